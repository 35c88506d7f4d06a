/// Ordered collection of declared resources and exported outputs
use tracing::debug;

use super::{Reference, Resource};
use crate::error::{Result, StratusError};

/// Exported value; secrets stay encrypted in the engine's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputValue {
    Plain(String),
    Secret(String),
}

impl OutputValue {
    pub fn as_str(&self) -> &str {
        match self {
            OutputValue::Plain(v) | OutputValue::Secret(v) => v,
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, OutputValue::Secret(_))
    }
}

/// Everything one program declares
#[derive(Debug, Clone, Default)]
pub struct Stack {
    name: String,
    description: String,
    config: Vec<(String, String)>,
    resources: Vec<Resource>,
    outputs: Vec<(String, OutputValue)>,
}

impl Stack {
    /// Create an empty stack
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Set a provider configuration value for this stack (e.g. `aws:region`)
    pub fn set_config(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.config.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.config.push((key, value)),
        }
    }

    /// Provider configuration in insertion order
    pub fn config(&self) -> &[(String, String)] {
        &self.config
    }

    /// Add a resource, returning a reference to it.
    ///
    /// Logical names must be unique inside one program; provider-side names are
    /// left to the engine.
    pub fn add(&mut self, resource: Resource) -> Result<Reference> {
        if self.get(&resource.name).is_some() {
            return Err(StratusError::DuplicateResource(resource.name));
        }
        debug!(
            "Declared {} ({})",
            resource.name, resource.type_token
        );
        let reference = resource.reference();
        self.resources.push(resource);
        Ok(reference)
    }

    /// Publish a value for downstream consumption
    pub fn export(&mut self, key: impl Into<String>, value: impl ToString) -> Result<()> {
        self.push_output(key.into(), OutputValue::Plain(value.to_string()))
    }

    /// Publish a value that the engine keeps encrypted
    pub fn export_secret(&mut self, key: impl Into<String>, value: impl ToString) -> Result<()> {
        self.push_output(key.into(), OutputValue::Secret(value.to_string()))
    }

    fn push_output(&mut self, key: String, value: OutputValue) -> Result<()> {
        if self.outputs.iter().any(|(k, _)| *k == key) {
            return Err(StratusError::DuplicateOutput(key));
        }
        self.outputs.push((key, value));
        Ok(())
    }

    /// Look up a declared resource by logical name
    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Resources in declaration order
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Exports in declaration order
    pub fn outputs(&self) -> &[(String, OutputValue)] {
        &self.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceOptions;

    fn resource(name: &str) -> Resource {
        Resource {
            name: name.to_string(),
            type_token: "test:index:Thing",
            properties: serde_yaml::Value::Null,
            options: ResourceOptions::default(),
        }
    }

    #[test]
    fn test_add_keeps_order() {
        let mut stack = Stack::new("demo", "");
        stack.add(resource("b")).unwrap();
        stack.add(resource("a")).unwrap();

        let names: Vec<_> = stack.resources().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn test_duplicate_logical_name_rejected() {
        let mut stack = Stack::new("demo", "");
        stack.add(resource("a")).unwrap();

        let err = stack.add(resource("a")).unwrap_err();
        assert!(matches!(err, StratusError::DuplicateResource(name) if name == "a"));
        assert_eq!(stack.resources().len(), 1);
    }

    #[test]
    fn test_export_references() {
        let mut stack = Stack::new("demo", "");
        let api = stack.add(resource("api")).unwrap();
        stack.export("url", api.with_field("url")).unwrap();

        assert_eq!(
            stack.outputs(),
            [("url".to_string(), OutputValue::Plain("${api.url}".to_string()))]
        );
        assert!(stack.export("url", "again").is_err());
        assert!(stack.export_secret("url", "again").is_err());
    }

    #[test]
    fn test_config_overwrites_in_place() {
        let mut stack = Stack::new("demo", "");
        stack.set_config("gcp:zone", "a");
        stack.set_config("gcp:project", "p");
        stack.set_config("gcp:zone", "b");

        assert_eq!(
            stack.config(),
            [
                ("gcp:zone".to_string(), "b".to_string()),
                ("gcp:project".to_string(), "p".to_string())
            ]
        );
    }
}
