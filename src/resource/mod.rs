/// Declarative resource records handed to the external engine
pub mod stack;

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::{Result, StratusError};

pub use stack::{OutputValue, Stack};

/// Handle to another resource, or to one of its output fields.
///
/// Displays as the engine interpolation `${name}` / `${name.field}`, which is how
/// one resource's output is wired into another's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    resource: String,
    field: Option<String>,
}

impl Reference {
    /// Reference the whole resource
    pub fn to(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            field: None,
        }
    }

    /// Reference one output field of a resource
    pub fn field(resource: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            field: Some(field.into()),
        }
    }

    /// Reference a different output field of the same resource
    pub fn with_field(&self, field: impl Into<String>) -> Self {
        Self::field(self.resource.clone(), field)
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "${{{}.{}}}", self.resource, field),
            None => write!(f, "${{{}}}", self.resource),
        }
    }
}

impl Serialize for Reference {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Engine-level options attached to a resource
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Reference>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<Reference>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub protect: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_secret_outputs: Vec<String>,
}

impl ResourceOptions {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// One declared resource: logical name, type token and desired properties
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name: String,
    pub type_token: &'static str,
    pub properties: Value,
    pub options: ResourceOptions,
}

impl Resource {
    /// Reference this resource as a whole
    pub fn reference(&self) -> Reference {
        Reference::to(self.name.clone())
    }

    /// Bind the resource to an explicit provider instance
    pub fn with_provider(mut self, provider: Reference) -> Self {
        self.options.provider = Some(provider);
        self
    }

    /// Add an explicit ordering dependency
    pub fn depends_on(mut self, dependency: Reference) -> Self {
        self.options.depends_on.push(dependency);
        self
    }

    /// Mark output fields as secrets in the engine's state
    pub fn secret_outputs<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options
            .additional_secret_outputs
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Entry in the program's `resources` section
    pub(crate) fn to_program_entry(&self) -> Result<Value> {
        let mut entry = Mapping::new();
        entry.insert("type".into(), self.type_token.into());
        if !is_empty_value(&self.properties) {
            entry.insert("properties".into(), self.properties.clone());
        }
        if !self.options.is_empty() {
            let options = serde_yaml::to_value(&self.options).map_err(|source| {
                StratusError::Properties {
                    type_token: self.type_token,
                    source,
                }
            })?;
            entry.insert("options".into(), options);
        }
        Ok(Value::Mapping(entry))
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Mapping(m) => m.is_empty(),
        _ => false,
    }
}

/// Implemented by every typed desired-state record
pub trait Declare: Serialize {
    /// Engine type token, e.g. `aws:lambda:Function`
    const TYPE_TOKEN: &'static str;

    /// Desired properties as the engine expects them
    fn properties(&self) -> Result<Value> {
        serde_yaml::to_value(self).map_err(|source| StratusError::Properties {
            type_token: Self::TYPE_TOKEN,
            source,
        })
    }

    /// Produce the resource under a logical name
    fn declare(&self, name: impl Into<String>) -> Result<Resource> {
        Ok(Resource {
            name: name.into(),
            type_token: Self::TYPE_TOKEN,
            properties: self.properties()?,
            options: ResourceOptions::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Bucket {
        bucket_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        website: Option<Reference>,
    }

    impl Declare for Bucket {
        const TYPE_TOKEN: &'static str = "aws:s3:Bucket";
    }

    #[test]
    fn test_reference_interpolation() {
        assert_eq!(Reference::to("provider").to_string(), "${provider}");
        assert_eq!(Reference::field("api", "url").to_string(), "${api.url}");
        assert_eq!(
            Reference::field("cluster", "name").with_field("endpoint").to_string(),
            "${cluster.endpoint}"
        );
    }

    #[test]
    fn test_declare_uses_camel_case_properties() {
        let resource = Bucket {
            bucket_name: "site".to_string(),
            website: Some(Reference::field("cdn", "domain")),
        }
        .declare("assets")
        .unwrap();

        assert_eq!(resource.type_token, "aws:s3:Bucket");
        assert_eq!(resource.properties["bucketName"], "site");
        assert_eq!(resource.properties["website"], "${cdn.domain}");
        assert_eq!(resource.reference().with_field("arn").to_string(), "${assets.arn}");
    }

    #[test]
    fn test_program_entry_omits_empty_options() {
        let resource = Bucket {
            bucket_name: "site".to_string(),
            website: None,
        }
        .declare("assets")
        .unwrap();

        let entry = resource.to_program_entry().unwrap();
        assert_eq!(entry["type"], "aws:s3:Bucket");
        assert!(entry.get("options").is_none());
    }

    #[test]
    fn test_program_entry_carries_options() {
        let resource = Bucket {
            bucket_name: "site".to_string(),
            website: None,
        }
        .declare("assets")
        .unwrap()
        .with_provider(Reference::to("k8s"))
        .depends_on(Reference::to("ns"))
        .secret_outputs(["kubeconfig"]);

        let entry = resource.to_program_entry().unwrap();
        assert_eq!(entry["options"]["provider"], "${k8s}");
        assert_eq!(entry["options"]["dependsOn"][0], "${ns}");
        assert_eq!(entry["options"]["additionalSecretOutputs"][0], "kubeconfig");
        assert!(entry["options"].get("protect").is_none());
    }
}
