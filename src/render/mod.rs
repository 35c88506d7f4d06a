/// Render a stack as a Pulumi YAML program
use anyhow::{Context, Result};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::resource::{OutputValue, Stack};

pub const PROGRAM_FILE: &str = "Pulumi.yaml";

/// Program document: project header, resources and outputs
pub fn program(stack: &Stack) -> Result<Value> {
    let mut doc = Mapping::new();
    doc.insert("name".into(), stack.name().into());
    doc.insert("runtime".into(), "yaml".into());
    if !stack.description().is_empty() {
        doc.insert("description".into(), stack.description().into());
    }

    let mut resources = Mapping::new();
    for resource in stack.resources() {
        let entry = resource
            .to_program_entry()
            .with_context(|| format!("Failed to render resource {}", resource.name))?;
        resources.insert(resource.name.clone().into(), entry);
    }
    doc.insert("resources".into(), Value::Mapping(resources));

    if !stack.outputs().is_empty() {
        let mut outputs = Mapping::new();
        for (key, value) in stack.outputs() {
            outputs.insert(key.clone().into(), output_value(value));
        }
        doc.insert("outputs".into(), Value::Mapping(outputs));
    }

    Ok(Value::Mapping(doc))
}

fn output_value(value: &OutputValue) -> Value {
    if !value.is_secret() {
        return value.as_str().into();
    }
    let mut secret = Mapping::new();
    secret.insert("fn::secret".into(), value.as_str().into());
    Value::Mapping(secret)
}

/// Per-stack settings file holding provider configuration
pub fn stack_settings(stack: &Stack) -> Value {
    let config: Mapping = stack
        .config()
        .iter()
        .map(|(k, v)| (Value::from(k.clone()), Value::from(v.clone())))
        .collect();

    let mut doc = Mapping::new();
    doc.insert("config".into(), Value::Mapping(config));
    Value::Mapping(doc)
}

/// Name of the per-stack settings file
pub fn settings_file(stack_name: &str) -> String {
    format!("Pulumi.{}.yaml", stack_name)
}

/// Files written for one program
#[derive(Debug, Clone)]
pub struct RenderedProgram {
    pub dir: PathBuf,
    pub program: PathBuf,
    pub settings: PathBuf,
}

/// Write the program and its stack settings into `dir`
pub async fn write(stack: &Stack, stack_name: &str, dir: &Path) -> Result<RenderedProgram> {
    tokio::fs::create_dir_all(dir)
        .await
        .context("Failed to create output directory")?;

    let program_path = dir.join(PROGRAM_FILE);
    let yaml = serde_yaml::to_string(&program(stack)?)?;
    tokio::fs::write(&program_path, yaml)
        .await
        .with_context(|| format!("Failed to write {}", program_path.display()))?;

    let settings_path = dir.join(settings_file(stack_name));
    let yaml = serde_yaml::to_string(&stack_settings(stack))?;
    tokio::fs::write(&settings_path, yaml)
        .await
        .with_context(|| format!("Failed to write {}", settings_path.display()))?;

    info!(
        "Rendered {} resources to {}",
        stack.resources().len(),
        program_path.display()
    );

    Ok(RenderedProgram {
        dir: dir.to_path_buf(),
        program: program_path,
        settings: settings_path,
    })
}
