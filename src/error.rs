/// Error types for stack declaration and composition
use thiserror::Error;

/// Errors raised while declaring resources or composing a stack
#[derive(Debug, Error)]
pub enum StratusError {
    /// Two resources in one program share a logical name
    #[error("resource '{0}' is already declared in this stack")]
    DuplicateResource(String),

    /// An output was exported twice under the same key
    #[error("output '{0}' is already exported")]
    DuplicateOutput(String),

    /// A pinned name suffix does not have the required shape
    #[error("invalid name suffix '{suffix}': expected {expected} lowercase alphanumeric characters")]
    InvalidSuffix { suffix: String, expected: usize },

    /// A typed record could not be converted into engine properties
    #[error("failed to serialize properties for {type_token}: {source}")]
    Properties {
        type_token: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    /// Template rendering failed
    #[error("template error: {0}")]
    Template(String),

    /// A required setting is missing from config and environment
    #[error("{0}")]
    MissingSetting(String),
}

pub type Result<T> = std::result::Result<T, StratusError>;
