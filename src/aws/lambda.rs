/// Serverless function and its execution role
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::handler::HandlerVariant;
use crate::resource::{Declare, Reference};

const LAMBDA_BASIC_EXECUTION: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

/// Code archive uploaded by the engine
#[derive(Debug, Clone, Serialize)]
pub struct FileArchive {
    #[serde(rename = "fn::fileArchive")]
    pub path: PathBuf,
}

/// A function invoked synchronously with a request event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    pub runtime: String,
    pub handler: String,
    pub role: Reference,
    pub code: FileArchive,
    pub memory_size: u32,
    pub timeout: u32,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl FunctionSpec {
    /// Function running `variant` from the archive at `artifact`
    pub fn new(
        runtime: impl Into<String>,
        variant: HandlerVariant,
        role: Reference,
        artifact: &Path,
    ) -> Self {
        Self {
            runtime: runtime.into(),
            handler: variant.entry_point().to_string(),
            role,
            code: FileArchive {
                path: artifact.to_path_buf(),
            },
            memory_size: 128,
            timeout: 10,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_limits(mut self, memory_size: u32, timeout: u32) -> Self {
        self.memory_size = memory_size;
        self.timeout = timeout;
        self
    }
}

impl Declare for FunctionSpec {
    const TYPE_TOKEN: &'static str = "aws:lambda:Function";
}

/// IAM role the function assumes
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRoleSpec {
    /// Trust policy as a JSON document string
    pub assume_role_policy: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl ExecutionRoleSpec {
    /// Role trusted by the Lambda service
    pub fn for_lambda(tags: BTreeMap<String, String>) -> Self {
        let policy = serde_json::json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Action": "sts:AssumeRole",
                "Effect": "Allow",
                "Principal": { "Service": "lambda.amazonaws.com" },
            }],
        });
        Self {
            assume_role_policy: policy.to_string(),
            tags,
        }
    }
}

impl Declare for ExecutionRoleSpec {
    const TYPE_TOKEN: &'static str = "aws:iam:Role";
}

/// Managed policy attached to a role
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePolicyAttachmentSpec {
    pub role: Reference,
    pub policy_arn: String,
}

impl RolePolicyAttachmentSpec {
    /// CloudWatch Logs access for the function
    pub fn basic_execution(role: &Reference) -> Self {
        Self {
            role: role.with_field("name"),
            policy_arn: LAMBDA_BASIC_EXECUTION.to_string(),
        }
    }
}

impl Declare for RolePolicyAttachmentSpec {
    const TYPE_TOKEN: &'static str = "aws:iam:RolePolicyAttachment";
}
