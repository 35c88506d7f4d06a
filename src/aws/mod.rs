/// AWS resource records: the serverless function and the REST API in front of it
pub mod apigateway;
pub mod artifact;
pub mod lambda;

pub use apigateway::{RestApiSpec, RouteSpec};
pub use artifact::FunctionArtifact;
pub use lambda::{ExecutionRoleSpec, FunctionSpec, RolePolicyAttachmentSpec};
