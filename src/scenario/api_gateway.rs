/// HTTP API: `GET /source` invokes the function, `GET /` serves static files
use tracing::{debug, info};

use crate::aws::{ExecutionRoleSpec, FunctionSpec, RestApiSpec, RolePolicyAttachmentSpec, RouteSpec};
use crate::config::StackConfig;
use crate::error::Result;
use crate::resource::{Declare, Stack};

pub const FUNCTION_NAME: &str = "handler";
pub const API_NAME: &str = "api";
pub const SOURCE_PATH: &str = "/source";

/// Compose the API stack
pub fn build(config: &StackConfig) -> Result<Stack> {
    let api = &config.api;
    info!(
        "Declaring API stack (handler: {}, runtime: {})",
        api.variant, api.function_runtime
    );

    let mut stack = Stack::new(
        format!("{}-api", config.project),
        "HTTP API backed by a serverless function",
    );
    stack.set_config("aws:region", config.aws_region());

    let role = stack.add(ExecutionRoleSpec::for_lambda(api.tags.clone()).declare("handler-role")?)?;
    let logs = stack.add(RolePolicyAttachmentSpec::basic_execution(&role).declare("handler-role-logs")?)?;

    let function = FunctionSpec::new(
        api.function_runtime.clone(),
        api.variant,
        role.with_field("arn"),
        &api.artifact,
    )
    .with_limits(api.memory_size, api.timeout)
    .with_tags(api.tags.clone());
    let handler = stack.add(function.declare(FUNCTION_NAME)?.depends_on(logs))?;

    let rest_api = RestApiSpec::new()
        .route(RouteSpec::function(SOURCE_PATH, "GET", handler))
        .route(RouteSpec::static_dir("/", api.static_dir.clone()))
        .with_tags(api.tags.clone());
    for route in rest_api.routes() {
        debug!("Route {}", route.path);
    }
    let endpoint = stack.add(rest_api.declare(API_NAME)?)?;

    // Public URL for the HTTP service
    stack.export("url", endpoint.with_field("url"))?;

    Ok(stack)
}
