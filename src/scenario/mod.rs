/// Scenario stacks composed from the typed resource records
pub mod api_gateway;
pub mod gpu_cluster;

use crate::config::StackConfig;
use crate::error::Result;
use crate::resource::Stack;

/// Independent programs this tool can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Scenario {
    /// HTTP API backed by a serverless function
    Api,
    /// GPU-enabled GKE cluster for model training
    Cluster,
}

impl Scenario {
    /// Compose the stack for this scenario
    pub fn build(&self, config: &StackConfig) -> Result<Stack> {
        match self {
            Scenario::Api => api_gateway::build(config),
            Scenario::Cluster => gpu_cluster::build(config),
        }
    }

    /// Directory name the rendered program is written to
    pub fn dir_name(&self) -> &'static str {
        match self {
            Scenario::Api => "api",
            Scenario::Cluster => "cluster",
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}
