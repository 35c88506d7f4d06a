/// Configuration management for Stratus stacks
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::StratusError;
use crate::handler::HandlerVariant;

const DEFAULT_AWS_REGION: &str = "us-east-1";
const DEFAULT_GCP_REGION: &str = "us-central1";
const DEFAULT_GCP_ZONE: &str = "us-central1-a";

/// Main stack configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    /// Pulumi project name
    pub project: String,

    /// Pulumi stack name
    #[serde(default = "default_stack")]
    pub stack: String,

    /// AWS settings for the API scenario
    #[serde(default)]
    pub aws: AwsConfig,

    /// GCP settings for the cluster scenario
    #[serde(default)]
    pub gcp: GcpConfig,

    /// HTTP API scenario
    #[serde(default)]
    pub api: ApiConfig,

    /// GPU training cluster scenario
    #[serde(default)]
    pub cluster: ClusterConfig,
}

/// AWS provider settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    /// AWS region (falls back to AWS_REGION, then us-east-1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// GCP provider settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GcpConfig {
    /// Project id (falls back to GOOGLE_CLOUD_PROJECT)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Region (falls back to GOOGLE_REGION, then us-central1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Zone the cluster lives in (falls back to GOOGLE_ZONE, then us-central1-a)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

/// HTTP API backed by a serverless function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Which handler body the function runs
    #[serde(default)]
    pub variant: HandlerVariant,

    /// Tags applied to the function and the REST API
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Lambda runtime identifier
    #[serde(default = "default_runtime")]
    pub function_runtime: String,

    /// Code archive uploaded as the function body
    #[serde(default = "default_artifact")]
    pub artifact: PathBuf,

    /// Directory served on `GET /`
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Function memory in MB
    #[serde(default = "default_memory")]
    pub memory_size: u32,

    /// Function timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u32,
}

/// GPU-enabled container cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Pinned 8 character name suffix; a random one is declared when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// GKE release channel
    #[serde(default = "default_release_channel")]
    pub release_channel: String,

    /// General purpose node pool
    #[serde(default = "NodePoolConfig::cpu_default")]
    pub cpu_pool: NodePoolConfig,

    /// Accelerator node pool
    #[serde(default = "NodePoolConfig::gpu_default")]
    pub gpu_pool: NodePoolConfig,

    /// Namespace training workloads run in
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Ceiling on GPUs requested inside the namespace
    #[serde(default = "default_gpu_quota")]
    pub gpu_quota: u32,

    /// Size of the training data volume claim (e.g. "100Gi")
    #[serde(default = "default_volume_size")]
    pub volume_size: String,

    /// Storage class of the training data volume claim
    #[serde(default = "default_storage_class")]
    pub storage_class: String,
}

/// Node pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePoolConfig {
    /// Compute machine type (e.g. "n1-standard-8")
    pub machine_type: String,

    /// Autoscaling lower bound
    #[serde(default)]
    pub min_nodes: u32,

    /// Autoscaling upper bound
    #[serde(default = "default_max_nodes")]
    pub max_nodes: u32,

    /// Attached accelerator, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerator: Option<AcceleratorConfig>,

    /// Use preemptible VMs
    #[serde(default)]
    pub preemptible: bool,
}

/// Accelerator attached to every node in a pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceleratorConfig {
    /// Accelerator type (e.g. "nvidia-tesla-t4")
    #[serde(rename = "type")]
    pub accelerator_type: String,

    /// Accelerators per node
    #[serde(default = "default_one")]
    pub count: u32,
}

fn default_stack() -> String {
    "dev".to_string()
}

fn default_runtime() -> String {
    "provided.al2023".to_string()
}

fn default_artifact() -> PathBuf {
    crate::aws::artifact::default_archive_path()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("www")
}

fn default_memory() -> u32 {
    128
}

fn default_timeout() -> u32 {
    10
}

fn default_release_channel() -> String {
    "REGULAR".to_string()
}

fn default_namespace() -> String {
    "pytorch-training".to_string()
}

fn default_gpu_quota() -> u32 {
    4
}

fn default_volume_size() -> String {
    "100Gi".to_string()
}

fn default_storage_class() -> String {
    "standard-rwo".to_string()
}

fn default_max_nodes() -> u32 {
    3
}

fn default_one() -> u32 {
    1
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            variant: HandlerVariant::default(),
            tags: BTreeMap::new(),
            function_runtime: default_runtime(),
            artifact: default_artifact(),
            static_dir: default_static_dir(),
            memory_size: default_memory(),
            timeout: default_timeout(),
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            suffix: None,
            release_channel: default_release_channel(),
            cpu_pool: NodePoolConfig::cpu_default(),
            gpu_pool: NodePoolConfig::gpu_default(),
            namespace: default_namespace(),
            gpu_quota: default_gpu_quota(),
            volume_size: default_volume_size(),
            storage_class: default_storage_class(),
        }
    }
}

impl NodePoolConfig {
    fn cpu_default() -> Self {
        Self {
            machine_type: "e2-standard-4".to_string(),
            min_nodes: 1,
            max_nodes: 3,
            accelerator: None,
            preemptible: false,
        }
    }

    fn gpu_default() -> Self {
        Self {
            machine_type: "n1-standard-8".to_string(),
            min_nodes: 0,
            max_nodes: 2,
            accelerator: Some(AcceleratorConfig {
                accelerator_type: "nvidia-tesla-t4".to_string(),
                count: 1,
            }),
            preemptible: false,
        }
    }
}

/// Pick the configured value, then the environment, then the default
fn resolve_with<F>(configured: Option<&str>, env_key: &str, default: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    configured
        .map(str::to_string)
        .or_else(|| lookup(env_key).filter(|v| !v.is_empty()))
        .unwrap_or_else(|| default.to_string())
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

impl StackConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: StackConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.project.is_empty() {
            anyhow::bail!("project cannot be empty");
        }

        if self.stack.is_empty() {
            anyhow::bail!("stack cannot be empty");
        }

        if self.api.function_runtime.is_empty() {
            anyhow::bail!("api.function_runtime cannot be empty");
        }

        self.validate_pool("cluster.cpu_pool", &self.cluster.cpu_pool)?;
        self.validate_pool("cluster.gpu_pool", &self.cluster.gpu_pool)?;

        Ok(())
    }

    fn validate_pool(&self, field: &str, pool: &NodePoolConfig) -> anyhow::Result<()> {
        if pool.min_nodes > pool.max_nodes {
            anyhow::bail!(
                "{}: min_nodes ({}) exceeds max_nodes ({})",
                field,
                pool.min_nodes,
                pool.max_nodes
            );
        }
        Ok(())
    }

    /// AWS region from config, AWS_REGION, or the default
    pub fn aws_region(&self) -> String {
        resolve_with(
            self.aws.region.as_deref(),
            "AWS_REGION",
            DEFAULT_AWS_REGION,
            env_lookup,
        )
    }

    /// GCP region from config, GOOGLE_REGION, or the default
    pub fn gcp_region(&self) -> String {
        resolve_with(
            self.gcp.region.as_deref(),
            "GOOGLE_REGION",
            DEFAULT_GCP_REGION,
            env_lookup,
        )
    }

    /// GCP zone from config, GOOGLE_ZONE, or the default
    pub fn gcp_zone(&self) -> String {
        resolve_with(
            self.gcp.zone.as_deref(),
            "GOOGLE_ZONE",
            DEFAULT_GCP_ZONE,
            env_lookup,
        )
    }

    /// GCP project id from config or GOOGLE_CLOUD_PROJECT
    pub fn gcp_project(&self) -> Result<String, StratusError> {
        self.gcp
            .project
            .clone()
            .or_else(|| env_lookup("GOOGLE_CLOUD_PROJECT").filter(|v| !v.is_empty()))
            .ok_or_else(|| {
                StratusError::MissingSetting(
                    "GCP project id not found. Set GOOGLE_CLOUD_PROJECT environment variable or specify gcp.project in config".to_string(),
                )
            })
    }

    /// Anchor relative file paths at `base` (the config file's directory)
    ///
    /// The rendered program runs from its own directory, so paths the engine
    /// uploads must not depend on the caller's working directory.
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.api.artifact, &mut self.api.static_dir] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Generate an example configuration file
    pub fn example() -> Self {
        Self {
            project: "stratus".to_string(),
            stack: default_stack(),
            aws: AwsConfig {
                region: Some(DEFAULT_AWS_REGION.to_string()),
            },
            gcp: GcpConfig {
                project: None,
                region: Some(DEFAULT_GCP_REGION.to_string()),
                zone: Some(DEFAULT_GCP_ZONE.to_string()),
            },
            api: ApiConfig {
                tags: [("Owner".to_string(), "Neo".to_string())]
                    .into_iter()
                    .collect(),
                ..ApiConfig::default()
            },
            cluster: ClusterConfig::default(),
        }
    }
}
