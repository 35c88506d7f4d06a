/// GKE cluster, node pools and the random name suffix
use serde::Serialize;
use std::collections::BTreeMap;

use super::naming::SUFFIX_LEN;
use crate::config::NodePoolConfig;
use crate::resource::{Declare, Reference};

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Taint key the GPU pool carries and GPU workloads tolerate
pub const GPU_TAINT_KEY: &str = "nvidia.com/gpu";

/// Node label GKE sets on nodes with an attached accelerator
pub const ACCELERATOR_LABEL: &str = "cloud.google.com/gke-accelerator";

/// Engine-side random string used as a name suffix
#[derive(Debug, Clone, Serialize)]
pub struct RandomSuffixSpec {
    pub length: usize,
    pub special: bool,
    pub upper: bool,
    pub lower: bool,
    pub numeric: bool,
}

impl Default for RandomSuffixSpec {
    fn default() -> Self {
        Self {
            length: SUFFIX_LEN,
            special: false,
            upper: false,
            lower: true,
            numeric: true,
        }
    }
}

impl Declare for RandomSuffixSpec {
    const TYPE_TOKEN: &'static str = "random:RandomString";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadIdentityConfig {
    pub workload_pool: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseChannel {
    pub channel: String,
}

/// Managed container cluster. The default pool is removed so that node pools
/// are declared separately.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub name: String,
    pub location: String,
    pub project: String,
    pub initial_node_count: u32,
    pub remove_default_node_pool: bool,
    pub networking_mode: String,
    pub ip_allocation_policy: BTreeMap<String, String>,
    pub workload_identity_config: WorkloadIdentityConfig,
    pub release_channel: ReleaseChannel,
    pub deletion_protection: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_labels: BTreeMap<String, String>,
}

impl ClusterSpec {
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        project: impl Into<String>,
        release_channel: impl Into<String>,
    ) -> Self {
        let project = project.into();
        Self {
            name: name.into(),
            location: location.into(),
            workload_identity_config: WorkloadIdentityConfig {
                workload_pool: format!("{}.svc.id.goog", project),
            },
            project,
            initial_node_count: 1,
            remove_default_node_pool: true,
            networking_mode: "VPC_NATIVE".to_string(),
            ip_allocation_policy: BTreeMap::new(),
            release_channel: ReleaseChannel {
                channel: release_channel.into(),
            },
            deletion_protection: false,
            resource_labels: BTreeMap::new(),
        }
    }

    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.resource_labels = labels;
        self
    }
}

impl Declare for ClusterSpec {
    const TYPE_TOKEN: &'static str = "gcp:container:Cluster";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Autoscaling {
    pub min_node_count: u32,
    pub max_node_count: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeManagement {
    pub auto_repair: bool,
    pub auto_upgrade: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuestAccelerator {
    #[serde(rename = "type")]
    pub accelerator_type: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Taint {
    pub key: String,
    pub value: String,
    pub effect: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkloadMetadataConfig {
    pub mode: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    pub machine_type: String,
    pub oauth_scopes: Vec<String>,
    pub preemptible: bool,
    pub workload_metadata_config: WorkloadMetadataConfig,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub guest_accelerators: Vec<GuestAccelerator>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,
}

/// Group of uniformly configured machines owned by a cluster
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolSpec {
    pub cluster: Reference,
    pub location: String,
    pub project: String,
    pub initial_node_count: u32,
    pub autoscaling: Autoscaling,
    pub management: NodeManagement,
    pub node_config: NodeConfig,
}

impl NodePoolSpec {
    /// Pool attached to `cluster`, shaped by `config`.
    ///
    /// An accelerator in the config adds the guest accelerator and the GPU taint.
    pub fn from_config(
        cluster: &Reference,
        location: impl Into<String>,
        project: impl Into<String>,
        role: &str,
        config: &NodePoolConfig,
    ) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert("pool-role".to_string(), role.to_string());

        let (guest_accelerators, taints) = match &config.accelerator {
            Some(accelerator) => (
                vec![GuestAccelerator {
                    accelerator_type: accelerator.accelerator_type.clone(),
                    count: accelerator.count,
                }],
                vec![Taint {
                    key: GPU_TAINT_KEY.to_string(),
                    value: "present".to_string(),
                    effect: "NO_SCHEDULE".to_string(),
                }],
            ),
            None => (Vec::new(), Vec::new()),
        };

        Self {
            cluster: cluster.with_field("name"),
            location: location.into(),
            project: project.into(),
            initial_node_count: config.min_nodes,
            autoscaling: Autoscaling {
                min_node_count: config.min_nodes,
                max_node_count: config.max_nodes,
            },
            management: NodeManagement {
                auto_repair: true,
                auto_upgrade: true,
            },
            node_config: NodeConfig {
                machine_type: config.machine_type.clone(),
                oauth_scopes: vec![CLOUD_PLATFORM_SCOPE.to_string()],
                preemptible: config.preemptible,
                workload_metadata_config: WorkloadMetadataConfig {
                    mode: "GKE_METADATA".to_string(),
                },
                labels,
                guest_accelerators,
                taints,
            },
        }
    }

    pub fn has_accelerator(&self) -> bool {
        !self.node_config.guest_accelerators.is_empty()
    }
}

impl Declare for NodePoolSpec {
    const TYPE_TOKEN: &'static str = "gcp:container:NodePool";
}
