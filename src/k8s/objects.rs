/// Namespace-scoped Kubernetes objects and the provider they are applied through
use serde::Serialize;
use std::collections::BTreeMap;

use crate::gcp::container::{ACCELERATOR_LABEL, GPU_TAINT_KEY};
use crate::resource::Declare;

const DRIVER_INSTALLER_IMAGE: &str = "cos-nvidia-installer:fixed";
const PAUSE_IMAGE: &str = "gcr.io/google-containers/pause:2.0";

/// Object metadata shared by every kind
#[derive(Debug, Clone, Default, Serialize)]
pub struct ObjectMeta {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Kubernetes provider bound to the generated kubeconfig
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesProviderSpec {
    pub kubeconfig: String,
    pub enable_server_side_apply: bool,
}

impl KubernetesProviderSpec {
    pub fn new(kubeconfig: String) -> Self {
        Self {
            kubeconfig,
            enable_server_side_apply: true,
        }
    }
}

impl Declare for KubernetesProviderSpec {
    const TYPE_TOKEN: &'static str = "pulumi:providers:kubernetes";
}

#[derive(Debug, Clone, Serialize)]
pub struct NamespaceSpec {
    pub metadata: ObjectMeta,
}

impl NamespaceSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::named(name).label("app.kubernetes.io/managed-by", "stratus"),
        }
    }
}

impl Declare for NamespaceSpec {
    const TYPE_TOKEN: &'static str = "kubernetes:core/v1:Namespace";
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotaBody {
    pub hard: BTreeMap<String, String>,
}

/// Ceiling on aggregate resources consumed inside a namespace
#[derive(Debug, Clone, Serialize)]
pub struct QuotaSpec {
    pub metadata: ObjectMeta,
    pub spec: QuotaBody,
}

impl QuotaSpec {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::named(name).in_namespace(namespace),
            spec: QuotaBody {
                hard: BTreeMap::new(),
            },
        }
    }

    /// Limit GPU requests in the namespace
    pub fn gpus(self, count: u32) -> Self {
        self.limit(format!("requests.{}", GPU_TAINT_KEY), count.to_string())
    }

    pub fn limit(mut self, resource: impl Into<String>, quantity: impl Into<String>) -> Self {
        self.spec.hard.insert(resource.into(), quantity.into());
        self
    }
}

impl Declare for QuotaSpec {
    const TYPE_TOKEN: &'static str = "kubernetes:core/v1:ResourceQuota";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    pub match_labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PodTemplate {
    pub metadata: ObjectMeta,
    pub spec: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonSetBody {
    pub selector: LabelSelector,
    pub update_strategy: serde_json::Value,
    pub template: PodTemplate,
}

/// Workload running one pod on every qualifying node
#[derive(Debug, Clone, Serialize)]
pub struct DaemonSetSpec {
    pub metadata: ObjectMeta,
    pub spec: DaemonSetBody,
}

impl DaemonSetSpec {
    /// Installs NVIDIA drivers on every node carrying an accelerator
    pub fn nvidia_driver_installer() -> Self {
        let name = "nvidia-driver-installer";
        let labels: BTreeMap<String, String> =
            [("k8s-app".to_string(), name.to_string())].into_iter().collect();

        let pod_spec = serde_json::json!({
            "priorityClassName": "system-node-critical",
            "hostNetwork": true,
            "hostPID": true,
            "affinity": {
                "nodeAffinity": {
                    "requiredDuringSchedulingIgnoredDuringExecution": {
                        "nodeSelectorTerms": [{
                            "matchExpressions": [{
                                "key": ACCELERATOR_LABEL,
                                "operator": "Exists",
                            }],
                        }],
                    },
                },
            },
            "tolerations": [{ "operator": "Exists" }],
            "volumes": [
                { "name": "dev", "hostPath": { "path": "/dev" } },
                { "name": "vulkan-icd-mount", "hostPath": { "path": "/home/kubernetes/bin/nvidia/vulkan/icd.d" } },
                { "name": "nvidia-install-dir-host", "hostPath": { "path": "/home/kubernetes/bin/nvidia" } },
                { "name": "root-mount", "hostPath": { "path": "/" } },
                { "name": "cos-tools", "hostPath": { "path": "/var/lib/cos-tools" } },
            ],
            "initContainers": [{
                "name": name,
                "image": DRIVER_INSTALLER_IMAGE,
                "imagePullPolicy": "IfNotPresent",
                "resources": { "requests": { "cpu": "150m" } },
                "securityContext": { "privileged": true },
                "env": [
                    { "name": "NVIDIA_INSTALL_DIR_HOST", "value": "/home/kubernetes/bin/nvidia" },
                    { "name": "NVIDIA_INSTALL_DIR_CONTAINER", "value": "/usr/local/nvidia" },
                    { "name": "VULKAN_ICD_DIR_HOST", "value": "/home/kubernetes/bin/nvidia/vulkan/icd.d" },
                    { "name": "VULKAN_ICD_DIR_CONTAINER", "value": "/etc/vulkan/icd.d" },
                    { "name": "ROOT_MOUNT_DIR", "value": "/root" },
                    { "name": "COS_TOOLS_DIR_HOST", "value": "/var/lib/cos-tools" },
                    { "name": "COS_TOOLS_DIR_CONTAINER", "value": "/build/cos-tools" },
                ],
                "volumeMounts": [
                    { "name": "nvidia-install-dir-host", "mountPath": "/usr/local/nvidia" },
                    { "name": "vulkan-icd-mount", "mountPath": "/etc/vulkan/icd.d" },
                    { "name": "dev", "mountPath": "/dev" },
                    { "name": "root-mount", "mountPath": "/root" },
                    { "name": "cos-tools", "mountPath": "/build/cos-tools" },
                ],
            }],
            "containers": [{ "name": "pause", "image": PAUSE_IMAGE }],
        });

        Self {
            metadata: ObjectMeta::named(name)
                .in_namespace("kube-system")
                .label("k8s-app", name),
            spec: DaemonSetBody {
                selector: LabelSelector {
                    match_labels: labels.clone(),
                },
                update_strategy: serde_json::json!({ "type": "RollingUpdate" }),
                template: PodTemplate {
                    metadata: ObjectMeta {
                        labels,
                        ..ObjectMeta::default()
                    },
                    spec: pod_spec,
                },
            },
        }
    }
}

impl Declare for DaemonSetSpec {
    const TYPE_TOKEN: &'static str = "kubernetes:apps/v1:DaemonSet";
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageRequest {
    pub requests: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimBody {
    pub access_modes: Vec<String>,
    pub storage_class_name: String,
    pub resources: StorageRequest,
}

/// Persistent storage requested by training workloads
#[derive(Debug, Clone, Serialize)]
pub struct VolumeClaimSpec {
    pub metadata: ObjectMeta,
    pub spec: ClaimBody,
}

impl VolumeClaimSpec {
    /// Single-writer claim of `size` from `storage_class`
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        storage_class: impl Into<String>,
        size: impl Into<String>,
    ) -> Self {
        Self {
            metadata: ObjectMeta::named(name).in_namespace(namespace),
            spec: ClaimBody {
                access_modes: vec!["ReadWriteOnce".to_string()],
                storage_class_name: storage_class.into(),
                resources: StorageRequest {
                    requests: [("storage".to_string(), size.into())].into_iter().collect(),
                },
            },
        }
    }
}

impl Declare for VolumeClaimSpec {
    const TYPE_TOKEN: &'static str = "kubernetes:core/v1:PersistentVolumeClaim";
}
