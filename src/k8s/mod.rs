/// Kubernetes objects declared on the training cluster
pub mod kubeconfig;
pub mod objects;

pub use kubeconfig::KubeconfigTemplate;
pub use objects::{
    DaemonSetSpec, KubernetesProviderSpec, NamespaceSpec, QuotaSpec, VolumeClaimSpec,
};
