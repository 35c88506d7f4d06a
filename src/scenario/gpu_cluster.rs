/// GPU-enabled GKE cluster for PyTorch training
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::config::StackConfig;
use crate::error::Result;
use crate::gcp::naming::{cluster_name_from, derive_cluster_name};
use crate::gcp::{ClusterSpec, NodePoolSpec, RandomSuffixSpec};
use crate::k8s::{
    DaemonSetSpec, KubeconfigTemplate, KubernetesProviderSpec, NamespaceSpec, QuotaSpec,
    VolumeClaimSpec,
};
use crate::resource::{Declare, Stack};

pub const CLUSTER: &str = "cluster";
pub const SUFFIX: &str = "cluster-suffix";
pub const PROVIDER: &str = "k8s-provider";

/// Compose the cluster stack
pub fn build(config: &StackConfig) -> Result<Stack> {
    let settings = &config.cluster;
    let project = config.gcp_project()?;
    let zone = config.gcp_zone();

    let mut stack = Stack::new(
        format!("{}-cluster", config.project),
        "GPU-enabled Kubernetes cluster for machine learning training",
    );
    stack.set_config("gcp:project", project.clone());
    stack.set_config("gcp:region", config.gcp_region());
    stack.set_config("gcp:zone", zone.clone());

    let cluster_name = match &settings.suffix {
        Some(suffix) => derive_cluster_name(suffix)?,
        None => {
            let suffix = stack.add(RandomSuffixSpec::default().declare(SUFFIX)?)?;
            cluster_name_from(&suffix.with_field("result"))
        }
    };
    info!("Declaring cluster {} in {}", cluster_name, zone);

    let labels: BTreeMap<String, String> = [
        ("managed-by".to_string(), "stratus".to_string()),
        ("workload".to_string(), "pytorch-training".to_string()),
    ]
    .into_iter()
    .collect();
    let cluster = stack.add(
        ClusterSpec::new(cluster_name, zone.clone(), project.clone(), settings.release_channel.clone())
            .with_labels(labels)
            .declare(CLUSTER)?,
    )?;

    let cpu_pool = stack.add(
        NodePoolSpec::from_config(&cluster, zone.clone(), project.clone(), "cpu", &settings.cpu_pool)
            .declare("cpu-pool")?,
    )?;
    let gpu_pool_spec =
        NodePoolSpec::from_config(&cluster, zone.clone(), project.clone(), "gpu", &settings.gpu_pool);
    if !gpu_pool_spec.has_accelerator() {
        warn!("gpu-pool has no accelerator configured; training pods will not get GPUs");
    }
    let gpu_pool = stack.add(gpu_pool_spec.declare("gpu-pool")?)?;

    let kubeconfig = KubeconfigTemplate::new()?.render(&cluster, &project, &zone)?;
    let provider = stack.add(
        KubernetesProviderSpec::new(kubeconfig.clone())
            .declare(PROVIDER)?
            .depends_on(cpu_pool)
            .depends_on(gpu_pool)
            .secret_outputs(["kubeconfig"]),
    )?;

    let namespace = stack.add(
        NamespaceSpec::new(settings.namespace.clone())
            .declare("training-ns")?
            .with_provider(provider.clone()),
    )?;
    let namespace_name = namespace.with_field("metadata.name").to_string();

    stack.add(
        QuotaSpec::new("gpu-quota", namespace_name.clone())
            .gpus(settings.gpu_quota)
            .declare("gpu-quota")?
            .with_provider(provider.clone()),
    )?;
    stack.add(
        DaemonSetSpec::nvidia_driver_installer()
            .declare("nvidia-driver-installer")?
            .with_provider(provider.clone()),
    )?;
    stack.add(
        VolumeClaimSpec::new(
            "training-data",
            namespace_name,
            settings.storage_class.clone(),
            settings.volume_size.clone(),
        )
        .declare("training-data")?
        .with_provider(provider),
    )?;

    stack.export("clusterName", cluster.with_field("name"))?;
    stack.export("endpoint", cluster.with_field("endpoint"))?;
    stack.export("location", cluster.with_field("location"))?;
    stack.export_secret("kubeconfig", kubeconfig)?;

    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StratusError;

    fn config() -> StackConfig {
        let mut config = StackConfig::example();
        config.gcp.project = Some("ml-lab".to_string());
        config
    }

    #[test]
    fn test_random_suffix_declared_when_unpinned() {
        let stack = build(&config()).unwrap();

        assert_eq!(stack.resources()[0].name, SUFFIX);
        assert_eq!(
            stack.get(CLUSTER).unwrap().properties["name"],
            "pytorch-cluster-${cluster-suffix.result}"
        );
    }

    #[test]
    fn test_pinned_suffix_used_verbatim() {
        let mut config = config();
        config.cluster.suffix = Some("k3v9q2xa".to_string());

        let stack = build(&config).unwrap();
        assert!(stack.get(SUFFIX).is_none());
        assert_eq!(
            stack.get(CLUSTER).unwrap().properties["name"],
            "pytorch-cluster-k3v9q2xa"
        );
    }

    #[test]
    fn test_bad_pinned_suffix_rejected() {
        let mut config = config();
        config.cluster.suffix = Some("Not-Valid".to_string());

        assert!(matches!(
            build(&config),
            Err(StratusError::InvalidSuffix { .. })
        ));
    }

    #[test]
    fn test_node_pools_reference_cluster() {
        let stack = build(&config()).unwrap();

        for pool in ["cpu-pool", "gpu-pool"] {
            let props = &stack.get(pool).unwrap().properties;
            assert_eq!(props["cluster"], "${cluster.name}");
            assert_eq!(props["location"], "us-central1-a");
        }
        assert_eq!(
            stack.get("gpu-pool").unwrap().properties["nodeConfig"]["taints"][0]["effect"],
            "NO_SCHEDULE"
        );
    }

    #[test]
    fn test_gpu_pool_without_accelerator_still_declared() {
        let mut config = config();
        config.cluster.gpu_pool.accelerator = None;

        let stack = build(&config).unwrap();
        let node_config = &stack.get("gpu-pool").unwrap().properties["nodeConfig"];
        assert!(node_config.get("guestAccelerators").is_none());
        assert!(node_config.get("taints").is_none());
    }

    #[test]
    fn test_kubernetes_objects_use_provider() {
        let stack = build(&config()).unwrap();

        for name in ["training-ns", "gpu-quota", "nvidia-driver-installer", "training-data"] {
            let resource = stack.get(name).unwrap();
            assert_eq!(
                resource.options.provider.as_ref().map(ToString::to_string).as_deref(),
                Some("${k8s-provider}"),
                "{} not bound to provider",
                name
            );
        }
        assert_eq!(
            stack.get("gpu-quota").unwrap().properties["metadata"]["namespace"],
            "${training-ns.metadata.name}"
        );
    }

    #[test]
    fn test_cluster_exports() {
        let stack = build(&config()).unwrap();
        let keys: Vec<_> = stack.outputs().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["clusterName", "endpoint", "location", "kubeconfig"]);

        let (_, kubeconfig) = &stack.outputs()[3];
        assert!(kubeconfig.is_secret());
        assert!(kubeconfig.as_str().contains("${cluster.endpoint}"));
    }
}
