/// Kubeconfig generation for the GKE cluster
use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{Result, StratusError};
use crate::resource::Reference;

const TEMPLATE_NAME: &str = "kubeconfig";

const KUBECONFIG_TEMPLATE: &str = r#"apiVersion: v1
kind: Config
clusters:
- name: {{context}}
  cluster:
    certificate-authority-data: {{ca_certificate}}
    server: https://{{endpoint}}
contexts:
- name: {{context}}
  context:
    cluster: {{context}}
    user: {{context}}
current-context: {{context}}
preferences: {}
users:
- name: {{context}}
  user:
    exec:
      apiVersion: client.authentication.k8s.io/v1beta1
      command: gke-gcloud-auth-plugin
      installHint: Install gke-gcloud-auth-plugin for use with kubectl by following https://cloud.google.com/kubernetes-engine/docs/how-to/cluster-access-for-kubectl#install_plugin
      provideClusterInfo: true
"#;

#[derive(Serialize)]
struct KubeconfigContext {
    context: String,
    endpoint: String,
    ca_certificate: String,
}

/// Renders a kubeconfig whose values are engine interpolations over the cluster
pub struct KubeconfigTemplate {
    registry: Handlebars<'static>,
}

impl KubeconfigTemplate {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(TEMPLATE_NAME, KUBECONFIG_TEMPLATE)
            .map_err(|e| StratusError::Template(e.to_string()))?;
        Ok(Self { registry })
    }

    /// Kubeconfig for `cluster`, named after project and location like gcloud does
    pub fn render(&self, cluster: &Reference, project: &str, location: &str) -> Result<String> {
        let context = KubeconfigContext {
            context: format!("gke_{}_{}_{}", project, location, cluster.with_field("name")),
            endpoint: cluster.with_field("endpoint").to_string(),
            ca_certificate: cluster
                .with_field("masterAuth.clusterCaCertificate")
                .to_string(),
        };
        self.registry
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| StratusError::Template(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kubeconfig_uses_cluster_outputs() {
        let template = KubeconfigTemplate::new().unwrap();
        let kubeconfig = template
            .render(&Reference::to("cluster"), "ml-lab", "us-central1-a")
            .unwrap();

        assert!(kubeconfig.contains("server: https://${cluster.endpoint}"));
        assert!(kubeconfig
            .contains("certificate-authority-data: ${cluster.masterAuth.clusterCaCertificate}"));
        assert!(kubeconfig.contains("current-context: gke_ml-lab_us-central1-a_${cluster.name}"));
        assert!(kubeconfig.contains("command: gke-gcloud-auth-plugin"));
    }

    #[test]
    fn test_kubeconfig_is_yaml() {
        let template = KubeconfigTemplate::new().unwrap();
        let kubeconfig = template
            .render(&Reference::to("cluster"), "p", "z")
            .unwrap();

        let parsed: serde_yaml::Value = serde_yaml::from_str(&kubeconfig).unwrap();
        assert_eq!(parsed["kind"], "Config");
        assert_eq!(parsed["users"][0]["user"]["exec"]["provideClusterInfo"], true);
    }
}
