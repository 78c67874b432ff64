//! Controller configuration
//!
//! Loaded from YAML with camelCase keys:
//!
//! ```yaml
//! trustDomain: example.org
//! clusterName: prod
//! clusterDomain: cluster.local
//! ignoreNamespaces: [kube-system]
//! ```

use serde::{Deserialize, Serialize};
use spiffe::TrustDomain;
use tracing::debug;

use crate::entry::EntryRenderer;
use crate::{Error, Result};

/// Namespaces skipped when no `ignoreNamespaces` is configured
pub const DEFAULT_IGNORE_NAMESPACES: &[&str] = &["kube-system", "kube-public", "spire-system"];

fn default_ignore_namespaces() -> Vec<String> {
    DEFAULT_IGNORE_NAMESPACES
        .iter()
        .map(|ns| ns.to_string())
        .collect()
}

/// Settings shared by every entry derived in a cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerConfig {
    /// Trust domain all rendered SPIFFE IDs must belong to
    pub trust_domain: String,
    /// Cluster name used in parent IDs
    pub cluster_name: String,
    /// Cluster DNS domain, e.g. `cluster.local`
    #[serde(default)]
    pub cluster_domain: String,
    /// Namespaces whose pods never get entries
    #[serde(default = "default_ignore_namespaces")]
    pub ignore_namespaces: Vec<String>,
}

impl ControllerConfig {
    /// Parse and validate configuration from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| Error::config(format!("invalid YAML: {e}")))?;
        config.validate()?;
        debug!(
            trust_domain = %config.trust_domain,
            cluster_name = %config.cluster_name,
            cluster_domain = %config.cluster_domain,
            ignore_namespaces = config.ignore_namespaces.len(),
            "Loaded controller configuration"
        );
        Ok(config)
    }

    /// Check the trust domain is well formed and the cluster name is set
    pub fn validate(&self) -> Result<()> {
        self.parsed_trust_domain()?;
        if self.cluster_name.trim().is_empty() {
            return Err(Error::config("clusterName is required"));
        }
        Ok(())
    }

    /// Whether pods in `namespace` are skipped
    pub fn is_namespace_ignored(&self, namespace: &str) -> bool {
        self.ignore_namespaces.iter().any(|ns| ns == namespace)
    }

    /// Renderer bound to this cluster's trust domain, name and DNS domain
    pub fn entry_renderer(&self) -> Result<EntryRenderer> {
        self.validate()?;
        Ok(EntryRenderer::new(
            self.parsed_trust_domain()?,
            self.cluster_name.clone(),
            self.cluster_domain.clone(),
        ))
    }

    fn parsed_trust_domain(&self) -> Result<TrustDomain> {
        TrustDomain::new(&self.trust_domain)
            .map_err(|e| Error::config(format!("invalid trustDomain {:?}: {e}", self.trust_domain)))
    }
}
