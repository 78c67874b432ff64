//! Services associated with a pod
//!
//! The controller auto-populates DNS names from every service whose
//! Endpoints object targets the pod, ready or not.

use k8s_openapi::api::core::v1::{EndpointAddress, Endpoints};
use serde::{Deserialize, Serialize};

/// A service that routes to a pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// Service name
    pub name: String,
    /// Service namespace
    pub namespace: String,
}

impl From<&Endpoints> for ServiceEndpoint {
    fn from(endpoints: &Endpoints) -> Self {
        Self {
            name: endpoints.metadata.name.clone().unwrap_or_default(),
            namespace: endpoints.metadata.namespace.clone().unwrap_or_default(),
        }
    }
}

/// UIDs of the pods an Endpoints object targets
pub fn target_pod_uids(endpoints: &Endpoints) -> Vec<&str> {
    endpoints
        .subsets
        .iter()
        .flatten()
        .flat_map(|subset| {
            subset
                .addresses
                .iter()
                .flatten()
                .chain(subset.not_ready_addresses.iter().flatten())
        })
        .filter_map(pod_target_uid)
        .collect()
}

fn pod_target_uid(address: &EndpointAddress) -> Option<&str> {
    let target = address.target_ref.as_ref()?;
    if target.kind.as_deref() != Some("Pod") {
        return None;
    }
    target.uid.as_deref()
}

/// Services whose endpoints target the pod with `pod_uid`, in input order
pub fn endpoints_for_pod(endpoints: &[Endpoints], pod_uid: &str) -> Vec<ServiceEndpoint> {
    endpoints
        .iter()
        .filter(|e| target_pod_uids(e).contains(&pod_uid))
        .map(ServiceEndpoint::from)
        .collect()
}
