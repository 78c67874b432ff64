//! SPIRE registration entries for Kubernetes pods
//!
//! Derives the registration entry a ClusterSPIFFEID prescribes for a pod:
//! its SPIFFE ID, the parent agent ID of its node, workload selectors and
//! DNS names. Derivation is pure; watching the cluster and reconciling the
//! SPIRE server are left to the caller.
//!
//! ```ignore
//! let config = ControllerConfig::from_yaml(&std::fs::read_to_string("config.yaml")?)?;
//! let spec = ParsedClusterSpiffeIdSpec::parse(&cluster_spiffe_id.spec)?;
//! let endpoints = endpoints_for_pod(&all_endpoints, pod_uid);
//! let entry = config.entry_renderer()?.render_pod_entry(&spec, &pod, &node, &endpoints)?;
//! ```

#![deny(missing_docs)]

pub mod config;
pub mod dns;
pub mod endpoints;
pub mod entry;
pub mod error;
pub mod selector;
pub mod spec;
pub mod template;

pub use config::ControllerConfig;
pub use endpoints::{endpoints_for_pod, ServiceEndpoint};
pub use entry::{Entry, EntryRenderer};
pub use error::Error;
pub use selector::Selector;
pub use spec::{ClusterSPIFFEID, ClusterSpiffeIdSpec, ParsedClusterSpiffeIdSpec};
pub use spiffe::{SpiffeId, SpiffeIdError, TrustDomain};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
