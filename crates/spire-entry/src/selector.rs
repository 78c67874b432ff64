//! Workload selectors
//!
//! A selector is a `type:value` pair the SPIRE agent matches against a
//! running workload. Selector order is significant and is kept exactly as
//! declared.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Selector type used for Kubernetes workload attestation
pub const K8S_SELECTOR_TYPE: &str = "k8s";

/// A (type, value) pair matched by the SPIRE agent
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Selector {
    /// Selector type, e.g. `k8s`
    #[serde(rename = "type")]
    pub selector_type: String,
    /// Selector value, may itself contain colons
    pub value: String,
}

impl Selector {
    /// Create a selector
    pub fn new(selector_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            selector_type: selector_type.into(),
            value: value.into(),
        }
    }

    /// The selector pinning an entry to a single pod: `k8s:pod-uid:<uid>`
    pub fn pod_uid(uid: &str) -> Self {
        Self::new(K8S_SELECTOR_TYPE, format!("pod-uid:{uid}"))
    }

    /// Parse `type:value`, splitting on the first colon only
    pub fn parse(selector: &str) -> Result<Self, &'static str> {
        let Some((selector_type, value)) = selector.split_once(':') else {
            return Err("expected at least one colon separate the type from the value");
        };
        if selector_type.is_empty() {
            return Err("type cannot be empty");
        }
        if value.is_empty() {
            return Err("value cannot be empty");
        }
        Ok(Self::new(selector_type, value))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.selector_type, self.value)
    }
}

/// Ordered selectors for one entry, always led by the pod UID selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorSet {
    selectors: Vec<Selector>,
}

impl SelectorSet {
    /// Start a set for the pod with `pod_uid`
    pub fn for_pod(pod_uid: &str) -> Self {
        Self {
            selectors: vec![Selector::pod_uid(pod_uid)],
        }
    }

    /// Parse and append a rendered selector
    pub fn push_rendered(&mut self, rendered: &str) -> Result<(), &'static str> {
        self.selectors.push(Selector::parse(rendered)?);
        Ok(())
    }

    /// Selectors in declaration order
    pub fn into_vec(self) -> Vec<Selector> {
        self.selectors
    }
}
