//! Registration entry derivation
//!
//! [`EntryRenderer::render_pod_entry`] turns a parsed ClusterSPIFFEID, a pod,
//! the node it runs on and the services fronting it into a single [`Entry`].
//! Derivation is a pure function of its inputs: no caching, no logging and
//! no state shared between calls.

use std::time::Duration;

use k8s_openapi::api::core::v1::{Node, Pod};
use serde::{Serialize, Serializer};
use spiffe::{SpiffeId, TrustDomain};

use crate::dns::DnsNameSet;
use crate::endpoints::ServiceEndpoint;
use crate::selector::{Selector, SelectorSet};
use crate::spec::ParsedClusterSpiffeIdSpec;
use crate::template::{CompiledTemplate, RenderContext};
use crate::{Error, Result};

/// Path segments of the node attestor's agent IDs
pub const AGENT_PATH_SEGMENTS: &[&str] = &["spire", "agent", "k8s_psat"];

/// A SPIRE registration entry for one pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Workload identity
    #[serde(serialize_with = "serialize_spiffe_id")]
    pub spiffe_id: SpiffeId,
    /// Agent identity of the pod's node
    #[serde(serialize_with = "serialize_spiffe_id")]
    pub parent_id: SpiffeId,
    /// Pod UID selector first, then template selectors in declared order
    pub selectors: Vec<Selector>,
    /// X509-SVID TTL, serialized in whole seconds
    #[serde(rename = "x509SvidTtl", serialize_with = "serialize_secs")]
    pub x509_svid_ttl: Duration,
    /// Federated trust domains
    #[serde(serialize_with = "serialize_trust_domains")]
    pub federates_with: Vec<TrustDomain>,
    /// Deduplicated DNS names in ascending order
    pub dns_names: Vec<String>,
    /// Admin flag
    pub admin: bool,
    /// Downstream flag
    pub downstream: bool,
}

fn serialize_secs<S: Serializer>(ttl: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(ttl.as_secs())
}

fn serialize_spiffe_id<S: Serializer>(
    id: &SpiffeId,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}

fn serialize_trust_domains<S: Serializer>(
    trust_domains: &[TrustDomain],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(trust_domains.iter().map(ToString::to_string))
}

/// Derives entries for one cluster
#[derive(Debug, Clone)]
pub struct EntryRenderer {
    trust_domain: TrustDomain,
    cluster_name: String,
    cluster_domain: String,
}

impl EntryRenderer {
    /// Create a renderer for the cluster `cluster_name` in `trust_domain`
    ///
    /// `cluster_domain` may be empty, in which case service names are not
    /// suffixed with it.
    pub fn new(
        trust_domain: TrustDomain,
        cluster_name: impl Into<String>,
        cluster_domain: impl Into<String>,
    ) -> Self {
        Self {
            trust_domain,
            cluster_name: cluster_name.into(),
            cluster_domain: cluster_domain.into(),
        }
    }

    /// Configured trust domain
    pub fn trust_domain(&self) -> &TrustDomain {
        &self.trust_domain
    }

    /// Configured cluster name
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Configured cluster domain, possibly empty
    pub fn cluster_domain(&self) -> &str {
        &self.cluster_domain
    }

    /// Derive the entry for `pod` scheduled on `node`
    ///
    /// `endpoints` are the services whose endpoints target the pod. Their
    /// DNS names are added only when the spec auto-populates DNS names.
    ///
    /// # Errors
    ///
    /// The first failure aborts the entry. No partial entry is returned.
    pub fn render_pod_entry(
        &self,
        spec: &ParsedClusterSpiffeIdSpec,
        pod: &Pod,
        node: &Node,
        endpoints: &[ServiceEndpoint],
    ) -> Result<Entry> {
        let ctx = RenderContext::new(
            &self.trust_domain,
            &self.cluster_name,
            &self.cluster_domain,
            pod,
            node,
        );
        let pod_key = ctx.pod_key();

        let spiffe_id = render_spiffe_id(&spec.spiffe_id_template, &ctx, &self.trust_domain)?;
        let parent_id = self.parent_id(&ctx.node_meta.uid, &pod_key)?;

        let mut dns_names = DnsNameSet::new();
        if spec.auto_populate_dns_names {
            dns_names
                .extend_with_services(endpoints, &self.cluster_domain)
                .map_err(|e| Error::InvalidDnsName {
                    pod: pod_key.clone(),
                    name: e.name,
                    reason: e.reason,
                })?;
        }
        for template in &spec.dns_name_templates {
            let name = render(template, &ctx, &pod_key)?;
            dns_names.insert(name).map_err(|e| Error::InvalidDnsName {
                pod: pod_key.clone(),
                name: e.name,
                reason: e.reason,
            })?;
        }

        let mut selectors = SelectorSet::for_pod(&ctx.pod_meta.uid);
        for template in &spec.workload_selector_templates {
            let selector = render(template, &ctx, &pod_key)?;
            selectors
                .push_rendered(&selector)
                .map_err(|reason| Error::InvalidSelector {
                    pod: pod_key.clone(),
                    selector: selector.clone(),
                    reason: reason.to_string(),
                })?;
        }

        Ok(Entry {
            spiffe_id,
            parent_id,
            selectors: selectors.into_vec(),
            x509_svid_ttl: spec.ttl,
            federates_with: spec.federates_with.clone(),
            dns_names: dns_names.into_sorted(),
            admin: spec.admin,
            downstream: spec.downstream,
        })
    }

    /// `spiffe://<td>/spire/agent/k8s_psat/<clusterName>/<nodeUID>`
    fn parent_id(&self, node_uid: &str, pod_key: &str) -> Result<SpiffeId> {
        let segments: Vec<&str> = AGENT_PATH_SEGMENTS
            .iter()
            .copied()
            .chain([self.cluster_name.as_str(), node_uid])
            .collect();
        SpiffeId::from_segments(self.trust_domain.clone(), &segments).map_err(|source| {
            Error::InvalidParentId {
                pod: pod_key.to_string(),
                source,
            }
        })
    }
}

fn render(template: &CompiledTemplate, ctx: &RenderContext, pod_key: &str) -> Result<String> {
    template
        .render(ctx)
        .map_err(|e| Error::from_template(e, pod_key))
}

/// Render a SPIFFE ID template and check it belongs to `trust_domain`
///
/// A rendered ID in another trust domain is an error, never rewritten.
pub fn render_spiffe_id(
    template: &CompiledTemplate,
    ctx: &RenderContext,
    trust_domain: &TrustDomain,
) -> Result<SpiffeId> {
    let pod_key = ctx.pod_key();
    let rendered = render(template, ctx, &pod_key)?;

    let id = SpiffeId::new(&rendered).map_err(|source| Error::InvalidSpiffeId {
        pod: pod_key.clone(),
        id: rendered.clone(),
        source,
    })?;

    if id.trust_domain() != trust_domain {
        return Err(Error::TrustDomainMismatch {
            pod: pod_key,
            id: rendered,
            expected: trust_domain.to_string(),
            actual: id.trust_domain().to_string(),
        });
    }
    Ok(id)
}
