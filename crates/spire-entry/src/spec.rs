//! ClusterSPIFFEID Custom Resource Definition
//!
//! A ClusterSPIFFEID declares how entries are derived for the pods it
//! selects. Its templates are compiled once, when the resource is admitted
//! or changes, into a [`ParsedClusterSpiffeIdSpec`] that is then reused for
//! every pod.

use std::time::Duration;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spiffe::TrustDomain;
use tracing::debug;

use crate::template::{CompiledTemplate, TemplateEngine};
use crate::{Error, Result};

/// Template name used for the SPIFFE ID template in errors
pub const SPIFFE_ID_TEMPLATE_NAME: &str = "spiffeIDTemplate";

/// Specification for a ClusterSPIFFEID
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "spire.spiffe.io",
    version = "v1alpha1",
    kind = "ClusterSPIFFEID",
    plural = "clusterspiffeids",
    namespaced = false,
    printcolumn = r#"{"name":"Template","type":"string","jsonPath":".spec.spiffeIDTemplate"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpiffeIdSpec {
    /// Template for the SPIFFE ID of matching workloads
    #[serde(rename = "spiffeIDTemplate")]
    pub spiffe_id_template: String,

    /// X509-SVID TTL, e.g. `1h`, `30m`, `90s` or raw seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,

    /// Templates for additional DNS names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_name_templates: Vec<String>,

    /// Add the names of the services fronting each pod to its DNS names
    #[serde(
        rename = "autoPopulateDNSNames",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub auto_populate_dns_names: bool,

    /// Templates for additional workload selectors, as `type:value`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workload_selector_templates: Vec<String>,

    /// Trust domains the workloads federate with
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub federates_with: Vec<String>,

    /// Whether the workloads may use the SPIRE server admin API
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub admin: bool,

    /// Whether the workloads are downstream SPIRE servers
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub downstream: bool,
}

/// A ClusterSPIFFEID spec with compiled templates and parsed static fields
#[derive(Debug, Clone)]
pub struct ParsedClusterSpiffeIdSpec {
    /// Compiled `spiffeIDTemplate`
    pub spiffe_id_template: CompiledTemplate,
    /// Compiled `dnsNameTemplates`, in declared order
    pub dns_name_templates: Vec<CompiledTemplate>,
    /// Whether service DNS names are added
    pub auto_populate_dns_names: bool,
    /// Compiled `workloadSelectorTemplates`, in declared order
    pub workload_selector_templates: Vec<CompiledTemplate>,
    /// X509-SVID TTL; zero leaves the choice to the server
    pub ttl: Duration,
    /// Federated trust domains
    pub federates_with: Vec<TrustDomain>,
    /// Admin flag
    pub admin: bool,
    /// Downstream flag
    pub downstream: bool,
}

impl ParsedClusterSpiffeIdSpec {
    /// Validate `spec` and compile its templates
    ///
    /// # Errors
    ///
    /// `Error::TemplateSyntax` for a template that does not compile,
    /// `Error::InvalidSpec` for an empty SPIFFE ID template or bad TTL, and
    /// `Error::InvalidTrustDomain` for a bad `federatesWith` entry.
    pub fn parse(spec: &ClusterSpiffeIdSpec) -> Result<Self> {
        if spec.spiffe_id_template.trim().is_empty() {
            return Err(Error::invalid_spec("spiffeIDTemplate is required"));
        }

        let engine = TemplateEngine::new();
        let spiffe_id_template = engine.compile(SPIFFE_ID_TEMPLATE_NAME, &spec.spiffe_id_template)?;
        let dns_name_templates =
            compile_all(&engine, "dnsNameTemplates", &spec.dns_name_templates)?;
        let workload_selector_templates = compile_all(
            &engine,
            "workloadSelectorTemplates",
            &spec.workload_selector_templates,
        )?;

        let ttl = match spec.ttl.as_deref() {
            Some(ttl) => parse_duration(ttl)?,
            None => Duration::ZERO,
        };

        let federates_with = spec
            .federates_with
            .iter()
            .map(|td| {
                TrustDomain::new(td).map_err(|source| Error::InvalidTrustDomain {
                    value: td.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            dns_name_templates = dns_name_templates.len(),
            auto_populate_dns_names = spec.auto_populate_dns_names,
            workload_selector_templates = workload_selector_templates.len(),
            ttl_secs = ttl.as_secs(),
            federates_with = federates_with.len(),
            "Parsed ClusterSPIFFEID spec"
        );

        Ok(Self {
            spiffe_id_template,
            dns_name_templates,
            auto_populate_dns_names: spec.auto_populate_dns_names,
            workload_selector_templates,
            ttl,
            federates_with,
            admin: spec.admin,
            downstream: spec.downstream,
        })
    }
}

fn compile_all(
    engine: &TemplateEngine,
    field: &str,
    sources: &[String],
) -> Result<Vec<CompiledTemplate>> {
    sources
        .iter()
        .enumerate()
        .map(|(i, source)| {
            engine
                .compile(&format!("{field}[{i}]"), source)
                .map_err(Error::from)
        })
        .collect()
}

/// Parse a duration such as `1h`, `30m`, `90s` or a bare number of seconds
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let invalid = || {
        Error::invalid_spec(format!(
            "invalid ttl '{}', expected e.g. 1h, 30m, 3600s",
            s
        ))
    };

    let (digits, multiplier) = if let Some(hours) = s.strip_suffix('h') {
        (hours, 3600)
    } else if let Some(minutes) = s.strip_suffix('m') {
        (minutes, 60)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1)
    } else {
        (s, 1)
    };

    let n: u64 = digits.parse().map_err(|_| invalid())?;
    n.checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}
