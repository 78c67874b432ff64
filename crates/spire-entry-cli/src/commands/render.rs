//! Render command

use std::path::{Path, PathBuf};

use clap::Args;
use k8s_openapi::api::core::v1::{Endpoints, Node, Pod};
use spire_entry::{endpoints_for_pod, ControllerConfig, Entry, ParsedClusterSpiffeIdSpec};
use tracing::{debug, info, warn};

use super::{load_spec, load_yaml, load_yaml_documents, read_file};
use crate::Result;

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Controller configuration (trustDomain, clusterName, ...)
    #[arg(long, env = "SPIRE_ENTRY_CONFIG")]
    pub config: PathBuf,

    /// ClusterSPIFFEID manifest or bare spec
    #[arg(long)]
    pub spec: PathBuf,

    /// Pod manifest
    #[arg(long)]
    pub pod: PathBuf,

    /// Node manifest for the pod's node
    #[arg(long)]
    pub node: PathBuf,

    /// Endpoints manifests, `---` separated; their services add DNS names
    /// when the spec sets `autoPopulateDNSNames`
    #[arg(long)]
    pub endpoints: Option<PathBuf>,
}

pub fn run(args: RenderArgs) -> Result<()> {
    if let Some(entry) = render_entry(&args)? {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    }
    Ok(())
}

/// Render the entry for the pod in `args`.
///
/// Returns `None` when the pod's namespace is ignored by the configuration.
pub fn render_entry(args: &RenderArgs) -> Result<Option<Entry>> {
    let config = ControllerConfig::from_yaml(&read_file(&args.config)?)?;
    let pod: Pod = load_yaml(&args.pod)?;
    let namespace = pod.metadata.namespace.as_deref().unwrap_or_default();
    let name = pod.metadata.name.as_deref().unwrap_or_default();

    if config.is_namespace_ignored(namespace) {
        warn!(pod = %name, namespace = %namespace, "Namespace is ignored, no entry rendered");
        return Ok(None);
    }

    let spec = ParsedClusterSpiffeIdSpec::parse(&load_spec(&args.spec)?)?;
    let node: Node = load_yaml(&args.node)?;
    let endpoints = match (&args.endpoints, spec.auto_populate_dns_names) {
        (Some(path), true) => service_endpoints(path, &pod)?,
        (Some(path), false) => {
            debug!(
                path = %path.display(),
                "autoPopulateDNSNames is off, endpoints not loaded"
            );
            Vec::new()
        }
        (None, _) => Vec::new(),
    };

    let entry = config
        .entry_renderer()?
        .render_pod_entry(&spec, &pod, &node, &endpoints)?;
    info!(
        pod = %name,
        namespace = %namespace,
        spiffe_id = %entry.spiffe_id,
        dns_names = entry.dns_names.len(),
        "Rendered entry"
    );
    Ok(Some(entry))
}

fn service_endpoints(path: &Path, pod: &Pod) -> Result<Vec<spire_entry::ServiceEndpoint>> {
    let all: Vec<Endpoints> = load_yaml_documents(path)?;
    let uid = pod.metadata.uid.as_deref().unwrap_or_default();
    Ok(endpoints_for_pod(&all, uid))
}
