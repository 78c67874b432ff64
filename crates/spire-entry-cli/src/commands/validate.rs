//! Validate command

use std::path::PathBuf;

use clap::Args;
use spire_entry::ParsedClusterSpiffeIdSpec;
use tracing::info;

use super::load_spec;
use crate::Result;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// ClusterSPIFFEID manifest or bare spec
    #[arg(long)]
    pub spec: PathBuf,
}

/// Template counts of a spec that compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationSummary {
    pub dns_name_templates: usize,
    pub workload_selector_templates: usize,
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let summary = validate_spec(&args)?;
    println!(
        "  {} valid (spiffeIDTemplate, {} DNS name templates, {} workload selector templates)",
        args.spec.display(),
        summary.dns_name_templates,
        summary.workload_selector_templates
    );
    Ok(())
}

pub fn validate_spec(args: &ValidateArgs) -> Result<ValidationSummary> {
    let parsed = ParsedClusterSpiffeIdSpec::parse(&load_spec(&args.spec)?)?;
    let summary = ValidationSummary {
        dns_name_templates: parsed.dns_name_templates.len(),
        workload_selector_templates: parsed.workload_selector_templates.len(),
    };
    info!(
        spec = %args.spec.display(),
        dns_name_templates = summary.dns_name_templates,
        workload_selector_templates = summary.workload_selector_templates,
        "Spec is valid"
    );
    Ok(summary)
}
