//! Identity templates for ClusterSPIFFEID resources
//!
//! Templates are compiled once per ClusterSPIFFEID and rendered once per pod
//! against a [`RenderContext`]. Both the Go-template spelling used by
//! existing manifests and plain minijinja expressions are accepted:
//!
//! - `spiffe://{{ .TrustDomain }}/ns/{{ .PodMeta.Namespace }}/sa/{{ .PodSpec.ServiceAccountName }}`
//! - `{{ PodMeta.Name }}.{{ PodMeta.Namespace }}.svc.{{ ClusterDomain }}`
//! - `{% if PodMeta.Labels.tier == "edge" %}k8s:ns:edge{% else %}k8s:ns:{{ PodMeta.Namespace }}{% endif %}`
//!
//! Every referenced field is checked against the context schema at compile
//! time, and undefined values (a missing label, say) fail at render time
//! rather than rendering as empty strings.

mod context;
mod engine;
mod error;
mod filters;

pub use context::{ContainerContext, MetaContext, NodeSpecContext, PodSpecContext, RenderContext};
pub use engine::{CompiledTemplate, TemplateEngine};
pub use error::TemplateError;
