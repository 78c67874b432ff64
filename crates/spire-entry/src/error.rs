//! Error types for entry derivation
//!
//! Every variant carries enough context (template name, pod, offending
//! rendered value) to be logged by the caller without further lookups. Any
//! error aborts the entry for that pod; nothing is defaulted.

use spiffe::SpiffeIdError;
use thiserror::Error;

use crate::template::TemplateError;

/// Main error type for entry derivation
#[derive(Debug, Error)]
pub enum Error {
    /// Template failed to compile or references an unknown field
    #[error("invalid template {template}: {message}")]
    TemplateSyntax {
        /// Template name, e.g. `dnsNameTemplates[1]`
        template: String,
        /// Compiler message
        message: String,
    },

    /// Template failed to execute for a specific pod
    #[error("failed to execute template {template} for pod {pod}: {message}")]
    TemplateExecution {
        /// Template name
        template: String,
        /// Pod as `namespace/name`
        pod: String,
        /// Execution message
        message: String,
    },

    /// Rendered SPIFFE ID does not parse
    #[error("failed to render SPIFFE ID for pod {pod}: invalid SPIFFE ID {id:?}: {source}")]
    InvalidSpiffeId {
        /// Pod as `namespace/name`
        pod: String,
        /// Rendered value
        id: String,
        /// Parse failure
        source: SpiffeIdError,
    },

    /// Rendered SPIFFE ID belongs to a foreign trust domain
    #[error("failed to render SPIFFE ID for pod {pod}: invalid SPIFFE ID {id:?}: expected trust domain {expected:?} but got {actual:?}")]
    TrustDomainMismatch {
        /// Pod as `namespace/name`
        pod: String,
        /// Rendered value
        id: String,
        /// Configured trust domain
        expected: String,
        /// Trust domain found in the rendered ID
        actual: String,
    },

    /// Parent ID could not be formed from cluster name and node UID
    #[error("failed to render parent ID for pod {pod}: {source}")]
    InvalidParentId {
        /// Pod as `namespace/name`
        pod: String,
        /// Path validation failure
        source: SpiffeIdError,
    },

    /// DNS name failed label validation
    #[error("failed to render DNS name for pod {pod}: invalid DNS name {name:?}: {reason}")]
    InvalidDnsName {
        /// Pod as `namespace/name`
        pod: String,
        /// Full offending name
        name: String,
        /// Which rule failed, naming the label
        reason: String,
    },

    /// Rendered workload selector is malformed
    #[error("failed to render workload selector for pod {pod}: invalid workload selector {selector:?}: {reason}")]
    InvalidSelector {
        /// Pod as `namespace/name`
        pod: String,
        /// Rendered value
        selector: String,
        /// Which rule failed
        reason: String,
    },

    /// Trust domain name is malformed
    #[error("invalid trust domain {value:?}: {source}")]
    InvalidTrustDomain {
        /// Offending value
        value: String,
        /// Parse failure
        source: SpiffeIdError,
    },

    /// ClusterSPIFFEID spec failed admission-time validation
    #[error("invalid ClusterSPIFFEID spec: {message}")]
    InvalidSpec {
        /// Description of what's invalid
        message: String,
    },

    /// Controller configuration is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Description of what's invalid
        message: String,
    },
}

impl Error {
    /// Create an invalid spec error with the given message
    pub fn invalid_spec(msg: impl Into<String>) -> Self {
        Self::InvalidSpec {
            message: msg.into(),
        }
    }

    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Map a template error raised while rendering for `pod`
    ///
    /// Compile-time failures keep their syntax classification even when they
    /// surface late.
    pub fn from_template(err: TemplateError, pod: &str) -> Self {
        let template = err.template().to_string();
        let message = match &err {
            TemplateError::Syntax { source, .. } | TemplateError::Render { source, .. } => {
                source.to_string()
            }
            TemplateError::UnknownField { field, .. } => format!("unknown field {field}"),
        };
        if err.is_compile_error() {
            Self::TemplateSyntax { template, message }
        } else {
            Self::TemplateExecution {
                template,
                pod: pod.to_string(),
                message,
            }
        }
    }
}

impl From<TemplateError> for Error {
    fn from(err: TemplateError) -> Self {
        Self::from_template(err, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // Story: Errors name what failed and for which pod
    // ==========================================================================

    #[test]
    fn dns_error_names_full_offending_name() {
        let err = Error::InvalidDnsName {
            pod: "namespace/test".to_string(),
            name: "test-".to_string(),
            reason: "label does not match regex: test-".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to render DNS name for pod namespace/test: invalid DNS name \"test-\": label does not match regex: test-"
        );
    }

    #[test]
    fn trust_domain_mismatch_names_both_domains() {
        let err = Error::TrustDomainMismatch {
            pod: "ns/p".to_string(),
            id: "spiffe://other.org/x".to_string(),
            expected: "example.org".to_string(),
            actual: "other.org".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("expected trust domain \"example.org\" but got \"other.org\""));
        assert!(msg.contains("ns/p"));
    }

    #[test]
    fn unknown_field_maps_to_template_syntax() {
        let err = Error::from(TemplateError::UnknownField {
            template: "spiffeIDTemplate".to_string(),
            field: "PodMeta.Nmae".to_string(),
        });
        match err {
            Error::TemplateSyntax { template, message } => {
                assert_eq!(template, "spiffeIDTemplate");
                assert!(message.contains("PodMeta.Nmae"));
            }
            other => panic!("expected TemplateSyntax, got {other:?}"),
        }
    }

    #[test]
    fn render_failure_maps_to_template_execution_with_pod() {
        let err = Error::from_template(
            TemplateError::Render {
                template: "dnsNameTemplates[0]".to_string(),
                source: minijinja::Error::new(minijinja::ErrorKind::UndefinedError, "undefined value"),
            },
            "default/web-0",
        );
        assert!(matches!(
            err,
            Error::TemplateExecution { ref pod, .. } if pod == "default/web-0"
        ));
    }

    #[test]
    fn helper_constructors() {
        assert!(Error::invalid_spec("ttl").to_string().contains("ttl"));
        assert!(Error::config("clusterName is required")
            .to_string()
            .starts_with("configuration error"));
    }
}
