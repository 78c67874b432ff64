//! Template error types

use std::fmt;

/// Errors that can occur during template operations
#[derive(Debug)]
pub enum TemplateError {
    /// Template failed to compile
    Syntax {
        /// Template name, e.g. `dnsNameTemplates[0]`
        template: String,
        /// Underlying compiler error
        source: minijinja::Error,
    },
    /// Template references a field outside the render context schema
    UnknownField {
        /// Template name
        template: String,
        /// Dotted field path as written, e.g. `PodMeta.Nmae`
        field: String,
    },
    /// Template failed to execute against a context
    Render {
        /// Template name
        template: String,
        /// Underlying execution error
        source: minijinja::Error,
    },
}

impl TemplateError {
    /// Name of the template that failed
    pub fn template(&self) -> &str {
        match self {
            Self::Syntax { template, .. }
            | Self::UnknownField { template, .. }
            | Self::Render { template, .. } => template,
        }
    }

    /// Whether the error was raised at compile time rather than render time
    pub fn is_compile_error(&self) -> bool {
        !matches!(self, Self::Render { .. })
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax { template, source } => {
                write!(f, "template {} syntax error: {}", template, source)
            }
            Self::UnknownField { template, field } => write!(
                f,
                "template {} references unknown field: {}",
                template, field
            ),
            Self::Render { template, source } => {
                write!(f, "failed to execute template {}: {}", template, source)
            }
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Syntax { source, .. } | Self::Render { source, .. } => Some(source),
            Self::UnknownField { .. } => None,
        }
    }
}
