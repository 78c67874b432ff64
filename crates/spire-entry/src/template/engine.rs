//! Template engine for identity templates
//!
//! Uses minijinja with its standard delimiters and:
//! - strict undefined handling (no silent empty substitution)
//! - no auto-escaping and trailing newlines kept, so output is verbatim
//! - Go-template field references (`{{ .PodMeta.Name }}`) accepted by
//!   dropping the leading dot before compilation
//! - compile-time checking of referenced fields against [`RenderContext`]

use minijinja::{AutoEscape, Environment, UndefinedBehavior};

use super::context::{is_known_field, RenderContext};
use super::error::TemplateError;
use super::filters;

/// Globals minijinja provides that may appear as undeclared names
const BUILTIN_GLOBALS: &[&str] = &["range", "dict", "debug", "namespace"];

/// Factory for [`CompiledTemplate`]s sharing one environment configuration
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Create a new template engine
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);

        env.add_filter("required", filters::required);

        Self { env }
    }

    /// Compile `source` under `name`
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Syntax` if the template does not parse and
    /// `TemplateError::UnknownField` if it references a field that does not
    /// exist in [`RenderContext`].
    pub fn compile(&self, name: &str, source: &str) -> Result<CompiledTemplate, TemplateError> {
        let normalized = normalize_field_paths(source);

        let mut env = self.env.clone();
        env.add_template_owned(name.to_string(), normalized)
            .map_err(|source| TemplateError::Syntax {
                template: name.to_string(),
                source,
            })?;

        {
            let template = env.get_template(name).map_err(|source| TemplateError::Syntax {
                template: name.to_string(),
                source,
            })?;

            let mut referenced: Vec<String> =
                template.undeclared_variables(true).into_iter().collect();
            referenced.sort();
            if let Some(field) = referenced.into_iter().find(|f| !is_allowed_reference(f)) {
                return Err(TemplateError::UnknownField {
                    template: name.to_string(),
                    field,
                });
            }
        }

        Ok(CompiledTemplate {
            name: name.to_string(),
            source: source.to_string(),
            env,
        })
    }
}

fn is_allowed_reference(path: &str) -> bool {
    let root = path.split('.').next().unwrap_or(path);
    BUILTIN_GLOBALS.contains(&root) || is_known_field(path)
}

/// A template compiled once and rendered against many contexts
///
/// Rendering takes `&self` and keeps no state between calls, so a compiled
/// template can be shared freely across threads.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    name: String,
    source: String,
    env: Environment<'static>,
}

impl CompiledTemplate {
    /// Template name used in error messages
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template source as written by the user
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Execute the template against `ctx`
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Render` if a referenced value is undefined
    /// for this context or a filter fails.
    pub fn render(&self, ctx: &RenderContext) -> Result<String, TemplateError> {
        let render_err = |source: minijinja::Error| TemplateError::Render {
            template: self.name.clone(),
            source,
        };
        self.env
            .get_template(&self.name)
            .map_err(render_err)?
            .render(ctx.to_value())
            .map_err(render_err)
    }
}

/// Drop the leading dot of Go-template field paths inside `{{ }}` and `{% %}`.
///
/// `{{ .PodMeta.Name }}` becomes `{{ PodMeta.Name }}`. Dots that follow an
/// identifier, a closing bracket or a digit are member access and are kept,
/// as is anything inside quoted strings.
fn normalize_field_paths(template: &str) -> String {
    let mut result = String::with_capacity(template.len());
    let mut remaining = template;

    while let Some((start, close)) = next_tag(remaining) {
        result.push_str(&remaining[..start + 2]);
        remaining = &remaining[start + 2..];

        if let Some(end) = remaining.find(close) {
            normalize_expression(&remaining[..end], &mut result);
            result.push_str(close);
            remaining = &remaining[end + close.len()..];
        } else {
            // Unterminated tag, let the compiler report it
            result.push_str(remaining);
            remaining = "";
        }
    }

    result.push_str(remaining);
    result
}

/// Find the next `{{` or `{%` and return its offset and closing delimiter
fn next_tag(s: &str) -> Option<(usize, &'static str)> {
    let var = s.find("{{").map(|i| (i, "}}"));
    let block = s.find("{%").map(|i| (i, "%}"));
    match (var, block) {
        (Some(v), Some(b)) => Some(if v.0 < b.0 { v } else { b }),
        (v, b) => v.or(b),
    }
}

fn normalize_expression(expr: &str, out: &mut String) {
    let mut chars = expr.chars().peekable();
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    while let Some(ch) = chars.next() {
        match ch {
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                out.push(ch);
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                out.push(ch);
            }
            '.' if !in_single_quote && !in_double_quote => {
                let member_access = out
                    .chars()
                    .last()
                    .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | ')' | ']'));
                let starts_field = chars
                    .peek()
                    .is_some_and(|c| c.is_ascii_alphabetic() || *c == '_');
                if member_access || !starts_field {
                    out.push('.');
                }
            }
            _ => out.push(ch),
        }
    }
}
