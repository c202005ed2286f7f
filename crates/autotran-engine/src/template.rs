//! Caller templates
//!
//! Templates are format strings with named `{placeholder}`s. `{{` and `}}`
//! stand for literal braces. A placeholder without a value is an error.

use autotran_core::{Config, Diagnostic, DiagnosticCode, Location, Severity};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

/// `{{`, `}}`, `{name}`, or a stray brace
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{|\}\}|\{([^{}]*)\}|[{}]").expect("placeholder pattern is valid"));

/// A caller template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Where the template came from (file path or a label)
    name: String,

    source: String,
}

impl Template {
    /// Create a template from text
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Load a template file
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path).map_err(|e| TemplateError::Unreadable {
            path: path.display().to_string(),
            source: e,
        })?;

        Ok(Self::new(path.display().to_string(), source))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fill every placeholder from `values`
    pub fn render(&self, values: &BTreeMap<&str, String>) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        let mut last = 0;

        for caps in PLACEHOLDER_RE.captures_iter(&self.source) {
            let Some(m) = caps.get(0) else { continue };
            out.push_str(&self.source[last..m.start()]);
            last = m.end();

            match m.as_str() {
                "{{" => out.push('{'),
                "}}" => out.push('}'),
                "{" | "}" => {
                    return Err(TemplateError::UnbalancedBrace {
                        template: self.name.clone(),
                        offset: m.start(),
                    })
                }
                _ => {
                    let key = caps.get(1).map(|k| k.as_str().trim()).unwrap_or_default();
                    match values.get(key) {
                        Some(value) => out.push_str(value),
                        None => {
                            return Err(TemplateError::UnknownPlaceholder {
                                template: self.name.clone(),
                                name: key.to_string(),
                            })
                        }
                    }
                }
            }
        }

        out.push_str(&self.source[last..]);
        Ok(out)
    }
}

/// The procedure and function caller templates of a run
#[derive(Debug, Clone)]
pub struct TemplateSet {
    pub procedure: Template,
    pub function: Template,
}

impl TemplateSet {
    /// Load both templates from the configured paths
    pub fn load(config: &Config) -> Result<Self, TemplateError> {
        let procedure = Template::from_file(&config.procedure_template_path())?;
        let function = Template::from_file(&config.function_template_path())?;

        tracing::debug!(
            procedure = procedure.name(),
            function = function.name(),
            "loaded caller templates"
        );

        Ok(Self { procedure, function })
    }

    /// Template for a routine kind
    pub fn for_routine(&self, is_procedure: bool) -> &Template {
        if is_procedure {
            &self.procedure
        } else {
            &self.function
        }
    }
}

/// Template error types
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("cannot read template {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template {template} uses unknown placeholder {{{name}}}")]
    UnknownPlaceholder { template: String, name: String },

    #[error("template {template} has an unmatched brace at byte {offset}")]
    UnbalancedBrace { template: String, offset: usize },
}

impl TemplateError {
    /// Convert to an autotran diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let template = match self {
            Self::Unreadable { path, .. } => path,
            Self::UnknownPlaceholder { template, .. } | Self::UnbalancedBrace { template, .. } => template,
        };

        Diagnostic::new(DiagnosticCode::TemplateError, Severity::Error, self.to_string())
            .with_location(Location::new(template.clone()))
    }
}
