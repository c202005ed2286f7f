//! Per-script conversion errors

use autotran_core::{Diagnostic, DiagnosticCode, Severity};
use autotran_sql::ParseError;

use crate::locator::LocateError;
use crate::template::TemplateError;

/// Why a script could not be converted
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("rendered {fragment} is not valid SQL: {source}")]
    Render {
        fragment: &'static str,
        source: ParseError,
    },

    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
}

impl ConvertError {
    pub(crate) fn render(fragment: &'static str) -> impl FnOnce(ParseError) -> Self {
        move |source| Self::Render { fragment, source }
    }

    /// Stable diagnostic code for this error
    pub fn code(&self) -> DiagnosticCode {
        match self {
            Self::Parse(_) | Self::Render { .. } => DiagnosticCode::ScriptParseError,
            Self::Locate(LocateError::NotFound) => DiagnosticCode::RoutineNotFound,
            Self::Locate(LocateError::Ambiguous { .. }) => DiagnosticCode::RoutineAmbiguous,
            Self::Template(_) => DiagnosticCode::TemplateError,
            Self::Io(_) => DiagnosticCode::IoError,
        }
    }
}

/// A conversion error tagged with the script it came from
#[derive(Debug, thiserror::Error)]
#[error("{script}: {error}")]
pub struct ScriptFailure {
    pub script: String,
    #[source]
    pub error: ConvertError,
}

impl ScriptFailure {
    pub fn new(script: impl Into<String>, error: impl Into<ConvertError>) -> Self {
        Self {
            script: script.into(),
            error: error.into(),
        }
    }

    /// Convert to an autotran diagnostic located at the script
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = match &self.error {
            ConvertError::Parse(e) => e.to_diagnostic(Some(&self.script)),
            other => Diagnostic::new(other.code(), Severity::Error, other.to_string()),
        };
        diag.for_script(&self.script)
    }
}
