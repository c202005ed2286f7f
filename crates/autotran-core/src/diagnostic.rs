//! Diagnostic codes and error reporting
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Script parsing (1xxx)
    /// Script text could not be tokenized or a routine header is malformed
    ScriptParseError,

    // Routine location (2xxx)
    /// No CREATE FUNCTION / CREATE PROCEDURE statement in the script
    RoutineNotFound,

    /// More than one CREATE FUNCTION / CREATE PROCEDURE statement in the script
    RoutineAmbiguous,

    // Rendering (3xxx)
    /// Caller template missing, unreadable or malformed
    TemplateError,

    // File system (4xxx)
    /// Reading a script or writing its conversion failed
    IoError,

    // General (9xxx)
    /// Script converted successfully
    ScriptConverted,

    /// General warning message
    Warning,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScriptParseError => "SCRIPT_PARSE_ERROR",
            Self::RoutineNotFound => "ROUTINE_NOT_FOUND",
            Self::RoutineAmbiguous => "ROUTINE_AMBIGUOUS",
            Self::TemplateError => "TEMPLATE_ERROR",
            Self::IoError => "IO_ERROR",
            Self::ScriptConverted => "SCRIPT_CONVERTED",
            Self::Warning => "WARNING",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - should be reviewed but not blocking
    Warn,

    /// Error - the script was skipped
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Source location in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Script identifier (file name)
    pub file: String,

    /// Optional line number (1-indexed)
    pub line: Option<usize>,

    /// Optional column number (1-indexed)
    pub column: Option<usize>,
}

impl Location {
    /// Create a new location with just a file path
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
        }
    }

    /// Create a location with file, line, and column
    pub fn with_position(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
            column: Some(column),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{}:{}:{}", self.file, line, column),
            (Some(line), None) => write!(f, "{}:{}", self.file, line),
            _ => write!(f, "{}", self.file),
        }
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Source location (best-effort)
    pub location: Option<Location>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach the script identifier unless a more precise location is already set
    pub fn for_script(self, script: &str) -> Self {
        if self.location.is_some() {
            self
        } else {
            self.with_location(Location::new(script))
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "[{}] {}: {}", self.code, location, self.message),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_code_stability() {
        // Ensure codes are stable strings
        assert_eq!(DiagnosticCode::RoutineNotFound.as_str(), "ROUTINE_NOT_FOUND");
        assert_eq!(DiagnosticCode::ScriptParseError.as_str(), "SCRIPT_PARSE_ERROR");
    }

    #[test]
    fn diagnostic_serialization() {
        let diag = Diagnostic::new(
            DiagnosticCode::RoutineAmbiguous,
            Severity::Error,
            "found 2 routine definitions",
        )
        .with_location(Location::new("audit_log.sql"));

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("ROUTINE_AMBIGUOUS"));
        assert!(json.contains("error"));
        assert!(json.contains("audit_log.sql"));
    }

    #[test]
    fn for_script_keeps_precise_location() {
        let diag = Diagnostic::new(DiagnosticCode::ScriptParseError, Severity::Error, "bad token")
            .with_location(Location::with_position("a.sql", 3, 7))
            .for_script("ignored.sql");

        assert_eq!(diag.location.unwrap().to_string(), "a.sql:3:7");
    }

    #[test]
    fn display_includes_code_and_location() {
        let diag = Diagnostic::new(DiagnosticCode::IoError, Severity::Error, "permission denied")
            .for_script("b.sql");

        assert_eq!(diag.to_string(), "[IO_ERROR] b.sql: permission denied");
    }
}
