//! Batch run report (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use crate::diagnostic::{Diagnostic, Severity};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary statistics for a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// SQL files found in the input directory
    pub sql_files: usize,

    /// Files that passed the AUTONOMOUS_TRANSACTION pre-filter
    pub selected: usize,

    /// Scripts converted and written
    pub converted: usize,

    /// Scripts skipped because of an error
    pub failed: usize,

    /// SQL files that could not be read, so were never checked for the marker
    pub unreadable: usize,
}

/// Batch report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Summary statistics
    pub summary: ReportSummary,

    /// All diagnostics, in processing order
    pub diagnostics: Vec<Diagnostic>,
}

impl BatchReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Record a converted script
    pub fn record_converted(&mut self, diagnostic: Diagnostic) {
        self.summary.converted += 1;
        self.diagnostics.push(diagnostic);
    }

    /// Record a skipped script
    pub fn record_failed(&mut self, diagnostic: Diagnostic) {
        self.summary.failed += 1;
        self.diagnostics.push(diagnostic);
    }

    /// Record a file that could not be read
    pub fn record_unreadable(&mut self, diagnostic: Diagnostic) {
        self.summary.unreadable += 1;
        self.diagnostics.push(diagnostic);
    }

    /// Add a diagnostic that does not change the script counters
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Check if the report has any errors
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Diagnostics with error severity
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    /// Diagnostics with warning severity
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warn)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}
