//! autotran Core
//!
//! Shared configuration, diagnostics and the batch report.
//! Never rename diagnostic codes - they are part of the public API.

pub mod diagnostic;
pub mod report;
pub mod config;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, Location};
pub use report::{BatchReport, ReportSummary, ReportVersion};
pub use config::{Config, ConfigError, SelectionRules, TemplatePaths, CONFIG_FILE_NAME};
