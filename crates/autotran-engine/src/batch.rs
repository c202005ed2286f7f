//! Batch conversion of a script directory
//!
//! Scripts come from a [`ScriptSource`] and conversions go to a
//! [`ScriptSink`]. A script that fails is reported and skipped; the batch
//! carries on with the next one.

use autotran_core::{BatchReport, Diagnostic, DiagnosticCode, SelectionRules, Severity};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::converter::ScriptConverter;
use crate::error::{ConvertError, ScriptFailure};
use crate::template::TemplateSet;

/// Text of one selected script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptText {
    /// File name, reused for the output
    pub id: String,
    pub sql: String,
}

/// Outcome of scanning a source
#[derive(Debug, Default)]
pub struct Discovery {
    /// Files with the script extension
    pub sql_files: usize,

    /// Scripts carrying the selection marker, in file-name order
    pub selected: Vec<ScriptText>,

    /// Scripts that could not be read
    pub unreadable: Vec<ScriptFailure>,
}

/// Where scripts come from
pub trait ScriptSource {
    fn discover(&self) -> Result<Discovery, BatchError>;
}

/// Where conversions go
pub trait ScriptSink {
    fn write(&mut self, id: &str, text: &str) -> std::io::Result<()>;
}

impl ScriptSink for BTreeMap<String, String> {
    fn write(&mut self, id: &str, text: &str) -> std::io::Result<()> {
        self.insert(id.to_string(), text.to_string());
        Ok(())
    }
}

/// Non-recursive scan of one directory
pub struct DirectorySource {
    root: PathBuf,
    rules: SelectionRules,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, rules: SelectionRules) -> Self {
        Self {
            root: root.into(),
            rules,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ScriptSource for DirectorySource {
    fn discover(&self) -> Result<Discovery, BatchError> {
        if !self.root.is_dir() {
            return Err(BatchError::InputDirectory {
                path: self.root.display().to_string(),
                message: "not a directory".to_string(),
            });
        }

        let mut discovery = Discovery::default();

        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() || !self.rules.has_extension(entry.path()) {
                continue;
            }
            discovery.sql_files += 1;

            let id = entry.file_name().to_string_lossy().into_owned();
            match std::fs::read_to_string(entry.path()) {
                Ok(sql) if self.rules.matches(&sql) => discovery.selected.push(ScriptText { id, sql }),
                Ok(_) => tracing::debug!(script = %id, "no selection marker, skipped"),
                Err(e) => discovery.unreadable.push(ScriptFailure::new(id, ConvertError::Io(e))),
            }
        }

        tracing::info!("Total SQL files in path: {}", discovery.sql_files);
        tracing::info!(
            "{} SQL files in path: {}",
            self.rules.marker,
            discovery.selected.len()
        );

        Ok(discovery)
    }
}

/// Writes each conversion under the input's file name
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    /// Use `root` as the output directory, creating it when missing
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, BatchError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| BatchError::Io {
            path: root.display().to_string(),
            source: e,
        })?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ScriptSink for DirectorySink {
    fn write(&mut self, id: &str, text: &str) -> std::io::Result<()> {
        std::fs::write(self.root.join(id), text)
    }
}

/// Runs the converter over every selected script
pub struct BatchRunner<'a> {
    converter: ScriptConverter<'a>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(templates: &'a TemplateSet) -> Self {
        Self {
            converter: ScriptConverter::new(templates),
        }
    }

    /// Convert every selected script of `source` into `sink`
    ///
    /// Only a failure to scan the source aborts the run.
    pub fn run(&self, source: &dyn ScriptSource, sink: &mut dyn ScriptSink) -> Result<BatchReport, BatchError> {
        let discovery = source.discover()?;

        let mut report = BatchReport::new();
        report.summary.sql_files = discovery.sql_files;
        report.summary.selected = discovery.selected.len();

        for failure in &discovery.unreadable {
            tracing::error!("Could not read: {}", failure);
            report.record_unreadable(failure.to_diagnostic());
        }

        for script in &discovery.selected {
            let outcome = self.converter.convert(&script.sql, &script.id).and_then(|conversion| {
                sink.write(&script.id, &conversion.output)
                    .map(|()| conversion)
                    .map_err(|e| ScriptFailure::new(&script.id, ConvertError::Io(e)))
            });

            match outcome {
                Ok(conversion) => {
                    tracing::info!(
                        script = %script.id,
                        routine = %conversion.routine,
                        passthrough = conversion.passthrough_statements,
                        "converted"
                    );
                    for warning in &conversion.warnings {
                        tracing::warn!(script = %script.id, "{}", warning);
                        report.add_diagnostic(
                            Diagnostic::new(DiagnosticCode::Warning, Severity::Warn, warning.as_str())
                                .for_script(&script.id),
                        );
                    }
                    report.record_converted(
                        Diagnostic::new(
                            DiagnosticCode::ScriptConverted,
                            Severity::Info,
                            format!("converted {}", conversion.routine),
                        )
                        .for_script(&script.id),
                    );
                }
                Err(failure) => record_failure(&mut report, &failure),
            }
        }

        Ok(report)
    }
}

fn record_failure(report: &mut BatchReport, failure: &ScriptFailure) {
    tracing::error!("Could not process: {}", failure);
    report.record_failed(failure.to_diagnostic());
}

/// Batch-level errors
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("invalid input directory {path}: {message}")]
    InputDirectory { path: String, message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
