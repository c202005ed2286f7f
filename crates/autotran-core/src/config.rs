//! Configuration schema (autotran.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "autotran.toml";

/// Locations of the caller templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePaths {
    /// Template used when the routine is a procedure
    #[serde(default = "default_procedure_template")]
    pub procedure: PathBuf,

    /// Template used when the routine is a function
    #[serde(default = "default_function_template")]
    pub function: PathBuf,
}

fn default_procedure_template() -> PathBuf {
    PathBuf::from("procedure_ddl_baseline.txt")
}

fn default_function_template() -> PathBuf {
    PathBuf::from("function_ddl_baseline.txt")
}

impl Default for TemplatePaths {
    fn default() -> Self {
        Self {
            procedure: default_procedure_template(),
            function: default_function_template(),
        }
    }
}

/// Rules for picking candidate scripts out of the input directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRules {
    /// Marker searched case-insensitively in the script text
    #[serde(default = "default_marker")]
    pub marker: String,

    /// File extension (without the dot)
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_marker() -> String {
    "AUTONOMOUS_TRANSACTION".to_string()
}

fn default_extension() -> String {
    "sql".to_string()
}

impl Default for SelectionRules {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            extension: default_extension(),
        }
    }
}

impl SelectionRules {
    /// Check whether a script's text carries the marker
    ///
    /// This is a raw substring test: a marker inside a comment or a string
    /// literal matches too.
    pub fn matches(&self, sql: &str) -> bool {
        sql.to_uppercase().contains(&self.marker.to_uppercase())
    }

    /// Check whether a path has the configured extension
    pub fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.extension)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Caller templates
    #[serde(default)]
    pub templates: TemplatePaths,

    /// Input selection
    #[serde(default)]
    pub selection: SelectionRules,

    /// Directory relative paths resolve against
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            templates: TemplatePaths::default(),
            selection: SelectionRules::default(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut config = Self::from_toml(&contents)?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.project_root = std::env::current_dir().unwrap_or_default();

        if config.selection.marker.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "selection.marker must not be empty".to_string(),
            ));
        }

        Ok(config)
    }

    /// Load `autotran.toml` from a directory, or fall back to defaults rooted there
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            Self::from_file(&candidate)
        } else {
            Ok(Self {
                project_root: dir.to_path_buf(),
                ..Self::default()
            })
        }
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Absolute path of the procedure template
    pub fn procedure_template_path(&self) -> PathBuf {
        self.resolve(&self.templates.procedure)
    }

    /// Absolute path of the function template
    pub fn function_template_path(&self) -> PathBuf {
        self.resolve(&self.templates.function)
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.selection.marker, "AUTONOMOUS_TRANSACTION");
        assert_eq!(config.templates.procedure, PathBuf::from("procedure_ddl_baseline.txt"));
        assert_eq!(config.templates.function, PathBuf::from("function_ddl_baseline.txt"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [templates]
            function = "templates/fn.txt"
            "#,
        )
        .unwrap();

        assert_eq!(config.templates.function, PathBuf::from("templates/fn.txt"));
        assert_eq!(config.templates.procedure, PathBuf::from("procedure_ddl_baseline.txt"));
        assert_eq!(config.selection.extension, "sql");
    }

    #[test]
    fn empty_marker_is_rejected() {
        let result = Config::from_toml(
            r#"
            [selection]
            marker = "  "
            "#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn marker_matching_is_case_insensitive() {
        let rules = SelectionRules::default();
        assert!(rules.matches("PRAGMA autonomous_transaction;"));
        assert!(rules.matches("-- AUTONOMOUS_TRANSACTION in a comment"));
        assert!(!rules.matches("CREATE FUNCTION f() RETURNS int"));
    }

    #[test]
    fn extension_matching() {
        let rules = SelectionRules::default();
        assert!(rules.has_extension(Path::new("dir/a.sql")));
        assert!(!rules.has_extension(Path::new("dir/a.sql.bak")));
        assert!(!rules.has_extension(Path::new("dir/README")));
    }

    #[test]
    fn resolve_relative_paths_against_root() {
        let config = Config {
            project_root: PathBuf::from("/work"),
            ..Config::default()
        };

        assert_eq!(
            config.procedure_template_path(),
            PathBuf::from("/work/procedure_ddl_baseline.txt")
        );
        assert_eq!(config.resolve(Path::new("/abs/t.txt")), PathBuf::from("/abs/t.txt"));
    }

    #[test]
    fn discover_without_file_uses_defaults() {
        let dir = std::env::temp_dir().join("autotran-config-discover-missing");
        let config = Config::discover(&dir).unwrap();
        assert_eq!(config.project_root, dir);
        assert_eq!(config.selection, SelectionRules::default());
    }
}
