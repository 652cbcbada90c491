//! Configuration management

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::collectors::SourceKind;
use crate::inventory_core::flatten::DEFAULT_SENTINEL;
use crate::out::OutFormat;
use crate::reports::ReportDefinition;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub source: SourceConfig,
    pub report: ReportConfig,
    /// Custom reports, keyed by the name used on the command line.
    pub reports: BTreeMap<String, ReportDefinition>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `plain`, `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "plain".to_string(),
        }
    }
}

/// Where inventory listings come from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Path or name of the cloud CLI executable.
    pub az_path: String,
    /// Directory of saved `<kind>.json` listings for the file source.
    pub input_dir: PathBuf,
    /// Subscription passed to every CLI call. `None` uses the CLI's current one.
    pub subscription: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Az,
            az_path: "az".to_string(),
            input_dir: PathBuf::from("inventory"),
            subscription: None,
        }
    }
}

/// Report rendering options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Value for columns that cannot be resolved.
    pub sentinel: String,
    pub format: OutFormat,
    /// Write to this file instead of stdout.
    pub output: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            format: OutFormat::Csv,
            output: None,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Layers, later ones winning: `config/default.*` (optional), the file at
    /// `path` (required when given), then `INVENTORY_*` variables with `__`
    /// between nested keys, e.g. `INVENTORY_SOURCE__SUBSCRIPTION`.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder
            .add_source(
                config::Environment::with_prefix("INVENTORY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Custom report by name. The `config` crate lower-cases table keys, so
    /// names are compared without regard to case.
    pub fn report_definition(&self, name: &str) -> Option<&ReportDefinition> {
        self.reports
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, def)| def)
    }
}
