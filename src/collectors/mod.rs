mod az_cli;
mod file;

pub use az_cli::AzCliSource;
pub use file::FileSource;

use crate::config::SourceConfig;
use crate::inventory_core::InventorySource;
use crate::mock::MockSource;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Live listings from the cloud CLI.
    Az,
    /// Saved `<kind>.json` listings from a directory.
    File,
    /// Canned sample inventory.
    Mock,
}

/// Builds the source selected in `cfg`. The subscription is fixed here, once,
/// and carried by the source for every listing it makes.
pub fn build_source(cfg: &SourceConfig) -> Result<Box<dyn InventorySource>> {
    let source: Box<dyn InventorySource> = match cfg.kind {
        SourceKind::Az => Box::new(AzCliSource::new(&cfg.az_path, cfg.subscription.clone())),
        SourceKind::File => {
            if !cfg.input_dir.is_dir() {
                bail!(
                    "input directory {} does not exist or is not a directory",
                    cfg.input_dir.display()
                );
            }
            Box::new(FileSource::new(&cfg.input_dir))
        }
        SourceKind::Mock => Box::new(MockSource::new()),
    };
    info!(source = source.name(), subscription = ?cfg.subscription, "inventory source ready");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn file_source_needs_existing_directory() {
        let cfg = SourceConfig {
            kind: SourceKind::File,
            input_dir: PathBuf::from("/definitely/not/here"),
            ..SourceConfig::default()
        };
        assert!(build_source(&cfg).is_err());

        let dir = tempfile::tempdir().unwrap();
        let cfg = SourceConfig {
            kind: SourceKind::File,
            input_dir: dir.path().to_path_buf(),
            ..SourceConfig::default()
        };
        assert_eq!(build_source(&cfg).unwrap().name(), "file");
    }

    #[test]
    fn builds_cli_and_mock_sources() {
        let cfg = SourceConfig::default();
        assert_eq!(build_source(&cfg).unwrap().name(), "az-cli");
        let cfg = SourceConfig {
            kind: SourceKind::Mock,
            ..SourceConfig::default()
        };
        assert_eq!(build_source(&cfg).unwrap().name(), "mock");
    }
}
