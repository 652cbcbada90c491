use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use super::az_cli::parse_listing;
use crate::inventory_core::{InventoryRecord, InventorySource, ResourceKind};

/// Reads listings saved earlier with `az ... --output json > <dir>/<kind>.json`.
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path_for(&self, kind: ResourceKind) -> PathBuf {
        self.dir.join(format!("{}.json", kind.as_str()))
    }
}

impl InventorySource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    fn list(&self, kind: ResourceKind) -> Result<Vec<InventoryRecord>> {
        let path = self.path_for(kind);
        let data = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let records = parse_listing(&data).with_context(|| format!("parsing {}", path.display()))?;
        info!(kind = %kind, count = records.len(), path = %path.display(), "loaded listing");
        Ok(records)
    }
}
