use std::collections::HashMap;

use tracing::{debug, info};

use super::extract::KeySpec;
use super::{InventoryRecord, ResourceId};

/// Secondary records bucketed by the parent identifier extracted from each
/// record. Built in one pass and immutable afterwards; it borrows the records
/// it indexes.
#[derive(Debug, Clone)]
pub struct AssociationIndex<'a> {
    name: String,
    buckets: HashMap<ResourceId, Vec<&'a InventoryRecord>>,
    indexed: usize,
    skipped: usize,
}

impl<'a> AssociationIndex<'a> {
    /// Buckets `records` under the identifier `key` extracts from each one.
    /// Records whose key field is absent or does not match are skipped; that
    /// is best-effort joining, not an error.
    pub fn build(name: &str, records: &'a [InventoryRecord], key: &KeySpec) -> Self {
        let mut buckets: HashMap<ResourceId, Vec<&'a InventoryRecord>> = HashMap::new();
        let mut skipped = 0;

        for (position, record) in records.iter().enumerate() {
            match key.extract(record) {
                Some(id) => buckets.entry(id).or_default().push(record),
                None => {
                    skipped += 1;
                    debug!(
                        index = name,
                        position,
                        field = %key.field_path(),
                        "no parent identifier, record left out of index"
                    );
                }
            }
        }

        let indexed = records.len() - skipped;
        info!(
            index = name,
            indexed,
            skipped,
            parents = buckets.len(),
            "association index built"
        );

        Self {
            name: name.to_string(),
            buckets,
            indexed,
            skipped,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All records for `id`, in input order. Exact match only.
    pub fn matches(&self, id: &str) -> &[&'a InventoryRecord] {
        self.buckets.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first record for `id` by input order; later ones are ignored.
    pub fn first(&self, id: &str) -> Option<&'a InventoryRecord> {
        self.matches(id).first().copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.buckets.contains_key(id)
    }

    pub fn parent_ids(&self) -> impl Iterator<Item = &ResourceId> + '_ {
        self.buckets.keys()
    }

    /// Number of distinct parents.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn indexed(&self) -> usize {
        self.indexed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
