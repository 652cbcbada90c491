//! Joins primary records with their associations and flattens each one into a
//! single report row.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashSet;

use tracing::{debug, warn};

use super::extract::KeySpec;
use super::index::AssociationIndex;
use super::path::FieldPath;
use super::{InventoryRecord, ResourceId};
use crate::error::FlattenError;

pub const DEFAULT_SENTINEL: &str = "N/A";

fn default_yes() -> Value {
    Value::from("Yes")
}

/// Where a column's value comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSource {
    /// A field of the primary record, copied verbatim.
    Primary(FieldPath),
    /// A field of the first record associated through `index`.
    Associated { index: String, path: FieldPath },
    /// `yes` when an associated record exists (and `path`, if given, is
    /// truthy in it); the column default otherwise.
    Flag {
        index: String,
        #[serde(default)]
        path: Option<FieldPath>,
        #[serde(default = "default_yes")]
        yes: Value,
    },
    /// How many records `index` holds for the primary record.
    Count { index: String },
    /// Same value on every row.
    Literal(Value),
}

impl ColumnSource {
    pub fn index(&self) -> Option<&str> {
        match self {
            ColumnSource::Associated { index, .. }
            | ColumnSource::Flag { index, .. }
            | ColumnSource::Count { index } => Some(index),
            ColumnSource::Primary(_) | ColumnSource::Literal(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub source: ColumnSource,
    /// Falls back to the field map's sentinel when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ColumnSpec {
    pub fn new(name: &str, source: ColumnSource) -> Self {
        Self {
            name: name.to_string(),
            source,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn primary(name: &str, path: &str) -> Result<Self, FlattenError> {
        Ok(Self::new(name, ColumnSource::Primary(FieldPath::parse(path)?)))
    }

    pub fn associated(name: &str, index: &str, path: &str) -> Result<Self, FlattenError> {
        Ok(Self::new(
            name,
            ColumnSource::Associated {
                index: index.to_string(),
                path: FieldPath::parse(path)?,
            },
        ))
    }

    pub fn flag(name: &str, index: &str, path: Option<&str>) -> Result<Self, FlattenError> {
        Ok(Self::new(
            name,
            ColumnSource::Flag {
                index: index.to_string(),
                path: path.map(FieldPath::parse).transpose()?,
                yes: default_yes(),
            },
        ))
    }

    pub fn count(name: &str, index: &str) -> Self {
        Self::new(
            name,
            ColumnSource::Count {
                index: index.to_string(),
            },
        )
    }

    pub fn literal(name: &str, value: impl Into<Value>) -> Self {
        Self::new(name, ColumnSource::Literal(value.into()))
    }
}

/// Describes how primary records turn into rows: which field identifies a
/// record, and which columns to produce in which order.
#[derive(Debug, Clone)]
pub struct FieldMap {
    key: KeySpec,
    columns: Vec<ColumnSpec>,
    sentinel: Value,
}

impl FieldMap {
    pub fn new(key: KeySpec, columns: Vec<ColumnSpec>) -> Self {
        Self {
            key,
            columns,
            sentinel: Value::from(DEFAULT_SENTINEL),
        }
    }

    pub fn with_sentinel(mut self, sentinel: impl Into<Value>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn key(&self) -> &KeySpec {
        &self.key
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn header(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn default_for<'m>(&'m self, column: &'m ColumnSpec) -> &'m Value {
        column.default.as_ref().unwrap_or(&self.sentinel)
    }

    /// Fails on the first column whose name repeats an earlier one or that
    /// names an index not in `available`.
    pub fn check<S: AsRef<str>>(&self, available: &[S]) -> Result<(), FlattenError> {
        let known: HashSet<&str> = available.iter().map(AsRef::as_ref).collect();
        let mut seen: HashSet<&str> = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(FlattenError::DuplicateColumn {
                    column: column.name.clone(),
                });
            }
            if let Some(index) = column.source.index() {
                if !known.contains(index) {
                    return Err(FlattenError::UnknownIndex {
                        column: column.name.clone(),
                        index: index.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// One output row: column name to scalar, in field-map order.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    cells: Vec<(String, Value)>,
}

impl FlatRow {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.cells.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.cells.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for FlatRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_) | Value::Null)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Produces exactly one row per primary record, in input order.
///
/// Each record's identifier is extracted with the field map's key and looked
/// up in the named indexes; derived columns read from the first associated
/// record only. Anything that does not resolve (no identifier, no match,
/// missing or non-scalar field, unknown index) yields the column default.
pub fn flatten(
    primary: &[InventoryRecord],
    indexes: &[&AssociationIndex<'_>],
    map: &FieldMap,
) -> Vec<FlatRow> {
    let mut warned: HashSet<&str> = HashSet::new();
    for column in map.columns() {
        if let Some(index) = column.source.index() {
            if !indexes.iter().any(|i| i.name() == index) && warned.insert(index) {
                warn!(column = %column.name, index, "column refers to an index that was not supplied");
            }
        }
    }

    primary
        .iter()
        .enumerate()
        .map(|(position, record)| {
            let key = map.key().extract(record);
            if key.is_none() {
                debug!(position, field = %map.key().field_path(), "primary record has no identifier");
            }
            flatten_one(record, key.as_ref(), indexes, map)
        })
        .collect()
}

fn lookup<'i, 'a>(
    indexes: &[&'i AssociationIndex<'a>],
    name: &str,
) -> Option<&'i AssociationIndex<'a>> {
    indexes.iter().copied().find(|i| i.name() == name)
}

fn flatten_one(
    record: &InventoryRecord,
    key: Option<&ResourceId>,
    indexes: &[&AssociationIndex<'_>],
    map: &FieldMap,
) -> FlatRow {
    let cells = map
        .columns()
        .iter()
        .map(|column| {
            let resolved = match &column.source {
                ColumnSource::Primary(path) => record.resolve(path).filter(|v| is_scalar(v)).cloned(),
                ColumnSource::Associated { index, path } => key
                    .zip(lookup(indexes, index))
                    .and_then(|(id, idx)| idx.first(id.as_str()))
                    .and_then(|assoc| assoc.resolve(path))
                    .filter(|v| is_scalar(v))
                    .cloned(),
                ColumnSource::Flag { index, path, yes } => key
                    .zip(lookup(indexes, index))
                    .and_then(|(id, idx)| idx.first(id.as_str()))
                    .filter(|assoc| match path {
                        Some(p) => assoc.resolve(p).is_some_and(is_truthy),
                        None => true,
                    })
                    .map(|_| yes.clone()),
                ColumnSource::Count { index } => key
                    .zip(lookup(indexes, index))
                    .map(|(id, idx)| Value::from(idx.matches(id.as_str()).len())),
                ColumnSource::Literal(value) => Some(value.clone()),
            };
            let value = resolved.unwrap_or_else(|| map.default_for(column).clone());
            (column.name.clone(), value)
        })
        .collect();

    FlatRow { cells }
}
