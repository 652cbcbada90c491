use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};
use std::borrow::Borrow;
use std::fmt;

use anyhow::Result;

use crate::error::{json_type_name, FlattenError};

pub mod extract;
pub mod flatten;
pub mod index;
pub mod path;

pub use extract::{IdPattern, KeySpec};
pub use flatten::{flatten, ColumnSource, ColumnSpec, FieldMap, FlatRow};
pub use index::AssociationIndex;
pub use path::FieldPath;

/// One cloud resource as returned by a listing call. No fixed schema: every
/// accessor treats a field as optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryRecord(JsonMap<String, Value>);

impl InventoryRecord {
    pub fn from_value(value: Value) -> Result<Self, FlattenError> {
        Self::from_value_at(value, 0)
    }

    fn from_value_at(value: Value, position: usize) -> Result<Self, FlattenError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(FlattenError::NotARecord {
                position,
                found: json_type_name(&other),
            }),
        }
    }

    /// Splits a listing (a JSON array of objects) into records.
    pub fn list_from_value(value: Value) -> Result<Vec<Self>, FlattenError> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| Self::from_value_at(v, i))
                .collect(),
            other => Err(FlattenError::NotASequence {
                found: json_type_name(&other),
            }),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn resolve(&self, path: &FieldPath) -> Option<&Value> {
        let (path::Segment::Key(first), rest) = path.segments().split_first()? else {
            return None;
        };
        path::walk(self.0.get(first)?, rest)
    }

    pub fn str_or<'a>(&'a self, field: &str, default: &'a str) -> &'a str {
        self.get(field).and_then(Value::as_str).unwrap_or(default)
    }

    pub fn fields(&self) -> &JsonMap<String, Value> {
        &self.0
    }
}

/// Identifier used to correlate a record with its parent or policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for ResourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kinds of listings the report shell knows how to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Plans,
    WebApps,
    FunctionApps,
    Autoscale,
    Subscriptions,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Plans,
        ResourceKind::WebApps,
        ResourceKind::FunctionApps,
        ResourceKind::Autoscale,
        ResourceKind::Subscriptions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Plans => "plans",
            ResourceKind::WebApps => "webapps",
            ResourceKind::FunctionApps => "functionapps",
            ResourceKind::Autoscale => "autoscale",
            ResourceKind::Subscriptions => "subscriptions",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supplies inventory listings. Implementations do the I/O; the flattening
/// core only ever sees the returned records.
pub trait InventorySource {
    fn name(&self) -> &'static str;
    fn list(&self, kind: ResourceKind) -> Result<Vec<InventoryRecord>>;
}
