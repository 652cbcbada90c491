use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::FlattenError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Dotted path into a record, with optional array indices:
/// `sku.name`, `profiles[0].capacity.minimum`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, FlattenError> {
        let invalid = |reason: &str| FlattenError::InvalidFieldPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.trim().is_empty() {
            return Err(invalid("path is empty"));
        }

        let mut segments = Vec::new();
        for part in raw.split('.') {
            // "profiles[0][1]" -> key "profiles", indices 0 and 1
            let (key, mut rest) = match part.find('[') {
                Some(i) => (&part[..i], &part[i..]),
                None => (part, ""),
            };
            if key.is_empty() {
                return Err(invalid("empty key segment"));
            }
            if key.contains(']') {
                return Err(invalid("unbalanced `]`"));
            }
            segments.push(Segment::Key(key.to_string()));

            while !rest.is_empty() {
                let Some(close) = rest.find(']') else {
                    return Err(invalid("unclosed `[`"));
                };
                let digits = &rest[1..close];
                let index = digits
                    .parse::<usize>()
                    .map_err(|_| invalid(&format!("`{digits}` is not an array index")))?;
                segments.push(Segment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(invalid("unexpected text after `]`"));
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Walks `root` along the path. `null` anywhere on the way counts as absent.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        walk(root, &self.segments)
    }
}

/// Walks `current` along `segments`. `null` anywhere on the way counts as absent.
pub(crate) fn walk<'a>(mut current: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    for segment in segments {
        current = match (segment, current) {
            (Segment::Key(k), Value::Object(map)) => map.get(k)?,
            (Segment::Index(i), Value::Array(items)) => items.get(*i)?,
            _ => return None,
        };
    }
    (!current.is_null()).then_some(current)
}

impl FromStr for FieldPath {
    type Err = FlattenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = FlattenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.raw
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_keys_and_indices() {
        let p = FieldPath::parse("profiles[0].capacity.minimum").unwrap();
        assert_eq!(
            p.segments(),
            &[
                Segment::Key("profiles".into()),
                Segment::Index(0),
                Segment::Key("capacity".into()),
                Segment::Key("minimum".into()),
            ]
        );
        assert_eq!(p.to_string(), "profiles[0].capacity.minimum");
    }

    #[test]
    fn parses_consecutive_indices() {
        let p = FieldPath::parse("grid[1][2]").unwrap();
        assert_eq!(
            p.segments(),
            &[Segment::Key("grid".into()), Segment::Index(1), Segment::Index(2)]
        );
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["", "  ", "a..b", ".a", "a.", "a[x]", "a[0", "a[0]b", "[0]", "a]"] {
            assert!(
                matches!(FieldPath::parse(bad), Err(FlattenError::InvalidFieldPath { .. })),
                "expected `{bad}` to be rejected"
            );
        }
    }

    #[test]
    fn resolves_nested_values() {
        let doc = json!({"profiles": [{"capacity": {"minimum": "1"}}], "sku": {"name": "P1v2"}});
        let min = FieldPath::parse("profiles[0].capacity.minimum").unwrap();
        let sku = FieldPath::parse("sku.name").unwrap();
        assert_eq!(min.resolve(&doc), Some(&json!("1")));
        assert_eq!(sku.resolve(&doc), Some(&json!("P1v2")));
    }

    #[test]
    fn missing_wrong_shape_and_null_resolve_to_none() {
        let doc = json!({"profiles": [], "sku": "flat", "tier": null});
        for path in ["profiles[0].capacity", "sku.name", "tier", "absent", "profiles.x"] {
            let p = FieldPath::parse(path).unwrap();
            assert_eq!(p.resolve(&doc), None, "{path}");
        }
    }

    #[test]
    fn deserializes_from_string() {
        let p: FieldPath = serde_json::from_value(json!("a.b[2]")).unwrap();
        assert_eq!(p.as_str(), "a.b[2]");
        assert!(serde_json::from_value::<FieldPath>(json!("a[")).is_err());
    }
}
