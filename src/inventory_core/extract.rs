//! Identifier extraction.
//!
//! Child resources point at their parent through a path-shaped identifier, e.g.
//! an autoscale setting's `targetResourceUri` or a web app's `serverFarmId`:
//!
//! ```text
//! /subscriptions/<sub>/resourceGroups/<rg>/providers/Microsoft.Web/serverfarms/<plan>
//! ```
//!
//! An [`IdPattern`] pulls the parent identifier out of such a string. A value
//! that does not match yields `None`, which callers treat as "no parent".

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::path::FieldPath;
use super::{InventoryRecord, ResourceId};
use crate::error::FlattenError;

#[derive(Debug, Clone)]
pub enum IdPattern {
    /// The whole (non-empty) field value is the identifier.
    Whole,
    /// The regex's capture groups, joined with `/`, are the identifier.
    Capture(Regex),
    /// Resource group and the segment after a marker, as `<group>/<name>`,
    /// lower-cased. Both parts compare case-insensitively in resource ids.
    Scoped(Regex),
}

impl IdPattern {
    pub fn whole() -> Self {
        IdPattern::Whole
    }

    /// Matches the path segment following `/<marker>/`. The marker is matched
    /// case-insensitively since providers are inconsistent about casing
    /// (`serverfarms` vs `serverFarms`); the extracted segment keeps its case.
    pub fn segment_after(marker: &str) -> Result<Self, FlattenError> {
        let marker = marker.trim_matches('/');
        if marker.is_empty() {
            return Err(FlattenError::InvalidPattern {
                pattern: marker.to_string(),
                reason: "marker segment is empty".into(),
            });
        }
        Self::regex(&format!("(?i)/{}/([^/]+)", regex::escape(marker)))
    }

    /// Like [`IdPattern::segment_after`], but qualified by the resource group
    /// so that same-named resources in different groups stay apart.
    pub fn scoped_segment_after(marker: &str) -> Result<Self, FlattenError> {
        let marker = marker.trim_matches('/');
        if marker.is_empty() {
            return Err(FlattenError::InvalidPattern {
                pattern: marker.to_string(),
                reason: "marker segment is empty".into(),
            });
        }
        let pattern = format!(
            "(?i)/resourceGroups/([^/]+)/(?:.*/)?{}/([^/]+)",
            regex::escape(marker)
        );
        Ok(IdPattern::Scoped(compile(&pattern)?))
    }

    pub fn regex(pattern: &str) -> Result<Self, FlattenError> {
        Ok(IdPattern::Capture(compile(pattern)?))
    }

    pub fn extract(&self, value: &str) -> Option<String> {
        let found = match self {
            IdPattern::Whole => value.to_string(),
            IdPattern::Capture(re) => join_captures(re, value)?,
            IdPattern::Scoped(re) => join_captures(re, value)?.to_lowercase(),
        };
        (!found.is_empty()).then_some(found)
    }
}

fn compile(pattern: &str) -> Result<Regex, FlattenError> {
    let re = Regex::new(pattern).map_err(|e| FlattenError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;
    if re.captures_len() < 2 {
        return Err(FlattenError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "pattern needs a capture group for the identifier".into(),
        });
    }
    Ok(re)
}

/// Every group must take part in the match and be non-empty.
fn join_captures(re: &Regex, value: &str) -> Option<String> {
    let caps = re.captures(value)?;
    let parts = caps
        .iter()
        .skip(1)
        .map(|m| m.map(|m| m.as_str()).filter(|s| !s.is_empty()))
        .collect::<Option<Vec<&str>>>()?;
    Some(parts.join("/"))
}

/// Where a record's identifier lives and how to pull it out.
///
/// In config form:
///
/// ```toml
/// key = { field = "targetResourceUri", segment_after = "serverfarms" }
/// key = { field = "id", segment_after = "serverfarms", by_resource_group = true }
/// key = { field = "id", pattern = "/sites/([^/]+)$" }
/// key = { field = "name" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "KeySpecDef", into = "KeySpecDef")]
pub struct KeySpec {
    field: FieldPath,
    pattern: IdPattern,
    def: KeySpecDef,
}

impl KeySpec {
    pub fn new(field: &str, pattern: IdPattern) -> Result<Self, FlattenError> {
        let def = KeySpecDef {
            field: field.to_string(),
            segment_after: None,
            by_resource_group: false,
            pattern: match &pattern {
                IdPattern::Whole => None,
                IdPattern::Capture(re) | IdPattern::Scoped(re) => Some(re.as_str().to_string()),
            },
        };
        Ok(Self {
            field: FieldPath::parse(field)?,
            pattern,
            def,
        })
    }

    /// Key taken verbatim from `field`.
    pub fn field(field: &str) -> Result<Self, FlattenError> {
        Self::new(field, IdPattern::whole())
    }

    /// Key taken from the segment after `/<marker>/` in `field`.
    pub fn segment_after(field: &str, marker: &str) -> Result<Self, FlattenError> {
        let mut spec = Self::new(field, IdPattern::segment_after(marker)?)?;
        spec.def.pattern = None;
        spec.def.segment_after = Some(marker.to_string());
        Ok(spec)
    }

    /// Key of the form `<resource group>/<segment after marker>`, lower-cased.
    pub fn scoped_segment_after(field: &str, marker: &str) -> Result<Self, FlattenError> {
        let mut spec = Self::new(field, IdPattern::scoped_segment_after(marker)?)?;
        spec.def.pattern = None;
        spec.def.segment_after = Some(marker.to_string());
        spec.def.by_resource_group = true;
        Ok(spec)
    }

    pub fn field_path(&self) -> &FieldPath {
        &self.field
    }

    /// `None` when the field is absent, not a string, or does not match.
    pub fn extract(&self, record: &InventoryRecord) -> Option<ResourceId> {
        match record.resolve(&self.field)? {
            Value::String(s) => self.pattern.extract(s).map(ResourceId::from),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct KeySpecDef {
    field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    segment_after: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    by_resource_group: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl TryFrom<KeySpecDef> for KeySpec {
    type Error = FlattenError;

    fn try_from(def: KeySpecDef) -> Result<Self, Self::Error> {
        if def.by_resource_group && def.segment_after.is_none() {
            return Err(FlattenError::InvalidPattern {
                pattern: def.pattern.unwrap_or_default(),
                reason: "`by_resource_group` needs `segment_after`".into(),
            });
        }
        match (&def.segment_after, &def.pattern) {
            (Some(_), Some(p)) => Err(FlattenError::InvalidPattern {
                pattern: p.clone(),
                reason: "set either `segment_after` or `pattern`, not both".into(),
            }),
            (Some(marker), None) if def.by_resource_group => {
                KeySpec::scoped_segment_after(&def.field, marker)
            }
            (Some(marker), None) => KeySpec::segment_after(&def.field, marker),
            (None, Some(p)) => KeySpec::new(&def.field, IdPattern::regex(p)?),
            (None, None) => KeySpec::field(&def.field),
        }
    }
}

impl From<KeySpec> for KeySpecDef {
    fn from(spec: KeySpec) -> Self {
        spec.def
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PLAN_URI: &str =
        "/subscriptions/0000/resourceGroups/rg-web/providers/Microsoft.Web/serverfarms/plan-A";

    #[test]
    fn segment_after_extracts_plan_name() {
        let p = IdPattern::segment_after("serverfarms").unwrap();
        assert_eq!(p.extract(PLAN_URI).as_deref(), Some("plan-A"));
        assert_eq!(p.extract(".../serverfarms/plan-A").as_deref(), Some("plan-A"));
    }

    #[test]
    fn segment_after_ignores_marker_case_but_keeps_segment_case() {
        let p = IdPattern::segment_after("serverfarms").unwrap();
        assert_eq!(
            p.extract("/subscriptions/1/resourceGroups/x/providers/Microsoft.Web/serverFarms/Plan-Mixed")
                .as_deref(),
            Some("Plan-Mixed")
        );
    }

    #[test]
    fn non_matching_values_yield_none() {
        let p = IdPattern::segment_after("serverfarms").unwrap();
        assert_eq!(p.extract("not-a-matching-shape"), None);
        assert_eq!(p.extract("/serverfarms/"), None);
        assert_eq!(p.extract(""), None);
        assert_eq!(IdPattern::whole().extract(""), None);
    }

    #[test]
    fn scoped_segment_keeps_same_named_plans_apart() {
        let p = IdPattern::scoped_segment_after("serverfarms").unwrap();
        assert_eq!(p.extract(PLAN_URI).as_deref(), Some("rg-web/plan-a"));
        assert_eq!(
            p.extract("/subscriptions/0000/resourceGroups/RG-Other/providers/Microsoft.Web/serverFarms/Plan-A")
                .as_deref(),
            Some("rg-other/plan-a")
        );
        assert_eq!(
            p.extract("/subscriptions/0000/resourcegroups/RG-WEB/providers/microsoft.web/serverFarms/PLAN-A")
                .as_deref(),
            p.extract(PLAN_URI).as_deref()
        );
        // no resource group to qualify with
        assert_eq!(p.extract(".../serverfarms/plan-A"), None);
        assert!(IdPattern::scoped_segment_after("").is_err());
    }

    #[test]
    fn regex_joins_every_capture_group() {
        let p = IdPattern::regex("/rg/([^/]+)/name/([^/]+)").unwrap();
        assert_eq!(p.extract("/rg/a/name/b").as_deref(), Some("a/b"));
        let optional = IdPattern::regex("^(a)?(b)$").unwrap();
        assert_eq!(optional.extract("b"), None);
    }

    #[test]
    fn regex_without_capture_group_is_rejected() {
        assert!(matches!(
            IdPattern::regex("serverfarms"),
            Err(FlattenError::InvalidPattern { .. })
        ));
        assert!(matches!(
            IdPattern::regex("(unclosed"),
            Err(FlattenError::InvalidPattern { .. })
        ));
        assert!(IdPattern::segment_after("/").is_err());
    }

    #[test]
    fn key_spec_extracts_from_record() {
        let key = KeySpec::segment_after("targetResourceUri", "serverfarms").unwrap();
        let rec = InventoryRecord::from_value(json!({ "targetResourceUri": PLAN_URI })).unwrap();
        assert_eq!(key.extract(&rec), Some(ResourceId::from("plan-A")));

        let numeric = InventoryRecord::from_value(json!({ "targetResourceUri": 42 })).unwrap();
        assert_eq!(key.extract(&numeric), None);

        let absent = InventoryRecord::from_value(json!({})).unwrap();
        assert_eq!(key.extract(&absent), None);
    }

    #[test]
    fn key_spec_deserializes_each_form() {
        let seg: KeySpec =
            serde_json::from_value(json!({"field": "serverFarmId", "segment_after": "serverfarms"}))
                .unwrap();
        let rec = InventoryRecord::from_value(json!({ "serverFarmId": PLAN_URI })).unwrap();
        assert_eq!(seg.extract(&rec), Some(ResourceId::from("plan-A")));

        let re: KeySpec =
            serde_json::from_value(json!({"field": "serverFarmId", "pattern": "/rg-([a-z]+)/"}))
                .unwrap();
        let rec = InventoryRecord::from_value(json!({ "serverFarmId": "/rg-web/x" })).unwrap();
        assert_eq!(re.extract(&rec), Some(ResourceId::from("web")));

        let plain: KeySpec = serde_json::from_value(json!({"field": "name"})).unwrap();
        let rec = InventoryRecord::from_value(json!({ "name": "plan-A" })).unwrap();
        assert_eq!(plain.extract(&rec), Some(ResourceId::from("plan-A")));

        let scoped: KeySpec = serde_json::from_value(
            json!({"field": "serverFarmId", "segment_after": "serverfarms", "by_resource_group": true}),
        )
        .unwrap();
        let rec = InventoryRecord::from_value(json!({ "serverFarmId": PLAN_URI })).unwrap();
        assert_eq!(scoped.extract(&rec), Some(ResourceId::from("rg-web/plan-a")));
        assert_eq!(
            serde_json::to_value(&scoped).unwrap(),
            json!({"field": "serverFarmId", "segment_after": "serverfarms", "by_resource_group": true})
        );

        assert!(serde_json::from_value::<KeySpec>(
            json!({"field": "id", "segment_after": "a", "pattern": "(b)"})
        )
        .is_err());
        assert!(serde_json::from_value::<KeySpec>(json!({"field": "id", "by_resource_group": true})).is_err());
    }
}
