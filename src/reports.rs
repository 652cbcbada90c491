//! Report definitions and the runner that fetches listings, builds the
//! association indexes and flattens the primary listing into rows.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::info;

use crate::config::Config;
use crate::error::FlattenError;
use crate::inventory_core::{
    flatten, AssociationIndex, ColumnSpec, FieldMap, FlatRow, InventoryRecord, InventorySource,
    KeySpec, ResourceKind,
};

pub const BUILTIN_REPORTS: [&str; 4] = ["plans", "webapps", "functionapps", "subscriptions"];

/// A secondary listing joined to the primary one under `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinSpec {
    pub name: String,
    pub resource: ResourceKind,
    pub key: KeySpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDefinition {
    pub primary: ResourceKind,
    /// Identifier of a primary record, matched against each join's keys.
    pub key: KeySpec,
    #[serde(default)]
    pub joins: Vec<JoinSpec>,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<FlatRow>,
}

impl ReportDefinition {
    pub fn field_map(&self, sentinel: &str) -> FieldMap {
        FieldMap::new(self.key.clone(), self.columns.clone()).with_sentinel(sentinel)
    }

    /// Column names must be unique and every column must name one of the
    /// declared joins.
    pub fn validate(&self) -> Result<(), FlattenError> {
        let names: Vec<&str> = self.joins.iter().map(|j| j.name.as_str()).collect();
        self.field_map("").check(&names)
    }

    /// Lists every resource kind the report needs, once each and in order.
    pub fn run(&self, name: &str, source: &dyn InventorySource, sentinel: &str) -> Result<Report> {
        self.validate()
            .with_context(|| format!("report `{name}` is misconfigured"))?;

        let mut listings: HashMap<ResourceKind, Vec<InventoryRecord>> = HashMap::new();
        for kind in std::iter::once(self.primary).chain(self.joins.iter().map(|j| j.resource)) {
            if listings.contains_key(&kind) {
                continue;
            }
            let records = source
                .list(kind)
                .with_context(|| format!("listing {kind} from {}", source.name()))?;
            listings.insert(kind, records);
        }

        let empty: Vec<InventoryRecord> = Vec::new();
        let listing = |kind: ResourceKind| listings.get(&kind).unwrap_or(&empty);

        let indexes: Vec<AssociationIndex<'_>> = self
            .joins
            .iter()
            .map(|join| AssociationIndex::build(&join.name, listing(join.resource), &join.key))
            .collect();
        let index_refs: Vec<&AssociationIndex<'_>> = indexes.iter().collect();

        let map = self.field_map(sentinel);
        let rows = flatten(listing(self.primary), &index_refs, &map);
        info!(report = name, rows = rows.len(), "report flattened");

        Ok(Report {
            name: name.to_string(),
            header: map.header(),
            rows,
        })
    }
}

fn subscription_column(columns: &mut Vec<ColumnSpec>, subscription: Option<&str>) {
    if let Some(sub) = subscription {
        columns.insert(0, ColumnSpec::literal("Subscription", sub));
    }
}

/// Plan names are only unique within a resource group.
fn serverfarm_key(field: &str) -> Result<KeySpec, FlattenError> {
    KeySpec::scoped_segment_after(field, "serverfarms")
}

/// Hosting plans with their autoscale bounds and how many web apps they host.
pub fn plans_report(subscription: Option<&str>) -> Result<ReportDefinition, FlattenError> {
    let mut columns = vec![
        ColumnSpec::primary("Plan", "name")?,
        ColumnSpec::primary("ResourceGroup", "resourceGroup")?,
        ColumnSpec::primary("Location", "location")?,
        ColumnSpec::primary("SKU", "sku.name")?,
        ColumnSpec::primary("Tier", "sku.tier")?,
        ColumnSpec::primary("Workers", "sku.capacity")?,
        ColumnSpec::primary("Kind", "kind")?,
        ColumnSpec::flag("AutoScale", "autoscale", Some("enabled"))?.with_default("No"),
        ColumnSpec::associated("Min", "autoscale", "profiles[0].capacity.minimum")?,
        ColumnSpec::associated("Max", "autoscale", "profiles[0].capacity.maximum")?,
        ColumnSpec::associated("Default", "autoscale", "profiles[0].capacity.default")?,
        ColumnSpec::count("Apps", "apps"),
    ];
    subscription_column(&mut columns, subscription);

    Ok(ReportDefinition {
        primary: ResourceKind::Plans,
        key: serverfarm_key("id")?,
        joins: vec![
            JoinSpec {
                name: "autoscale".into(),
                resource: ResourceKind::Autoscale,
                key: serverfarm_key("targetResourceUri")?,
            },
            JoinSpec {
                name: "apps".into(),
                resource: ResourceKind::WebApps,
                key: serverfarm_key("serverFarmId")?,
            },
        ],
        columns,
    })
}

/// Sites of `kind` with the plan they run on.
fn sites_report(
    kind: ResourceKind,
    subscription: Option<&str>,
) -> Result<ReportDefinition, FlattenError> {
    let mut columns = vec![
        ColumnSpec::primary("App", "name")?,
        ColumnSpec::primary("ResourceGroup", "resourceGroup")?,
        ColumnSpec::primary("Location", "location")?,
        ColumnSpec::primary("State", "state")?,
        ColumnSpec::primary("DefaultHostName", "defaultHostName")?,
        ColumnSpec::primary("HttpsOnly", "httpsOnly")?,
        ColumnSpec::associated("Plan", "plan", "name")?.with_default("Unknown"),
        ColumnSpec::associated("SKU", "plan", "sku.name")?.with_default("Unknown"),
        ColumnSpec::associated("Tier", "plan", "sku.tier")?.with_default("Unknown"),
    ];
    subscription_column(&mut columns, subscription);

    Ok(ReportDefinition {
        primary: kind,
        key: serverfarm_key("serverFarmId")?,
        joins: vec![JoinSpec {
            name: "plan".into(),
            resource: ResourceKind::Plans,
            key: serverfarm_key("id")?,
        }],
        columns,
    })
}

pub fn webapps_report(subscription: Option<&str>) -> Result<ReportDefinition, FlattenError> {
    sites_report(ResourceKind::WebApps, subscription)
}

pub fn functionapps_report(subscription: Option<&str>) -> Result<ReportDefinition, FlattenError> {
    sites_report(ResourceKind::FunctionApps, subscription)
}

/// Subscriptions visible to the current login.
pub fn subscriptions_report() -> Result<ReportDefinition, FlattenError> {
    Ok(ReportDefinition {
        primary: ResourceKind::Subscriptions,
        key: KeySpec::field("id")?,
        joins: vec![],
        columns: vec![
            ColumnSpec::primary("Name", "name")?,
            ColumnSpec::primary("SubscriptionId", "id")?,
            ColumnSpec::primary("State", "state")?,
            ColumnSpec::primary("IsDefault", "isDefault")?,
            ColumnSpec::primary("TenantId", "tenantId")?,
        ],
    })
}

pub fn builtin(name: &str, subscription: Option<&str>) -> Option<Result<ReportDefinition, FlattenError>> {
    match name {
        "plans" => Some(plans_report(subscription)),
        "webapps" => Some(webapps_report(subscription)),
        "functionapps" => Some(functionapps_report(subscription)),
        "subscriptions" => Some(subscriptions_report()),
        _ => None,
    }
}

/// Custom reports from the config take precedence over built-ins of the
/// same name. Names are matched case-insensitively.
pub fn resolve(name: &str, config: &Config) -> Result<ReportDefinition> {
    if let Some(custom) = config.report_definition(name) {
        return Ok(custom.clone());
    }
    match builtin(&name.to_lowercase(), config.source.subscription.as_deref()) {
        Some(def) => Ok(def?),
        None => Err(anyhow!(
            "unknown report `{name}`; available: {}",
            available(config).join(", ")
        )),
    }
}

pub fn available(config: &Config) -> Vec<String> {
    let names: BTreeSet<String> = BUILTIN_REPORTS
        .iter()
        .map(|n| n.to_string())
        .chain(config.reports.keys().map(|n| n.to_lowercase()))
        .collect();
    names.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSource;
    use serde_json::json;

    fn run(def: ReportDefinition, name: &str) -> Report {
        def.run(name, &MockSource::new(), "N/A").unwrap()
    }

    fn column<'r>(report: &'r Report, plan: &str, key_col: &str, col: &str) -> &'r serde_json::Value {
        report
            .rows
            .iter()
            .find(|r| r.get(key_col) == Some(&json!(plan)))
            .and_then(|r| r.get(col))
            .unwrap()
    }

    fn join_key<'d>(def: &'d ReportDefinition, name: &str) -> &'d KeySpec {
        &def.joins.iter().find(|j| j.name == name).unwrap().key
    }

    #[test]
    fn builtins_are_valid() {
        for name in BUILTIN_REPORTS {
            let def = builtin(name, Some("prod")).unwrap().unwrap();
            def.validate().unwrap();
        }
        assert!(builtin("nope", None).is_none());
    }

    #[test]
    fn plans_report_joins_autoscale_and_apps() {
        let report = run(plans_report(None).unwrap(), "plans");
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.header[0], "Plan");

        assert_eq!(column(&report, "plan-web-prod", "Plan", "AutoScale"), &json!("Yes"));
        assert_eq!(column(&report, "plan-web-prod", "Plan", "Min"), &json!("2"));
        assert_eq!(column(&report, "plan-web-prod", "Plan", "Max"), &json!("10"));
        assert_eq!(column(&report, "plan-web-prod", "Plan", "Apps"), &json!(2));
        assert_eq!(column(&report, "plan-web-prod", "Plan", "SKU"), &json!("P1v2"));

        assert_eq!(column(&report, "plan-func-prem", "Plan", "AutoScale"), &json!("No"));
        assert_eq!(column(&report, "plan-func-prem", "Plan", "Min"), &json!("N/A"));
        assert_eq!(column(&report, "plan-func-prem", "Plan", "Apps"), &json!(0));

        // disabled setting: not flagged, bounds still reported
        assert_eq!(column(&report, "plan-legacy", "Plan", "AutoScale"), &json!("No"));
        assert_eq!(column(&report, "plan-legacy", "Plan", "Max"), &json!("2"));
    }

    #[test]
    fn webapps_report_resolves_plan_and_subscription() {
        let report = run(webapps_report(Some("Contoso Production")).unwrap(), "webapps");
        assert_eq!(report.header[0], "Subscription");
        assert_eq!(report.rows.len(), 3);
        assert_eq!(column(&report, "shop-api", "App", "Plan"), &json!("plan-web-prod"));
        assert_eq!(column(&report, "intranet", "App", "Tier"), &json!("Standard"));
        assert_eq!(
            column(&report, "intranet", "App", "Subscription"),
            &json!("Contoso Production")
        );
    }

    #[test]
    fn functionapps_report_uses_function_listing() {
        let report = run(functionapps_report(None).unwrap(), "functionapps");
        assert_eq!(report.rows.len(), 1);
        assert_eq!(column(&report, "orders-worker", "App", "SKU"), &json!("EP1"));
    }

    #[test]
    fn misconfigured_definition_is_rejected_before_listing() {
        let mut def = plans_report(None).unwrap();
        def.joins.retain(|j| j.name != "apps");
        let err = def.run("plans", &MockSource::new(), "N/A").unwrap_err();
        assert!(format!("{err:#}").contains("unknown association `apps`"));
    }

    #[test]
    fn same_named_plans_in_different_groups_stay_apart() {
        let plans = InventoryRecord::list_from_value(json!([
            {"id": "/subscriptions/1/resourceGroups/rg-a/providers/Microsoft.Web/serverfarms/plan",
             "name": "plan", "resourceGroup": "rg-a"},
            {"id": "/subscriptions/1/resourceGroups/rg-b/providers/Microsoft.Web/serverfarms/plan",
             "name": "plan", "resourceGroup": "rg-b"}
        ]))
        .unwrap();
        let settings = InventoryRecord::list_from_value(json!([{
            "enabled": true,
            "targetResourceUri": "/subscriptions/1/resourceGroups/RG-A/providers/Microsoft.Web/serverFarms/plan",
            "profiles": [{"capacity": {"minimum": "1", "maximum": "9", "default": "1"}}]
        }]))
        .unwrap();
        let apps = InventoryRecord::list_from_value(json!([{
            "name": "app",
            "serverFarmId": "/subscriptions/1/resourceGroups/rg-a/providers/Microsoft.Web/serverFarms/plan"
        }]))
        .unwrap();

        let def = plans_report(None).unwrap();
        let autoscale = AssociationIndex::build("autoscale", &settings, join_key(&def, "autoscale"));
        let hosted = AssociationIndex::build("apps", &apps, join_key(&def, "apps"));
        let rows = flatten(&plans, &[&autoscale, &hosted], &def.field_map("N/A"));

        assert_eq!(rows[0].get("AutoScale"), Some(&json!("Yes")));
        assert_eq!(rows[0].get("Max"), Some(&json!("9")));
        assert_eq!(rows[0].get("Apps"), Some(&json!(1)));

        assert_eq!(rows[1].get("ResourceGroup"), Some(&json!("rg-b")));
        assert_eq!(rows[1].get("AutoScale"), Some(&json!("No")));
        assert_eq!(rows[1].get("Min"), Some(&json!("N/A")));
        assert_eq!(rows[1].get("Apps"), Some(&json!(0)));
    }

    #[test]
    fn repeated_column_name_fails_validation() {
        let mut def = plans_report(None).unwrap();
        def.columns.push(ColumnSpec::primary("Plan", "kind").unwrap());
        assert_eq!(
            def.validate(),
            Err(FlattenError::DuplicateColumn { column: "Plan".into() })
        );
        let err = def.run("plans", &MockSource::new(), "N/A").unwrap_err();
        assert!(format!("{err:#}").contains("`Plan` is declared more than once"));
    }

    #[test]
    fn report_names_match_case_insensitively() {
        let mut config = Config::default();
        config.reports.insert("scaleup".into(), subscriptions_report().unwrap());

        assert_eq!(resolve("ScaleUp", &config).unwrap().primary, ResourceKind::Subscriptions);
        assert_eq!(resolve("PLANS", &config).unwrap().primary, ResourceKind::Plans);
        assert!(available(&config).contains(&"scaleup".to_string()));
    }

    #[test]
    fn resolve_prefers_custom_and_lists_all() {
        let mut config = Config::default();
        config.reports.insert("plans".into(), subscriptions_report().unwrap());
        config.reports.insert("extra".into(), subscriptions_report().unwrap());

        let def = resolve("plans", &config).unwrap();
        assert_eq!(def.primary, ResourceKind::Subscriptions);
        assert!(resolve("webapps", &config).is_ok());

        let err = resolve("missing", &config).unwrap_err();
        assert!(err.to_string().contains("extra"));
        assert_eq!(
            available(&config),
            ["extra", "functionapps", "plans", "subscriptions", "webapps"]
        );
    }
}
