use anyhow::Result;
use serde_json::{json, Value};

use crate::inventory_core::{InventoryRecord, InventorySource, ResourceKind};

const SUB: &str = "/subscriptions/11111111-2222-3333-4444-555555555555";

/// Canned inventory shaped like real CLI output, for demos and tests.
///
/// - `plan-web-prod`: autoscaled 2..10 (default 3), hosts two web apps
/// - `plan-func-prem`: no autoscale setting, hosts one function app
/// - `plan-legacy`: autoscale setting present but disabled, hosts one web app
///
/// One autoscale setting targets a scale set rather than a plan and never
/// joins to anything.
pub struct MockSource;

impl MockSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

fn plan_id(rg: &str, name: &str) -> String {
    format!("{SUB}/resourceGroups/{rg}/providers/Microsoft.Web/serverfarms/{name}")
}

fn plans() -> Value {
    json!([
        {
            "id": plan_id("rg-web", "plan-web-prod"),
            "name": "plan-web-prod",
            "resourceGroup": "rg-web",
            "location": "westeurope",
            "kind": "app",
            "sku": {"name": "P1v2", "tier": "PremiumV2", "capacity": 3}
        },
        {
            "id": plan_id("rg-func", "plan-func-prem"),
            "name": "plan-func-prem",
            "resourceGroup": "rg-func",
            "location": "westeurope",
            "kind": "elastic",
            "sku": {"name": "EP1", "tier": "ElasticPremium", "capacity": 1}
        },
        {
            "id": plan_id("rg-legacy", "plan-legacy"),
            "name": "plan-legacy",
            "resourceGroup": "rg-legacy",
            "location": "northeurope",
            "kind": "app",
            "sku": {"name": "S1", "tier": "Standard", "capacity": 1}
        }
    ])
}

fn site(rg: &str, name: &str, kind: &str, plan_rg: &str, plan: &str, state: &str) -> Value {
    json!({
        "id": format!("{SUB}/resourceGroups/{rg}/providers/Microsoft.Web/sites/{name}"),
        "name": name,
        "resourceGroup": rg,
        "location": "westeurope",
        "kind": kind,
        "state": state,
        "defaultHostName": format!("{name}.azurewebsites.net"),
        "httpsOnly": true,
        // the CLI is not consistent about the casing of this segment
        "serverFarmId": plan_id(plan_rg, plan).replace("serverfarms", "serverFarms")
    })
}

fn web_apps() -> Value {
    json!([
        site("rg-web", "shop-frontend", "app", "rg-web", "plan-web-prod", "Running"),
        site("rg-web", "shop-api", "app,linux", "rg-web", "plan-web-prod", "Running"),
        site("rg-legacy", "intranet", "app", "rg-legacy", "plan-legacy", "Stopped")
    ])
}

fn function_apps() -> Value {
    json!([site(
        "rg-func",
        "orders-worker",
        "functionapp,linux",
        "rg-func",
        "plan-func-prem",
        "Running"
    )])
}

fn autoscale_settings() -> Value {
    json!([
        {
            "name": "plan-web-prod-autoscale",
            "enabled": true,
            "targetResourceUri": plan_id("rg-web", "plan-web-prod"),
            "profiles": [{"name": "default", "capacity": {"minimum": "2", "maximum": "10", "default": "3"}}]
        },
        {
            "name": "plan-legacy-autoscale",
            "enabled": false,
            "targetResourceUri": plan_id("rg-legacy", "plan-legacy"),
            "profiles": [{"name": "default", "capacity": {"minimum": "1", "maximum": "2", "default": "1"}}]
        },
        {
            "name": "batch-vmss-autoscale",
            "enabled": true,
            "targetResourceUri": format!("{SUB}/resourceGroups/rg-batch/providers/Microsoft.Compute/virtualMachineScaleSets/batch"),
            "profiles": [{"name": "default", "capacity": {"minimum": "0", "maximum": "20", "default": "0"}}]
        }
    ])
}

fn subscriptions() -> Value {
    json!([
        {
            "id": "11111111-2222-3333-4444-555555555555",
            "name": "Contoso Production",
            "state": "Enabled",
            "isDefault": true,
            "tenantId": "99999999-8888-7777-6666-555555555555"
        },
        {
            "id": "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee",
            "name": "Contoso Sandbox",
            "state": "Disabled",
            "isDefault": false,
            "tenantId": "99999999-8888-7777-6666-555555555555"
        }
    ])
}

impl InventorySource for MockSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn list(&self, kind: ResourceKind) -> Result<Vec<InventoryRecord>> {
        let listing = match kind {
            ResourceKind::Plans => plans(),
            ResourceKind::WebApps => web_apps(),
            ResourceKind::FunctionApps => function_apps(),
            ResourceKind::Autoscale => autoscale_settings(),
            ResourceKind::Subscriptions => subscriptions(),
        };
        Ok(InventoryRecord::list_from_value(listing)?)
    }
}
