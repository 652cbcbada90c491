use anyhow::{bail, Context, Result};
use std::process::Command;
use tracing::{debug, info};

use crate::inventory_core::{InventoryRecord, InventorySource, ResourceKind};

/// Lists resources by shelling out to the cloud CLI with JSON output.
pub struct AzCliSource {
    program: String,
    subscription: Option<String>,
}

impl AzCliSource {
    pub fn new(program: &str, subscription: Option<String>) -> Self {
        Self {
            program: program.to_string(),
            subscription,
        }
    }

    fn command_for(kind: ResourceKind) -> &'static [&'static str] {
        match kind {
            ResourceKind::Plans => &["appservice", "plan", "list"],
            ResourceKind::WebApps => &["webapp", "list"],
            ResourceKind::FunctionApps => &["functionapp", "list"],
            ResourceKind::Autoscale => &["monitor", "autoscale", "list"],
            ResourceKind::Subscriptions => &["account", "list"],
        }
    }

    pub fn args_for(&self, kind: ResourceKind) -> Vec<String> {
        let mut args: Vec<String> = Self::command_for(kind).iter().map(|s| s.to_string()).collect();
        // `account list` spans every subscription the login can see
        if kind != ResourceKind::Subscriptions {
            if let Some(sub) = &self.subscription {
                args.push("--subscription".into());
                args.push(sub.clone());
            }
        }
        args.push("--output".into());
        args.push("json".into());
        args
    }
}

/// Turns the CLI's stdout into records. Some list commands print nothing at
/// all when there is nothing to list.
pub(crate) fn parse_listing(stdout: &[u8]) -> Result<Vec<InventoryRecord>> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(vec![]);
    }
    let value: serde_json::Value = serde_json::from_slice(stdout).context("CLI output is not JSON")?;
    Ok(InventoryRecord::list_from_value(value)?)
}

impl InventorySource for AzCliSource {
    fn name(&self) -> &'static str {
        "az-cli"
    }

    fn list(&self, kind: ResourceKind) -> Result<Vec<InventoryRecord>> {
        let args = self.args_for(kind);
        debug!(program = %self.program, ?args, "running CLI");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .with_context(|| format!("failed to start `{}`", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "`{} {}` failed ({}): {}",
                self.program,
                args.join(" "),
                output.status,
                stderr.trim()
            );
        }

        let records = parse_listing(&output.stdout)
            .with_context(|| format!("unexpected output from `{} {}`", self.program, args.join(" ")))?;
        info!(kind = %kind, count = records.len(), "listed resources");
        Ok(records)
    }
}
