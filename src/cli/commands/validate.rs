//! Validate command
//!
//! Reports every error and warning found in the topology without building it.

use super::{CommandContext, Runnable};
use anyhow::Result;
use clap::Parser;
use vpcsynth::validate::validate;

/// Arguments for the validate command
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

impl ValidateArgs {
    /// Execute the validate command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let topology = ctx.load_topology().await?;

        ctx.output.banner("TOPOLOGY VALIDATION");
        ctx.output.info(&format!(
            "Validating stack '{}' in {}",
            topology.stack.name, topology.stack.region
        ));

        let report = validate(&topology);
        let failed = !report.is_valid() || (self.strict && !report.warnings.is_empty());

        if ctx.output.is_structured() {
            ctx.output.document(&serde_json::json!({
                "stack": topology.stack.name,
                "valid": !failed,
                "errors": report.errors,
                "warnings": report.warnings,
            }))?;
            return Ok(i32::from(failed));
        }

        ctx.output.issues(&report.errors, &report.warnings);

        ctx.output.section("Summary");
        ctx.output.table(&[
            ("Subnets".to_string(), topology.subnets.len().to_string()),
            (
                "Route tables".to_string(),
                topology.route_tables.len().to_string(),
            ),
            (
                "Security groups".to_string(),
                topology.security_groups.len().to_string(),
            ),
            ("Instances".to_string(), topology.instance_count().to_string()),
            ("Errors".to_string(), report.errors.len().to_string()),
            ("Warnings".to_string(), report.warnings.len().to_string()),
        ]);

        if failed {
            ctx.output.error(&format!(
                "Topology is invalid: {} error(s), {} warning(s)",
                report.errors.len(),
                report.warnings.len()
            ));
            Ok(1)
        } else {
            ctx.output.success("Topology is valid");
            Ok(0)
        }
    }
}

#[async_trait::async_trait]
impl Runnable for ValidateArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
