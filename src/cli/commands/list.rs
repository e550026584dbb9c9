//! List command
//!
//! Lists the synthesized resources in declaration order.

use super::{CommandContext, Runnable};
use anyhow::Result;
use clap::Parser;
use serde::Serialize;

/// Arguments for the list command
#[derive(Parser, Debug, Clone)]
pub struct ListArgs {
    /// Only list resources of this type (e.g. AWS::EC2::Subnet)
    #[arg(long = "type")]
    pub resource_type: Option<String>,

    /// Also list stack outputs
    #[arg(long)]
    pub outputs: bool,
}

#[derive(Debug, Serialize)]
struct ResourceEntry<'a> {
    logical_id: &'a str,
    #[serde(rename = "type")]
    resource_type: &'a str,
    path: Option<&'a str>,
}

impl ListArgs {
    /// Execute the list command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let template = ctx.synthesize().await?;

        let entries: Vec<ResourceEntry<'_>> = template
            .resources
            .iter()
            .filter(|(_, r)| {
                self.resource_type
                    .as_deref()
                    .map_or(true, |t| r.resource_type == t)
            })
            .map(|(id, r)| ResourceEntry {
                logical_id: id,
                resource_type: &r.resource_type,
                path: r.path(),
            })
            .collect();

        if ctx.output.is_structured() {
            let outputs: Vec<&str> = if self.outputs {
                template.outputs.keys().map(String::as_str).collect()
            } else {
                Vec::new()
            };
            ctx.output.document(&serde_json::json!({
                "resources": entries,
                "outputs": outputs,
            }))?;
            return Ok(0);
        }

        ctx.output
            .section(&format!("Resources ({})", entries.len()));
        let id_width = entries.iter().map(|e| e.logical_id.len()).max().unwrap_or(0);
        let type_width = entries
            .iter()
            .map(|e| e.resource_type.len())
            .max()
            .unwrap_or(0);
        for entry in &entries {
            ctx.output.line(&format!(
                "{:<id_width$}  {:<type_width$}  {}",
                entry.logical_id,
                entry.resource_type,
                entry.path.unwrap_or("-"),
            ));
        }

        if self.outputs {
            ctx.output
                .section(&format!("Outputs ({})", template.outputs.len()));
            for id in template.outputs.keys() {
                ctx.output.line(id);
            }
        }

        Ok(0)
    }
}

#[async_trait::async_trait]
impl Runnable for ListArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
