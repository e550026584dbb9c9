//! Graph command
//!
//! Prints the deployment order of the synthesized resources together with
//! their direct dependencies, or the whole graph in Graphviz DOT.

use super::{CommandContext, Runnable};
use anyhow::Result;
use clap::Parser;
use vpcsynth::graph::DependencyGraph;

/// Arguments for the graph command
#[derive(Parser, Debug, Clone)]
pub struct GraphArgs {
    /// Emit Graphviz DOT instead of the deployment order
    #[arg(long)]
    pub dot: bool,
}

impl GraphArgs {
    /// Execute the graph command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let template = ctx.synthesize().await?;
        let graph = DependencyGraph::from_template(&template)?;

        if self.dot {
            print!("{}", graph.to_dot());
            return Ok(0);
        }

        let order = graph.deployment_order()?;

        if ctx.output.is_structured() {
            let entries: Vec<_> = order
                .iter()
                .map(|id| {
                    serde_json::json!({
                        "logical_id": id,
                        "type": graph.get_node(id).map(|n| n.resource_type.as_str()),
                        "depends_on": graph.direct_dependencies(id),
                    })
                })
                .collect();
            ctx.output.document(&entries)?;
            return Ok(0);
        }

        ctx.output.section(&format!(
            "Deployment order ({} resources, {} dependencies)",
            graph.node_count(),
            graph.edge_count()
        ));

        for (position, id) in order.iter().enumerate() {
            let resource_type = graph
                .get_node(id)
                .map(|n| n.resource_type.as_str())
                .unwrap_or("?");
            let deps = graph.direct_dependencies(id);
            let line = if deps.is_empty() {
                format!("{:>3}. {} ({})", position + 1, id, resource_type)
            } else {
                format!(
                    "{:>3}. {} ({}) <- {}",
                    position + 1,
                    id,
                    resource_type,
                    deps.join(", ")
                )
            };
            ctx.output.line(&line);
        }

        Ok(0)
    }
}

#[async_trait::async_trait]
impl Runnable for GraphArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
