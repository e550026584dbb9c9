//! Init command
//!
//! Writes the built-in topology to disk as a starting point for a custom one.

use super::{CommandContext, Runnable};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use vpcsynth::topology::{Topology, TopologyFormat};

/// Arguments for the init command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// File to create
    #[arg(default_value = "topology.yml")]
    pub path: PathBuf,

    /// Document format (yaml, json or toml); defaults to the file extension
    #[arg(long, value_parser = parse_topology_format)]
    pub format: Option<TopologyFormat>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

fn parse_topology_format(name: &str) -> std::result::Result<TopologyFormat, String> {
    TopologyFormat::parse(name).ok_or_else(|| format!("unknown topology format '{}'", name))
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        if self.path.exists() && !self.force {
            ctx.output.error(&format!(
                "{} already exists (use --force to overwrite)",
                self.path.display()
            ));
            return Ok(1);
        }

        let format = self
            .format
            .unwrap_or_else(|| TopologyFormat::from_path(&self.path));

        // The shipped YAML keeps its comments; other formats are rendered.
        let content = match format {
            TopologyFormat::Yaml => Topology::builtin_source().to_string(),
            _ => Topology::builtin()?.render(format)?,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&self.path, content)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        ctx.output.success(&format!(
            "Created {} topology at {}",
            format.extension(),
            self.path.display()
        ));
        ctx.output.hint(&format!(
            "Run 'vpcsynth --topology {} synth' to build the template",
            self.path.display()
        ));

        Ok(0)
    }
}

#[async_trait::async_trait]
impl Runnable for InitArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
