//! Subcommands module for vpcsynth CLI
//!
//! This module contains all the subcommand implementations.

pub mod diff;
pub mod graph;
pub mod init;
pub mod list;
pub mod synth;
pub mod validate;

use crate::cli::output::OutputFormatter;
use anyhow::Result;
use std::path::PathBuf;
use vpcsynth::config::Config;
use vpcsynth::stack::VpcStack;
use vpcsynth::template::{Template, TemplateFormat};
use vpcsynth::topology::Topology;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Topology path from the command line
    pub topology_path: Option<PathBuf>,
    /// Stack name override from the command line
    pub stack_name: Option<String>,
    /// Region override from the command line
    pub region: Option<String>,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Self {
        let use_color = !cli.no_color && config.colors_enabled();
        let output = OutputFormatter::new(use_color, cli.output, cli.verbosity());

        Self {
            config,
            output,
            topology_path: cli.topology.clone(),
            stack_name: cli.stack_name.clone(),
            region: cli.region.clone(),
        }
    }

    /// Get the effective topology path, if any
    pub fn topology(&self) -> Option<&PathBuf> {
        self.topology_path
            .as_ref()
            .or(self.config.defaults.topology.as_ref())
    }

    /// Load the topology (file or built-in) with command-line and config
    /// overrides applied
    pub async fn load_topology(&self) -> Result<Topology> {
        let topology = match self.topology() {
            Some(path) => {
                self.output
                    .debug(&format!("Loading topology: {}", path.display()));
                Topology::from_file(path).await?
            }
            None => {
                self.output.debug("Using built-in topology");
                Topology::builtin()?
            }
        };

        let stack_name = self
            .stack_name
            .as_deref()
            .or(self.config.defaults.stack_name.as_deref());
        let region = self
            .region
            .as_deref()
            .or(self.config.defaults.region.as_deref());

        let mut topology = topology.with_overrides(stack_name, region);
        if let Some(description) = &self.config.defaults.description {
            topology.stack.description = Some(description.clone());
        }

        Ok(topology)
    }

    /// Load the topology and synthesize it into a template
    pub async fn synthesize(&self) -> Result<Template> {
        let topology = self.load_topology().await?;
        let template = VpcStack::synthesize(&topology)?;
        Ok(template)
    }

    /// Template format requested by flag, falling back to configuration
    pub fn template_format(&self, flag: Option<TemplateFormat>) -> TemplateFormat {
        flag.unwrap_or_else(|| self.config.template_format())
    }
}

/// clap value parser for `--format`
pub fn parse_template_format(name: &str) -> std::result::Result<TemplateFormat, String> {
    TemplateFormat::parse(name).ok_or_else(|| format!("unknown template format '{}'", name))
}

/// Trait for runnable commands
#[async_trait::async_trait]
pub trait Runnable {
    /// Execute the command
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32>;
}
