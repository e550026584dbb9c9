//! CLI module for vpcsynth
//!
//! This module provides the command-line interface for vpcsynth,
//! including argument parsing and subcommand handling.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// vpcsynth - synthesize a CloudFormation template from a VPC topology
///
/// Without `--topology` the built-in topology is used.
#[derive(Parser, Debug, Clone)]
#[command(name = "vpcsynth")]
#[command(version)]
#[command(about = "Synthesize a CloudFormation template from a VPC topology", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Topology document (YAML, JSON or TOML)
    #[arg(short = 't', long, global = true, env = "VPCSYNTH_TOPOLOGY")]
    pub topology: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "VPCSYNTH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Override the stack name
    #[arg(long, global = true)]
    pub stack_name: Option<String>,

    /// Override the region
    #[arg(long, global = true)]
    pub region: Option<String>,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
    /// YAML output
    Yaml,
    /// Minimal output (only errors)
    Minimal,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Validate the topology and write the CloudFormation template
    Synth(commands::synth::SynthArgs),

    /// Validate the topology and report errors and warnings
    Validate(commands::validate::ValidateArgs),

    /// Show the resource dependency graph
    Graph(commands::graph::GraphArgs),

    /// List the resources the topology synthesizes to
    List(commands::list::ListArgs),

    /// Compare the synthesized template with an existing one
    Diff(commands::diff::DiffArgs),

    /// Write the built-in topology as a starting document
    Init(commands::init::InitArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["vpcsynth", "synth"]).unwrap();
        assert!(matches!(cli.command, Commands::Synth(_)));
        assert!(cli.topology.is_none());
        assert_eq!(cli.output, OutputFormat::Human);
    }

    #[test]
    fn test_verbosity() {
        let cli = Cli::try_parse_from(["vpcsynth", "-vvvvv", "validate"]).unwrap();
        assert_eq!(cli.verbosity(), 3);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "vpcsynth",
            "list",
            "--topology",
            "net.yml",
            "--stack-name",
            "edge",
            "--output",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.topology, Some(PathBuf::from("net.yml")));
        assert_eq!(cli.stack_name.as_deref(), Some("edge"));
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_diff_requires_existing_template() {
        assert!(Cli::try_parse_from(["vpcsynth", "diff"]).is_err());
    }
}
