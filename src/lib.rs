//! # vpcsynth - VPC topology to CloudFormation synthesizer
//!
//! vpcsynth expands a declarative network topology (one VPC with its subnets,
//! route tables, NAT gateways, security groups and instances) into a
//! CloudFormation template. Synthesis is a single synchronous pass: the
//! topology is validated, resources are created in a fixed order, and the
//! resulting template is rendered as JSON or YAML.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        CLI Interface                         │
//! │     synth / validate / graph / list / diff / init (clap)     │
//! └──────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//! ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐
//! │    Topology     │──▶│    Validate     │──▶│   Stack Builder │
//! │ (YAML/JSON/TOML)│   │ (issues, CIDRs) │   │ (ordered build) │
//! └─────────────────┘   └─────────────────┘   └─────────────────┘
//!                                                      │
//!                                                      ▼
//! ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐
//! │   Graph (DAG)   │◀──│    Template     │──▶│      Diff       │
//! │ order / cycles  │   │ (JSON / YAML)   │   │ (vs. existing)  │
//! └─────────────────┘   └─────────────────┘   └─────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use vpcsynth::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let topology = Topology::builtin()?;
//!     let template = VpcStack::synthesize(&topology)?;
//!
//!     let graph = DependencyGraph::from_template(&template)?;
//!     println!("{:?}", graph.deployment_order()?);
//!
//!     println!("{}", template.render(TemplateFormat::Yaml)?);
//!     Ok(())
//! }
//! ```

// Re-export commonly used items in prelude
pub mod prelude {
    //! Commonly used types for synthesizing templates.
    //!
    //! ```rust
    //! use vpcsynth::prelude::*;
    //! ```

    pub use crate::config::Config;
    pub use crate::diff::{render_text_diff, DiffOptions, TemplateDiff};
    pub use crate::error::{Error, ErrorContext, Result};
    pub use crate::graph::DependencyGraph;
    pub use crate::stack::VpcStack;
    pub use crate::template::{Output, Resource, Template, TemplateFormat};
    pub use crate::topology::{Topology, TopologyFormat};
    pub use crate::validate::{validate, Issue, ValidationReport};
}

/// Error types and the crate-wide `Result` alias.
pub mod error;

/// Topology document model and loading.
pub mod topology;

/// Topology validation producing errors and warnings.
pub mod validate;

/// CloudFormation template model and rendering.
pub mod template;

/// Ordered construction of the VPC resources.
pub mod stack;

/// Resource dependency graph.
pub mod graph;

/// Comparison against existing templates.
pub mod diff;

/// Layered configuration.
pub mod config;

pub use error::{Error, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
