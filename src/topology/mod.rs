//! Declarative network topology.
//!
//! A topology is the configuration table the stack is built from: the VPC,
//! its internet gateway, route tables with their routes, security groups and
//! subnets with the instances they host. Entries reference each other by
//! name; the [`stack`](crate::stack) builder turns those names into
//! CloudFormation references.
//!
//! Tables are kept in declaration order so the synthesized template follows
//! the document.
//!
//! ```yaml
//! stack: { name: demo, region: eu-west-1 }
//! vpc: { name: demo-vpc, cidr_block: 10.0.0.0/16 }
//! internet_gateway: demo-igw
//! route_tables:
//!   demo-public-rtb:
//!     - { destination_cidr_block: 0.0.0.0/0, router_type: gateway, gateway_id: demo-igw }
//! security_groups: {}
//! subnets:
//!   demo-public:
//!     availability_zone: eu-west-1a
//!     cidr_block: 10.0.1.0/24
//!     route_table_id: demo-public-rtb
//! ```

mod types;

pub use types::{
    IngressRule, InstanceSpec, RouteSpec, RouteTarget, SecurityGroupSpec, StackSettings,
    SubnetSpec, Tag, VpcSpec,
};

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Topology document shipped with the binary
const BUILTIN_TOPOLOGY: &str = include_str!("builtin.yml");

/// On-disk format of a topology document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopologyFormat {
    #[default]
    Yaml,
    Json,
    Toml,
}

impl TopologyFormat {
    /// Pick the format from a file extension; unknown extensions read as YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
            "json" => TopologyFormat::Json,
            "toml" => TopologyFormat::Toml,
            _ => TopologyFormat::Yaml,
        }
    }

    /// Parse a format name as given on the command line
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(TopologyFormat::Yaml),
            "json" => Some(TopologyFormat::Json),
            "toml" => Some(TopologyFormat::Toml),
            _ => None,
        }
    }

    /// Conventional file extension
    pub fn extension(self) -> &'static str {
        match self {
            TopologyFormat::Yaml => "yml",
            TopologyFormat::Json => "json",
            TopologyFormat::Toml => "toml",
        }
    }
}

/// The full network topology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub stack: StackSettings,

    pub vpc: VpcSpec,

    /// Construct name of the internet gateway
    pub internet_gateway: String,

    /// Default key pair for instances without their own `key_name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_pair_name: Option<String>,

    /// Route table name -> routes
    #[serde(default)]
    pub route_tables: IndexMap<String, Vec<RouteSpec>>,

    /// Security group name -> group
    #[serde(default)]
    pub security_groups: IndexMap<String, SecurityGroupSpec>,

    /// Subnet name -> subnet
    #[serde(default)]
    pub subnets: IndexMap<String, SubnetSpec>,
}

impl Topology {
    /// The topology shipped with vpcsynth
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_TOPOLOGY, TopologyFormat::Yaml)
    }

    /// Raw text of the built-in topology
    pub fn builtin_source() -> &'static str {
        BUILTIN_TOPOLOGY
    }

    /// Load a topology document from disk
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::TopologyNotFound(path.to_path_buf()));
        }

        let content = tokio::fs::read_to_string(path).await?;
        let format = TopologyFormat::from_path(path);
        tracing::debug!("Loading topology from {} as {:?}", path.display(), format);

        Self::parse(&content, format).map_err(|e| {
            let message = e.to_string();
            Error::topology_parse(path, message, Some(Box::new(e)))
        })
    }

    /// Parse a topology document
    pub fn parse(content: &str, format: TopologyFormat) -> Result<Self> {
        let topology = match format {
            TopologyFormat::Yaml => serde_yaml::from_str(content)?,
            TopologyFormat::Json => serde_json::from_str(content)?,
            TopologyFormat::Toml => toml::from_str(content)?,
        };
        Ok(topology)
    }

    /// Serialize the topology
    pub fn render(&self, format: TopologyFormat) -> Result<String> {
        Ok(match format {
            TopologyFormat::Yaml => serde_yaml::to_string(self)?,
            TopologyFormat::Json => serde_json::to_string_pretty(self)?,
            TopologyFormat::Toml => toml::to_string_pretty(self)?,
        })
    }

    /// Apply command-line or configuration overrides to the stack settings
    pub fn with_overrides(mut self, stack_name: Option<&str>, region: Option<&str>) -> Self {
        if let Some(name) = stack_name {
            self.stack.name = name.to_string();
        }
        if let Some(region) = region {
            self.stack.region = region.to_string();
        }
        self
    }

    /// Total number of instances across all subnets
    pub fn instance_count(&self) -> usize {
        self.subnets.values().map(|s| s.instances.len()).sum()
    }

    /// Subnets that host a NAT gateway, in first-use order without duplicates
    pub fn nat_subnets(&self) -> Vec<&str> {
        let mut subnets: Vec<&str> = Vec::new();
        for routes in self.route_tables.values() {
            for route in routes {
                if let RouteTarget::NatGateway { subnet_id } = &route.target {
                    if !subnets.contains(&subnet_id.as_str()) {
                        subnets.push(subnet_id);
                    }
                }
            }
        }
        subnets
    }

    /// Key pair an instance launches with
    pub fn key_name_for<'a>(&'a self, instance: &'a InstanceSpec) -> Option<&'a str> {
        instance
            .key_name
            .as_deref()
            .or(self.key_pair_name.as_deref())
    }

    /// Whether a route table sends traffic to the internet gateway
    pub fn routes_to_internet(&self, route_table: &str) -> bool {
        self.route_tables.get(route_table).is_some_and(|routes| {
            routes
                .iter()
                .any(|r| matches!(r.target, RouteTarget::Gateway { .. }))
        })
    }
}
