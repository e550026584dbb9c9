//! Typed entries of the topology tables.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use validator::Validate;

fn default_vpc_cidr() -> String {
    "10.0.0.0/16".to_string()
}

fn default_true() -> bool {
    true
}

fn default_tenancy() -> String {
    "default".to_string()
}

/// Stack-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StackSettings {
    /// Stack name, used for export names and construct paths
    #[validate(length(min = 1, message = "stack name must not be empty"))]
    pub name: String,

    /// Target region
    #[validate(length(min = 1, message = "region must not be empty"))]
    pub region: String,

    /// Template description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The VPC itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct VpcSpec {
    /// Construct name of the VPC
    #[validate(length(min = 1, message = "vpc name must not be empty"))]
    pub name: String,

    /// IPv4 block of the VPC
    #[serde(default = "default_vpc_cidr")]
    pub cidr_block: String,

    /// Enable the Amazon DNS server
    #[serde(default = "default_true")]
    pub enable_dns_support: bool,

    /// Assign public DNS hostnames to instances
    #[serde(default = "default_true")]
    pub enable_dns_hostnames: bool,

    /// Instance tenancy: default or dedicated
    #[serde(default = "default_tenancy")]
    pub instance_tenancy: String,
}

/// A `Key`/`Value` tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Tag {
    #[validate(length(min = 1, max = 128, message = "tag key must be 1-128 characters"))]
    pub key: String,
    #[validate(length(max = 256, message = "tag value must be at most 256 characters"))]
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Shorthand for a `Name` tag
    pub fn name(value: impl Into<String>) -> Self {
        Self::new("Name", value)
    }
}

/// Where a route sends its traffic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "router_type", rename_all = "snake_case")]
pub enum RouteTarget {
    /// The internet gateway named by `gateway_id`
    #[serde(alias = "GATEWAY")]
    Gateway { gateway_id: String },

    /// A NAT gateway created in the subnet named by `subnet_id`
    #[serde(alias = "NAT_GATEWAY")]
    NatGateway { subnet_id: String },
}

impl RouteTarget {
    /// Router type as written in the topology
    pub fn router_type(&self) -> &'static str {
        match self {
            RouteTarget::Gateway { .. } => "gateway",
            RouteTarget::NatGateway { .. } => "nat_gateway",
        }
    }
}

/// One entry of a route table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub destination_cidr_block: String,

    #[serde(flatten)]
    pub target: RouteTarget,
}

/// An ingress or egress rule of a security group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct IngressRule {
    /// tcp, udp, icmp, icmpv6, -1 or a protocol number
    #[validate(length(min = 1, message = "ip_protocol must not be empty"))]
    pub ip_protocol: String,

    #[validate(range(min = -1, max = 65535, message = "from_port must be within -1..=65535"))]
    pub from_port: i32,

    #[validate(range(min = -1, max = 65535, message = "to_port must be within -1..=65535"))]
    pub to_port: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr_ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr_ipv6: Option<String>,

    /// Logical name of another security group in the topology
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_security_group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl IngressRule {
    /// Number of traffic sources set on this rule
    pub fn source_count(&self) -> usize {
        [
            self.cidr_ip.is_some(),
            self.cidr_ipv6.is_some(),
            self.source_security_group.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

/// A security group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SecurityGroupSpec {
    #[validate(length(min = 1, max = 255, message = "group_description must be 1-255 characters"))]
    pub group_description: String,

    /// Defaults to the logical name of the group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,

    #[serde(default)]
    #[validate(nested)]
    pub security_group_ingress: Vec<IngressRule>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[validate(nested)]
    pub security_group_egress: Vec<IngressRule>,

    #[serde(default)]
    #[validate(nested)]
    pub tags: Vec<Tag>,
}

/// An EC2 instance placed in a subnet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct InstanceSpec {
    #[validate(length(min = 1, message = "image_id must not be empty"))]
    pub image_id: String,

    #[validate(length(min = 1, message = "instance_type must not be empty"))]
    pub instance_type: String,

    /// Falls back to the topology's `key_pair_name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,

    #[serde(default)]
    pub disable_api_termination: bool,

    /// Logical names of security groups in the topology
    #[serde(default)]
    pub security_group_ids: Vec<String>,

    /// Plain-text user data, base64 encoded in the template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,

    #[serde(default)]
    #[validate(nested)]
    pub tags: Vec<Tag>,
}

/// A subnet and the instances it hosts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SubnetSpec {
    #[validate(length(min = 1, message = "availability_zone must not be empty"))]
    pub availability_zone: String,

    pub cidr_block: String,

    #[serde(default)]
    pub map_public_ip_on_launch: bool,

    /// Logical name of the route table associated with this subnet
    #[validate(length(min = 1, message = "route_table_id must not be empty"))]
    pub route_table_id: String,

    #[serde(default)]
    pub instances: IndexMap<String, InstanceSpec>,
}
