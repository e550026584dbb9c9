//! Shared test utilities and fixtures for the vpcsynth test suite.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

use vpcsynth::template::Template;
use vpcsynth::topology::{Topology, TopologyFormat};
use vpcsynth::stack::VpcStack;

/// A small two-subnet topology in eu-west-1, with a NAT gateway shared by
/// two private route tables.
pub const SMALL_TOPOLOGY: &str = r##"
stack:
  name: edge
  region: eu-west-1
vpc:
  name: edge-vpc
  cidr_block: 172.16.0.0/16
internet_gateway: edge-igw
route_tables:
  public-rtb:
    - destination_cidr_block: 0.0.0.0/0
      router_type: gateway
      gateway_id: edge-igw
  private-a-rtb:
    - destination_cidr_block: 0.0.0.0/0
      router_type: nat_gateway
      subnet_id: public-subnet
  private-b-rtb:
    - destination_cidr_block: 0.0.0.0/0
      router_type: nat_gateway
      subnet_id: public-subnet
security_groups:
  app-sg:
    group_description: app servers
    security_group_ingress:
      - { ip_protocol: tcp, cidr_ip: 172.16.0.0/16, from_port: 8080, to_port: 8080 }
subnets:
  public-subnet:
    availability_zone: eu-west-1a
    cidr_block: 172.16.1.0/24
    map_public_ip_on_launch: true
    route_table_id: public-rtb
  private-a-subnet:
    availability_zone: eu-west-1a
    cidr_block: 172.16.2.0/24
    route_table_id: private-a-rtb
    instances:
      app:
        image_id: ami-0123456789abcdef0
        instance_type: t3.small
        key_name: edge-key
        security_group_ids: [app-sg]
        user_data: "#!/bin/sh\necho hello"
  private-b-subnet:
    availability_zone: eu-west-1b
    cidr_block: 172.16.3.0/24
    route_table_id: private-b-rtb
"##;

/// A topology with overlapping subnets, a subnet outside the VPC and a
/// route through an undeclared gateway.
pub const BROKEN_TOPOLOGY: &str = r#"
stack:
  name: broken
  region: us-east-1
vpc:
  name: broken-vpc
  cidr_block: 10.0.0.0/16
internet_gateway: broken-igw
route_tables:
  rtb:
    - destination_cidr_block: 0.0.0.0/0
      router_type: gateway
      gateway_id: some-other-igw
subnets:
  a:
    availability_zone: us-east-1a
    cidr_block: 10.0.1.0/24
    route_table_id: rtb
  b:
    availability_zone: us-east-1a
    cidr_block: 10.0.1.128/25
    route_table_id: rtb
  c:
    availability_zone: us-east-1b
    cidr_block: 192.168.0.0/24
    route_table_id: rtb
"#;

/// Parse the small fixture topology
pub fn small_topology() -> Topology {
    Topology::parse(SMALL_TOPOLOGY, TopologyFormat::Yaml).expect("small topology parses")
}

/// Synthesize the built-in topology
pub fn builtin_template() -> Template {
    let topology = Topology::builtin().expect("builtin topology parses");
    VpcStack::synthesize(&topology).expect("builtin topology synthesizes")
}

/// Temporary directory holding test files
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Write a file relative to the directory and return its full path
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, content).expect("write test file");
        path
    }
}
