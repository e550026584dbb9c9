//! Construct names of generated resources.
//!
//! Resources declared in the topology keep their own names; everything the
//! builder adds on its own (associations, routes, NAT gateways, ...) is named
//! from the entries it belongs to. Logical ids are derived from these names.

use crate::topology::{RouteTarget, Topology};

/// Internet gateway attachment
pub const GATEWAY_ATTACHMENT: &str = "internet-gateway-attachment";

/// Name of the output exporting the VPC id
pub const VPC_ID_OUTPUT: &str = "VpcId";

/// Subnet/route-table association
pub fn association(subnet: &str, route_table: &str) -> String {
    format!("{subnet}-{route_table}")
}

/// The `index`-th route of a route table
pub fn route(route_table: &str, index: usize) -> String {
    format!("{route_table}-route-{index}")
}

/// Elastic IP backing the NAT gateway of a subnet
pub fn nat_eip(subnet: &str) -> String {
    format!("NATGatewayEIP-{subnet}")
}

/// NAT gateway placed in a subnet
pub fn nat_gateway(subnet: &str) -> String {
    format!("NATGateway-{subnet}")
}

/// Standalone ingress rule referencing another security group
pub fn group_ingress(group: &str, index: usize) -> String {
    format!("{group}-ingress-{index}")
}

/// Standalone egress rule referencing another security group
pub fn group_egress(group: &str, index: usize) -> String {
    format!("{group}-egress-{index}")
}

/// EC2 instance
pub fn instance(name: &str) -> String {
    format!("{name}-instance")
}

/// Output exporting the id of a named resource
pub fn id_output(name: &str) -> String {
    format!("{name}-id")
}

/// Every construct name the builder will create for a topology, in build
/// order. NAT gateways appear once per subnet no matter how many routes use
/// them.
pub fn construct_names(topology: &Topology) -> Vec<String> {
    let mut names = vec![
        topology.vpc.name.clone(),
        topology.internet_gateway.clone(),
        GATEWAY_ATTACHMENT.to_string(),
    ];

    names.extend(topology.route_tables.keys().cloned());

    names.extend(topology.security_groups.keys().cloned());
    for (name, group) in &topology.security_groups {
        for (index, rule) in group.security_group_ingress.iter().enumerate() {
            if rule.source_security_group.is_some() {
                names.push(group_ingress(name, index));
            }
        }
        for (index, rule) in group.security_group_egress.iter().enumerate() {
            if rule.source_security_group.is_some() {
                names.push(group_egress(name, index));
            }
        }
    }

    names.extend(topology.subnets.keys().cloned());
    for (name, subnet) in &topology.subnets {
        names.push(association(name, &subnet.route_table_id));
    }

    let mut nat_subnets: Vec<&str> = Vec::new();
    for (table, routes) in &topology.route_tables {
        for (index, spec) in routes.iter().enumerate() {
            if let RouteTarget::NatGateway { subnet_id } = &spec.target {
                if !nat_subnets.contains(&subnet_id.as_str()) {
                    nat_subnets.push(subnet_id);
                    names.push(nat_eip(subnet_id));
                    names.push(nat_gateway(subnet_id));
                }
            }
            names.push(route(table, index));
        }
    }

    for subnet in topology.subnets.values() {
        names.extend(subnet.instances.keys().map(|name| instance(name)));
    }

    names
}

/// Every output name the builder will export, in build order: the VPC id,
/// then each subnet, instance and NAT gateway id.
pub fn output_names(topology: &Topology) -> Vec<String> {
    let mut names = vec![VPC_ID_OUTPUT.to_string()];
    names.extend(topology.subnets.keys().map(|name| id_output(name)));
    for subnet in topology.subnets.values() {
        names.extend(subnet.instances.keys().map(|name| id_output(name)));
    }
    names.extend(
        topology
            .nat_subnets()
            .into_iter()
            .map(|subnet| id_output(&nat_gateway(subnet))),
    );
    names
}
