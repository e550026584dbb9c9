//! Topology validation.
//!
//! Everything the builder relies on is checked here so synthesis itself can
//! treat a lookup miss as a bug in the input rather than guess:
//!
//! - field constraints declared with `validator` on the topology types
//! - CIDR syntax and containment (subnets inside the VPC, no overlaps)
//! - name references between tables (route tables, subnets, security groups,
//!   the internet gateway)
//! - security group rule shape (one source, ordered ports, known protocol)
//! - uniqueness of the generated CloudFormation logical ids
//!
//! Problems that still produce a deployable template are reported as
//! warnings.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::IpAddr;

use ipnet::{IpNet, Ipv4Net};
use serde::Serialize;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::{Error, Result};
use crate::stack::naming;
use crate::template::logical_id;
use crate::topology::{IngressRule, RouteTarget, Topology};

/// A single finding, located by a dotted path into the topology
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub path: String,
    pub message: String,
}

impl Issue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Outcome of validating a topology
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(Issue::new(path, message));
    }

    fn warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(Issue::new(path, message));
    }

    /// Turn a report with errors into [`Error::Validation`]
    pub fn into_result(self) -> Result<Vec<Issue>> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(Error::Validation(self.errors))
        }
    }
}

/// Validate a topology
pub fn validate(topology: &Topology) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_fields(topology, &mut report);
    let vpc_net = check_vpc(topology, &mut report);
    check_subnets(topology, vpc_net, &mut report);
    check_route_tables(topology, &mut report);
    check_security_groups(topology, &mut report);
    check_instances(topology, &mut report);
    check_logical_ids(topology, &mut report);

    for warning in &report.warnings {
        tracing::warn!("{}", warning);
    }
    tracing::debug!(
        "Validation finished: {} error(s), {} warning(s)",
        report.errors.len(),
        report.warnings.len()
    );

    report
}

// ============================================================================
// Field constraints
// ============================================================================

fn check_fields(topology: &Topology, report: &mut ValidationReport) {
    collect(&topology.stack.validate(), "stack", report);
    collect(&topology.vpc.validate(), "vpc", report);

    if topology.internet_gateway.trim().is_empty() {
        report.error("internet_gateway", "internet gateway name must not be empty");
    }

    for (name, group) in &topology.security_groups {
        collect(&group.validate(), &format!("security_groups.{name}"), report);
    }
    for (name, subnet) in &topology.subnets {
        let path = format!("subnets.{name}");
        collect(&subnet.validate(), &path, report);
        for (instance_name, instance) in &subnet.instances {
            collect(
                &instance.validate(),
                &format!("{path}.instances.{instance_name}"),
                report,
            );
        }
    }
}

fn collect(
    result: &std::result::Result<(), ValidationErrors>,
    path: &str,
    report: &mut ValidationReport,
) {
    if let Err(errors) = result {
        flatten_errors(errors, path, report);
    }
}

fn flatten_errors(errors: &ValidationErrors, path: &str, report: &mut ValidationReport) {
    for (field, kind) in errors.errors() {
        let field_path = format!("{path}.{field}");
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map_or_else(|| error.code.to_string(), ToString::to_string);
                    report.error(field_path.clone(), message);
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten_errors(inner, &field_path, report),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_errors(inner, &format!("{field_path}[{index}]"), report);
                }
            }
        }
    }
}

// ============================================================================
// Addressing
// ============================================================================

fn check_vpc(topology: &Topology, report: &mut ValidationReport) -> Option<Ipv4Net> {
    match topology.vpc.cidr_block.parse::<Ipv4Net>() {
        Ok(net) => {
            if !(16..=28).contains(&net.prefix_len()) {
                report.error(
                    "vpc.cidr_block",
                    format!("VPC block {net} must have a prefix between /16 and /28"),
                );
            }
            if net.network() != net.addr() {
                report.warning(
                    "vpc.cidr_block",
                    format!("{net} has host bits set; the network is {}", net.trunc()),
                );
            }
            Some(net.trunc())
        }
        Err(_) => {
            report.error(
                "vpc.cidr_block",
                format!("'{}' is not an IPv4 CIDR block", topology.vpc.cidr_block),
            );
            None
        }
    }
}

fn check_subnets(topology: &Topology, vpc_net: Option<Ipv4Net>, report: &mut ValidationReport) {
    let mut parsed: Vec<(&str, Ipv4Net)> = Vec::new();

    for (name, subnet) in &topology.subnets {
        let path = format!("subnets.{name}");

        match subnet.cidr_block.parse::<Ipv4Net>() {
            Ok(net) => {
                if let Some(vpc) = vpc_net {
                    if !vpc.contains(&net) {
                        report.error(
                            format!("{path}.cidr_block"),
                            format!("{net} is outside the VPC block {vpc}"),
                        );
                    }
                }
                for (other, other_net) in &parsed {
                    if blocks_overlap(&net, other_net) {
                        report.error(
                            format!("{path}.cidr_block"),
                            format!("{net} overlaps subnet '{other}' ({other_net})"),
                        );
                    }
                }
                parsed.push((name.as_str(), net.trunc()));
            }
            Err(_) => report.error(
                format!("{path}.cidr_block"),
                format!("'{}' is not an IPv4 CIDR block", subnet.cidr_block),
            ),
        }

        if !subnet.availability_zone.starts_with(&topology.stack.region) {
            report.warning(
                format!("{path}.availability_zone"),
                format!(
                    "'{}' is not in region '{}'",
                    subnet.availability_zone, topology.stack.region
                ),
            );
        }

        if !topology.route_tables.contains_key(&subnet.route_table_id) {
            report.error(
                format!("{path}.route_table_id"),
                format!("unknown route table '{}'", subnet.route_table_id),
            );
        }
    }
}

fn blocks_overlap(a: &Ipv4Net, b: &Ipv4Net) -> bool {
    a.contains(&b.network()) || b.contains(&a.network())
}

fn check_route_tables(topology: &Topology, report: &mut ValidationReport) {
    let associated: HashSet<&str> = topology
        .subnets
        .values()
        .map(|s| s.route_table_id.as_str())
        .collect();

    for (table, routes) in &topology.route_tables {
        let path = format!("route_tables.{table}");

        if !associated.contains(table.as_str()) {
            report.warning(path.clone(), "route table is not associated with any subnet");
        }

        let mut destinations: HashMap<IpNet, usize> = HashMap::new();
        for (index, route) in routes.iter().enumerate() {
            let route_path = format!("{path}[{index}]");

            match route.destination_cidr_block.parse::<IpNet>() {
                Ok(dest) => {
                    if let Some(first) = destinations.insert(dest.trunc(), index) {
                        report.error(
                            format!("{route_path}.destination_cidr_block"),
                            format!("destination {dest} is already routed by entry {first}"),
                        );
                    }
                }
                Err(_) => report.error(
                    format!("{route_path}.destination_cidr_block"),
                    format!("'{}' is not a CIDR block", route.destination_cidr_block),
                ),
            }

            match &route.target {
                RouteTarget::Gateway { gateway_id } => {
                    if *gateway_id != topology.internet_gateway {
                        report.error(
                            format!("{route_path}.gateway_id"),
                            format!(
                                "unknown gateway '{gateway_id}' (the internet gateway is '{}')",
                                topology.internet_gateway
                            ),
                        );
                    }
                }
                RouteTarget::NatGateway { subnet_id } => {
                    match topology.subnets.get(subnet_id) {
                        None => report.error(
                            format!("{route_path}.subnet_id"),
                            format!("unknown subnet '{subnet_id}'"),
                        ),
                        Some(subnet) => {
                            if !topology.routes_to_internet(&subnet.route_table_id) {
                                report.warning(
                                    format!("{route_path}.subnet_id"),
                                    format!(
                                        "NAT gateway subnet '{subnet_id}' has no route to the internet gateway"
                                    ),
                                );
                            }
                            if subnet.route_table_id == *table {
                                report.warning(
                                    format!("{route_path}.subnet_id"),
                                    format!(
                                        "subnet '{subnet_id}' routes through its own NAT gateway"
                                    ),
                                );
                            }
                        }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Security groups and instances
// ============================================================================

const KNOWN_PROTOCOLS: &[&str] = &["tcp", "udp", "icmp", "icmpv6", "-1"];

fn check_rule(
    topology: &Topology,
    rule: &IngressRule,
    path: &str,
    report: &mut ValidationReport,
) {
    let protocol = rule.ip_protocol.to_ascii_lowercase();
    let numeric = protocol.parse::<u8>().is_ok();
    if !KNOWN_PROTOCOLS.contains(&protocol.as_str()) && !numeric {
        report.error(
            format!("{path}.ip_protocol"),
            format!("unknown protocol '{}'", rule.ip_protocol),
        );
    }

    if protocol != "-1" {
        for (field, port) in [("from_port", rule.from_port), ("to_port", rule.to_port)] {
            if port < 0 {
                report.error(
                    format!("{path}.{field}"),
                    format!("{field} {port} is only allowed with ip_protocol -1"),
                );
            }
        }
    }

    if protocol != "-1" && rule.from_port > rule.to_port {
        report.error(
            path.to_string(),
            format!(
                "from_port {} is greater than to_port {}",
                rule.from_port, rule.to_port
            ),
        );
    }

    match rule.source_count() {
        1 => {}
        0 => report.error(
            path.to_string(),
            "rule needs one of cidr_ip, cidr_ipv6 or source_security_group",
        ),
        _ => report.error(
            path.to_string(),
            "rule must set only one of cidr_ip, cidr_ipv6 or source_security_group",
        ),
    }

    if let Some(cidr) = &rule.cidr_ip {
        if cidr.parse::<Ipv4Net>().is_err() {
            report.error(
                format!("{path}.cidr_ip"),
                format!("'{cidr}' is not an IPv4 CIDR block"),
            );
        }
    }
    if let Some(cidr) = &rule.cidr_ipv6 {
        let is_v6 = matches!(cidr.parse::<IpNet>(), Ok(net) if matches!(net.addr(), IpAddr::V6(_)));
        if !is_v6 {
            report.error(
                format!("{path}.cidr_ipv6"),
                format!("'{cidr}' is not an IPv6 CIDR block"),
            );
        }
    }
    if let Some(group) = &rule.source_security_group {
        if !topology.security_groups.contains_key(group) {
            report.error(
                format!("{path}.source_security_group"),
                format!("unknown security group '{group}'"),
            );
        }
    }
}

fn check_security_groups(topology: &Topology, report: &mut ValidationReport) {
    let used: HashSet<&str> = topology
        .subnets
        .values()
        .flat_map(|s| s.instances.values())
        .flat_map(|i| i.security_group_ids.iter().map(String::as_str))
        .chain(
            topology
                .security_groups
                .values()
                .flat_map(|g| g.security_group_ingress.iter().chain(&g.security_group_egress))
                .filter_map(|r| r.source_security_group.as_deref()),
        )
        .collect();

    let mut group_names: HashMap<&str, &str> = HashMap::new();

    for (name, group) in &topology.security_groups {
        let path = format!("security_groups.{name}");

        if !used.contains(name.as_str()) {
            report.warning(path.clone(), "security group is not used by any instance");
        }

        let group_name = group.group_name.as_deref().unwrap_or(name);
        if group_name.to_ascii_lowercase().starts_with("sg-") {
            report.error(format!("{path}.group_name"), "group name cannot start with 'sg-'");
        }
        if let Some(previous) = group_names.insert(group_name, name.as_str()) {
            report.error(
                format!("{path}.group_name"),
                format!("group name '{group_name}' is already used by '{previous}'"),
            );
        }

        for (index, rule) in group.security_group_ingress.iter().enumerate() {
            check_rule(
                topology,
                rule,
                &format!("{path}.security_group_ingress[{index}]"),
                report,
            );
        }
        for (index, rule) in group.security_group_egress.iter().enumerate() {
            check_rule(
                topology,
                rule,
                &format!("{path}.security_group_egress[{index}]"),
                report,
            );
        }
    }
}

fn check_instances(topology: &Topology, report: &mut ValidationReport) {
    let mut seen: HashMap<&str, &str> = HashMap::new();

    for (subnet_name, subnet) in &topology.subnets {
        for (name, instance) in &subnet.instances {
            let path = format!("subnets.{subnet_name}.instances.{name}");

            if let Some(other) = seen.insert(name.as_str(), subnet_name.as_str()) {
                report.error(
                    path.clone(),
                    format!("instance name is also declared in subnet '{other}'"),
                );
            }

            if topology.key_name_for(instance).is_none() {
                report.error(
                    format!("{path}.key_name"),
                    "no key pair; set key_name or the topology's key_pair_name",
                );
            }

            if instance.security_group_ids.is_empty() {
                report.warning(
                    format!("{path}.security_group_ids"),
                    "no security groups; the VPC default group applies",
                );
            }
            for group in &instance.security_group_ids {
                if !topology.security_groups.contains_key(group) {
                    report.error(
                        format!("{path}.security_group_ids"),
                        format!("unknown security group '{group}'"),
                    );
                }
            }
        }
    }
}

// ============================================================================
// Logical ids
// ============================================================================

fn check_logical_ids(topology: &Topology, report: &mut ValidationReport) {
    // Resources and outputs live in separate sections of the template
    check_unique_ids(naming::construct_names(topology), "logical id", report);
    check_unique_ids(naming::output_names(topology), "output id", report);
}

fn check_unique_ids(names: Vec<String>, kind: &str, report: &mut ValidationReport) {
    let mut seen: HashMap<String, String> = HashMap::new();

    for name in names {
        match logical_id(&name) {
            Ok(id) => {
                if let Some(previous) = seen.insert(id.clone(), name.clone()) {
                    report.error(
                        name.clone(),
                        format!("{kind} '{id}' collides with '{previous}'"),
                    );
                }
            }
            Err(_) => report.error(
                name.clone(),
                "name contains no letters or digits to build a logical id from",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{RouteSpec, Tag};

    fn builtin() -> Topology {
        Topology::builtin().unwrap()
    }

    fn has_error(report: &ValidationReport, path_fragment: &str) -> bool {
        report.errors.iter().any(|e| e.path.contains(path_fragment))
    }

    #[test]
    fn test_builtin_is_valid() {
        let report = validate(&builtin());
        assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_subnet_outside_vpc() {
        let mut topology = builtin();
        topology.subnets["pintusukses-public-subnet"].cidr_block = "192.168.0.0/24".into();
        let report = validate(&topology);
        assert!(has_error(&report, "pintusukses-public-subnet.cidr_block"));
    }

    #[test]
    fn test_overlapping_subnets() {
        let mut topology = builtin();
        topology.subnets["pintusukses-private-subnet"].cidr_block = "10.0.1.128/25".into();
        let report = validate(&topology);
        let overlap = report
            .errors
            .iter()
            .find(|e| e.message.contains("overlaps"))
            .expect("overlap reported");
        assert!(overlap.path.contains("pintusukses-private-subnet"));
    }

    #[test]
    fn test_unknown_route_table() {
        let mut topology = builtin();
        topology.subnets["pintusukses-private-subnet"].route_table_id = "nope".into();
        let report = validate(&topology);
        assert!(has_error(&report, "route_table_id"));
        // the private table is now orphaned
        assert!(report
            .warnings
            .iter()
            .any(|w| w.path == "route_tables.private-pintusukses-rtb"));
    }

    #[test]
    fn test_unknown_nat_subnet_and_gateway() {
        let mut topology = builtin();
        topology.route_tables["private-pintusukses-rtb"][0].target = RouteTarget::NatGateway {
            subnet_id: "ghost".into(),
        };
        topology.route_tables["public-pintusukses-rtb"][0].target = RouteTarget::Gateway {
            gateway_id: "other-igw".into(),
        };
        let report = validate(&topology);
        assert!(has_error(&report, "private-pintusukses-rtb[0].subnet_id"));
        assert!(has_error(&report, "public-pintusukses-rtb[0].gateway_id"));
    }

    #[test]
    fn test_nat_in_private_subnet_warns() {
        let mut topology = builtin();
        topology.route_tables["private-pintusukses-rtb"][0].target = RouteTarget::NatGateway {
            subnet_id: "pintusukses-private-subnet".into(),
        };
        let report = validate(&topology);
        assert!(report.is_valid());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.message.contains("no route to the internet gateway")));
    }

    #[test]
    fn test_duplicate_destination() {
        let mut topology = builtin();
        let route = RouteSpec {
            destination_cidr_block: "0.0.0.0/0".into(),
            target: RouteTarget::Gateway {
                gateway_id: "pintusukses-internet-gateway".into(),
            },
        };
        topology.route_tables["public-pintusukses-rtb"].push(route);
        let report = validate(&topology);
        assert!(has_error(&report, "public-pintusukses-rtb[1].destination_cidr_block"));
    }

    #[test]
    fn test_rule_checks() {
        let mut topology = builtin();
        let rules = &mut topology.security_groups["pintusukses-web-sg"].security_group_ingress;
        rules[0].from_port = 443;
        rules[0].to_port = 80;
        rules[1].cidr_ipv6 = Some("10.0.0.0/8".into());
        rules[2].ip_protocol = "gre-ish".into();
        rules[3].cidr_ipv6 = None;
        let report = validate(&topology);
        assert!(report
            .errors
            .iter()
            .any(|e| e.message.contains("greater than to_port")));
        assert!(has_error(&report, "security_group_ingress[1].cidr_ipv6"));
        assert!(has_error(&report, "security_group_ingress[2].ip_protocol"));
        assert!(report
            .errors
            .iter()
            .any(|e| e.path.ends_with("security_group_ingress[3]") && e.message.contains("needs one")));
    }

    #[test]
    fn test_negative_port_needs_all_protocols() {
        let mut topology = builtin();
        let rules = &mut topology.security_groups["pintusukses-web-sg"].security_group_ingress;
        rules[0].from_port = -1;
        rules[1].ip_protocol = "-1".into();
        rules[1].from_port = -1;
        rules[1].to_port = -1;
        let report = validate(&topology);
        assert!(report.errors.iter().any(|e| {
            e.path.ends_with("security_group_ingress[0].from_port")
                && e.message == "from_port -1 is only allowed with ip_protocol -1"
        }));
        assert!(!has_error(&report, "security_group_ingress[1]"));
    }

    #[test]
    fn test_instance_needs_a_key_pair() {
        let mut topology = builtin();
        topology.key_pair_name = None;
        let report = validate(&topology);
        assert!(has_error(
            &report,
            "pintusukses-public-instance.key_name"
        ));
        assert!(has_error(
            &report,
            "pintusukses-private-instance.key_name"
        ));

        topology.subnets["pintusukses-public-subnet"].instances["pintusukses-public-instance"]
            .key_name = Some("own-key".into());
        let report = validate(&topology);
        assert!(!has_error(&report, "pintusukses-public-instance.key_name"));
        assert!(has_error(&report, "pintusukses-private-instance.key_name"));
    }

    #[test]
    fn test_unknown_instance_security_group() {
        let mut topology = builtin();
        topology.subnets["pintusukses-public-subnet"].instances["pintusukses-public-instance"]
            .security_group_ids
            .push("missing-sg".into());
        let report = validate(&topology);
        assert!(report
            .errors
            .iter()
            .any(|e| e.message == "unknown security group 'missing-sg'"));
    }

    #[test]
    fn test_unused_security_group_warns() {
        let mut topology = builtin();
        let mut spare = topology.security_groups["pintusukses-web-sg"].clone();
        spare.tags = vec![Tag::name("spare")];
        spare.group_name = Some("spare".into());
        topology.security_groups.insert("spare-sg".into(), spare);
        let report = validate(&topology);
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.path == "security_groups.spare-sg"));
    }

    #[test]
    fn test_field_errors_are_flattened() {
        let mut topology = builtin();
        topology.subnets["pintusukses-public-subnet"].instances["pintusukses-public-instance"]
            .image_id
            .clear();
        topology.security_groups["pintusukses-web-sg"].tags[0].key.clear();
        let report = validate(&topology);
        assert!(report
            .errors
            .iter()
            .any(|e| e.path.ends_with("pintusukses-public-instance.image_id")));
        assert!(report
            .errors
            .iter()
            .any(|e| e.path == "security_groups.pintusukses-web-sg.tags[0].key"));
    }

    #[test]
    fn test_logical_id_collision() {
        let mut topology = builtin();
        let subnet = topology.subnets["pintusukses-public-subnet"].clone();
        // differs only by punctuation, so both map to the same logical id
        topology.subnets.insert("pintusukses_public_subnet".into(), subnet);
        let report = validate(&topology);
        assert!(report
            .errors
            .iter()
            .any(|e| e.message.contains("collides with")));
    }

    #[test]
    fn test_into_result() {
        let report = validate(&builtin());
        assert!(report.into_result().is_ok());

        let mut topology = builtin();
        topology.vpc.cidr_block = "not-a-cidr".into();
        let err = validate(&topology).into_result().unwrap_err();
        assert!(matches!(err, Error::Validation(ref issues) if !issues.is_empty()));
    }
}
