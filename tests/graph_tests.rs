//! Dependency graph tests over synthesized templates

mod common;

use common::*;
use vpcsynth::graph::DependencyGraph;
use vpcsynth::stack::VpcStack;
use vpcsynth::template::intrinsic::reference;
use vpcsynth::template::Resource;
use vpcsynth::Error;

fn position(order: &[String], id: &str) -> usize {
    order
        .iter()
        .position(|x| x == id)
        .unwrap_or_else(|| panic!("{id} missing from order"))
}

#[test]
fn test_builtin_graph_is_acyclic_and_complete() {
    let template = builtin_template();
    let graph = DependencyGraph::from_template(&template).unwrap();

    assert_eq!(graph.node_count(), template.resources.len());
    assert!(!graph.has_cycles());
    assert_eq!(graph.deployment_order().unwrap().len(), 17);
}

#[test]
fn test_vpc_precedes_everything_that_references_it() {
    let template = builtin_template();
    let graph = DependencyGraph::from_template(&template).unwrap();
    let order = graph.deployment_order().unwrap();

    assert_eq!(order[0], "VpcPintusukses");
    let vpc_pos = position(&order, "VpcPintusukses");
    for dependent in graph.dependents_of("VpcPintusukses") {
        assert!(position(&order, &dependent) > vpc_pos, "{dependent}");
    }
    // Everything but the internet gateway hangs off the VPC
    assert_eq!(graph.dependents_of("VpcPintusukses").len(), 15);
}

#[test]
fn test_every_edge_is_respected() {
    let template = builtin_template();
    let graph = DependencyGraph::from_template(&template).unwrap();
    let order = graph.deployment_order().unwrap();

    for id in template.resources.keys() {
        for dependency in graph.direct_dependencies(id) {
            assert!(
                position(&order, &dependency) < position(&order, id),
                "{dependency} must come before {id}"
            );
        }
    }
}

#[test]
fn test_nat_route_dependencies() {
    let template = builtin_template();
    let graph = DependencyGraph::from_template(&template).unwrap();

    let deps = graph.dependencies_of("PrivatePintusuksesRtbRoute0");
    for expected in [
        "PrivatePintusuksesRtb",
        "NATGatewayPintusuksesPublicSubnet",
        "NATGatewayEIPPintusuksesPublicSubnet",
        "PintusuksesPublicSubnet",
        "InternetGatewayAttachment",
        "VpcPintusukses",
    ] {
        assert!(deps.iter().any(|d| d == expected), "{expected} in {deps:?}");
    }
    assert_eq!(
        graph.direct_dependencies("PublicPintusuksesRtbRoute0"),
        vec![
            "PintusuksesInternetGateway",
            "InternetGatewayAttachment",
            "PublicPintusuksesRtb"
        ]
    );
}

#[test]
fn test_fixture_graph_orders_shared_nat_once() {
    let template = VpcStack::synthesize(&small_topology()).unwrap();
    let graph = DependencyGraph::from_template(&template).unwrap();
    let order = graph.deployment_order().unwrap();

    let nat = position(&order, "NATGatewayPublicSubnet");
    assert!(position(&order, "PrivateARtbRoute0") > nat);
    assert!(position(&order, "PrivateBRtbRoute0") > nat);
    assert_eq!(graph.direct_dependents("NATGatewayPublicSubnet").len(), 2);
}

#[test]
fn test_dangling_reference_in_edited_template() {
    let mut template = builtin_template();
    template.resources.shift_remove("InternetGatewayAttachment");

    let err = DependencyGraph::from_template(&template).unwrap_err();
    assert!(matches!(
        err,
        Error::DanglingReference { ref to, .. } if to == "InternetGatewayAttachment"
    ));
}

#[test]
fn test_cycle_in_edited_template() {
    let mut template = builtin_template();
    template
        .resources
        .insert(
            "VpcPintusukses".to_string(),
            Resource::new("AWS::EC2::VPC").property("Peer", reference("PintusuksesPublicSubnet")),
        );

    let graph = DependencyGraph::from_template(&template).unwrap();
    assert!(graph.has_cycles());
    let cycles = graph.get_cycles();
    assert!(cycles[0].contains(&"VpcPintusukses".to_string()));
    assert!(matches!(graph.deployment_order(), Err(Error::DependencyCycle(_))));
}

#[test]
fn test_dot_output() {
    let graph = DependencyGraph::from_template(&builtin_template()).unwrap();
    let dot = graph.to_dot();
    assert!(dot.starts_with("digraph resources {"));
    assert!(dot.contains("\"VpcPintusukses\" -> \"PintusuksesPublicSubnet\" [style=solid];"));
    assert!(dot.contains(
        "\"InternetGatewayAttachment\" -> \"PublicPintusuksesRtbRoute0\" [style=dashed];"
    ));
    assert!(dot.trim_end().ends_with('}'));
}
