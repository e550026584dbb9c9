//! Synthesis tests for vpcsynth
//!
//! These tests build templates from the built-in and fixture topologies and
//! check the resource set, the wiring between resources and the rendered
//! documents.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;

use vpcsynth::stack::{self, VpcStack};
use vpcsynth::template::{Template, TemplateFormat};
use vpcsynth::topology::Topology;
use vpcsynth::Error;

// ============================================================================
// Built-in Topology
// ============================================================================

#[test]
fn test_builtin_resource_set() {
    let template = builtin_template();
    let counts = template.count_by_type();

    let expected = [
        (stack::VPC, 1),
        (stack::INTERNET_GATEWAY, 1),
        (stack::GATEWAY_ATTACHMENT, 1),
        (stack::ROUTE_TABLE, 2),
        (stack::SECURITY_GROUP, 2),
        (stack::SUBNET, 2),
        (stack::SUBNET_ROUTE_TABLE_ASSOCIATION, 2),
        (stack::ROUTE, 2),
        (stack::EIP, 1),
        (stack::NAT_GATEWAY, 1),
        (stack::INSTANCE, 2),
    ];
    for (resource_type, count) in expected {
        assert_eq!(counts.get(resource_type), Some(&count), "{resource_type}");
    }
    assert_eq!(counts.len(), expected.len());
}

#[test]
fn test_builtin_outputs_are_exported() {
    let template = builtin_template();
    assert_eq!(template.outputs.len(), 6);

    let vpc = &template.outputs["VpcId"];
    assert_eq!(vpc.value, json!({"Ref": "VpcPintusukses"}));
    assert_eq!(
        vpc.export.as_ref().map(|e| e.name.clone()),
        Some(json!("pintusukses-vpc-VpcId"))
    );
    assert!(template
        .outputs
        .contains_key("NATGatewayPintusuksesPublicSubnetId"));
}

#[test]
fn test_nat_route_wiring() {
    let template = builtin_template();

    let route = template.resource("PrivatePintusuksesRtbRoute0").unwrap();
    assert_eq!(route.properties["RouteTableId"], json!({"Ref": "PrivatePintusuksesRtb"}));
    assert_eq!(
        route.properties["NatGatewayId"],
        json!({"Ref": "NATGatewayPintusuksesPublicSubnet"})
    );
    assert!(route.depends_on.is_empty());

    let nat = template
        .resource("NATGatewayPintusuksesPublicSubnet")
        .unwrap();
    assert_eq!(
        nat.properties["AllocationId"],
        json!({"Fn::GetAtt": ["NATGatewayEIPPintusuksesPublicSubnet", "AllocationId"]})
    );
    assert_eq!(nat.properties["SubnetId"], json!({"Ref": "PintusuksesPublicSubnet"}));
}

#[test]
fn test_gateway_route_depends_on_attachment() {
    let template = builtin_template();
    let route = template.resource("PublicPintusuksesRtbRoute0").unwrap();
    assert_eq!(
        route.properties["GatewayId"],
        json!({"Ref": "PintusuksesInternetGateway"})
    );
    assert_eq!(route.depends_on, vec!["InternetGatewayAttachment"]);
    assert_eq!(route.properties["DestinationCidrBlock"], json!("0.0.0.0/0"));
}

#[test]
fn test_instance_security_groups_and_key() {
    let template = builtin_template();
    let instance = template
        .resource("PintusuksesPrivateInstanceInstance")
        .unwrap();
    assert_eq!(
        instance.properties["SecurityGroupIds"],
        json!([{"Ref": "PintusuksesApiSg"}])
    );
    assert_eq!(
        instance.properties["SubnetId"],
        json!({"Ref": "PintusuksesPrivateSubnet"})
    );
    assert_eq!(
        instance.properties["KeyName"],
        json!("pintusukses-ap-southeast-3-key")
    );
    assert!(!instance.properties.contains_key("UserData"));
}

#[test]
fn test_security_group_rules_inline() {
    let template = builtin_template();
    let group = template.resource("PintusuksesApiSg").unwrap();
    let ingress = group.properties["SecurityGroupIngress"].as_array().unwrap();
    assert_eq!(ingress.len(), 7);
    assert_eq!(
        ingress[6],
        json!({"IpProtocol": "tcp", "FromPort": 3306, "ToPort": 3306, "CidrIp": "0.0.0.0/0"})
    );
    assert_eq!(ingress[1]["CidrIpv6"], json!("::/0"));
}

// ============================================================================
// Fixture Topology
// ============================================================================

#[test]
fn test_shared_nat_gateway_is_created_once() {
    let template = VpcStack::synthesize(&small_topology()).unwrap();
    assert_eq!(template.resources_of_type(stack::NAT_GATEWAY).count(), 1);
    assert_eq!(template.resources_of_type(stack::EIP).count(), 1);

    for route in ["PrivateARtbRoute0", "PrivateBRtbRoute0"] {
        assert_eq!(
            template.resource(route).unwrap().properties["NatGatewayId"],
            json!({"Ref": "NATGatewayPublicSubnet"})
        );
    }
    assert_eq!(template.resources.len(), 19);
}

#[test]
fn test_user_data_is_base64_encoded() {
    let template = VpcStack::synthesize(&small_topology()).unwrap();
    let app = template.resource("AppInstance").unwrap();
    assert_eq!(
        app.properties["UserData"],
        json!({"Fn::Base64": "#!/bin/sh\necho hello"})
    );
    assert_eq!(app.properties["KeyName"], json!("edge-key"));
}

#[test]
fn test_overrides_change_exports_and_paths() {
    let topology = small_topology().with_overrides(Some("edge-prod"), Some("eu-west-1"));
    let template = VpcStack::synthesize(&topology).unwrap();
    assert_eq!(
        template.outputs["VpcId"].export.as_ref().map(|e| e.name.clone()),
        Some(json!("edge-prod-VpcId"))
    );
    assert_eq!(
        template.resource("EdgeVpc").and_then(|r| r.path()),
        Some("edge-prod/edge-vpc")
    );
}

#[test]
fn test_invalid_topology_is_rejected() {
    let topology = Topology::parse(BROKEN_TOPOLOGY, vpcsynth::topology::TopologyFormat::Yaml)
        .unwrap();
    let err = VpcStack::synthesize(&topology).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(err.exit_code(), 4);
    assert!(err.issues().len() >= 3);
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_json_rendering_round_trips() {
    let template = builtin_template();
    let rendered = template.render(TemplateFormat::Json).unwrap();
    assert!(rendered.starts_with("{\n  \"AWSTemplateFormatVersion\": \"2010-09-09\""));
    assert_eq!(Template::parse(&rendered).unwrap(), template);
}

#[test]
fn test_yaml_rendering_round_trips() {
    let template = builtin_template();
    let rendered = template.render(TemplateFormat::Yaml).unwrap();
    assert!(rendered.contains("AWSTemplateFormatVersion: 2010-09-09")
        || rendered.contains("AWSTemplateFormatVersion: '2010-09-09'"));
    assert_eq!(Template::parse(&rendered).unwrap(), template);
}

#[test]
fn test_resources_keep_build_order() {
    let template = builtin_template();
    let ids: Vec<&str> = template.resources.keys().map(String::as_str).collect();
    assert_eq!(
        &ids[..3],
        &["VpcPintusukses", "PintusuksesInternetGateway", "InternetGatewayAttachment"]
    );
    assert_eq!(ids.last(), Some(&"PintusuksesPrivateInstanceInstance"));
}
