//! The VPC stack builder.
//!
//! [`VpcStack`] walks a [`Topology`] in a fixed order and emits one
//! CloudFormation resource per network object, threading logical ids between
//! them: route tables reference the VPC, associations reference subnets and
//! route tables, routes reference the internet gateway or a NAT gateway, and
//! instances reference their subnet and security groups.
//!
//! Build order:
//!
//! 1. VPC
//! 2. internet gateway and its attachment
//! 3. route tables
//! 4. security groups (plus standalone rules that reference other groups)
//! 5. subnets
//! 6. subnet/route-table associations
//! 7. routes, creating each NAT gateway (and its Elastic IP) on first use
//! 8. instances
//! 9. outputs

pub mod naming;

use indexmap::IndexMap;
use ipnet::IpNet;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::template::intrinsic::{base64, get_att, reference};
use crate::template::{logical_id, Export, Output, Resource, Template};
use crate::topology::{IngressRule, RouteTarget, Tag, Topology};
use crate::validate;

pub const VPC: &str = "AWS::EC2::VPC";
pub const INTERNET_GATEWAY: &str = "AWS::EC2::InternetGateway";
pub const GATEWAY_ATTACHMENT: &str = "AWS::EC2::VPCGatewayAttachment";
pub const ROUTE_TABLE: &str = "AWS::EC2::RouteTable";
pub const ROUTE: &str = "AWS::EC2::Route";
pub const SECURITY_GROUP: &str = "AWS::EC2::SecurityGroup";
pub const SECURITY_GROUP_INGRESS: &str = "AWS::EC2::SecurityGroupIngress";
pub const SECURITY_GROUP_EGRESS: &str = "AWS::EC2::SecurityGroupEgress";
pub const SUBNET: &str = "AWS::EC2::Subnet";
pub const SUBNET_ROUTE_TABLE_ASSOCIATION: &str = "AWS::EC2::SubnetRouteTableAssociation";
pub const EIP: &str = "AWS::EC2::EIP";
pub const NAT_GATEWAY: &str = "AWS::EC2::NatGateway";
pub const INSTANCE: &str = "AWS::EC2::Instance";

/// Render tags as CloudFormation `Key`/`Value` objects, adding a `Name` tag
/// when the list has none.
fn tags_with_name(tags: &[Tag], name: &str) -> Value {
    let mut rendered: Vec<Value> = tags
        .iter()
        .map(|t| json!({ "Key": t.key, "Value": t.value }))
        .collect();
    if !tags.iter().any(|t| t.key == "Name") {
        rendered.insert(0, json!({ "Key": "Name", "Value": name }));
    }
    Value::Array(rendered)
}

fn is_ipv6(cidr: &str) -> bool {
    matches!(cidr.parse::<IpNet>(), Ok(IpNet::V6(_)))
}

/// Builder state: the template under construction plus name -> logical id
/// maps for everything later resources need to reference.
#[derive(Debug)]
pub struct VpcStack<'a> {
    topology: &'a Topology,
    template: Template,
    vpc_id: String,
    internet_gateway_id: String,
    gateway_attachment_id: String,
    route_table_ids: IndexMap<String, String>,
    security_group_ids: IndexMap<String, String>,
    subnet_ids: IndexMap<String, String>,
    nat_gateway_ids: IndexMap<String, String>,
    instance_ids: IndexMap<String, String>,
}

impl<'a> VpcStack<'a> {
    /// Validate a topology and build its template.
    ///
    /// Validation warnings are logged; errors abort with
    /// [`Error::Validation`].
    pub fn synthesize(topology: &'a Topology) -> Result<Template> {
        validate::validate(topology).into_result()?;
        Ok(Self::build(topology)?.into_template())
    }

    /// Build the stack without validating first.
    pub fn build(topology: &'a Topology) -> Result<Self> {
        let mut stack = Self {
            topology,
            template: Template::new(
                topology
                    .stack
                    .description
                    .clone()
                    .or_else(|| Some(format!("Network topology for {}", topology.stack.name))),
            ),
            vpc_id: String::new(),
            internet_gateway_id: String::new(),
            gateway_attachment_id: String::new(),
            route_table_ids: IndexMap::new(),
            security_group_ids: IndexMap::new(),
            subnet_ids: IndexMap::new(),
            nat_gateway_ids: IndexMap::new(),
            instance_ids: IndexMap::new(),
        };

        stack.create_vpc()?;
        stack.attach_internet_gateway()?;

        stack.create_route_tables()?;
        stack.create_security_groups()?;

        stack.create_subnets()?;
        stack.create_subnet_route_table_associations()?;

        stack.create_routes()?;
        stack.create_instances()?;
        stack.create_outputs()?;

        tracing::info!(
            "Synthesized stack '{}': {} resources, {} outputs",
            topology.stack.name,
            stack.template.resources.len(),
            stack.template.outputs.len()
        );

        Ok(stack)
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn into_template(self) -> Template {
        self.template
    }

    pub fn vpc_id(&self) -> &str {
        &self.vpc_id
    }

    pub fn internet_gateway_id(&self) -> &str {
        &self.internet_gateway_id
    }

    /// Route table name -> logical id
    pub fn route_table_ids(&self) -> &IndexMap<String, String> {
        &self.route_table_ids
    }

    /// Security group name -> logical id
    pub fn security_group_ids(&self) -> &IndexMap<String, String> {
        &self.security_group_ids
    }

    /// Subnet name -> logical id
    pub fn subnet_ids(&self) -> &IndexMap<String, String> {
        &self.subnet_ids
    }

    /// Subnet name -> logical id of the NAT gateway placed in it
    pub fn nat_gateway_ids(&self) -> &IndexMap<String, String> {
        &self.nat_gateway_ids
    }

    /// Instance name -> logical id
    pub fn instance_ids(&self) -> &IndexMap<String, String> {
        &self.instance_ids
    }

    fn path(&self, name: &str) -> String {
        format!("{}/{}", self.topology.stack.name, name)
    }

    fn add(&mut self, name: &str, resource: Resource) -> Result<String> {
        let resource = resource.with_path(self.path(name));
        let id = self.template.add_resource(name, resource)?;
        tracing::debug!("Created {} '{}'", id, name);
        Ok(id)
    }

    fn lookup(
        map: &IndexMap<String, String>,
        kind: &'static str,
        name: &str,
        referrer: &str,
    ) -> Result<String> {
        map.get(name)
            .cloned()
            .ok_or_else(|| Error::unknown_reference(kind, name, referrer))
    }

    fn create_vpc(&mut self) -> Result<()> {
        let topology = self.topology;
        let vpc = &topology.vpc;
        let resource = Resource::new(VPC)
            .property("CidrBlock", vpc.cidr_block.as_str())
            .property("EnableDnsHostnames", vpc.enable_dns_hostnames)
            .property("EnableDnsSupport", vpc.enable_dns_support)
            .property("InstanceTenancy", vpc.instance_tenancy.as_str())
            .property("Tags", tags_with_name(&[], &vpc.name));

        self.vpc_id = self.add(&vpc.name, resource)?;
        Ok(())
    }

    fn attach_internet_gateway(&mut self) -> Result<()> {
        let name = self.topology.internet_gateway.clone();
        let gateway = Resource::new(INTERNET_GATEWAY).property("Tags", tags_with_name(&[], &name));
        self.internet_gateway_id = self.add(&name, gateway)?;

        let attachment = Resource::new(GATEWAY_ATTACHMENT)
            .property("VpcId", reference(&self.vpc_id))
            .property("InternetGatewayId", reference(&self.internet_gateway_id));
        self.gateway_attachment_id = self.add(naming::GATEWAY_ATTACHMENT, attachment)?;
        Ok(())
    }

    fn create_route_tables(&mut self) -> Result<()> {
        let topology = self.topology;
        for name in topology.route_tables.keys() {
            let resource = Resource::new(ROUTE_TABLE)
                .property("VpcId", reference(&self.vpc_id))
                .property("Tags", tags_with_name(&[], name));
            let id = self.add(name, resource)?;
            self.route_table_ids.insert(name.clone(), id);
        }
        Ok(())
    }

    fn rule_json(rule: &IngressRule) -> Value {
        let mut value = json!({
            "IpProtocol": rule.ip_protocol.to_ascii_lowercase(),
            "FromPort": rule.from_port,
            "ToPort": rule.to_port,
        });
        if let Some(cidr) = &rule.cidr_ip {
            value["CidrIp"] = json!(cidr);
        }
        if let Some(cidr) = &rule.cidr_ipv6 {
            value["CidrIpv6"] = json!(cidr);
        }
        if let Some(description) = &rule.description {
            value["Description"] = json!(description);
        }
        value
    }

    /// Rules with a CIDR source; group-to-group rules become standalone resources
    fn inline_rules(rules: &[IngressRule]) -> Vec<Value> {
        rules
            .iter()
            .filter(|r| r.source_security_group.is_none())
            .map(Self::rule_json)
            .collect()
    }

    fn create_security_groups(&mut self) -> Result<()> {
        let topology = self.topology;

        // Groups first, so rules referencing a group declared later resolve.
        for (name, group) in &topology.security_groups {
            let mut resource = Resource::new(SECURITY_GROUP)
                .property("GroupDescription", group.group_description.as_str())
                .property("GroupName", group.group_name.as_deref().unwrap_or(name))
                .property("VpcId", reference(&self.vpc_id))
                .property(
                    "SecurityGroupIngress",
                    Self::inline_rules(&group.security_group_ingress),
                );
            let egress = Self::inline_rules(&group.security_group_egress);
            if !egress.is_empty() {
                resource = resource.property("SecurityGroupEgress", egress);
            }
            resource = resource.property("Tags", tags_with_name(&group.tags, name));

            let id = self.add(name, resource)?;
            self.security_group_ids.insert(name.clone(), id);
        }

        for (name, group) in &topology.security_groups {
            let group_id = Self::lookup(&self.security_group_ids, "security group", name, name)?;
            for (ingress, rules) in [
                (true, &group.security_group_ingress),
                (false, &group.security_group_egress),
            ] {
                for (index, rule) in rules.iter().enumerate() {
                    let Some(peer) = &rule.source_security_group else {
                        continue;
                    };
                    let construct = if ingress {
                        naming::group_ingress(name, index)
                    } else {
                        naming::group_egress(name, index)
                    };
                    let peer_id =
                        Self::lookup(&self.security_group_ids, "security group", peer, &construct)?;

                    let mut resource = Resource::new(if ingress {
                        SECURITY_GROUP_INGRESS
                    } else {
                        SECURITY_GROUP_EGRESS
                    })
                    .property("GroupId", reference(&group_id))
                    .property("IpProtocol", rule.ip_protocol.to_ascii_lowercase())
                    .property("FromPort", rule.from_port)
                    .property("ToPort", rule.to_port)
                    .optional_property("Description", rule.description.as_deref());
                    resource = if ingress {
                        resource.property("SourceSecurityGroupId", reference(&peer_id))
                    } else {
                        resource.property("DestinationSecurityGroupId", reference(&peer_id))
                    };
                    self.add(&construct, resource)?;
                }
            }
        }
        Ok(())
    }

    fn create_subnets(&mut self) -> Result<()> {
        let topology = self.topology;
        for (name, subnet) in &topology.subnets {
            let resource = Resource::new(SUBNET)
                .property("VpcId", reference(&self.vpc_id))
                .property("AvailabilityZone", subnet.availability_zone.as_str())
                .property("CidrBlock", subnet.cidr_block.as_str())
                .property("MapPublicIpOnLaunch", subnet.map_public_ip_on_launch)
                .property("Tags", tags_with_name(&[], name));
            let id = self.add(name, resource)?;
            self.subnet_ids.insert(name.clone(), id);
        }
        Ok(())
    }

    fn create_subnet_route_table_associations(&mut self) -> Result<()> {
        let topology = self.topology;
        for (name, subnet) in &topology.subnets {
            let construct = naming::association(name, &subnet.route_table_id);
            let subnet_id = Self::lookup(&self.subnet_ids, "subnet", name, &construct)?;
            let route_table_id = Self::lookup(
                &self.route_table_ids,
                "route table",
                &subnet.route_table_id,
                &construct,
            )?;

            let resource = Resource::new(SUBNET_ROUTE_TABLE_ASSOCIATION)
                .property("RouteTableId", reference(&route_table_id))
                .property("SubnetId", reference(&subnet_id));
            self.add(&construct, resource)?;
        }
        Ok(())
    }

    /// NAT gateway for a subnet, created with its Elastic IP on first request
    fn nat_gateway_for(&mut self, subnet: &str, referrer: &str) -> Result<String> {
        if let Some(id) = self.nat_gateway_ids.get(subnet) {
            return Ok(id.clone());
        }

        let subnet_id = Self::lookup(&self.subnet_ids, "subnet", subnet, referrer)?;

        let eip = Resource::new(EIP)
            .property("Domain", "vpc")
            .depends_on(self.gateway_attachment_id.clone());
        let eip_id = self.add(&naming::nat_eip(subnet), eip)?;

        let name = naming::nat_gateway(subnet);
        let gateway = Resource::new(NAT_GATEWAY)
            .property("AllocationId", get_att(&eip_id, "AllocationId"))
            .property("SubnetId", reference(&subnet_id))
            .property("Tags", tags_with_name(&[], &name));
        let id = self.add(&name, gateway)?;

        self.nat_gateway_ids.insert(subnet.to_string(), id.clone());
        Ok(id)
    }

    fn create_routes(&mut self) -> Result<()> {
        let topology = self.topology;
        for (table, routes) in &topology.route_tables {
            let route_table_id = Self::lookup(&self.route_table_ids, "route table", table, table)?;

            for (index, route) in routes.iter().enumerate() {
                let construct = naming::route(table, index);
                let destination_key = if is_ipv6(&route.destination_cidr_block) {
                    "DestinationIpv6CidrBlock"
                } else {
                    "DestinationCidrBlock"
                };

                let mut resource = Resource::new(ROUTE)
                    .property("RouteTableId", reference(&route_table_id))
                    .property(destination_key, route.destination_cidr_block.as_str());

                match &route.target {
                    RouteTarget::Gateway { gateway_id } => {
                        if *gateway_id != topology.internet_gateway {
                            return Err(Error::unknown_reference(
                                "internet gateway",
                                gateway_id,
                                construct,
                            ));
                        }
                        resource = resource
                            .property("GatewayId", reference(&self.internet_gateway_id))
                            .depends_on(self.gateway_attachment_id.clone());
                    }
                    RouteTarget::NatGateway { subnet_id } => {
                        let nat_id = self.nat_gateway_for(subnet_id, &construct)?;
                        resource = resource.property("NatGatewayId", reference(&nat_id));
                    }
                }

                self.add(&construct, resource)?;
            }
        }
        Ok(())
    }

    fn create_instances(&mut self) -> Result<()> {
        let topology = self.topology;
        for (subnet_name, subnet) in &topology.subnets {
            let subnet_id = Self::lookup(&self.subnet_ids, "subnet", subnet_name, subnet_name)?;

            for (name, instance) in &subnet.instances {
                let construct = naming::instance(name);
                let security_groups = instance
                    .security_group_ids
                    .iter()
                    .map(|group| {
                        Self::lookup(&self.security_group_ids, "security group", group, &construct)
                            .map(|id| reference(&id))
                    })
                    .collect::<Result<Vec<_>>>()?;

                let resource = Resource::new(INSTANCE)
                    .property("ImageId", instance.image_id.as_str())
                    .property("InstanceType", instance.instance_type.as_str())
                    .optional_property("KeyName", topology.key_name_for(instance))
                    .property("DisableApiTermination", instance.disable_api_termination)
                    .property("SubnetId", reference(&subnet_id))
                    .property("SecurityGroupIds", security_groups)
                    .optional_property("UserData", instance.user_data.as_deref().map(base64))
                    .property("Tags", tags_with_name(&instance.tags, name));

                let id = self.add(&construct, resource)?;
                self.instance_ids.insert(name.clone(), id);
            }
        }
        Ok(())
    }

    fn output(&mut self, name: &str, description: String, value: Value) -> Result<()> {
        let export = format!("{}-{}", self.topology.stack.name, logical_id(name)?);
        self.template.add_output(
            name,
            Output {
                description: Some(description),
                value,
                export: Some(Export {
                    name: Value::String(export),
                }),
            },
        )?;
        Ok(())
    }

    fn create_outputs(&mut self) -> Result<()> {
        let vpc_id = self.vpc_id.clone();
        self.output(
            naming::VPC_ID_OUTPUT,
            format!("Id of {}", self.topology.vpc.name),
            reference(&vpc_id),
        )?;

        let named: Vec<(String, String)> = self
            .subnet_ids
            .iter()
            .chain(&self.instance_ids)
            .map(|(name, id)| (name.clone(), id.clone()))
            .chain(
                self.nat_gateway_ids
                    .iter()
                    .map(|(subnet, id)| (naming::nat_gateway(subnet), id.clone())),
            )
            .collect();

        for (name, id) in named {
            self.output(&naming::id_output(&name), format!("Id of {name}"), reference(&id))?;
        }
        Ok(())
    }
}
