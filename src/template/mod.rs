//! CloudFormation template model.
//!
//! The stack builder produces a [`Template`]: an ordered set of resources
//! keyed by logical id, plus outputs. Serialization uses CloudFormation's own
//! key names, so `to_json()` output is deployable as-is.

pub mod intrinsic;

use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Template format version emitted in every template
pub const FORMAT_VERSION: &str = "2010-09-09";

/// Metadata key recording the construct path of a resource
pub const PATH_METADATA_KEY: &str = "vpcsynth:path";

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new("[^A-Za-z0-9]+").expect("static regex"));

/// Derive a CloudFormation logical id from a construct name.
///
/// Logical ids are alphanumeric, so the name is split on every other
/// character and the pieces are joined in PascalCase:
/// `pintusukses-public-subnet` becomes `PintusuksesPublicSubnet`.
pub fn logical_id(name: &str) -> Result<String> {
    let id: String = NON_ALPHANUMERIC
        .split(name)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();

    if id.is_empty() || id.len() > 255 {
        return Err(Error::InvalidLogicalId(name.to_string()));
    }
    Ok(id)
}

/// Output format of a rendered template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateFormat {
    #[default]
    Json,
    Yaml,
}

impl TemplateFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Some(TemplateFormat::Json),
            "yaml" | "yml" => Some(TemplateFormat::Yaml),
            _ => None,
        }
    }
}

impl fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateFormat::Json => write!(f, "json"),
            TemplateFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// `DependsOn` may be a single id or a list
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(id) => vec![id],
        OneOrMany::Many(ids) => ids,
    })
}

/// A single template resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,

    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub depends_on: Vec<String>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties: Map::new(),
            depends_on: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Set a property
    #[must_use]
    pub fn property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Set a property only when a value is present
    #[must_use]
    pub fn optional_property(self, key: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.property(key, value),
            None => self,
        }
    }

    /// Add an explicit dependency
    #[must_use]
    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        let id = logical_id.into();
        if !self.depends_on.contains(&id) {
            self.depends_on.push(id);
        }
        self
    }

    /// Record the construct path
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.metadata
            .insert(PATH_METADATA_KEY.to_string(), Value::String(path.into()));
        self
    }

    /// Construct path, when recorded
    pub fn path(&self) -> Option<&str> {
        self.metadata.get(PATH_METADATA_KEY).and_then(Value::as_str)
    }

    /// Logical ids this resource needs, from properties and `DependsOn`
    pub fn references(&self) -> Vec<String> {
        let mut refs = Vec::new();
        for value in self.properties.values() {
            intrinsic::collect_references(value, &mut refs);
        }
        for id in &self.depends_on {
            if !refs.contains(id) {
                refs.push(id.clone());
            }
        }
        refs
    }
}

/// Export of an output value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Export {
    pub name: Value,
}

/// A stack output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub value: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<Export>,
}

/// A CloudFormation template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion", default = "default_format_version")]
    pub format_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub resources: IndexMap<String, Resource>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, Output>,
}

fn default_format_version() -> String {
    FORMAT_VERSION.to_string()
}

impl Default for Template {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Template {
    pub fn new(description: Option<String>) -> Self {
        Self {
            format_version: default_format_version(),
            description,
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    /// Add a resource under the logical id derived from `name`
    pub fn add_resource(&mut self, name: &str, resource: Resource) -> Result<String> {
        let id = logical_id(name)?;
        if self.resources.contains_key(&id) {
            return Err(Error::DuplicateLogicalId {
                logical_id: id,
                name: name.to_string(),
            });
        }
        tracing::trace!("Adding {} as {}", resource.resource_type, id);
        self.resources.insert(id.clone(), resource);
        Ok(id)
    }

    /// Add an output
    pub fn add_output(&mut self, name: &str, output: Output) -> Result<String> {
        let id = logical_id(name)?;
        if self.outputs.contains_key(&id) {
            return Err(Error::DuplicateLogicalId {
                logical_id: id,
                name: name.to_string(),
            });
        }
        self.outputs.insert(id.clone(), output);
        Ok(id)
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    /// Logical ids of all resources of a type, in declaration order
    pub fn resources_of_type<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a str> {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
            .map(|(id, _)| id.as_str())
    }

    /// Resource count per type, in first-seen order
    pub fn count_by_type(&self) -> IndexMap<String, usize> {
        let mut counts = IndexMap::new();
        for resource in self.resources.values() {
            *counts.entry(resource.resource_type.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Logical ids the given resource depends on
    pub fn references(&self, logical_id: &str) -> Vec<String> {
        self.resources
            .get(logical_id)
            .map(Resource::references)
            .unwrap_or_default()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::TemplateRender(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::TemplateRender(e.to_string()))
    }

    pub fn render(&self, format: TemplateFormat) -> Result<String> {
        match format {
            TemplateFormat::Json => self.to_json(),
            TemplateFormat::Yaml => self.to_yaml(),
        }
    }

    /// Parse a template written as JSON or long-form YAML
    pub fn parse(content: &str) -> Result<Self> {
        match serde_json::from_str(content) {
            Ok(template) => Ok(template),
            Err(_) => Ok(serde_yaml::from_str(content)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_logical_id() {
        assert_eq!(
            logical_id("pintusukses-public-subnet").unwrap(),
            "PintusuksesPublicSubnet"
        );
        assert_eq!(
            logical_id("NATGatewayEIP-pintusukses-public-subnet").unwrap(),
            "NATGatewayEIPPintusuksesPublicSubnet"
        );
        assert_eq!(logical_id("rtb-route-0").unwrap(), "RtbRoute0");
        assert!(logical_id("--").is_err());
    }

    #[test]
    fn test_duplicate_logical_id_rejected() {
        let mut template = Template::default();
        template
            .add_resource("web-sg", Resource::new("AWS::EC2::SecurityGroup"))
            .unwrap();
        let err = template
            .add_resource("web_sg", Resource::new("AWS::EC2::SecurityGroup"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateLogicalId { ref logical_id, .. } if logical_id == "WebSg"));
    }

    #[test]
    fn test_serialized_keys() {
        let mut template = Template::new(Some("demo".into()));
        template
            .add_resource(
                "igw-attachment",
                Resource::new("AWS::EC2::VPCGatewayAttachment")
                    .property("VpcId", intrinsic::reference("Vpc"))
                    .depends_on("Igw")
                    .with_path("demo/igw-attachment"),
            )
            .unwrap();

        let value = serde_json::to_value(&template).unwrap();
        assert_eq!(value["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(value["Description"], "demo");
        let resource = &value["Resources"]["IgwAttachment"];
        assert_eq!(resource["Type"], "AWS::EC2::VPCGatewayAttachment");
        assert_eq!(resource["Properties"]["VpcId"], json!({"Ref": "Vpc"}));
        assert_eq!(resource["DependsOn"], json!(["Igw"]));
        assert_eq!(resource["Metadata"]["vpcsynth:path"], "demo/igw-attachment");
        assert!(value.get("Outputs").is_none());
    }

    #[test]
    fn test_parse_accepts_single_depends_on() {
        let template = Template::parse(
            r#"{"Resources":{"Route":{"Type":"AWS::EC2::Route","DependsOn":"Attach"}}}"#,
        )
        .unwrap();
        assert_eq!(template.format_version, FORMAT_VERSION);
        assert_eq!(template.resources["Route"].depends_on, vec!["Attach"]);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = "AWSTemplateFormatVersion: '2010-09-09'\nResources:\n  Vpc:\n    Type: AWS::EC2::VPC\n    Properties:\n      CidrBlock: 10.0.0.0/16\n";
        let template = Template::parse(yaml).unwrap();
        assert_eq!(
            template.resources["Vpc"].properties["CidrBlock"],
            "10.0.0.0/16"
        );
    }

    #[test]
    fn test_references_include_depends_on() {
        let resource = Resource::new("AWS::EC2::Route")
            .property("RouteTableId", intrinsic::reference("PublicRtb"))
            .property("GatewayId", intrinsic::reference("Igw"))
            .depends_on("IgwAttachment");
        assert_eq!(
            resource.references(),
            vec!["PublicRtb", "Igw", "IgwAttachment"]
        );
    }

    #[test]
    fn test_count_by_type() {
        let mut template = Template::default();
        template.add_resource("a", Resource::new("AWS::EC2::Subnet")).unwrap();
        template.add_resource("b", Resource::new("AWS::EC2::Subnet")).unwrap();
        template.add_resource("c", Resource::new("AWS::EC2::VPC")).unwrap();
        let counts = template.count_by_type();
        assert_eq!(counts["AWS::EC2::Subnet"], 2);
        assert_eq!(counts["AWS::EC2::VPC"], 1);
        assert_eq!(template.resources_of_type("AWS::EC2::Subnet").count(), 2);
    }
}
