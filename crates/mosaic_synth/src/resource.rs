//! Cloud resource declarations.

use indexmap::IndexMap;
use serde::Serialize;

use crate::value::{tag, Value};

/// A single cloud resource declaration.
///
/// The declaration is inert data: a type marker plus a property map,
/// rendered verbatim into the stack template at synthesis time.
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    #[serde(rename = "Type")]
    type_name: String,

    #[serde(rename = "Properties", skip_serializing_if = "IndexMap::is_empty")]
    properties: IndexMap<String, Value>,

    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,

    /// Top-level template attributes such as `UpdatePolicy` or
    /// `CreationPolicy`, emitted beside `Properties`.
    #[serde(flatten)]
    attributes: IndexMap<String, serde_json::Value>,
}

impl Resource {
    /// Create a declaration for the given resource type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: IndexMap::new(),
            depends_on: Vec::new(),
            attributes: IndexMap::new(),
        }
    }

    /// Set a property.
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Set a property only when a value is present.
    pub fn prop_opt(self, name: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(v) => self.prop(name, v),
            None => self,
        }
    }

    /// Append a `{Key, Value}` entry to the `Tags` property.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let tags = self
            .properties
            .entry("Tags".to_string())
            .or_insert_with(|| Value::List(Vec::new()));
        if let Value::List(items) = tags {
            items.push(tag(key, value));
        }
        self
    }

    /// Declare an explicit ordering dependency on another resource.
    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    /// Set a top-level attribute such as `UpdatePolicy`.
    pub fn attribute(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_serialization() {
        let vpc = Resource::new("AWS::EC2::VPC")
            .prop("CidrBlock", "10.0.0.0/16")
            .prop("EnableDnsSupport", true)
            .tag("Name", "base-vpc");

        let json = serde_json::to_value(&vpc).unwrap();
        assert_eq!(json["Type"], "AWS::EC2::VPC");
        assert_eq!(json["Properties"]["CidrBlock"], "10.0.0.0/16");
        assert_eq!(json["Properties"]["Tags"][0]["Key"], "Name");
        assert!(json.get("DependsOn").is_none());
    }

    #[test]
    fn test_depends_on_and_attributes() {
        let asg = Resource::new("AWS::AutoScaling::AutoScalingGroup")
            .depends_on("NodesLaunchTemplate")
            .attribute(
                "CreationPolicy",
                serde_json::json!({"ResourceSignal": {"Count": "3", "Timeout": "PT15M"}}),
            );

        let json = serde_json::to_value(&asg).unwrap();
        assert_eq!(json["DependsOn"][0], "NodesLaunchTemplate");
        assert_eq!(json["CreationPolicy"]["ResourceSignal"]["Timeout"], "PT15M");
    }
}
