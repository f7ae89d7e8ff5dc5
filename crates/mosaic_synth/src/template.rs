//! Rendered deployment templates.

use serde_json::{json, Map, Value as Json};

use crate::error::SynthResult;
use crate::stack::Stack;

const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// A fully rendered stack template.
///
/// This is the artifact handed to the provisioning engine; the struct
/// only wraps the JSON body with query helpers used by acceptance tests.
#[derive(Debug, Clone)]
pub struct Template {
    stack_name: String,
    body: Json,
}

impl Template {
    pub(crate) fn render(stack: &Stack) -> SynthResult<Self> {
        let mut resources = Map::new();
        for (logical_id, resource) in stack.resources() {
            resources.insert(logical_id.clone(), serde_json::to_value(resource)?);
        }

        let mut body = Map::new();
        body.insert(
            "AWSTemplateFormatVersion".to_string(),
            json!(TEMPLATE_FORMAT_VERSION),
        );
        if let Some(description) = stack.description() {
            body.insert("Description".to_string(), json!(description));
        }
        body.insert("Resources".to_string(), Json::Object(resources));

        let mut outputs = Map::new();
        for (name, output) in stack.outputs() {
            let mut entry = Map::new();
            entry.insert("Value".to_string(), serde_json::to_value(&output.value)?);
            if let Some(description) = &output.description {
                entry.insert("Description".to_string(), json!(description));
            }
            if let Some(export) = &output.export {
                entry.insert("Export".to_string(), json!({ "Name": export }));
            }
            outputs.insert(name.clone(), Json::Object(entry));
        }
        if !outputs.is_empty() {
            body.insert("Outputs".to_string(), Json::Object(outputs));
        }

        Ok(Self {
            stack_name: stack.name().to_string(),
            body: Json::Object(body),
        })
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn body(&self) -> &Json {
        &self.body
    }

    pub fn to_json_pretty(&self) -> SynthResult<String> {
        Ok(serde_json::to_string_pretty(&self.body)?)
    }

    /// All declared resource type markers, in declaration order.
    pub fn resource_types(&self) -> Vec<String> {
        self.resource_entries()
            .filter_map(|(_, r)| r.get("Type").and_then(Json::as_str))
            .map(str::to_string)
            .collect()
    }

    /// True when the template declares at least one resource of the type.
    pub fn has_resource(&self, type_name: &str) -> bool {
        self.resource_types().iter().any(|t| t == type_name)
    }

    /// Logical ID and body of every resource of the given type.
    pub fn find_resources<'a>(&'a self, type_name: &str) -> Vec<(&'a str, &'a Json)> {
        let type_name = type_name.to_string();
        self.resource_entries()
            .filter(move |(_, r)| {
                r.get("Type").and_then(Json::as_str) == Some(type_name.as_str())
            })
            .collect()
    }

    pub fn resource_count(&self) -> usize {
        self.resource_entries().count()
    }

    /// The output entry for `name`, if declared.
    pub fn output(&self, name: &str) -> Option<&Json> {
        self.body.get("Outputs").and_then(|o| o.get(name))
    }

    fn resource_entries(&self) -> impl Iterator<Item = (&str, &Json)> {
        self.body
            .get("Resources")
            .and_then(Json::as_object)
            .into_iter()
            .flat_map(|map| map.iter().map(|(k, v)| (k.as_str(), v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use crate::stack::Environment;
    use crate::value::Value;

    fn sample_stack() -> Stack {
        let mut stack = Stack::new("Net", Environment::default());
        stack
            .add_resource(
                "BaseVpc",
                Resource::new("AWS::EC2::VPC").prop("CidrBlock", "10.0.0.0/16"),
            )
            .unwrap();
        stack.export("vpcId", Value::r#ref("BaseVpc")).unwrap();
        stack
    }

    #[test]
    fn test_render_shape() {
        let template = sample_stack().to_template().unwrap();
        let body = template.body();
        assert_eq!(body["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(
            body["Resources"]["BaseVpc"]["Properties"]["CidrBlock"],
            "10.0.0.0/16"
        );
        assert_eq!(body["Outputs"]["vpcId"]["Export"]["Name"], "Net:vpcId");
    }

    #[test]
    fn test_query_helpers() {
        let template = sample_stack().to_template().unwrap();
        assert!(template.has_resource("AWS::EC2::VPC"));
        assert!(!template.has_resource("AWS::EKS::Cluster"));
        assert_eq!(template.resource_types(), vec!["AWS::EC2::VPC"]);
        assert_eq!(template.find_resources("AWS::EC2::VPC").len(), 1);
    }
}
