//! Stack containers and deploy targets.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::error::{SynthError, SynthResult};
use crate::resource::Resource;
use crate::template::Template;
use crate::value::Value;

/// Environment variable carrying the default target account.
pub const ENV_DEFAULT_ACCOUNT: &str = "MOSAIC_DEFAULT_ACCOUNT";
/// Environment variable carrying the default target region.
pub const ENV_DEFAULT_REGION: &str = "MOSAIC_DEFAULT_REGION";

/// Deploy target for a stack: account and region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Environment {
    pub account: Option<String>,
    pub region: Option<String>,
}

impl Environment {
    /// Read the deploy target from the process environment.
    ///
    /// Resolved once at synthesis time; unset variables leave the
    /// target open for the provisioning engine to fill in.
    pub fn from_env() -> Self {
        Self {
            account: std::env::var(ENV_DEFAULT_ACCOUNT).ok().filter(|v| !v.is_empty()),
            region: std::env::var(ENV_DEFAULT_REGION).ok().filter(|v| !v.is_empty()),
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// True when the target region is one of the China partitions.
    pub fn is_china_partition(&self) -> bool {
        matches!(
            self.region.as_deref(),
            Some("cn-north-1") | Some("cn-northwest-1")
        )
    }

    /// The IAM partition prefix for managed policy ARNs.
    pub fn partition(&self) -> &'static str {
        if self.is_china_partition() {
            "aws-cn"
        } else {
            "aws"
        }
    }
}

/// A stack output, optionally exported for consumption by other stacks.
#[derive(Debug, Clone)]
pub struct Output {
    pub value: Value,
    pub description: Option<String>,
    pub export: Option<String>,
}

/// A named container of resource declarations and outputs.
///
/// Resources keep insertion order; producer-before-consumer ordering is
/// established by the code that builds the stack, not enforced here.
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    description: Option<String>,
    env: Environment,
    resources: IndexMap<String, Resource>,
    outputs: IndexMap<String, Output>,
}

impl Stack {
    pub fn new(name: impl Into<String>, env: Environment) -> Self {
        Self {
            name: name.into(),
            description: None,
            env,
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Target region as a value: the configured literal, or the engine's
    /// region pseudo parameter when the target is open.
    pub fn region_value(&self) -> Value {
        match &self.env.region {
            Some(region) => Value::Str(region.clone()),
            None => Value::region(),
        }
    }

    /// Add a resource declaration under a stack-unique logical ID.
    pub fn add_resource(
        &mut self,
        logical_id: impl Into<String>,
        resource: Resource,
    ) -> SynthResult<()> {
        let logical_id = logical_id.into();
        if self.resources.contains_key(&logical_id) {
            return Err(SynthError::DuplicateLogicalId {
                stack: self.name.clone(),
                id: logical_id,
            });
        }
        debug!(stack = %self.name, %logical_id, kind = resource.type_name(), "declared resource");
        self.resources.insert(logical_id, resource);
        Ok(())
    }

    /// Add a plain output.
    pub fn add_output(&mut self, name: impl Into<String>, value: Value) -> SynthResult<()> {
        self.insert_output(name.into(), value, None)
    }

    /// Add an output exported under `<stack>:<name>` for other stacks.
    ///
    /// Returns the import token a consumer stack uses for the value.
    pub fn export(&mut self, name: impl Into<String>, value: Value) -> SynthResult<Value> {
        let name = name.into();
        let export_name = Self::export_name(&self.name, &name);
        self.insert_output(name, value, Some(export_name.clone()))?;
        Ok(Value::import(export_name))
    }

    /// Add an output exported under an explicit global name.
    pub fn export_as(
        &mut self,
        name: impl Into<String>,
        export_name: impl Into<String>,
        value: Value,
    ) -> SynthResult<Value> {
        let export_name = export_name.into();
        self.insert_output(name.into(), value, Some(export_name.clone()))?;
        Ok(Value::import(export_name))
    }

    /// The global export name for a stack output.
    pub fn export_name(stack: &str, output: &str) -> String {
        format!("{}:{}", stack, output)
    }

    fn insert_output(
        &mut self,
        name: String,
        value: Value,
        export: Option<String>,
    ) -> SynthResult<()> {
        if self.outputs.contains_key(&name) {
            return Err(SynthError::DuplicateOutput {
                stack: self.name.clone(),
                name,
            });
        }
        self.outputs.insert(
            name,
            Output {
                value,
                description: None,
                export,
            },
        );
        Ok(())
    }

    pub fn resources(&self) -> impl Iterator<Item = (&String, &Resource)> {
        self.resources.iter()
    }

    pub fn outputs(&self) -> impl Iterator<Item = (&String, &Output)> {
        self.outputs.iter()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Render this stack to a deployment template.
    pub fn to_template(&self) -> SynthResult<Template> {
        if self.resources.is_empty() {
            return Err(SynthError::EmptyStack(self.name.clone()));
        }
        Template::render(self)
    }

    pub(crate) fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_logical_id_rejected() {
        let mut stack = Stack::new("TestStack", Environment::default());
        stack
            .add_resource("Vpc", Resource::new("AWS::EC2::VPC"))
            .unwrap();
        let err = stack
            .add_resource("Vpc", Resource::new("AWS::EC2::VPC"))
            .unwrap_err();
        assert!(matches!(err, SynthError::DuplicateLogicalId { .. }));
    }

    #[test]
    fn test_export_returns_import_token() {
        let mut stack = Stack::new("Net", Environment::default());
        stack
            .add_resource("Vpc", Resource::new("AWS::EC2::VPC"))
            .unwrap();
        let token = stack.export("vpcId", Value::r#ref("Vpc")).unwrap();
        assert_eq!(token, Value::import("Net:vpcId"));
    }

    #[test]
    fn test_empty_stack_fails_synthesis() {
        let stack = Stack::new("Empty", Environment::default());
        assert!(matches!(
            stack.to_template(),
            Err(SynthError::EmptyStack(_))
        ));
    }

    #[test]
    fn test_china_partition() {
        let env = Environment::default().with_region("cn-north-1");
        assert_eq!(env.partition(), "aws-cn");
        let env = Environment::default().with_region("eu-west-1");
        assert_eq!(env.partition(), "aws");
    }
}
