//! Composition plans.
//!
//! A plan resolves every tile instance of a deployment against the
//! catalog, resolves `$(instance.output)` bindings into cross-stack
//! wirings, and orders instances so every producer precedes its
//! consumers. Ordering is fixed here, at construction; synthesis and
//! generation consume the plan as-is.

use std::collections::HashMap;

use mosaic_spec::{Category, DeploymentManifest, DeploymentSummary, TileManifest};
use mosaic_synth::Stack;
use serde::Serialize;
use tracing::debug;

use crate::error::{GenError, GenResult};
use crate::renderer::Renderer;

/// A planned input value: a literal from the manifest, or a wiring to a
/// producer stack's export.
#[derive(Debug, Clone, Serialize)]
pub enum PlannedValue {
    Literal(String),
    LiteralList(Vec<String>),
    Wired {
        producer_instance: String,
        producer_stack: String,
        output: String,
        export: String,
    },
}

/// One bound input on a planned instance.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedInput {
    pub name: String,
    pub value: PlannedValue,
}

/// One tile instance, resolved and ordered.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedInstance {
    /// Instance name from the deployment manifest.
    pub instance: String,
    pub tile_name: String,
    pub tile_version: String,
    pub category: Option<Category>,
    /// Stack hosting this instance.
    pub stack_name: String,
    /// Identifiers used by the generated entry point.
    pub stack_variable: String,
    pub construct_id: String,
    pub inputs: Vec<PlannedInput>,
    pub region: Option<String>,
    /// Producers this instance must come after.
    pub comes_after: Vec<String>,
}

/// A dependency-ordered composition plan for one deployment.
#[derive(Debug, Clone, Serialize)]
pub struct CompositionPlan {
    pub deployment: String,
    pub instances: Vec<PlannedInstance>,
    pub summary: DeploymentSummary,
}

impl CompositionPlan {
    /// Build a plan from a deployment and the resolved tile manifests
    /// of its instances (instance name -> manifest).
    pub fn build(
        deployment: &DeploymentManifest,
        resolved: &HashMap<String, TileManifest>,
    ) -> GenResult<Self> {
        let renderer = Renderer::new();

        // Stack names are fixed up front so wirings can point at them
        // before ordering is settled.
        let stack_names: HashMap<&str, String> = deployment
            .instance_order()
            .into_iter()
            .map(|name| (name, format!("{}Stack", renderer.to_pascal_case(name))))
            .collect();

        let mut instances = Vec::new();
        for (instance_name, instance) in &deployment.spec.template.tiles {
            let manifest = resolved
                .get(instance_name)
                .ok_or_else(|| GenError::UnresolvedInstance(instance_name.to_string()))?;

            let mut comes_after: Vec<String> = instance.depends_on.clone();
            let mut inputs = Vec::new();

            for binding in &instance.inputs {
                let value = match binding.output_ref() {
                    Some(reference) => {
                        let producer = resolved.get(&reference.instance).ok_or_else(|| {
                            GenError::UnknownProducer {
                                instance: instance_name.to_string(),
                                producer: reference.instance.clone(),
                            }
                        })?;
                        if producer.output(&reference.output).is_none() {
                            return Err(GenError::UndeclaredOutput {
                                instance: instance_name.to_string(),
                                producer: reference.instance.clone(),
                                output: reference.output.clone(),
                            });
                        }
                        if !comes_after.contains(&reference.instance) {
                            comes_after.push(reference.instance.clone());
                        }

                        let producer_stack = stack_names
                            .get(reference.instance.as_str())
                            .cloned()
                            .ok_or_else(|| GenError::UnknownProducer {
                                instance: instance_name.to_string(),
                                producer: reference.instance.clone(),
                            })?;
                        PlannedValue::Wired {
                            export: Stack::export_name(&producer_stack, &reference.output),
                            producer_stack,
                            producer_instance: reference.instance.clone(),
                            output: reference.output.clone(),
                        }
                    }
                    None => match (&binding.input_value, &binding.input_values) {
                        (Some(value), _) => PlannedValue::Literal(value.clone()),
                        (None, Some(values)) => PlannedValue::LiteralList(values.clone()),
                        (None, None) => PlannedValue::Literal(String::new()),
                    },
                };
                inputs.push(PlannedInput {
                    name: binding.name.clone(),
                    value,
                });
            }

            instances.push(PlannedInstance {
                instance: instance_name.to_string(),
                tile_name: manifest.name().to_string(),
                tile_version: manifest.version().to_string(),
                category: manifest.metadata.category,
                stack_name: stack_names[instance_name.as_str()].clone(),
                stack_variable: format!("{}_stack", renderer.to_snake_case(instance_name)),
                construct_id: renderer.to_pascal_case(instance_name),
                inputs,
                region: instance.region.clone(),
                comes_after,
            });
        }

        let ordered = order_instances(instances)?;
        debug!(
            deployment = deployment.name(),
            instances = ordered.len(),
            "built composition plan"
        );

        Ok(Self {
            deployment: deployment.name().to_string(),
            instances: ordered,
            summary: deployment.spec.summary.clone(),
        })
    }

    pub fn instance(&self, name: &str) -> Option<&PlannedInstance> {
        self.instances.iter().find(|i| i.instance == name)
    }

    /// Stack name hosting an instance, if planned.
    pub fn stack_of(&self, instance: &str) -> Option<&str> {
        self.instance(instance).map(|i| i.stack_name.as_str())
    }
}

/// Producer-before-consumer order, stable with respect to authoring
/// order among independent instances.
fn order_instances(pending: Vec<PlannedInstance>) -> GenResult<Vec<PlannedInstance>> {
    let mut pending = pending;
    let mut ordered: Vec<PlannedInstance> = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let emitted: Vec<String> = ordered.iter().map(|i| i.instance.clone()).collect();
        let position = pending.iter().position(|candidate| {
            candidate
                .comes_after
                .iter()
                .all(|dep| emitted.iter().any(|e| e == dep))
        });

        match position {
            Some(index) => ordered.push(pending.remove(index)),
            None => {
                return Err(GenError::DependencyCycle(
                    pending.into_iter().map(|i| i.instance).collect(),
                ))
            }
        }
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_spec::{
        InputType, Metadata, OutputType, SpecReader, TileInput, TileOutput, TileSpecBody,
    };

    fn tile(name: &str, inputs: &[(&str, bool)], outputs: &[&str]) -> TileManifest {
        TileManifest::new(
            Metadata::new(name, "0.1.0"),
            TileSpecBody {
                inputs: inputs
                    .iter()
                    .map(|(n, required)| {
                        let input = TileInput::new(*n, InputType::String);
                        if *required {
                            input.required()
                        } else {
                            input
                        }
                    })
                    .collect(),
                outputs: outputs
                    .iter()
                    .map(|o| TileOutput::new(*o, OutputType::String))
                    .collect(),
                notes: vec![],
            },
        )
    }

    fn deployment(yaml: &str) -> DeploymentManifest {
        SpecReader::parse_deployment(yaml).unwrap()
    }

    const WIRED: &str = r#"
apiVersion: mosaic.io/v1alpha1
kind: Deployment
metadata:
  name: wired
  version: 0.1.0
spec:
  template:
    tiles:
      cluster:
        tileReference: eks
        tileVersion: 0.1.0
        inputs:
          - name: vpcId
            inputValue: $(network.vpcId)
      network:
        tileReference: network
        tileVersion: 0.1.0
"#;

    #[test]
    fn test_reference_implies_ordering() {
        // The consumer is authored first; the plan must reorder.
        let resolved = HashMap::from([
            ("network".to_string(), tile("network", &[], &["vpcId"])),
            (
                "cluster".to_string(),
                tile("eks", &[("vpcId", true)], &["clusterEndpoint"]),
            ),
        ]);

        let plan = CompositionPlan::build(&deployment(WIRED), &resolved).unwrap();
        let order: Vec<&str> = plan.instances.iter().map(|i| i.instance.as_str()).collect();
        assert_eq!(order, vec!["network", "cluster"]);

        let cluster = plan.instance("cluster").unwrap();
        match &cluster.inputs[0].value {
            PlannedValue::Wired { export, producer_stack, .. } => {
                assert_eq!(producer_stack, "NetworkStack");
                assert_eq!(export, "NetworkStack:vpcId");
            }
            other => panic!("expected wired value, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_is_detected() {
        let yaml = r#"
apiVersion: mosaic.io/v1alpha1
kind: Deployment
metadata:
  name: cyclic
  version: 0.1.0
spec:
  template:
    tiles:
      first:
        tileReference: network
        tileVersion: 0.1.0
        dependsOn: [second]
      second:
        tileReference: network
        tileVersion: 0.1.0
        dependsOn: [first]
"#;
        let resolved = HashMap::from([
            ("first".to_string(), tile("network", &[], &["vpcId"])),
            ("second".to_string(), tile("network", &[], &["vpcId"])),
        ]);

        let err = CompositionPlan::build(&deployment(yaml), &resolved).unwrap_err();
        assert!(matches!(err, GenError::DependencyCycle(_)));
    }

    #[test]
    fn test_undeclared_output_is_rejected() {
        let resolved = HashMap::from([
            ("network".to_string(), tile("network", &[], &["somethingElse"])),
            (
                "cluster".to_string(),
                tile("eks", &[("vpcId", true)], &["clusterEndpoint"]),
            ),
        ]);

        let err = CompositionPlan::build(&deployment(WIRED), &resolved).unwrap_err();
        assert!(matches!(err, GenError::UndeclaredOutput { .. }));
    }

    #[test]
    fn test_identifiers_derived_from_instance_names() {
        let yaml = r#"
apiVersion: mosaic.io/v1alpha1
kind: Deployment
metadata:
  name: naming
  version: 0.1.0
spec:
  template:
    tiles:
      base-network:
        tileReference: network
        tileVersion: 0.1.0
"#;
        let resolved = HashMap::from([(
            "base-network".to_string(),
            tile("network", &[], &["vpcId"]),
        )]);

        let plan = CompositionPlan::build(&deployment(yaml), &resolved).unwrap();
        let instance = &plan.instances[0];
        assert_eq!(instance.stack_name, "BaseNetworkStack");
        assert_eq!(instance.stack_variable, "base_network_stack");
        assert_eq!(instance.construct_id, "BaseNetwork");
    }
}
