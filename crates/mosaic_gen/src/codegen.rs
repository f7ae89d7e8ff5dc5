//! Entry-point source emission.
//!
//! Mechanically turns a [`CompositionPlan`] into the source text of a
//! program that instantiates each planned tile in its own stack and
//! synthesizes the app. Pure text substitution: all resolution and
//! ordering already happened at plan construction.

use std::collections::HashMap;

use regex::Regex;
use tracing::info;

use crate::plan::{CompositionPlan, PlannedInstance, PlannedValue};
use crate::renderer::Renderer;

const HEADER_TEMPLATE: &str = r#"//! Deployment entry point for '{{deployment}}'.
//!
//! Composed by the mosaic generator from the deployment manifest.
//! Regenerate after editing the manifest; do not edit by hand.

use std::path::Path;

use mosaic_synth::{App, Environment, Stack, Value};
use mosaic_tiles::{instantiate, Bindings, Bound};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = Environment::from_env();
    let mut app = App::new();
"#;

const FOOTER_TEMPLATE: &str = r#"
    app.synth(Path::new("{{out_dir}}"))?;
    Ok(())
}
"#;

/// Generator for deployment entry points.
pub struct EntryPointGenerator {
    renderer: Renderer,
    out_dir: String,
}

impl EntryPointGenerator {
    pub fn new() -> Self {
        Self {
            renderer: Renderer::new(),
            out_dir: "mosaic.out".to_string(),
        }
    }

    /// Override the out dir the generated program synthesizes into.
    pub fn with_out_dir(mut self, out_dir: impl Into<String>) -> Self {
        self.out_dir = out_dir.into();
        self
    }

    /// Emit the entry-point source for a composition plan.
    pub fn generate(&self, plan: &CompositionPlan) -> String {
        let mut vars = HashMap::new();
        vars.insert("deployment".to_string(), plan.deployment.clone());
        vars.insert("out_dir".to_string(), self.out_dir.clone());

        let mut source = self.renderer.render(HEADER_TEMPLATE, &vars);
        for instance in &plan.instances {
            source.push_str(&self.instance_block(instance));
        }
        source.push_str(&self.renderer.render(FOOTER_TEMPLATE, &vars));

        info!(
            deployment = %plan.deployment,
            stacks = plan.instances.len(),
            "generated entry point"
        );
        source
    }

    fn instance_block(&self, instance: &PlannedInstance) -> String {
        let env_expr = match &instance.region {
            Some(region) => format!("env.clone().with_region({})", quote(region)),
            None => "env.clone()".to_string(),
        };

        let mut block = format!(
            r#"
    // {instance}: {tile} {version}
    let mut {stack_var} = Stack::new({stack_name}, {env_expr});
    let mut bindings = Bindings::new();
"#,
            instance = instance.instance,
            tile = instance.tile_name,
            version = instance.tile_version,
            stack_var = instance.stack_variable,
            stack_name = quote(&instance.stack_name),
            env_expr = env_expr,
        );

        for input in &instance.inputs {
            let line = match &input.value {
                PlannedValue::Literal(value) => format!(
                    "    bindings.set_literal({}, {});\n",
                    quote(&input.name),
                    quote(value)
                ),
                PlannedValue::LiteralList(values) => {
                    let items: Vec<String> = values
                        .iter()
                        .map(|v| format!("{}.to_string()", quote(v)))
                        .collect();
                    format!(
                        "    bindings.set({}, Bound::List(vec![{}]));\n",
                        quote(&input.name),
                        items.join(", ")
                    )
                }
                PlannedValue::Wired { export, .. } => format!(
                    "    bindings.set_wired({}, Value::import({}));\n",
                    quote(&input.name),
                    quote(export)
                ),
            };
            block.push_str(&line);
        }

        block.push_str(&format!(
            "    instantiate(&mut {stack_var}, {tile}, {construct_id}, &bindings)?;\n    app.add_stack({stack_var})?;\n",
            stack_var = instance.stack_variable,
            tile = quote(&instance.tile_name),
            construct_id = quote(&instance.construct_id),
        ));

        block
    }

    /// Render the deployment summary with output references replaced by
    /// the export names the synthesized templates publish them under.
    pub fn render_summary(&self, plan: &CompositionPlan) -> String {
        let reference = Regex::new(r"\$\(([A-Za-z0-9_-]+)\.([A-Za-z0-9_]+)\)").unwrap();
        let resolve = |text: &str| -> String {
            reference
                .replace_all(text, |caps: &regex::Captures| match plan.stack_of(&caps[1]) {
                    Some(stack) => mosaic_synth::Stack::export_name(stack, &caps[2]),
                    None => caps[0].to_string(),
                })
                .to_string()
        };

        let mut lines = Vec::new();
        lines.push("======================== Summary ========================".to_string());
        if !plan.summary.description.is_empty() {
            lines.push(resolve(&plan.summary.description));
            lines.push(String::new());
        }
        for output in &plan.summary.outputs {
            lines.push(format!("{} = {}", output.name, resolve(&output.value)));
        }
        for note in &plan.summary.notes {
            lines.push(resolve(note));
        }
        lines.push("=========================================================".to_string());
        lines.join("\n")
    }
}

impl Default for EntryPointGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Quote a string as a Rust string literal.
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_spec::{
        InputType, Metadata, OutputType, SpecReader, TileInput, TileManifest, TileOutput,
        TileSpecBody,
    };
    use std::collections::HashMap;

    fn plan() -> CompositionPlan {
        let deployment = SpecReader::parse_deployment(
            r#"
apiVersion: mosaic.io/v1alpha1
kind: Deployment
metadata:
  name: eks-simple
  version: 0.1.0
spec:
  template:
    tiles:
      network:
        tileReference: network
        tileVersion: 0.1.0
        inputs:
          - name: cidr
            inputValue: 10.0.0.0/16
      cluster:
        tileReference: eks
        tileVersion: 0.0.5
        inputs:
          - name: vpcId
            inputValue: $(network.vpcId)
          - name: clusterName
            inputValue: workloads
  summary:
    description: Cluster endpoint is exported as $(cluster.clusterEndpoint)
    outputs:
      - name: vpcId
        value: $(network.vpcId)
"#,
        )
        .unwrap();

        let network = TileManifest::new(
            Metadata::new("network", "0.1.0"),
            TileSpecBody {
                inputs: vec![TileInput::new("cidr", InputType::String)],
                outputs: vec![TileOutput::new("vpcId", OutputType::String)],
                notes: vec![],
            },
        );
        let eks = TileManifest::new(
            Metadata::new("eks", "0.0.5"),
            TileSpecBody {
                inputs: vec![
                    TileInput::new("vpcId", InputType::String).required(),
                    TileInput::new("clusterName", InputType::String).required(),
                ],
                outputs: vec![TileOutput::new("clusterEndpoint", OutputType::String)],
                notes: vec![],
            },
        );

        let resolved = HashMap::from([
            ("network".to_string(), network),
            ("cluster".to_string(), eks),
        ]);
        CompositionPlan::build(&deployment, &resolved).unwrap()
    }

    #[test]
    fn test_generated_source_shape() {
        let source = EntryPointGenerator::new().generate(&plan());

        assert!(source.contains("fn main()"));
        assert!(source.contains("let mut network_stack = Stack::new(\"NetworkStack\""));
        assert!(source.contains("bindings.set_literal(\"cidr\", \"10.0.0.0/16\");"));
        assert!(source
            .contains("bindings.set_wired(\"vpcId\", Value::import(\"NetworkStack:vpcId\"));"));
        assert!(source.contains("app.synth(Path::new(\"mosaic.out\"))?;"));

        // Producer block is emitted before the consumer block.
        let network_at = source.find("NetworkStack").unwrap();
        let cluster_at = source.find("ClusterStack").unwrap();
        assert!(network_at < cluster_at);
    }

    #[test]
    fn test_out_dir_override() {
        let source = EntryPointGenerator::new()
            .with_out_dir("build/out")
            .generate(&plan());
        assert!(source.contains("app.synth(Path::new(\"build/out\"))?;"));
    }

    #[test]
    fn test_summary_resolves_references_to_exports() {
        let summary = EntryPointGenerator::new().render_summary(&plan());
        assert!(summary.contains("vpcId = NetworkStack:vpcId"));
        assert!(summary.contains("ClusterStack:clusterEndpoint"));
    }
}
