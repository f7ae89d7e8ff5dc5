//! CLI command definitions.
//!
//! Each subcommand maps to one authoring workflow around the tile
//! catalog: scaffold, list, validate, synthesize, generate.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use mosaic_spec::{DeploymentManifest, TileManifest, TileRepo};

pub mod generate;
pub mod init;
pub mod list;
pub mod synth;
pub mod validate;

/// Mosaic - tile catalog and stack composer
#[derive(Parser)]
#[command(name = "mosaic")]
#[command(version, about = "Mosaic - Infrastructure-as-Code tile catalog and stack composer")]
#[command(long_about = r#"
Mosaic is a catalog of parameterized Infrastructure-as-Code tiles and a
composer that assembles selected tiles into deployable stacks rendered
as static templates.

WORKFLOWS:
  init      → Scaffold a new tile skeleton in a tile repo
  list      → List tiles in a repo or the builtin catalog
  validate  → Validate a tile or deployment manifest
  synth     → Synthesize a deployment into templates
  generate  → Emit the composed entry-point source for a deployment

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  4 - Composition/generation error
  5 - Synthesis error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scaffold a new tile skeleton in a tile repo
    Init(init::InitArgs),

    /// List tiles in a repo or the builtin catalog
    List(list::ListArgs),

    /// Validate a tile or deployment manifest
    Validate(validate::ValidateArgs),

    /// Synthesize a deployment into templates
    Synth(synth::SynthArgs),

    /// Emit the composed entry-point source for a deployment
    Generate(generate::GenerateArgs),
}

/// Resolve every tile instance of a deployment to a manifest: the
/// on-disk repo wins, the builtin catalog is the fallback.
pub(crate) fn resolve_instances(
    deployment: &DeploymentManifest,
    repo: Option<&TileRepo>,
) -> Result<HashMap<String, TileManifest>> {
    let mut resolved = HashMap::new();

    for (instance_name, instance) in &deployment.spec.template.tiles {
        let from_repo = repo.and_then(|r| {
            r.lookup(&instance.tile_reference, &instance.tile_version)
                .map(|record| record.manifest)
                .ok()
        });

        let manifest = match from_repo {
            Some(manifest) => manifest,
            None => match mosaic_tiles::builtin_manifest(&instance.tile_reference) {
                Some(manifest) => {
                    debug!(
                        tile = %instance.tile_reference,
                        "resolved from builtin catalog"
                    );
                    manifest
                }
                None => bail!(
                    "instance '{}' references tile '{}' {} which is not in the repo or the builtin catalog",
                    instance_name,
                    instance.tile_reference,
                    instance.tile_version
                ),
            },
        };

        resolved.insert(instance_name.clone(), manifest);
    }

    Ok(resolved)
}

/// Open the tile repo named by flag or configuration, when present.
pub(crate) fn open_repo(flag: Option<&Path>, config_repo: Option<&Path>) -> Option<TileRepo> {
    flag.or(config_repo)
        .and_then(|path| TileRepo::open(path).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_gen::{CompositionPlan, PlannedValue};
    use mosaic_spec::{SpecReader, SpecValidator};
    use mosaic_synth::{App, Stack, Value};
    use mosaic_tiles::{Bindings, Bound};
    use std::path::PathBuf;

    fn shipped_deployment(name: &str) -> DeploymentManifest {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../deployments")
            .join(name);
        SpecReader::read_deployment(path).unwrap()
    }

    fn synthesize(deployment: &DeploymentManifest) -> Vec<mosaic_synth::Template> {
        let resolved = resolve_instances(deployment, None).unwrap();

        let result = SpecValidator::validate_deployment(deployment, &resolved);
        assert!(result.valid, "errors: {:?}", result.errors);

        let plan = CompositionPlan::build(deployment, &resolved).unwrap();
        let mut app = App::new();
        for planned in &plan.instances {
            let mut stack = Stack::new(&planned.stack_name, mosaic_synth::Environment::default());
            let mut bindings = Bindings::new();
            for input in &planned.inputs {
                match &input.value {
                    PlannedValue::Literal(v) => bindings.set_literal(&input.name, v.clone()),
                    PlannedValue::LiteralList(v) => {
                        bindings.set(&input.name, Bound::List(v.clone()))
                    }
                    PlannedValue::Wired { export, .. } => {
                        bindings.set_wired(&input.name, Value::import(export.clone()))
                    }
                }
            }
            mosaic_tiles::instantiate(
                &mut stack,
                &planned.tile_name,
                &planned.construct_id,
                &bindings,
            )
            .unwrap();
            app.add_stack(stack).unwrap();
        }
        app.render().unwrap()
    }

    #[test]
    fn test_shipped_eks_deployment_synthesizes() {
        let deployment = shipped_deployment("eks-simple.yaml");
        let templates = synthesize(&deployment);
        assert_eq!(templates.len(), 2);
        assert!(templates[0].has_resource("AWS::EC2::VPC"));
        assert!(templates[1].has_resource("AWS::EKS::Cluster"));
        assert!(templates[1].has_resource("AWS::AutoScaling::AutoScalingGroup"));
    }

    #[test]
    fn test_shipped_data_services_deployment_synthesizes() {
        let deployment = shipped_deployment("data-services.yaml");
        let templates = synthesize(&deployment);
        assert_eq!(templates.len(), 5);

        let all_types: Vec<String> = templates.iter().flat_map(|t| t.resource_types()).collect();
        for marker in [
            "AWS::RDS::DBCluster",
            "AWS::ElastiCache::ReplicationGroup",
            "AWS::Elasticsearch::Domain",
            "AWS::EFS::FileSystem",
        ] {
            assert!(all_types.iter().any(|t| t == marker), "missing {}", marker);
        }
    }

    #[test]
    fn test_resolve_falls_back_to_builtin_catalog() {
        let deployment = shipped_deployment("eks-simple.yaml");
        let resolved = resolve_instances(&deployment, None).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved["cluster"].name(), "eks-spot");
    }
}
