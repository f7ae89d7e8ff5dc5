//! Synth command - synthesize a deployment into templates.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use mosaic_gen::{CompositionPlan, EntryPointGenerator, PlannedValue};
use mosaic_spec::SpecReader;
use mosaic_synth::{App, Stack, Value};
use mosaic_tiles::{Bindings, Bound};

use crate::commands::{open_repo, resolve_instances};
use crate::config::MosaicConfig;

#[derive(Args)]
pub struct SynthArgs {
    /// Deployment manifest file
    #[arg(short, long)]
    deployment: PathBuf,

    /// Output directory for templates (defaults to mosaic.toml, then mosaic.out)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Tile repo used to resolve instances
    #[arg(short, long)]
    repo: Option<PathBuf>,
}

pub fn execute(args: SynthArgs) -> Result<()> {
    let current_dir = std::env::current_dir()?;
    let config = MosaicConfig::load(&current_dir)?;

    let deployment = SpecReader::read_deployment(&args.deployment)?;
    let repo = open_repo(args.repo.as_deref(), config.repo.as_deref());
    let resolved = resolve_instances(&deployment, repo.as_ref())?;
    let plan = CompositionPlan::build(&deployment, &resolved)
        .context("composition failed")?;

    let env = config.environment();
    let mut app = App::new();

    println!("🧱 Composing {} stacks...", plan.instances.len());
    for planned in &plan.instances {
        let stack_env = match &planned.region {
            Some(region) => env.clone().with_region(region.clone()),
            None => env.clone(),
        };
        let mut stack = Stack::new(&planned.stack_name, stack_env);

        let mut bindings = Bindings::new();
        for input in &planned.inputs {
            match &input.value {
                PlannedValue::Literal(value) => bindings.set_literal(&input.name, value.clone()),
                PlannedValue::LiteralList(values) => {
                    bindings.set(&input.name, Bound::List(values.clone()))
                }
                PlannedValue::Wired { export, .. } => {
                    bindings.set_wired(&input.name, Value::import(export.clone()))
                }
            }
        }

        mosaic_tiles::instantiate(&mut stack, &planned.tile_name, &planned.construct_id, &bindings)
            .with_context(|| format!("instance '{}' failed to synthesize", planned.instance))?;
        app.add_stack(stack)?;
        println!(
            "   📄 {} ({} {})",
            planned.stack_name, planned.tile_name, planned.tile_version
        );
    }

    let out_dir = args
        .out
        .or(config.out_dir)
        .unwrap_or_else(mosaic_synth::default_out_dir);
    let manifest = app.synth(&out_dir)?;
    info!(out = %out_dir.display(), stacks = manifest.artifacts.len(), "synthesis complete");

    println!();
    println!(
        "✅ Synthesized {} templates into {}",
        manifest.artifacts.len(),
        out_dir.display()
    );
    println!();
    println!("{}", EntryPointGenerator::new().render_summary(&plan));

    Ok(())
}
