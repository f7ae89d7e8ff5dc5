//! Generate command - emit the composed entry-point source.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use mosaic_gen::{CompositionPlan, EntryPointGenerator};
use mosaic_spec::SpecReader;

use crate::commands::{open_repo, resolve_instances};
use crate::config::MosaicConfig;

#[derive(Args)]
pub struct GenerateArgs {
    /// Deployment manifest file
    #[arg(short, long)]
    deployment: PathBuf,

    /// File to write the entry-point source to (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Out dir the generated program synthesizes into
    #[arg(long, default_value = "mosaic.out")]
    out_dir: String,

    /// Tile repo used to resolve instances
    #[arg(short, long)]
    repo: Option<PathBuf>,
}

pub fn execute(args: GenerateArgs) -> Result<()> {
    let current_dir = std::env::current_dir()?;
    let config = MosaicConfig::load(&current_dir)?;

    let deployment = SpecReader::read_deployment(&args.deployment)?;
    let repo = open_repo(args.repo.as_deref(), config.repo.as_deref());
    let resolved = resolve_instances(&deployment, repo.as_ref())?;
    let plan = CompositionPlan::build(&deployment, &resolved)
        .context("composition failed")?;

    let source = EntryPointGenerator::new()
        .with_out_dir(&args.out_dir)
        .generate(&plan);

    match &args.output {
        Some(path) => {
            fs::write(path, &source)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(file = %path.display(), "wrote entry point");
            println!(
                "✅ Generated entry point for '{}' ({} stacks) at {}",
                plan.deployment,
                plan.instances.len(),
                path.display()
            );
        }
        None => print!("{}", source),
    }

    Ok(())
}
