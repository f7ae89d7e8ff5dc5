//! Validate command - validate tile or deployment manifests.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use tracing::info;

use mosaic_spec::{SpecReader, SpecValidator, ValidationResult};

use crate::commands::{open_repo, resolve_instances};
use crate::config::MosaicConfig;

#[derive(Args)]
pub struct ValidateArgs {
    /// Tile manifest file to validate
    #[arg(short, long, conflicts_with = "deployment")]
    tile: Option<PathBuf>,

    /// Deployment manifest file to validate
    #[arg(short, long)]
    deployment: Option<PathBuf>,

    /// Tile repo used to resolve deployment instances
    #[arg(short, long)]
    repo: Option<PathBuf>,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    let current_dir = std::env::current_dir()?;
    let config = MosaicConfig::load(&current_dir)?;

    let result = match (&args.tile, &args.deployment) {
        (Some(tile_path), None) => {
            info!("Validating tile manifest {:?}", tile_path);
            println!("📋 Validating tile manifest...");
            let manifest = SpecReader::read_tile(tile_path)?;
            let mut result = SpecValidator::validate_tile(&manifest);

            // Output names are a compatibility contract; hold a new
            // version against the newest older one in the repo.
            if let Some(repo) = open_repo(args.repo.as_deref(), config.repo.as_deref()) {
                if let Some(older) = newest_older_version(&repo, &manifest)? {
                    result.merge(SpecValidator::validate_compatibility(&older, &manifest));
                }
            }
            result
        }
        (None, Some(deployment_path)) => {
            info!("Validating deployment manifest {:?}", deployment_path);
            println!("📋 Validating deployment manifest...");
            let deployment = SpecReader::read_deployment(deployment_path)?;
            let repo = open_repo(args.repo.as_deref(), config.repo.as_deref());
            let resolved = resolve_instances(&deployment, repo.as_ref())?;
            SpecValidator::validate_deployment(&deployment, &resolved)
        }
        _ => bail!("pass either --tile or --deployment"),
    };

    report(&result);

    if !result.valid {
        bail!("validation failed");
    }
    Ok(())
}

fn newest_older_version(
    repo: &mosaic_spec::TileRepo,
    manifest: &mosaic_spec::TileManifest,
) -> Result<Option<mosaic_spec::TileManifest>> {
    let version = match mosaic_spec::TileVersion::parse(manifest.version()) {
        Ok(version) => version,
        Err(_) => return Ok(None),
    };

    Ok(repo
        .discover()?
        .into_iter()
        .filter(|record| record.manifest.name() == manifest.name() && record.version < version)
        .max_by(|a, b| a.version.cmp(&b.version))
        .map(|record| record.manifest))
}

fn report(result: &ValidationResult) {
    if result.valid {
        println!("   ✅ Validation passed");
    } else {
        println!("   ❌ Validation failed:");
        for error in &result.errors {
            println!("      - {}", error);
        }
    }
    for warning in &result.warnings {
        println!("   ⚠️  {}", warning);
    }
}
