//! List command - list tiles in a repo or the builtin catalog.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use mosaic_spec::{TileManifest, TileRepo};

use crate::commands::open_repo;
use crate::config::MosaicConfig;

#[derive(Args)]
pub struct ListArgs {
    /// Tile repo directory (defaults to mosaic.toml repo, then the
    /// builtin catalog)
    #[arg(short, long)]
    repo: Option<PathBuf>,

    /// Output format: json
    #[arg(short, long)]
    output: Option<String>,
}

pub fn execute(args: ListArgs) -> Result<()> {
    let current_dir = std::env::current_dir()?;
    let config = MosaicConfig::load(&current_dir)?;

    let repo = open_repo(args.repo.as_deref(), config.repo.as_deref());
    let (source, manifests): (&str, Vec<TileManifest>) = match &repo {
        Some(repo) => ("repo", discover(repo)?),
        None => ("builtin", mosaic_tiles::builtin_manifests()),
    };

    if args.output.as_deref() == Some("json") {
        let records: Vec<_> = manifests
            .iter()
            .map(|m| {
                json!({
                    "name": m.name(),
                    "version": m.version(),
                    "category": m.metadata.category.map(|c| c.to_string()),
                    "license": m.metadata.license,
                    "description": m.metadata.description,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!("📦 Tiles ({})", source);
    println!("{:<20} {:<10} {:<20} {}", "NAME", "VERSION", "CATEGORY", "LICENSE");
    for manifest in &manifests {
        println!(
            "{:<20} {:<10} {:<20} {}",
            manifest.name(),
            manifest.version(),
            manifest
                .metadata
                .category
                .map(|c| c.to_string())
                .unwrap_or_default(),
            manifest.metadata.license.as_deref().unwrap_or("-"),
        );
    }
    println!();
    println!("{} tiles", manifests.len());

    Ok(())
}

fn discover(repo: &TileRepo) -> Result<Vec<TileManifest>> {
    Ok(repo
        .discover()?
        .into_iter()
        .map(|record| record.manifest)
        .collect())
}
