//! Init command - scaffold a tile skeleton in a tile repo.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;

use mosaic_spec::{
    Category, InputType, Metadata, OutputType, SpecWriter, TileInput, TileManifest, TileOutput,
    TileSpecBody, TILE_MANIFEST_FILE,
};

use crate::config::MosaicConfig;

#[derive(Args)]
pub struct InitArgs {
    /// Tile name (kebab-case)
    #[arg(short, long)]
    name: String,

    /// Initial tile version
    #[arg(long, default_value = "0.1.0")]
    tile_version: String,

    /// Tile category
    #[arg(short, long, default_value = "Application")]
    category: String,

    /// Tile repo directory (defaults to mosaic.toml repo)
    #[arg(short, long)]
    repo: Option<PathBuf>,
}

pub fn execute(args: InitArgs) -> Result<()> {
    let current_dir = std::env::current_dir()?;
    let config = MosaicConfig::load(&current_dir)?;

    let repo_root = args
        .repo
        .or(config.repo)
        .unwrap_or_else(|| current_dir.clone());

    let category: Category =
        serde_yaml::from_str(&args.category).context("unrecognized category")?;

    let tile_dir = repo_root.join(&args.name).join(&args.tile_version);
    if tile_dir.exists() {
        bail!(
            "tile '{}' {} already exists at {}",
            args.name,
            args.tile_version,
            tile_dir.display()
        );
    }
    fs::create_dir_all(&tile_dir)?;

    let manifest = TileManifest::new(
        Metadata::new(&args.name, &args.tile_version)
            .with_category(category)
            .with_description("Describe what this tile provisions")
            .with_license("MIT"),
        TileSpecBody {
            inputs: vec![
                TileInput::new("exampleRequired", InputType::String).required(),
                TileInput::new("exampleOptional", InputType::String).with_default("default"),
            ],
            outputs: vec![TileOutput::new("exampleOutput", OutputType::String)],
            notes: vec!["Replace the example inputs and outputs.".to_string()],
        },
    );
    SpecWriter::write_tile(tile_dir.join(TILE_MANIFEST_FILE), &manifest)?;

    fs::write(
        tile_dir.join(".gitignore"),
        "mosaic.out/\n*.template.json\n",
    )?;

    info!(tile = %args.name, version = %args.tile_version, "scaffolded tile");
    println!(
        "✅ Scaffolded tile '{}' {} at {}",
        args.name,
        args.tile_version,
        tile_dir.display()
    );
    println!("   Edit {} to declare inputs and outputs.", TILE_MANIFEST_FILE);

    Ok(())
}
