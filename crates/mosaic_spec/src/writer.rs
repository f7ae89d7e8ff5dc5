//! Manifest file writing.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::SpecResult;
use crate::models::{DeploymentManifest, TileManifest};

/// Writer for tile and deployment manifests.
pub struct SpecWriter;

impl SpecWriter {
    /// Serialize a tile manifest to YAML text.
    pub fn tile_to_yaml(manifest: &TileManifest) -> SpecResult<String> {
        Ok(serde_yaml::to_string(manifest)?)
    }

    /// Write a tile manifest to a file.
    pub fn write_tile(path: impl AsRef<Path>, manifest: &TileManifest) -> SpecResult<()> {
        let path = path.as_ref();
        debug!("Writing tile manifest to {:?}", path);
        fs::write(path, Self::tile_to_yaml(manifest)?)?;
        Ok(())
    }

    /// Serialize a deployment manifest to YAML text.
    pub fn deployment_to_yaml(manifest: &DeploymentManifest) -> SpecResult<String> {
        Ok(serde_yaml::to_string(manifest)?)
    }

    /// Write a deployment manifest to a file.
    pub fn write_deployment(
        path: impl AsRef<Path>,
        manifest: &DeploymentManifest,
    ) -> SpecResult<()> {
        let path = path.as_ref();
        debug!("Writing deployment manifest to {:?}", path);
        fs::write(path, Self::deployment_to_yaml(manifest)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Metadata, TileSpecBody};
    use crate::reader::SpecReader;

    #[test]
    fn test_tile_round_trip() {
        let manifest = TileManifest::new(
            Metadata::new("efs", "0.1.0")
                .with_category(Category::Storage)
                .with_license("MIT"),
            TileSpecBody::default(),
        );

        let yaml = SpecWriter::tile_to_yaml(&manifest).unwrap();
        let parsed = SpecReader::parse_tile(&yaml).unwrap();
        assert_eq!(parsed.name(), "efs");
        assert_eq!(parsed.metadata.category, Some(Category::Storage));
    }
}
