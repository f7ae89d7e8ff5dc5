//! Manifest file reading.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{SpecError, SpecResult};
use crate::models::{DeploymentManifest, TileManifest, API_VERSION};

/// Reader for tile and deployment manifests.
pub struct SpecReader;

impl SpecReader {
    /// Read a tile manifest from a file.
    pub fn read_tile(path: impl AsRef<Path>) -> SpecResult<TileManifest> {
        let path = path.as_ref();
        debug!("Reading tile manifest from {:?}", path);
        let content = fs::read_to_string(path)?;
        Self::parse_tile(&content).map_err(|e| invalid(path, e))
    }

    /// Parse a tile manifest from YAML text.
    pub fn parse_tile(content: &str) -> SpecResult<TileManifest> {
        let manifest: TileManifest = serde_yaml::from_str(content)?;
        Self::check_header(&manifest.api_version, &manifest.kind, TileManifest::KIND)?;
        Ok(manifest)
    }

    /// Read a deployment manifest from a file.
    ///
    /// Tile-instance order is the file's authoring order.
    pub fn read_deployment(path: impl AsRef<Path>) -> SpecResult<DeploymentManifest> {
        let path = path.as_ref();
        debug!("Reading deployment manifest from {:?}", path);
        let content = fs::read_to_string(path)?;
        Self::parse_deployment(&content).map_err(|e| invalid(path, e))
    }

    /// Parse a deployment manifest from YAML text.
    pub fn parse_deployment(content: &str) -> SpecResult<DeploymentManifest> {
        let manifest: DeploymentManifest = serde_yaml::from_str(content)?;
        Self::check_header(
            &manifest.api_version,
            &manifest.kind,
            DeploymentManifest::KIND,
        )?;
        if manifest.spec.template.tiles.is_empty() {
            return Err(SpecError::ValidationFailed(
                "deployment declares no tiles".to_string(),
            ));
        }
        Ok(manifest)
    }

    fn check_header(api_version: &str, kind: &str, expected_kind: &str) -> SpecResult<()> {
        if api_version != API_VERSION {
            return Err(SpecError::ValidationFailed(format!(
                "unsupported apiVersion '{}', expected '{}'",
                api_version, API_VERSION
            )));
        }
        if kind != expected_kind {
            return Err(SpecError::ValidationFailed(format!(
                "unexpected kind '{}', expected '{}'",
                kind, expected_kind
            )));
        }
        Ok(())
    }
}

fn invalid(path: &Path, err: SpecError) -> SpecError {
    match err {
        SpecError::Yaml(e) => SpecError::InvalidManifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE_YAML: &str = r#"
apiVersion: mosaic.io/v1alpha1
kind: Tile
metadata:
  name: network
  category: Network
  version: 0.1.0
spec:
  inputs:
    - name: cidr
      inputType: String
      defaultValue: 10.0.0.0/16
  outputs:
    - name: vpcId
      outputType: String
    - name: publicSubnetId1
      outputType: String
"#;

    const DEPLOYMENT_YAML: &str = r#"
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
        tileReference: eks-spot
        tileVersion: 0.5.0
        dependsOn: [network]
        inputs:
          - name: vpcId
            inputValue: $(network.vpcId)
  summary:
    description: Simple cluster on a fresh network
"#;

    #[test]
    fn test_parse_tile() {
        let tile = SpecReader::parse_tile(TILE_YAML).unwrap();
        assert_eq!(tile.name(), "network");
        assert_eq!(tile.spec.outputs.len(), 2);
        assert_eq!(
            tile.input("cidr").unwrap().default_value.as_deref(),
            Some("10.0.0.0/16")
        );
    }

    #[test]
    fn test_parse_deployment_preserves_order() {
        let deployment = SpecReader::parse_deployment(DEPLOYMENT_YAML).unwrap();
        assert_eq!(deployment.instance_order(), vec!["network", "cluster"]);
        let cluster = deployment.instance("cluster").unwrap();
        assert_eq!(cluster.depends_on, vec!["network"]);
        assert_eq!(
            cluster.binding("vpcId").unwrap().output_ref().unwrap().instance,
            "network"
        );
    }

    #[test]
    fn test_rejects_wrong_kind() {
        let swapped = TILE_YAML.replace("kind: Tile", "kind: Deployment");
        assert!(SpecReader::parse_tile(&swapped).is_err());
    }

    #[test]
    fn test_rejects_empty_deployment() {
        let yaml = r#"
apiVersion: mosaic.io/v1alpha1
kind: Deployment
metadata:
  name: empty
  version: 0.1.0
spec:
  template:
    tiles: {}
"#;
        assert!(SpecReader::parse_deployment(yaml).is_err());
    }
}
