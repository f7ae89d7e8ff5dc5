//! Integration tests for manifest reading, repo discovery and validation.

use std::collections::HashMap;
use std::fs;

use mosaic_spec::{
    Category, InputType, Metadata, OutputType, SpecReader, SpecValidator, SpecWriter, TileInput,
    TileManifest, TileOutput, TileRepo, TileSpecBody, TILE_MANIFEST_FILE,
};

fn tile(name: &str, version: &str, outputs: &[&str]) -> TileManifest {
    TileManifest::new(
        Metadata::new(name, version)
            .with_category(Category::Network)
            .with_license("MIT"),
        TileSpecBody {
            inputs: vec![TileInput::new("cidr", InputType::String).with_default("10.0.0.0/16")],
            outputs: outputs
                .iter()
                .map(|o| TileOutput::new(*o, OutputType::String))
                .collect(),
            notes: vec![],
        },
    )
}

#[test]
fn test_repo_round_trip_through_disk() {
    let temp = tempfile::tempdir().unwrap();

    for (name, version) in [("network", "0.0.1"), ("network", "0.1.0"), ("efs", "0.1.0")] {
        let dir = temp.path().join(name).join(version);
        fs::create_dir_all(&dir).unwrap();
        SpecWriter::write_tile(
            dir.join(TILE_MANIFEST_FILE),
            &tile(name, version, &["vpcId"]),
        )
        .unwrap();
    }

    let repo = TileRepo::open(temp.path()).unwrap();
    let records = repo.discover().unwrap();
    assert_eq!(records.len(), 3);

    let network = repo.lookup("network", "0.0.1").unwrap();
    assert_eq!(network.manifest.version(), "0.0.1");
    assert_eq!(repo.lookup_latest("network").unwrap().version.as_str(), "0.1.0");
}

#[test]
fn test_deployment_validation_end_to_end() {
    let deployment = SpecReader::parse_deployment(
        r#"
apiVersion: mosaic.io/v1alpha1
kind: Deployment
metadata:
  name: search-stack
  version: 0.1.0
spec:
  template:
    tiles:
      network:
        tileReference: network
        tileVersion: 0.1.0
      search:
        tileReference: elasticsearch
        tileVersion: 7.4.0
        dependsOn: [network]
        inputs:
          - name: domainName
            inputValue: logs
          - name: vpcId
            inputValue: $(network.vpcId)
  summary:
    description: Search domain on a dedicated network
    outputs:
      - name: endpoint
        value: $(search.domainEndpoint)
"#,
    )
    .unwrap();

    let search = TileManifest::new(
        Metadata::new("elasticsearch", "7.4.0").with_category(Category::Analysis),
        TileSpecBody {
            inputs: vec![
                TileInput::new("domainName", InputType::String).required(),
                TileInput::new("vpcId", InputType::String).required(),
            ],
            outputs: vec![TileOutput::new("domainEndpoint", OutputType::String)],
            notes: vec![],
        },
    );

    let resolved = HashMap::from([
        ("network".to_string(), tile("network", "0.1.0", &["vpcId"])),
        ("search".to_string(), search),
    ]);

    let result = SpecValidator::validate_deployment(&deployment, &resolved);
    assert!(result.valid, "errors: {:?}", result.errors);
    assert_eq!(deployment.instance_order(), vec!["network", "search"]);
}

#[test]
fn test_version_compatibility_warning_path() {
    let older = tile("network", "0.0.1", &["vpcId", "publicSubnetId1"]);
    let newer = tile("network", "0.1.0", &["vpcId"]);

    let result = SpecValidator::validate_compatibility(&older, &newer);
    assert!(result.valid);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("publicSubnetId1"));
}
