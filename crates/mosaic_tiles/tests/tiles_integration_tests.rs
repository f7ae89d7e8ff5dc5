//! Integration tests composing catalog tiles across stacks.

use mosaic_synth::{App, Environment, Stack, Value};
use mosaic_tiles::eks_spot::{EksSpotProps, EksSpotTile};
use mosaic_tiles::network::{NetworkProps, NetworkTile};
use mosaic_tiles::{instantiate, Bindings, VpcAttributes};

#[test]
fn test_network_feeds_cluster_across_stacks() {
    let env = Environment::default().with_region("eu-west-1");
    let mut app = App::new();

    let mut network_stack = Stack::new("NetworkStack", env.clone());
    NetworkTile::new(&mut network_stack, "Network", NetworkProps::default()).unwrap();
    app.add_stack(network_stack).unwrap();

    let mut cluster_stack = Stack::new("ClusterStack", env);
    EksSpotTile::new(
        &mut cluster_stack,
        "Cluster",
        EksSpotProps {
            vpc: VpcAttributes::from_exports("NetworkStack"),
            cluster_name: "workloads".to_string(),
            cluster_version: None,
            key_pair: "ops-keypair".to_string(),
            capacity_instances: None,
            max_size: None,
            min_size: None,
            desired_capacity: None,
            cooldown: None,
            on_demand_percentage: None,
        },
    )
    .unwrap();
    app.add_stack(cluster_stack).unwrap();

    let out = tempfile::tempdir().unwrap();
    let manifest = app.synth(out.path()).unwrap();
    assert_eq!(manifest.artifacts.len(), 2);

    let templates = app.render().unwrap();
    let network = &templates[0];
    let cluster = &templates[1];

    assert!(network.has_resource("AWS::EC2::VPC"));
    assert!(cluster.has_resource("AWS::EKS::Cluster"));

    // The cluster's subnets come in through the network stack's exports.
    let rendered = serde_json::to_string(cluster.body()).unwrap();
    assert!(rendered.contains("NetworkStack:publicSubnetId1"));
    assert!(rendered.contains("Fn::ImportValue"));
}

#[test]
fn test_generic_instantiation_matches_typed_path() {
    let mut stack = Stack::new("NetworkStack", Environment::default());
    let mut bindings = Bindings::new();
    bindings.set_literal("cidr", "192.168.0.0/16");

    let outputs = instantiate(&mut stack, "network", "Network", &bindings).unwrap();
    assert!(outputs.get("vpcId").is_some());
    assert_eq!(outputs.get("vpcCidr"), Some(&Value::from("192.168.0.0/16")));

    let template = stack.to_template().unwrap();
    assert!(template.has_resource("AWS::EC2::VPC"));
    assert!(template.output("vpcId").is_some());
}

#[test]
fn test_each_tile_synthesizes_its_marker_resource() {
    // Network attributes reused for the tiles that need a VPC.
    let vpc_bindings = |b: &mut Bindings| {
        b.set_wired("vpcId", Value::import("Net:vpcId"));
        b.set_wired("vpcCidr", Value::import("Net:vpcCidr"));
        b.set_wired("publicSubnetId1", Value::import("Net:publicSubnetId1"));
        b.set_wired("publicSubnetId2", Value::import("Net:publicSubnetId2"));
        b.set_wired("privateSubnetId1", Value::import("Net:privateSubnetId1"));
        b.set_wired("privateSubnetId2", Value::import("Net:privateSubnetId2"));
    };

    let cases: Vec<(&str, Box<dyn Fn(&mut Bindings)>, &str)> = vec![
        (
            "eks",
            Box::new(|b: &mut Bindings| {
                vpc_bindings(b);
                b.set_literal("clusterName", "basic");
            }),
            "AWS::EKS::Nodegroup",
        ),
        (
            "eks-spot",
            Box::new(|b: &mut Bindings| {
                vpc_bindings(b);
                b.set_literal("clusterName", "spot");
                b.set_literal("keyPairName", "ops");
            }),
            "AWS::AutoScaling::AutoScalingGroup",
        ),
        (
            "aurora-mysql",
            Box::new(|b: &mut Bindings| {
                vpc_bindings(b);
                b.set_literal("username", "admin");
                b.set_literal("dbname", "orders");
            }),
            "AWS::RDS::DBCluster",
        ),
        (
            "elasticache-redis",
            Box::new(|b: &mut Bindings| {
                b.set_wired("vpcId", Value::import("Net:vpcId"));
                b.set_wired("vpcCidr", Value::import("Net:vpcCidr"));
                b.set_wired("subnetId1", Value::import("Net:privateSubnetId1"));
                b.set_wired("subnetId2", Value::import("Net:privateSubnetId2"));
                b.set_literal("redisClusterName", "sessions");
            }),
            "AWS::ElastiCache::ReplicationGroup",
        ),
        (
            "elasticsearch",
            Box::new(|b: &mut Bindings| {
                b.set_literal("domainName", "logs");
                b.set_literal("masterUserName", "admin");
                b.set_literal("masterUserPassword", "not-a-real-password");
            }),
            "AWS::Elasticsearch::Domain",
        ),
        (
            "efs",
            Box::new(|b: &mut Bindings| {
                vpc_bindings(b);
            }),
            "AWS::EFS::FileSystem",
        ),
    ];

    for (tile, bind, marker) in cases {
        let mut stack = Stack::new("TileStack", Environment::default());
        let mut bindings = Bindings::new();
        bind(&mut bindings);

        instantiate(&mut stack, tile, "Tile", &bindings)
            .unwrap_or_else(|e| panic!("tile {} failed: {}", tile, e));
        let template = stack.to_template().unwrap();
        assert!(
            template.has_resource(marker),
            "tile {} is missing {}",
            tile,
            marker
        );
    }
}

#[test]
fn test_missing_required_input_is_reported() {
    let mut stack = Stack::new("TileStack", Environment::default());
    let err = instantiate(&mut stack, "elasticsearch", "Search", &Bindings::new()).unwrap_err();
    assert!(err.to_string().contains("domainName"));
}
