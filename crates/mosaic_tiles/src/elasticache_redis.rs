//! Redis cache cluster tile.
//!
//! Replication group with cluster mode and automatic failover, reachable
//! on 6379 from inside the VPC. Group names carry a deterministic suffix
//! so repeated deployments into one account do not collide.

use mosaic_spec::{
    Category, InputType, Metadata, OutputType, TileInput, TileManifest, TileOutput, TileSpecBody,
};
use mosaic_synth::{Resource, Stack, Value};

use crate::catalog::{Bindings, TileOutputs};
use crate::error::TileResult;
use crate::{lid, stable_suffix};

pub const NAME: &str = "elasticache-redis";
pub const VERSION: &str = "5.0.6";

const DEFAULT_ENGINE_VERSION: &str = "5.0.6";
const DEFAULT_NODE_TYPE: &str = "cache.t3.medium";
const DEFAULT_REPLICAS_PER_NODE_GROUP: i64 = 2;
const DEFAULT_NUM_NODE_GROUPS: i64 = 2;
const REDIS_PORT: i64 = 6379;

/// Input parameters.
#[derive(Debug, Clone)]
pub struct RedisProps {
    pub vpc_id: Value,
    pub vpc_cidr: Value,
    pub subnet_ids: Vec<Value>,
    pub cluster_name: String,
    pub replicas_per_node_group: Option<i64>,
    pub num_node_groups: Option<i64>,
    pub engine_version: Option<String>,
    pub auto_minor_version_upgrade: Option<bool>,
}

/// The Redis tile construct.
#[derive(Debug)]
pub struct RedisTile {
    pub redis_cluster_name: String,
    pub redis_endpoint: Value,
}

impl RedisTile {
    pub fn new(stack: &mut Stack, id: &str, props: RedisProps) -> TileResult<Self> {
        let suffix = stable_suffix(&format!("{}/{}", stack.name(), id));
        let group_name = format!("{}-{}", props.cluster_name, suffix);

        let subnet_group_id = lid(id, "SubnetGroup");
        stack.add_resource(
            &subnet_group_id,
            Resource::new("AWS::ElastiCache::SubnetGroup")
                .prop("Description", "subnet group for redis-cluster")
                .prop("CacheSubnetGroupName", format!("redis-subnetgroup-{}", suffix))
                .prop("SubnetIds", Value::List(props.subnet_ids.clone())),
        )?;

        let sg_id = lid(id, "SecurityGroup");
        stack.add_resource(
            &sg_id,
            Resource::new("AWS::EC2::SecurityGroup")
                .prop("GroupName", format!("redis-cluster-sg-{}", suffix))
                .prop("GroupDescription", "Redis access from inside the VPC")
                .prop("VpcId", props.vpc_id.clone())
                .prop(
                    "SecurityGroupIngress",
                    Value::List(vec![mosaic_synth::props! {
                        "IpProtocol" => "tcp",
                        "FromPort" => REDIS_PORT,
                        "ToPort" => REDIS_PORT,
                        "CidrIp" => props.vpc_cidr.clone(),
                    }]),
                ),
        )?;

        let group_id = lid(id, "ReplicationGroup");
        stack.add_resource(
            &group_id,
            Resource::new("AWS::ElastiCache::ReplicationGroup")
                .prop("ReplicationGroupId", group_name.as_str())
                .prop("ReplicationGroupDescription", group_name.as_str())
                .prop(
                    "ReplicasPerNodeGroup",
                    props
                        .replicas_per_node_group
                        .unwrap_or(DEFAULT_REPLICAS_PER_NODE_GROUP),
                )
                .prop(
                    "NumNodeGroups",
                    props.num_node_groups.unwrap_or(DEFAULT_NUM_NODE_GROUPS),
                )
                .prop("Engine", "redis")
                .prop("CacheNodeType", DEFAULT_NODE_TYPE)
                .prop(
                    "EngineVersion",
                    props
                        .engine_version
                        .unwrap_or_else(|| DEFAULT_ENGINE_VERSION.to_string()),
                )
                .prop(
                    "AutoMinorVersionUpgrade",
                    props.auto_minor_version_upgrade.unwrap_or(true),
                )
                .prop("AutomaticFailoverEnabled", true)
                .prop(
                    "SecurityGroupIds",
                    Value::List(vec![Value::get_att(&sg_id, "GroupId")]),
                )
                .prop("CacheSubnetGroupName", Value::r#ref(&subnet_group_id))
                .tag("member", format!("redis-cluster-{}", suffix))
                .depends_on(&subnet_group_id),
        )?;

        let redis_endpoint = Value::join(
            ":",
            vec![
                Value::get_att(&group_id, "ConfigurationEndPoint.Address"),
                Value::get_att(&group_id, "ConfigurationEndPoint.Port"),
            ],
        );

        stack.export("redisClusterName", Value::from(group_name.as_str()))?;
        stack.export("redisEndpoint", redis_endpoint.clone())?;

        Ok(Self {
            redis_cluster_name: group_name,
            redis_endpoint,
        })
    }

    pub(crate) fn from_bindings(
        stack: &mut Stack,
        id: &str,
        bindings: &Bindings,
    ) -> TileResult<TileOutputs> {
        let subnet_ids = vec![
            bindings.require(NAME, "subnetId1")?,
            bindings.require(NAME, "subnetId2")?,
        ];
        let props = RedisProps {
            vpc_id: bindings.require(NAME, "vpcId")?,
            vpc_cidr: bindings.require(NAME, "vpcCidr")?,
            subnet_ids,
            cluster_name: bindings.require_literal(NAME, "redisClusterName")?,
            replicas_per_node_group: bindings.number(NAME, "replicasPerNodeGroup")?,
            num_node_groups: bindings.number(NAME, "numNodeGroups")?,
            engine_version: bindings.literal("engineVersion"),
            auto_minor_version_upgrade: bindings
                .literal("autoMinorVersionUpgrade")
                .map(|v| v == "true"),
        };
        let tile = Self::new(stack, id, props)?;
        Ok(tile.outputs())
    }

    pub fn outputs(&self) -> TileOutputs {
        let mut outputs = TileOutputs::new();
        outputs.insert(
            "redisClusterName",
            Value::from(self.redis_cluster_name.as_str()),
        );
        outputs.insert("redisEndpoint", self.redis_endpoint.clone());
        outputs
    }
}

/// Catalog manifest for this tile.
pub fn manifest() -> TileManifest {
    TileManifest::new(
        Metadata::new(NAME, VERSION)
            .with_category(Category::Database)
            .with_description("Redis replication group with automatic failover")
            .with_license("MIT"),
        TileSpecBody {
            inputs: vec![
                TileInput::new("vpcId", InputType::String).required(),
                TileInput::new("vpcCidr", InputType::String).required(),
                TileInput::new("subnetId1", InputType::String).required(),
                TileInput::new("subnetId2", InputType::String).required(),
                TileInput::new("redisClusterName", InputType::String).required(),
                TileInput::new("replicasPerNodeGroup", InputType::Number)
                    .with_default(DEFAULT_REPLICAS_PER_NODE_GROUP.to_string()),
                TileInput::new("numNodeGroups", InputType::Number)
                    .with_default(DEFAULT_NUM_NODE_GROUPS.to_string()),
                TileInput::new("engineVersion", InputType::String)
                    .with_default(DEFAULT_ENGINE_VERSION),
                TileInput::new("autoMinorVersionUpgrade", InputType::Boolean)
                    .with_default("true"),
            ],
            outputs: vec![
                TileOutput::new("redisClusterName", OutputType::String),
                TileOutput::new("redisEndpoint", OutputType::String),
            ],
            notes: vec![],
        },
    )
}
