//! Basic managed Kubernetes cluster tile.
//!
//! Cluster master role with the node policy bundle inlined, the cluster
//! itself, and one managed node group sized from the capacity input.

use mosaic_spec::{
    Category, InputType, Metadata, OutputType, TileInput, TileManifest, TileOutput, TileSpecBody,
};
use mosaic_synth::{Resource, Stack, Value};
use serde_json::json;

use crate::catalog::{Bindings, TileOutputs};
use crate::error::TileResult;
use crate::network::VpcAttributes;
use crate::node_policy;
use crate::lid;

pub const NAME: &str = "eks";
pub const VERSION: &str = "0.0.5";

const DEFAULT_CLUSTER_VERSION: &str = "1.16";
const DEFAULT_CAPACITY: i64 = 2;
const DEFAULT_CAPACITY_INSTANCE: &str = "c5.large";

/// Input parameters.
#[derive(Debug, Clone)]
pub struct EksProps {
    pub vpc: VpcAttributes,
    pub cluster_name: String,
    pub capacity: Option<i64>,
    pub capacity_instance: Option<String>,
    pub cluster_version: Option<String>,
}

/// The basic cluster tile construct.
#[derive(Debug)]
pub struct EksTile {
    pub cluster_name: String,
    pub cluster_arn: Value,
    pub cluster_endpoint: Value,
    pub master_role_arn: Value,
    pub capacity: i64,
    pub capacity_instance: String,
}

impl EksTile {
    pub fn new(stack: &mut Stack, id: &str, props: EksProps) -> TileResult<Self> {
        let partition = stack.env().partition();
        let cluster_version = props
            .cluster_version
            .unwrap_or_else(|| DEFAULT_CLUSTER_VERSION.to_string());
        let capacity = props.capacity.unwrap_or(DEFAULT_CAPACITY);
        let capacity_instance = props
            .capacity_instance
            .unwrap_or_else(|| DEFAULT_CAPACITY_INSTANCE.to_string());

        let master_role_id = lid(id, "ClusterMasterRole");
        stack.add_resource(
            &master_role_id,
            Resource::new("AWS::IAM::Role")
                .prop(
                    "AssumeRolePolicyDocument",
                    Value::from(json!({
                        "Version": "2012-10-17",
                        "Statement": [
                            {
                                "Effect": "Allow",
                                "Principal": {"Service": "eks.amazonaws.com"},
                                "Action": "sts:AssumeRole",
                            }
                        ]
                    })),
                )
                .prop(
                    "ManagedPolicyArns",
                    vec![
                        format!("arn:{}:iam::aws:policy/AmazonEKSServicePolicy", partition),
                        format!("arn:{}:iam::aws:policy/AmazonEKSClusterPolicy", partition),
                    ],
                )
                .prop("Policies", Value::from(node_policy::as_role_policies())),
        )?;

        let mut subnet_ids = props.vpc.public_subnet_ids.clone();
        subnet_ids.extend(props.vpc.private_subnet_ids.iter().cloned());

        let cluster_id = lid(id, "BasicEksCluster");
        stack.add_resource(
            &cluster_id,
            Resource::new("AWS::EKS::Cluster")
                .prop("Name", props.cluster_name.as_str())
                .prop("Version", cluster_version.as_str())
                .prop("RoleArn", Value::get_att(&master_role_id, "Arn"))
                .prop(
                    "ResourcesVpcConfig",
                    mosaic_synth::props! {
                        "SubnetIds" => Value::List(subnet_ids.clone()),
                    },
                ),
        )?;

        let node_role_id = lid(id, "NodegroupRole");
        stack.add_resource(
            &node_role_id,
            Resource::new("AWS::IAM::Role")
                .prop(
                    "AssumeRolePolicyDocument",
                    Value::from(json!({
                        "Version": "2012-10-17",
                        "Statement": [
                            {
                                "Effect": "Allow",
                                "Principal": {"Service": "ec2.amazonaws.com"},
                                "Action": "sts:AssumeRole",
                            }
                        ]
                    })),
                )
                .prop(
                    "ManagedPolicyArns",
                    vec![
                        format!("arn:{}:iam::aws:policy/AmazonEKSWorkerNodePolicy", partition),
                        format!("arn:{}:iam::aws:policy/AmazonEKS_CNI_Policy", partition),
                        format!(
                            "arn:{}:iam::aws:policy/AmazonEC2ContainerRegistryReadOnly",
                            partition
                        ),
                    ],
                ),
        )?;

        // Managed group floor mirrors the capacity split: a third of the
        // capacity stays burstable.
        let min_size = capacity - (capacity as f64 / 3.0).round() as i64;
        stack.add_resource(
            lid(id, "ManagedNodegroup"),
            Resource::new("AWS::EKS::Nodegroup")
                .prop("ClusterName", Value::r#ref(&cluster_id))
                .prop("NodeRole", Value::get_att(&node_role_id, "Arn"))
                .prop("Subnets", Value::List(props.vpc.private_subnet_ids.clone()))
                .prop("InstanceTypes", vec![capacity_instance.clone()])
                .prop(
                    "ScalingConfig",
                    mosaic_synth::props! {
                        "MinSize" => min_size.max(1),
                        "MaxSize" => capacity.max(1),
                        "DesiredSize" => capacity.max(1),
                    },
                ),
        )?;

        let cluster_arn = Value::get_att(&cluster_id, "Arn");
        let cluster_endpoint = Value::get_att(&cluster_id, "Endpoint");
        let master_role_arn = Value::get_att(&master_role_id, "Arn");

        stack.export("clusterName", Value::from(props.cluster_name.as_str()))?;
        stack.export("clusterArn", cluster_arn.clone())?;
        stack.export("clusterEndpoint", cluster_endpoint.clone())?;
        stack.export("masterRoleArn", master_role_arn.clone())?;
        stack.export("capacity", Value::from(capacity.to_string()))?;
        stack.export("capacityInstance", Value::from(capacity_instance.as_str()))?;

        Ok(Self {
            cluster_name: props.cluster_name,
            cluster_arn,
            cluster_endpoint,
            master_role_arn,
            capacity,
            capacity_instance,
        })
    }

    pub(crate) fn from_bindings(
        stack: &mut Stack,
        id: &str,
        bindings: &Bindings,
    ) -> TileResult<TileOutputs> {
        let props = EksProps {
            vpc: VpcAttributes::from_bindings(NAME, bindings)?,
            cluster_name: bindings.require_literal(NAME, "clusterName")?,
            capacity: bindings.number(NAME, "capacity")?,
            capacity_instance: bindings.literal("capacityInstance"),
            cluster_version: bindings.literal("clusterVersion"),
        };
        let tile = Self::new(stack, id, props)?;
        Ok(tile.outputs())
    }

    pub fn outputs(&self) -> TileOutputs {
        let mut outputs = TileOutputs::new();
        outputs.insert("clusterName", Value::from(self.cluster_name.as_str()));
        outputs.insert("clusterArn", self.cluster_arn.clone());
        outputs.insert("clusterEndpoint", self.cluster_endpoint.clone());
        outputs.insert("masterRoleArn", self.master_role_arn.clone());
        outputs.insert("capacity", Value::from(self.capacity.to_string()));
        outputs.insert(
            "capacityInstance",
            Value::from(self.capacity_instance.as_str()),
        );
        outputs
    }
}

/// Catalog manifest for this tile.
pub fn manifest() -> TileManifest {
    let mut inputs = VpcAttributes::manifest_inputs();
    inputs.push(TileInput::new("clusterName", InputType::String).required());
    inputs.push(
        TileInput::new("capacity", InputType::Number).with_default(DEFAULT_CAPACITY.to_string()),
    );
    inputs.push(
        TileInput::new("capacityInstance", InputType::String)
            .with_default(DEFAULT_CAPACITY_INSTANCE),
    );
    inputs.push(
        TileInput::new("clusterVersion", InputType::String).with_default(DEFAULT_CLUSTER_VERSION),
    );

    TileManifest::new(
        Metadata::new(NAME, VERSION)
            .with_category(Category::ContainerProvider)
            .with_description("Managed Kubernetes cluster with a managed node group")
            .with_license("MIT"),
        TileSpecBody {
            inputs,
            outputs: [
                "clusterName",
                "clusterArn",
                "clusterEndpoint",
                "masterRoleArn",
                "capacity",
                "capacityInstance",
            ]
            .into_iter()
            .map(|name| TileOutput::new(name, OutputType::String))
            .collect(),
            notes: vec![],
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{NetworkProps, NetworkTile};
    use mosaic_synth::Environment;

    fn props(vpc: VpcAttributes) -> EksProps {
        EksProps {
            vpc,
            cluster_name: "test-cluster".to_string(),
            capacity: Some(6),
            capacity_instance: None,
            cluster_version: None,
        }
    }

    #[test]
    fn test_eks_synthesizes_cluster_and_nodegroup() {
        let mut stack = Stack::new("EksStack", Environment::default());
        let network = NetworkTile::new(&mut stack, "Network", NetworkProps::default()).unwrap();
        EksTile::new(&mut stack, "Eks", props(network.vpc)).unwrap();

        let template = stack.to_template().unwrap();
        assert!(template.has_resource("AWS::EKS::Cluster"));
        assert!(template.has_resource("AWS::EKS::Nodegroup"));
        assert!(template.has_resource("AWS::IAM::Role"));
    }

    #[test]
    fn test_capacity_split() {
        let mut stack = Stack::new("EksStack", Environment::default());
        let network = NetworkTile::new(&mut stack, "Network", NetworkProps::default()).unwrap();
        EksTile::new(&mut stack, "Eks", props(network.vpc)).unwrap();

        let template = stack.to_template().unwrap();
        let (_, nodegroup) = template.find_resources("AWS::EKS::Nodegroup")[0];
        assert_eq!(nodegroup["Properties"]["ScalingConfig"]["MinSize"], 4);
        assert_eq!(nodegroup["Properties"]["ScalingConfig"]["MaxSize"], 6);
    }

    #[test]
    fn test_china_partition_policy_arns() {
        let mut stack = Stack::new(
            "EksStack",
            Environment::default().with_region("cn-north-1"),
        );
        let network = NetworkTile::new(&mut stack, "Network", NetworkProps::default()).unwrap();
        EksTile::new(&mut stack, "Eks", props(network.vpc)).unwrap();

        let template = stack.to_template().unwrap();
        let roles = template.find_resources("AWS::IAM::Role");
        let arns = serde_json::to_string(&roles[0].1["Properties"]["ManagedPolicyArns"]).unwrap();
        assert!(arns.contains("arn:aws-cn:iam"));
    }
}
