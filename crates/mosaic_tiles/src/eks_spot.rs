//! Kubernetes cluster tile with a spot/on-demand mixed node group.
//!
//! Control-plane and node security groups, the cluster, a launch
//! template booting the EKS-optimized image, and an autoscaling group
//! with a mixed-instances policy. Nodes signal the stack on boot so
//! rolling updates wait for healthy capacity.

use mosaic_spec::{
    Category, InputType, Metadata, OutputType, TileInput, TileManifest, TileOutput, TileSpecBody,
};
use mosaic_synth::{Resource, Stack, Value};
use serde_json::json;

use crate::catalog::{Bindings, TileOutputs};
use crate::error::TileResult;
use crate::network::VpcAttributes;
use crate::lid;

pub const NAME: &str = "eks-spot";
pub const VERSION: &str = "0.5.0";

const DEFAULT_CLUSTER_VERSION: &str = "1.16";
const DEFAULT_MAX_SIZE: &str = "6";
const DEFAULT_MIN_SIZE: &str = "3";
const DEFAULT_DESIRED_CAPACITY: &str = "3";
const DEFAULT_COOLDOWN: &str = "180";
const DEFAULT_ON_DEMAND_PERCENTAGE: i64 = 25;
const DEFAULT_CAPACITY_INSTANCES: [&str; 3] = ["c5.large", "r5.large", "m5.large"];

/// Input parameters.
#[derive(Debug, Clone)]
pub struct EksSpotProps {
    pub vpc: VpcAttributes,
    pub cluster_name: String,
    pub cluster_version: Option<String>,
    pub key_pair: String,
    pub capacity_instances: Option<Vec<String>>,
    pub max_size: Option<String>,
    pub min_size: Option<String>,
    pub desired_capacity: Option<String>,
    pub cooldown: Option<String>,
    pub on_demand_percentage: Option<i64>,
}

/// The spot cluster tile construct.
#[derive(Debug)]
pub struct EksSpotTile {
    pub region_of_cluster: Value,
    pub cluster_name: String,
    pub cluster_version: String,
    pub cluster_arn: Value,
    pub cluster_endpoint: Value,
    pub master_role_arn: Value,
    pub nodes_role_arn: Value,
    pub autoscaling_group_name: Value,
    pub max_size: String,
    pub min_size: String,
    pub desired_capacity: String,
    pub capacity_instance: String,
}

impl EksSpotTile {
    pub fn new(stack: &mut Stack, id: &str, props: EksSpotProps) -> TileResult<Self> {
        let partition = stack.env().partition();
        let region_of_cluster = stack.region_value();
        let cluster_version = props
            .cluster_version
            .unwrap_or_else(|| DEFAULT_CLUSTER_VERSION.to_string());
        let max_size = props.max_size.unwrap_or_else(|| DEFAULT_MAX_SIZE.to_string());
        let min_size = props.min_size.unwrap_or_else(|| DEFAULT_MIN_SIZE.to_string());
        let desired_capacity = props
            .desired_capacity
            .unwrap_or_else(|| DEFAULT_DESIRED_CAPACITY.to_string());
        let cooldown = props.cooldown.unwrap_or_else(|| DEFAULT_COOLDOWN.to_string());
        let on_demand_percentage = props
            .on_demand_percentage
            .unwrap_or(DEFAULT_ON_DEMAND_PERCENTAGE);
        let capacity_instances = match props.capacity_instances {
            Some(list) if !list.is_empty() => list,
            _ => DEFAULT_CAPACITY_INSTANCES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let control_plane_sg_id = lid(id, "ControlPlaneSecurityGroup");
        stack.add_resource(
            &control_plane_sg_id,
            Resource::new("AWS::EC2::SecurityGroup")
                .prop("GroupDescription", "EKS control plane security group")
                .prop("VpcId", props.vpc.vpc_id.clone()),
        )?;

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
                ),
        )?;

        let mut subnet_ids = props.vpc.public_subnet_ids.clone();
        subnet_ids.extend(props.vpc.private_subnet_ids.iter().cloned());

        let cluster_id = lid(id, "SpotCluster");
        stack.add_resource(
            &cluster_id,
            Resource::new("AWS::EKS::Cluster")
                .prop("Name", props.cluster_name.as_str())
                .prop("Version", cluster_version.as_str())
                .prop("RoleArn", Value::get_att(&master_role_id, "Arn"))
                .prop(
                    "ResourcesVpcConfig",
                    mosaic_synth::props! {
                        "SecurityGroupIds" => Value::List(vec![Value::r#ref(&control_plane_sg_id)]),
                        "SubnetIds" => Value::List(subnet_ids.clone()),
                    },
                ),
        )?;

        let nodes_sg_id = lid(id, "NodesSecurityGroup");
        stack.add_resource(
            &nodes_sg_id,
            Resource::new("AWS::EC2::SecurityGroup")
                .prop("GroupName", "nodes-for-eks-sg")
                .prop("GroupDescription", "EKS worker nodes security group")
                .prop("VpcId", props.vpc.vpc_id.clone())
                .prop(
                    "SecurityGroupIngress",
                    Value::List(vec![Value::from(json!({
                        "IpProtocol": "tcp",
                        "FromPort": 22,
                        "ToPort": 22,
                        "CidrIp": "0.0.0.0/0",
                    }))]),
                ),
        )?;

        // Cross-group rules are separate resources so the two groups do
        // not form a property cycle.
        let ingress = |rule_id: &str, sg: &str, source: &str, from: i64, to: i64| {
            Resource::new("AWS::EC2::SecurityGroupIngress")
                .prop("GroupId", Value::get_att(sg, "GroupId"))
                .prop("SourceSecurityGroupId", Value::get_att(source, "GroupId"))
                .prop("IpProtocol", "tcp")
                .prop("FromPort", from)
                .prop("ToPort", to)
                .prop("Description", rule_id)
        };
        stack.add_resource(
            lid(id, "NodesFromControlPlaneRule"),
            ingress("control plane to nodes", &nodes_sg_id, &control_plane_sg_id, 1025, 65535),
        )?;
        stack.add_resource(
            lid(id, "NodesHttpsFromControlPlaneRule"),
            ingress("control plane https to nodes", &nodes_sg_id, &control_plane_sg_id, 443, 443),
        )?;
        stack.add_resource(
            lid(id, "ControlPlaneFromNodesRule"),
            ingress("nodes to control plane", &control_plane_sg_id, &nodes_sg_id, 443, 443),
        )?;

        let shared_sg_id = lid(id, "NodesSharedSecurityGroup");
        stack.add_resource(
            &shared_sg_id,
            Resource::new("AWS::EC2::SecurityGroup")
                .prop("GroupName", "nodes-shared-for-eks-sg")
                .prop("GroupDescription", "Shared security group between EKS nodes")
                .prop("VpcId", props.vpc.vpc_id.clone()),
        )?;
        stack.add_resource(
            lid(id, "NodesSharedAllTcpRule"),
            ingress("nodes shared all tcp", &shared_sg_id, &shared_sg_id, 0, 65535),
        )?;

        let nodes_role_id = lid(id, "NodesRole");
        stack.add_resource(
            &nodes_role_id,
            Resource::new("AWS::IAM::Role")
                .prop("RoleName", "nodes-for-eks-role")
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

        let instance_profile_id = lid(id, "NodesInstanceProfile");
        stack.add_resource(
            &instance_profile_id,
            Resource::new("AWS::IAM::InstanceProfile")
                .prop("Roles", Value::List(vec![Value::r#ref(&nodes_role_id)])),
        )?;

        let asg_id = lid(id, "NodesAutoScalingGroup");
        let launch_template_id = lid(id, "NodesLaunchTemplate");
        let launch_template_name = format!("{}-nodes", props.cluster_name);

        // The EKS-optimized image for the cluster version, resolved by
        // the engine through the public SSM parameter.
        let image_id = format!(
            "{{{{resolve:ssm:/aws/service/eks/optimized-ami/{}/amazon-linux-2/recommended/image_id}}}}",
            cluster_version
        );

        let user_data = Value::base64(Value::join(
            "\n",
            vec![
                Value::from("#!/bin/bash"),
                Value::from("set -e"),
                Value::from("sudo yum update -y"),
                Value::from("sudo yum install -y aws-cfn-bootstrap aws-cli jq wget"),
                Value::from(format!("/etc/eks/bootstrap.sh {}", props.cluster_name)),
                Value::sub(format!(
                    "/opt/aws/bin/cfn-signal -e $? --stack ${{AWS::StackName}} --resource {} --region ${{AWS::Region}}",
                    asg_id
                )),
            ],
        ));

        stack.add_resource(
            &launch_template_id,
            Resource::new("AWS::EC2::LaunchTemplate")
                .prop("LaunchTemplateName", launch_template_name.as_str())
                .prop(
                    "LaunchTemplateData",
                    mosaic_synth::props! {
                        "InstanceType" => capacity_instances[0].as_str(),
                        "ImageId" => image_id.as_str(),
                        "KeyName" => props.key_pair.as_str(),
                        "IamInstanceProfile" => mosaic_synth::props! {
                            "Arn" => Value::get_att(&instance_profile_id, "Arn"),
                        },
                        "SecurityGroupIds" => Value::List(vec![
                            Value::get_att(&nodes_sg_id, "GroupId"),
                            Value::get_att(&shared_sg_id, "GroupId"),
                        ]),
                        "BlockDeviceMappings" => Value::List(vec![Value::from(json!({
                            "DeviceName": "/dev/xvda",
                            "Ebs": {"VolumeSize": 40, "DeleteOnTermination": true},
                        }))]),
                        "UserData" => user_data,
                    },
                ),
        )?;

        let overrides: Vec<Value> = capacity_instances
            .iter()
            .map(|instance| mosaic_synth::props! { "InstanceType" => instance.as_str() })
            .collect();

        let mut subnet_identifiers = props.vpc.public_subnet_ids.clone();
        subnet_identifiers.extend(props.vpc.private_subnet_ids.iter().cloned());

        stack.add_resource(
            &asg_id,
            Resource::new("AWS::AutoScaling::AutoScalingGroup")
                .prop("VPCZoneIdentifier", Value::List(subnet_identifiers))
                .prop("DesiredCapacity", desired_capacity.as_str())
                .prop("Cooldown", cooldown.as_str())
                .prop("HealthCheckType", "EC2")
                .prop("MaxSize", max_size.as_str())
                .prop("MinSize", min_size.as_str())
                .prop(
                    "MixedInstancesPolicy",
                    mosaic_synth::props! {
                        "InstancesDistribution" => mosaic_synth::props! {
                            "OnDemandBaseCapacity" => 0i64,
                            "OnDemandPercentageAboveBaseCapacity" => on_demand_percentage,
                            // Valid values: lowest-price | capacity-optimized
                            "SpotAllocationStrategy" => "capacity-optimized",
                        },
                        "LaunchTemplate" => mosaic_synth::props! {
                            "LaunchTemplateSpecification" => mosaic_synth::props! {
                                "LaunchTemplateName" => launch_template_name.as_str(),
                                "Version" => Value::get_att(&launch_template_id, "LatestVersionNumber"),
                            },
                            "Overrides" => Value::List(overrides),
                        },
                    },
                )
                // Nodes fail to register without the cluster ownership tag.
                .prop(
                    "Tags",
                    Value::List(vec![
                        Value::from(json!({
                            "Key": "Name",
                            "Value": format!("nodes-asg-{}", props.cluster_name),
                            "PropagateAtLaunch": true,
                        })),
                        Value::from(json!({
                            "Key": format!("kubernetes.io/cluster/{}", props.cluster_name),
                            "Value": "owned",
                            "PropagateAtLaunch": true,
                        })),
                    ]),
                )
                .depends_on(&launch_template_id)
                .attribute(
                    "UpdatePolicy",
                    json!({
                        "AutoScalingScheduledAction": {
                            "IgnoreUnmodifiedGroupSizeProperties": true,
                        },
                        "AutoScalingRollingUpdate": {
                            "MinInstancesInService": "1",
                            "MaxBatchSize": "1",
                            "WaitOnResourceSignals": true,
                            "MinSuccessfulInstancesPercent": "100",
                        },
                    }),
                )
                .attribute(
                    "CreationPolicy",
                    json!({
                        "ResourceSignal": {
                            "Count": desired_capacity,
                            "Timeout": "PT15M",
                        },
                    }),
                ),
        )?;

        let capacity_instance = capacity_instances.join("/");
        let cluster_arn = Value::get_att(&cluster_id, "Arn");
        let cluster_endpoint = Value::get_att(&cluster_id, "Endpoint");
        let master_role_arn = Value::get_att(&master_role_id, "Arn");
        let nodes_role_arn = Value::get_att(&nodes_role_id, "Arn");
        let autoscaling_group_name = Value::r#ref(&asg_id);

        stack.export("regionOfCluster", region_of_cluster.clone())?;
        stack.export("clusterName", Value::from(props.cluster_name.as_str()))?;
        stack.export("clusterVersion", Value::from(cluster_version.as_str()))?;
        stack.export("masterRoleArn", master_role_arn.clone())?;
        stack.export("clusterEndpoint", cluster_endpoint.clone())?;
        stack.export("clusterArn", cluster_arn.clone())?;
        stack.export("autoScalingGroupName", autoscaling_group_name.clone())?;
        stack.export("autoScalingGroupMaxSize", Value::from(max_size.as_str()))?;
        stack.export("autoScalingGroupMinSize", Value::from(min_size.as_str()))?;
        stack.export(
            "autoScalingGroupDesiredCapacity",
            Value::from(desired_capacity.as_str()),
        )?;
        stack.export("nodesRoleArn", nodes_role_arn.clone())?;
        stack.export("capacityInstance", Value::from(capacity_instance.as_str()))?;

        Ok(Self {
            region_of_cluster,
            cluster_name: props.cluster_name,
            cluster_version,
            cluster_arn,
            cluster_endpoint,
            master_role_arn,
            nodes_role_arn,
            autoscaling_group_name,
            max_size,
            min_size,
            desired_capacity,
            capacity_instance,
        })
    }

    pub(crate) fn from_bindings(
        stack: &mut Stack,
        id: &str,
        bindings: &Bindings,
    ) -> TileResult<TileOutputs> {
        let props = EksSpotProps {
            vpc: VpcAttributes::from_bindings(NAME, bindings)?,
            cluster_name: bindings.require_literal(NAME, "clusterName")?,
            cluster_version: bindings.literal("clusterVersion"),
            key_pair: bindings.require_literal(NAME, "keyPairName")?,
            capacity_instances: bindings.list("capacityInstances"),
            max_size: bindings.literal("maxSizeAsg"),
            min_size: bindings.literal("minSizeAsg"),
            desired_capacity: bindings.literal("desiredCapacityAsg"),
            cooldown: bindings.literal("cooldownAsg"),
            on_demand_percentage: bindings.number(NAME, "onDemandPercentage")?,
        };
        let tile = Self::new(stack, id, props)?;
        Ok(tile.outputs())
    }

    pub fn outputs(&self) -> TileOutputs {
        let mut outputs = TileOutputs::new();
        outputs.insert("regionOfCluster", self.region_of_cluster.clone());
        outputs.insert("clusterName", Value::from(self.cluster_name.as_str()));
        outputs.insert("clusterVersion", Value::from(self.cluster_version.as_str()));
        outputs.insert("masterRoleArn", self.master_role_arn.clone());
        outputs.insert("clusterEndpoint", self.cluster_endpoint.clone());
        outputs.insert("clusterArn", self.cluster_arn.clone());
        outputs.insert(
            "autoScalingGroupName",
            self.autoscaling_group_name.clone(),
        );
        outputs.insert("autoScalingGroupMaxSize", Value::from(self.max_size.as_str()));
        outputs.insert("autoScalingGroupMinSize", Value::from(self.min_size.as_str()));
        outputs.insert(
            "autoScalingGroupDesiredCapacity",
            Value::from(self.desired_capacity.as_str()),
        );
        outputs.insert("nodesRoleArn", self.nodes_role_arn.clone());
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
    inputs.push(TileInput::new("keyPairName", InputType::String).required());
    inputs.push(
        TileInput::new("clusterVersion", InputType::String).with_default(DEFAULT_CLUSTER_VERSION),
    );
    inputs.push(
        TileInput::new("capacityInstances", InputType::StringList).with_defaults(
            DEFAULT_CAPACITY_INSTANCES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        ),
    );
    inputs.push(TileInput::new("maxSizeAsg", InputType::String).with_default(DEFAULT_MAX_SIZE));
    inputs.push(TileInput::new("minSizeAsg", InputType::String).with_default(DEFAULT_MIN_SIZE));
    inputs.push(
        TileInput::new("desiredCapacityAsg", InputType::String)
            .with_default(DEFAULT_DESIRED_CAPACITY),
    );
    inputs.push(TileInput::new("cooldownAsg", InputType::String).with_default(DEFAULT_COOLDOWN));
    inputs.push(
        TileInput::new("onDemandPercentage", InputType::Number)
            .with_default(DEFAULT_ON_DEMAND_PERCENTAGE.to_string()),
    );

    TileManifest::new(
        Metadata::new(NAME, VERSION)
            .with_category(Category::ContainerProvider)
            .with_description(
                "Managed Kubernetes cluster with a spot/on-demand mixed node group",
            )
            .with_license("MIT"),
        TileSpecBody {
            inputs,
            outputs: [
                "regionOfCluster",
                "clusterName",
                "clusterVersion",
                "masterRoleArn",
                "clusterEndpoint",
                "clusterArn",
                "autoScalingGroupName",
                "autoScalingGroupMaxSize",
                "autoScalingGroupMinSize",
                "autoScalingGroupDesiredCapacity",
                "nodesRoleArn",
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

    fn props(vpc: VpcAttributes) -> EksSpotProps {
        EksSpotProps {
            vpc,
            cluster_name: "spot-cluster".to_string(),
            cluster_version: None,
            key_pair: "ops-keypair".to_string(),
            capacity_instances: None,
            max_size: None,
            min_size: None,
            desired_capacity: None,
            cooldown: None,
            on_demand_percentage: None,
        }
    }

    fn synthesized() -> mosaic_synth::Template {
        let mut stack = Stack::new("SpotStack", Environment::default());
        let network = NetworkTile::new(&mut stack, "Network", NetworkProps::default()).unwrap();
        EksSpotTile::new(&mut stack, "Eks", props(network.vpc)).unwrap();
        stack.to_template().unwrap()
    }

    #[test]
    fn test_spot_cluster_resource_markers() {
        let template = synthesized();
        assert!(template.has_resource("AWS::EKS::Cluster"));
        assert!(template.has_resource("AWS::EC2::LaunchTemplate"));
        assert!(template.has_resource("AWS::AutoScaling::AutoScalingGroup"));
        assert!(template.has_resource("AWS::IAM::InstanceProfile"));
    }

    #[test]
    fn test_mixed_instances_policy() {
        let template = synthesized();
        let (_, asg) = template.find_resources("AWS::AutoScaling::AutoScalingGroup")[0];
        let policy = &asg["Properties"]["MixedInstancesPolicy"];
        assert_eq!(
            policy["InstancesDistribution"]["SpotAllocationStrategy"],
            "capacity-optimized"
        );
        assert_eq!(
            policy["InstancesDistribution"]["OnDemandPercentageAboveBaseCapacity"],
            25
        );
        assert_eq!(policy["LaunchTemplate"]["Overrides"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_cluster_ownership_tag_propagates() {
        let template = synthesized();
        let (_, asg) = template.find_resources("AWS::AutoScaling::AutoScalingGroup")[0];
        let tags = asg["Properties"]["Tags"].as_array().unwrap();
        let owned = tags
            .iter()
            .find(|t| t["Key"] == "kubernetes.io/cluster/spot-cluster")
            .unwrap();
        assert_eq!(owned["Value"], "owned");
        assert_eq!(owned["PropagateAtLaunch"], true);
    }

    #[test]
    fn test_rolling_update_waits_for_signals() {
        let template = synthesized();
        let (_, asg) = template.find_resources("AWS::AutoScaling::AutoScalingGroup")[0];
        assert_eq!(
            asg["UpdatePolicy"]["AutoScalingRollingUpdate"]["WaitOnResourceSignals"],
            true
        );
        assert_eq!(asg["CreationPolicy"]["ResourceSignal"]["Count"], "3");
    }

    #[test]
    fn test_capacity_instance_output_join() {
        let mut stack = Stack::new("SpotStack", Environment::default());
        let network = NetworkTile::new(&mut stack, "Network", NetworkProps::default()).unwrap();
        let mut p = props(network.vpc);
        p.capacity_instances = Some(vec!["m5.xlarge".to_string(), "c5.xlarge".to_string()]);
        let tile = EksSpotTile::new(&mut stack, "Eks", p).unwrap();
        assert_eq!(tile.capacity_instance, "m5.xlarge/c5.xlarge");
    }
}
