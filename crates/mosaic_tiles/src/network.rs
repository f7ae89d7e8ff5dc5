//! Network tile: a VPC spanning two availability zones with public and
//! private subnets, internet egress, and per-AZ NAT gateways.
//!
//! Subnets carry the Kubernetes ELB role tags so cluster tiles can
//! place load balancers without extra wiring.

use mosaic_spec::{
    Category, InputType, Metadata, OutputType, TileInput, TileManifest, TileOutput, TileSpecBody,
};
use mosaic_synth::{Resource, Stack, Value};

use crate::catalog::{Bindings, TileOutputs};
use crate::error::TileResult;
use crate::lid;

pub const NAME: &str = "network";
pub const VERSION: &str = "0.1.0";

const DEFAULT_CIDR: &str = "10.0.0.0/16";
/// Two AZs, two subnet tiers.
const MAX_AZS: usize = 2;

/// Input parameters.
#[derive(Debug, Clone, Default)]
pub struct NetworkProps {
    pub cidr: Option<String>,
}

/// VPC attributes threaded into downstream tiles.
#[derive(Debug, Clone)]
pub struct VpcAttributes {
    pub vpc_id: Value,
    pub cidr_block: Value,
    pub public_subnet_ids: Vec<Value>,
    pub private_subnet_ids: Vec<Value>,
}

impl VpcAttributes {
    /// Consume a network tile's exports from another stack.
    pub fn from_exports(stack_name: &str) -> Self {
        let import = |output: &str| Value::import(Stack::export_name(stack_name, output));
        Self {
            vpc_id: import("vpcId"),
            cidr_block: import("vpcCidr"),
            public_subnet_ids: vec![import("publicSubnetId1"), import("publicSubnetId2")],
            private_subnet_ids: vec![import("privateSubnetId1"), import("privateSubnetId2")],
        }
    }

    /// Assemble from individually bound inputs.
    pub(crate) fn from_bindings(tile: &str, bindings: &Bindings) -> TileResult<Self> {
        Ok(Self {
            vpc_id: bindings.require(tile, "vpcId")?,
            cidr_block: bindings.require(tile, "vpcCidr")?,
            public_subnet_ids: vec![
                bindings.require(tile, "publicSubnetId1")?,
                bindings.require(tile, "publicSubnetId2")?,
            ],
            private_subnet_ids: vec![
                bindings.require(tile, "privateSubnetId1")?,
                bindings.require(tile, "privateSubnetId2")?,
            ],
        })
    }

    /// The manifest inputs a tile consuming a VPC declares.
    pub(crate) fn manifest_inputs() -> Vec<TileInput> {
        let dep = |field: &str| mosaic_spec::InputDependency {
            tile: NAME.to_string(),
            field: field.to_string(),
        };
        ["vpcId", "vpcCidr", "publicSubnetId1", "publicSubnetId2", "privateSubnetId1", "privateSubnetId2"]
            .into_iter()
            .map(|name| {
                let mut input = TileInput::new(name, InputType::String).required();
                input.dependencies = vec![dep(name)];
                input
            })
            .collect()
    }
}

/// The network tile construct.
#[derive(Debug)]
pub struct NetworkTile {
    pub vpc: VpcAttributes,
    pub availability_zones: Value,
}

impl NetworkTile {
    /// Declare the network resources into `stack`.
    pub fn new(stack: &mut Stack, id: &str, props: NetworkProps) -> TileResult<Self> {
        let cidr = props.cidr.unwrap_or_else(|| DEFAULT_CIDR.to_string());

        let vpc_id = lid(id, "BaseVpc");
        stack.add_resource(
            &vpc_id,
            Resource::new("AWS::EC2::VPC")
                .prop("CidrBlock", cidr.as_str())
                .prop("EnableDnsHostnames", true)
                .prop("EnableDnsSupport", true)
                .tag("Name", format!("{}/BaseVpc", id)),
        )?;
        let vpc_ref = Value::r#ref(&vpc_id);

        // Carve 4 equal blocks out of the VPC CIDR: two public tiers,
        // two private tiers.
        let subnet_cidr = |index: usize| {
            Value::select(index, Value::cidr(Value::from(cidr.as_str()), 4, 8))
        };
        let az = |index: usize| Value::select(index, Value::get_azs());

        let mut public_subnet_ids = Vec::new();
        let mut private_subnet_ids = Vec::new();

        for n in 0..MAX_AZS {
            let public_id = lid(id, &format!("PublicSubnet{}", n + 1));
            stack.add_resource(
                &public_id,
                Resource::new("AWS::EC2::Subnet")
                    .prop("VpcId", vpc_ref.clone())
                    .prop("CidrBlock", subnet_cidr(n))
                    .prop("AvailabilityZone", az(n))
                    .prop("MapPublicIpOnLaunch", true)
                    .tag("Name", format!("{}/PublicSubnet{}", id, n + 1))
                    .tag("kubernetes.io/role/elb", "1"),
            )?;
            public_subnet_ids.push(Value::r#ref(&public_id));

            let private_id = lid(id, &format!("PrivateSubnet{}", n + 1));
            stack.add_resource(
                &private_id,
                Resource::new("AWS::EC2::Subnet")
                    .prop("VpcId", vpc_ref.clone())
                    .prop("CidrBlock", subnet_cidr(MAX_AZS + n))
                    .prop("AvailabilityZone", az(n))
                    .tag("Name", format!("{}/PrivateSubnet{}", id, n + 1))
                    .tag("kubernetes.io/role/internal-elb", "1"),
            )?;
            private_subnet_ids.push(Value::r#ref(&private_id));
        }

        let igw_id = lid(id, "InternetGateway");
        stack.add_resource(&igw_id, Resource::new("AWS::EC2::InternetGateway"))?;
        let attachment_id = lid(id, "VpcGatewayAttachment");
        stack.add_resource(
            &attachment_id,
            Resource::new("AWS::EC2::VPCGatewayAttachment")
                .prop("VpcId", vpc_ref.clone())
                .prop("InternetGatewayId", Value::r#ref(&igw_id)),
        )?;

        let public_rt_id = lid(id, "PublicRouteTable");
        stack.add_resource(
            &public_rt_id,
            Resource::new("AWS::EC2::RouteTable").prop("VpcId", vpc_ref.clone()),
        )?;
        stack.add_resource(
            lid(id, "PublicDefaultRoute"),
            Resource::new("AWS::EC2::Route")
                .prop("RouteTableId", Value::r#ref(&public_rt_id))
                .prop("DestinationCidrBlock", "0.0.0.0/0")
                .prop("GatewayId", Value::r#ref(&igw_id))
                .depends_on(&attachment_id),
        )?;

        for (n, subnet) in public_subnet_ids.iter().enumerate() {
            stack.add_resource(
                lid(id, &format!("PublicSubnet{}RouteTableAssociation", n + 1)),
                Resource::new("AWS::EC2::SubnetRouteTableAssociation")
                    .prop("RouteTableId", Value::r#ref(&public_rt_id))
                    .prop("SubnetId", subnet.clone()),
            )?;
        }

        // One NAT gateway per AZ so a zone outage cannot strand the
        // other zone's private tier.
        for n in 0..MAX_AZS {
            let eip_id = lid(id, &format!("NatEip{}", n + 1));
            stack.add_resource(
                &eip_id,
                Resource::new("AWS::EC2::EIP").prop("Domain", "vpc"),
            )?;

            let nat_id = lid(id, &format!("NatGateway{}", n + 1));
            stack.add_resource(
                &nat_id,
                Resource::new("AWS::EC2::NatGateway")
                    .prop("AllocationId", Value::get_att(&eip_id, "AllocationId"))
                    .prop("SubnetId", public_subnet_ids[n].clone())
                    .depends_on(&attachment_id),
            )?;

            let private_rt_id = lid(id, &format!("PrivateRouteTable{}", n + 1));
            stack.add_resource(
                &private_rt_id,
                Resource::new("AWS::EC2::RouteTable").prop("VpcId", vpc_ref.clone()),
            )?;
            stack.add_resource(
                lid(id, &format!("PrivateDefaultRoute{}", n + 1)),
                Resource::new("AWS::EC2::Route")
                    .prop("RouteTableId", Value::r#ref(&private_rt_id))
                    .prop("DestinationCidrBlock", "0.0.0.0/0")
                    .prop("NatGatewayId", Value::r#ref(&nat_id)),
            )?;
            stack.add_resource(
                lid(id, &format!("PrivateSubnet{}RouteTableAssociation", n + 1)),
                Resource::new("AWS::EC2::SubnetRouteTableAssociation")
                    .prop("RouteTableId", Value::r#ref(&private_rt_id))
                    .prop("SubnetId", private_subnet_ids[n].clone()),
            )?;
        }

        let availability_zones = Value::join(",", vec![az(0), az(1)]);

        stack.export("vpcId", vpc_ref.clone())?;
        stack.export("vpcCidr", Value::from(cidr.as_str()))?;
        stack.export("publicSubnetId1", public_subnet_ids[0].clone())?;
        stack.export("publicSubnetId2", public_subnet_ids[1].clone())?;
        stack.export("privateSubnetId1", private_subnet_ids[0].clone())?;
        stack.export("privateSubnetId2", private_subnet_ids[1].clone())?;
        stack.export("availabilityZones", availability_zones.clone())?;

        Ok(Self {
            vpc: VpcAttributes {
                vpc_id: vpc_ref,
                cidr_block: Value::from(cidr.as_str()),
                public_subnet_ids,
                private_subnet_ids,
            },
            availability_zones,
        })
    }

    pub(crate) fn from_bindings(
        stack: &mut Stack,
        id: &str,
        bindings: &Bindings,
    ) -> TileResult<TileOutputs> {
        let props = NetworkProps {
            cidr: bindings.literal("cidr"),
        };
        let tile = Self::new(stack, id, props)?;
        Ok(tile.outputs())
    }

    /// Output attributes, keyed as the manifest declares them.
    pub fn outputs(&self) -> TileOutputs {
        let mut outputs = TileOutputs::new();
        outputs.insert("vpcId", self.vpc.vpc_id.clone());
        outputs.insert("vpcCidr", self.vpc.cidr_block.clone());
        outputs.insert("publicSubnetId1", self.vpc.public_subnet_ids[0].clone());
        outputs.insert("publicSubnetId2", self.vpc.public_subnet_ids[1].clone());
        outputs.insert("privateSubnetId1", self.vpc.private_subnet_ids[0].clone());
        outputs.insert("privateSubnetId2", self.vpc.private_subnet_ids[1].clone());
        outputs.insert("availabilityZones", self.availability_zones.clone());
        outputs
    }
}

/// Catalog manifest for this tile.
pub fn manifest() -> TileManifest {
    TileManifest::new(
        Metadata::new(NAME, VERSION)
            .with_category(Category::Network)
            .with_description("VPC with public/private subnets across two availability zones")
            .with_license("MIT"),
        TileSpecBody {
            inputs: vec![TileInput::new("cidr", InputType::String).with_default(DEFAULT_CIDR)],
            outputs: [
                "vpcId",
                "vpcCidr",
                "publicSubnetId1",
                "publicSubnetId2",
                "privateSubnetId1",
                "privateSubnetId2",
                "availabilityZones",
            ]
            .into_iter()
            .map(|name| TileOutput::new(name, OutputType::String))
            .collect(),
            notes: vec![],
        },
    )
}
