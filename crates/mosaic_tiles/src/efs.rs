//! Shared filesystem tile.
//!
//! Encrypted filesystem with an infrequent-access lifecycle policy and
//! one mount target per private subnet.

use mosaic_spec::{
    Category, Metadata, OutputType, TileManifest, TileOutput, TileSpecBody,
};
use mosaic_synth::{Resource, Stack, Value};

use crate::catalog::{Bindings, TileOutputs};
use crate::error::TileResult;
use crate::network::VpcAttributes;
use crate::lid;

pub const NAME: &str = "efs";
pub const VERSION: &str = "0.1.0";

const NFS_PORT: i64 = 2049;

/// Input parameters.
#[derive(Debug, Clone)]
pub struct EfsProps {
    pub vpc: VpcAttributes,
}

/// The shared filesystem tile construct.
#[derive(Debug)]
pub struct EfsTile {
    pub file_system_id: Value,
}

impl EfsTile {
    pub fn new(stack: &mut Stack, id: &str, props: EfsProps) -> TileResult<Self> {
        let fs_id = lid(id, "FileSystem");
        stack.add_resource(
            &fs_id,
            Resource::new("AWS::EFS::FileSystem")
                .prop("Encrypted", true)
                .prop(
                    "LifecyclePolicies",
                    Value::List(vec![mosaic_synth::props! {
                        "TransitionToIA" => "AFTER_14_DAYS",
                    }]),
                )
                .prop("PerformanceMode", "generalPurpose")
                .prop("ThroughputMode", "bursting"),
        )?;

        let sg_id = lid(id, "MountTargetSecurityGroup");
        stack.add_resource(
            &sg_id,
            Resource::new("AWS::EC2::SecurityGroup")
                .prop("GroupDescription", "NFS access to the shared filesystem")
                .prop("VpcId", props.vpc.vpc_id.clone())
                .prop(
                    "SecurityGroupIngress",
                    Value::List(vec![mosaic_synth::props! {
                        "IpProtocol" => "tcp",
                        "FromPort" => NFS_PORT,
                        "ToPort" => NFS_PORT,
                        "CidrIp" => props.vpc.cidr_block.clone(),
                    }]),
                ),
        )?;

        for (n, subnet) in props.vpc.private_subnet_ids.iter().enumerate() {
            stack.add_resource(
                lid(id, &format!("MountTarget{}", n + 1)),
                Resource::new("AWS::EFS::MountTarget")
                    .prop("FileSystemId", Value::r#ref(&fs_id))
                    .prop("SubnetId", subnet.clone())
                    .prop(
                        "SecurityGroups",
                        Value::List(vec![Value::get_att(&sg_id, "GroupId")]),
                    ),
            )?;
        }

        let file_system_id = Value::r#ref(&fs_id);
        stack.export("fileSystemId", file_system_id.clone())?;

        Ok(Self { file_system_id })
    }

    pub(crate) fn from_bindings(
        stack: &mut Stack,
        id: &str,
        bindings: &Bindings,
    ) -> TileResult<TileOutputs> {
        let props = EfsProps {
            vpc: VpcAttributes::from_bindings(NAME, bindings)?,
        };
        let tile = Self::new(stack, id, props)?;
        Ok(tile.outputs())
    }

    pub fn outputs(&self) -> TileOutputs {
        let mut outputs = TileOutputs::new();
        outputs.insert("fileSystemId", self.file_system_id.clone());
        outputs
    }
}

/// Catalog manifest for this tile.
pub fn manifest() -> TileManifest {
    TileManifest::new(
        Metadata::new(NAME, VERSION)
            .with_category(Category::Storage)
            .with_description("Encrypted shared filesystem with per-subnet mount targets")
            .with_license("MIT"),
        TileSpecBody {
            inputs: VpcAttributes::manifest_inputs(),
            outputs: vec![TileOutput::new("fileSystemId", OutputType::String)],
            notes: vec![],
        },
    )
}
