//! Aurora MySQL cluster tile.
//!
//! Credentials live in a generated secret; the secret ARN is published
//! through a parameter-store entry so applications can find it by name.

use mosaic_spec::{
    Category, InputType, Metadata, OutputType, TileInput, TileManifest, TileOutput, TileSpecBody,
};
use mosaic_synth::{Resource, Stack, Value};
use serde_json::json;

use crate::catalog::{Bindings, TileOutputs};
use crate::error::TileResult;
use crate::network::VpcAttributes;
use crate::lid;

pub const NAME: &str = "aurora-mysql";
pub const VERSION: &str = "2.07.2";

const ENGINE: &str = "aurora-mysql";
const ENGINE_VERSION: &str = "5.7.mysql_aurora.2.07.2";
const INSTANCE_CLASS: &str = "db.r5.large";

/// Input parameters.
#[derive(Debug, Clone)]
pub struct AuroraMysqlProps {
    pub vpc: VpcAttributes,
    pub username: String,
    pub dbname: String,
}

/// The Aurora MySQL tile construct.
#[derive(Debug)]
pub struct AuroraMysqlTile {
    pub cluster_endpoint: Value,
    pub reader_endpoint: Value,
    pub secret_arn: Value,
    pub db_name: String,
}

impl AuroraMysqlTile {
    pub fn new(stack: &mut Stack, id: &str, props: AuroraMysqlProps) -> TileResult<Self> {
        let secret_id = lid(id, "DbCredentialsSecret");
        stack.add_resource(
            &secret_id,
            Resource::new("AWS::SecretsManager::Secret")
                .prop(
                    "Name",
                    format!("{}-aurora-mysql-credentials", props.dbname),
                )
                .prop(
                    "GenerateSecretString",
                    Value::from(json!({
                        "SecretStringTemplate": format!("{{\"username\":\"{}\"}}", props.username),
                        "GenerateStringKey": "password",
                        "ExcludePunctuation": true,
                        "IncludeSpace": false,
                    })),
                ),
        )?;
        let secret_arn = Value::r#ref(&secret_id);

        stack.add_resource(
            lid(id, "DbCredentialsArnParameter"),
            Resource::new("AWS::SSM::Parameter")
                .prop(
                    "Name",
                    format!("{}-aurora-mysql-credentials-arn", props.dbname),
                )
                .prop("Type", "String")
                .prop("Value", secret_arn.clone()),
        )?;

        let subnet_group_id = lid(id, "DbSubnetGroup");
        stack.add_resource(
            &subnet_group_id,
            Resource::new("AWS::RDS::DBSubnetGroup")
                .prop("DBSubnetGroupDescription", "Subnets for the Aurora cluster")
                .prop("SubnetIds", Value::List(props.vpc.private_subnet_ids.clone())),
        )?;

        let sg_id = lid(id, "DbSecurityGroup");
        stack.add_resource(
            &sg_id,
            Resource::new("AWS::EC2::SecurityGroup")
                .prop("GroupDescription", "Aurora MySQL access from inside the VPC")
                .prop("VpcId", props.vpc.vpc_id.clone())
                .prop(
                    "SecurityGroupIngress",
                    Value::List(vec![mosaic_synth::props! {
                        "IpProtocol" => "tcp",
                        "FromPort" => 3306i64,
                        "ToPort" => 3306i64,
                        "CidrIp" => props.vpc.cidr_block.clone(),
                    }]),
                ),
        )?;

        let cluster_id = lid(id, "AuroraMysqlCluster");
        stack.add_resource(
            &cluster_id,
            Resource::new("AWS::RDS::DBCluster")
                .prop("Engine", ENGINE)
                .prop("EngineVersion", ENGINE_VERSION)
                .prop("DatabaseName", props.dbname.as_str())
                .prop(
                    "MasterUsername",
                    Value::sub(format!(
                        "{{{{resolve:secretsmanager:${{{}}}:SecretString:username}}}}",
                        secret_id
                    )),
                )
                .prop(
                    "MasterUserPassword",
                    Value::sub(format!(
                        "{{{{resolve:secretsmanager:${{{}}}:SecretString:password}}}}",
                        secret_id
                    )),
                )
                .prop("DBSubnetGroupName", Value::r#ref(&subnet_group_id))
                .prop(
                    "VpcSecurityGroupIds",
                    Value::List(vec![Value::get_att(&sg_id, "GroupId")]),
                ),
        )?;

        for n in 1..=2 {
            stack.add_resource(
                lid(id, &format!("AuroraMysqlInstance{}", n)),
                Resource::new("AWS::RDS::DBInstance")
                    .prop("DBClusterIdentifier", Value::r#ref(&cluster_id))
                    .prop("DBInstanceClass", INSTANCE_CLASS)
                    .prop("Engine", ENGINE),
            )?;
        }

        let cluster_endpoint = Value::get_att(&cluster_id, "Endpoint.Address");
        let reader_endpoint = Value::get_att(&cluster_id, "ReadEndpoint.Address");

        stack.export("clusterEndpoint", cluster_endpoint.clone())?;
        stack.export("readerEndpoint", reader_endpoint.clone())?;
        stack.export("secretArn", secret_arn.clone())?;
        stack.export("dbName", Value::from(props.dbname.as_str()))?;

        Ok(Self {
            cluster_endpoint,
            reader_endpoint,
            secret_arn,
            db_name: props.dbname,
        })
    }

    pub(crate) fn from_bindings(
        stack: &mut Stack,
        id: &str,
        bindings: &Bindings,
    ) -> TileResult<TileOutputs> {
        let props = AuroraMysqlProps {
            vpc: VpcAttributes::from_bindings(NAME, bindings)?,
            username: bindings.require_literal(NAME, "username")?,
            dbname: bindings.require_literal(NAME, "dbname")?,
        };
        let tile = Self::new(stack, id, props)?;
        Ok(tile.outputs())
    }

    pub fn outputs(&self) -> TileOutputs {
        let mut outputs = TileOutputs::new();
        outputs.insert("clusterEndpoint", self.cluster_endpoint.clone());
        outputs.insert("readerEndpoint", self.reader_endpoint.clone());
        outputs.insert("secretArn", self.secret_arn.clone());
        outputs.insert("dbName", Value::from(self.db_name.as_str()));
        outputs
    }
}

/// Catalog manifest for this tile.
pub fn manifest() -> TileManifest {
    let mut inputs = VpcAttributes::manifest_inputs();
    inputs.push(TileInput::new("username", InputType::String).required());
    inputs.push(TileInput::new("dbname", InputType::String).required());

    TileManifest::new(
        Metadata::new(NAME, VERSION)
            .with_category(Category::Database)
            .with_description("Aurora MySQL cluster with generated credentials")
            .with_license("MIT"),
        TileSpecBody {
            inputs,
            outputs: [
                "clusterEndpoint",
                "readerEndpoint",
                "secretArn",
                "dbName",
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

    fn synthesized() -> mosaic_synth::Template {
        let mut stack = Stack::new("DbStack", Environment::default());
        let network = NetworkTile::new(&mut stack, "Network", NetworkProps::default()).unwrap();
        AuroraMysqlTile::new(
            &mut stack,
            "Db",
            AuroraMysqlProps {
                vpc: network.vpc,
                username: "admin".to_string(),
                dbname: "orders".to_string(),
            },
        )
        .unwrap();
        stack.to_template().unwrap()
    }

    #[test]
    fn test_aurora_resource_markers() {
        let template = synthesized();
        assert!(template.has_resource("AWS::RDS::DBCluster"));
        assert!(template.has_resource("AWS::SecretsManager::Secret"));
        assert!(template.has_resource("AWS::SSM::Parameter"));
        assert_eq!(template.find_resources("AWS::RDS::DBInstance").len(), 2);
    }

    #[test]
    fn test_secret_name_includes_dbname() {
        let template = synthesized();
        let (_, secret) = template.find_resources("AWS::SecretsManager::Secret")[0];
        assert_eq!(
            secret["Properties"]["Name"],
            "orders-aurora-mysql-credentials"
        );
    }

    #[test]
    fn test_master_credentials_resolve_from_secret() {
        let template = synthesized();
        let (_, cluster) = template.find_resources("AWS::RDS::DBCluster")[0];
        let username = serde_json::to_string(&cluster["Properties"]["MasterUsername"]).unwrap();
        assert!(username.contains("resolve:secretsmanager"));
        assert!(username.contains("SecretString:username"));
    }
}
