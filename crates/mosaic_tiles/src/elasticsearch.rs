//! Search domain tile.
//!
//! Elasticsearch domain with dedicated masters, zone awareness, EBS
//! storage, encryption at rest and in transit, and an account-scoped
//! access policy gated on source IP.

use mosaic_spec::{
    Category, InputType, Metadata, OutputType, TileInput, TileManifest, TileOutput, TileSpecBody,
};
use mosaic_synth::{Resource, Stack, Value};
use serde_json::json;

use crate::catalog::{Bindings, TileOutputs};
use crate::error::TileResult;
use crate::lid;

pub const NAME: &str = "elasticsearch";
pub const VERSION: &str = "7.4.0";

const DEFAULT_ES_VERSION: &str = "7.4";
const DEFAULT_DATA_INSTANCE_COUNT: i64 = 2;
const DEFAULT_DATA_INSTANCE_TYPE: &str = "r5.large.elasticsearch";
const DEFAULT_MASTER_INSTANCE_COUNT: i64 = 3;
const DEFAULT_MASTER_INSTANCE_TYPE: &str = "r5.large.elasticsearch";
const DEFAULT_VOLUME_SIZE: i64 = 40;
const DEFAULT_VOLUME_TYPE: &str = "gp2";

/// Input parameters.
#[derive(Debug, Clone)]
pub struct ElasticsearchProps {
    pub domain_name: String,
    pub elasticsearch_version: Option<String>,
    pub data_instance_count: Option<i64>,
    pub data_instance_type: Option<String>,
    pub instance_volume_size: Option<i64>,
    pub instance_volume_type: Option<String>,
    pub master_instance_count: Option<i64>,
    pub master_instance_type: Option<String>,
    pub master_user_name: String,
    pub master_user_password: String,
    pub kms_key_id: Option<String>,
}

/// The search domain tile construct.
#[derive(Debug)]
pub struct ElasticsearchTile {
    pub domain_name: String,
    pub domain_endpoint: Value,
}

impl ElasticsearchTile {
    pub fn new(stack: &mut Stack, id: &str, props: ElasticsearchProps) -> TileResult<Self> {
        let domain_id = lid(id, "Domain");

        let access_policy = json!({
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Effect": "Allow",
                    "Principal": {"AWS": {"Ref": "AWS::AccountId"}},
                    "Action": "es:*",
                    "Resource": {
                        "Fn::Sub": format!(
                            "arn:${{AWS::Partition}}:es:${{AWS::Region}}:${{AWS::AccountId}}:domain/{}/*",
                            props.domain_name
                        )
                    },
                    "Condition": {
                        "IpAddress": {"aws:SourceIp": ["127.0.0.1"]}
                    },
                }
            ]
        });

        let mut encryption_at_rest = mosaic_synth::props! { "Enabled" => true };
        if let (Value::Map(entries), Some(kms_key_id)) =
            (&mut encryption_at_rest, props.kms_key_id.as_deref())
        {
            entries.insert("KmsKeyId".to_string(), Value::from(kms_key_id));
        }

        stack.add_resource(
            &domain_id,
            Resource::new("AWS::Elasticsearch::Domain")
                .prop("DomainName", props.domain_name.as_str())
                .prop(
                    "ElasticsearchVersion",
                    props
                        .elasticsearch_version
                        .as_deref()
                        .unwrap_or(DEFAULT_ES_VERSION),
                )
                .prop(
                    "ElasticsearchClusterConfig",
                    mosaic_synth::props! {
                        "DedicatedMasterEnabled" => true,
                        "InstanceCount" => props
                            .data_instance_count
                            .unwrap_or(DEFAULT_DATA_INSTANCE_COUNT),
                        "ZoneAwarenessEnabled" => true,
                        "InstanceType" => props
                            .data_instance_type
                            .as_deref()
                            .unwrap_or(DEFAULT_DATA_INSTANCE_TYPE),
                        "DedicatedMasterType" => props
                            .master_instance_type
                            .as_deref()
                            .unwrap_or(DEFAULT_MASTER_INSTANCE_TYPE),
                        "DedicatedMasterCount" => props
                            .master_instance_count
                            .unwrap_or(DEFAULT_MASTER_INSTANCE_COUNT),
                    },
                )
                .prop(
                    "EBSOptions",
                    mosaic_synth::props! {
                        "EBSEnabled" => true,
                        "VolumeSize" => props
                            .instance_volume_size
                            .unwrap_or(DEFAULT_VOLUME_SIZE),
                        "VolumeType" => props
                            .instance_volume_type
                            .as_deref()
                            .unwrap_or(DEFAULT_VOLUME_TYPE),
                    },
                )
                .prop("EncryptionAtRestOptions", encryption_at_rest)
                .prop(
                    "NodeToNodeEncryptionOptions",
                    mosaic_synth::props! { "Enabled" => true },
                )
                .prop(
                    "AdvancedSecurityOptions",
                    mosaic_synth::props! {
                        "Enabled" => true,
                        "InternalUserDatabaseEnabled" => true,
                        "MasterUserOptions" => mosaic_synth::props! {
                            "MasterUserName" => props.master_user_name.as_str(),
                            "MasterUserPassword" => props.master_user_password.as_str(),
                        },
                    },
                )
                .prop("AccessPolicies", Value::from(access_policy)),
        )?;

        let domain_endpoint = Value::get_att(&domain_id, "DomainEndpoint");

        stack.export("domainName", Value::from(props.domain_name.as_str()))?;
        stack.export("domainEndpoint", domain_endpoint.clone())?;

        Ok(Self {
            domain_name: props.domain_name,
            domain_endpoint,
        })
    }

    pub(crate) fn from_bindings(
        stack: &mut Stack,
        id: &str,
        bindings: &Bindings,
    ) -> TileResult<TileOutputs> {
        let props = ElasticsearchProps {
            domain_name: bindings.require_literal(NAME, "domainName")?,
            elasticsearch_version: bindings.literal("elasticsearchVersion"),
            data_instance_count: bindings.number(NAME, "dataInstanceCount")?,
            data_instance_type: bindings.literal("dataInstanceType"),
            instance_volume_size: bindings.number(NAME, "instanceVolumeSize")?,
            instance_volume_type: bindings.literal("instanceVolumeType"),
            master_instance_count: bindings.number(NAME, "masterInstanceCount")?,
            master_instance_type: bindings.literal("masterInstanceType"),
            master_user_name: bindings.require_literal(NAME, "masterUserName")?,
            master_user_password: bindings.require_literal(NAME, "masterUserPassword")?,
            kms_key_id: bindings.literal("kmsKeyId"),
        };
        let tile = Self::new(stack, id, props)?;
        Ok(tile.outputs())
    }

    pub fn outputs(&self) -> TileOutputs {
        let mut outputs = TileOutputs::new();
        outputs.insert("domainName", Value::from(self.domain_name.as_str()));
        outputs.insert("domainEndpoint", self.domain_endpoint.clone());
        outputs
    }
}

/// Catalog manifest for this tile.
pub fn manifest() -> TileManifest {
    TileManifest::new(
        Metadata::new(NAME, VERSION)
            .with_category(Category::Analysis)
            .with_description("Encrypted search domain with dedicated master nodes")
            .with_license("MIT"),
        TileSpecBody {
            inputs: vec![
                TileInput::new("domainName", InputType::String).required(),
                TileInput::new("masterUserName", InputType::String).required(),
                TileInput::new("masterUserPassword", InputType::Secret).required(),
                TileInput::new("elasticsearchVersion", InputType::String)
                    .with_default(DEFAULT_ES_VERSION),
                TileInput::new("dataInstanceCount", InputType::Number)
                    .with_default(DEFAULT_DATA_INSTANCE_COUNT.to_string()),
                TileInput::new("dataInstanceType", InputType::String)
                    .with_default(DEFAULT_DATA_INSTANCE_TYPE),
                TileInput::new("instanceVolumeSize", InputType::Number)
                    .with_default(DEFAULT_VOLUME_SIZE.to_string()),
                TileInput::new("instanceVolumeType", InputType::String)
                    .with_default(DEFAULT_VOLUME_TYPE),
                TileInput::new("masterInstanceCount", InputType::Number)
                    .with_default(DEFAULT_MASTER_INSTANCE_COUNT.to_string()),
                TileInput::new("masterInstanceType", InputType::String)
                    .with_default(DEFAULT_MASTER_INSTANCE_TYPE),
                TileInput::new("kmsKeyId", InputType::String),
            ],
            outputs: vec![
                TileOutput::new("domainName", OutputType::String),
                TileOutput::new("domainEndpoint", OutputType::String),
            ],
            notes: vec![],
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_synth::Environment;

    fn props() -> ElasticsearchProps {
        ElasticsearchProps {
            domain_name: "logs".to_string(),
            elasticsearch_version: None,
            data_instance_count: None,
            data_instance_type: None,
            instance_volume_size: None,
            instance_volume_type: None,
            master_instance_count: None,
            master_instance_type: None,
            master_user_name: "admin".to_string(),
            master_user_password: "not-a-real-password".to_string(),
            kms_key_id: None,
        }
    }

    #[test]
    fn test_domain_resource_marker() {
        let mut stack = Stack::new("SearchStack", Environment::default());
        ElasticsearchTile::new(&mut stack, "Search", props()).unwrap();

        let template = stack.to_template().unwrap();
        assert!(template.has_resource("AWS::Elasticsearch::Domain"));
    }

    #[test]
    fn test_encryption_and_masters_enabled() {
        let mut stack = Stack::new("SearchStack", Environment::default());
        ElasticsearchTile::new(&mut stack, "Search", props()).unwrap();

        let template = stack.to_template().unwrap();
        let (_, domain) = template.find_resources("AWS::Elasticsearch::Domain")[0];
        assert_eq!(domain["Properties"]["EncryptionAtRestOptions"]["Enabled"], true);
        assert_eq!(
            domain["Properties"]["ElasticsearchClusterConfig"]["DedicatedMasterCount"],
            3
        );
    }

    #[test]
    fn test_access_policy_scopes_to_domain_arn() {
        let mut stack = Stack::new("SearchStack", Environment::default());
        ElasticsearchTile::new(&mut stack, "Search", props()).unwrap();

        let template = stack.to_template().unwrap();
        let (_, domain) = template.find_resources("AWS::Elasticsearch::Domain")[0];
        let policy = serde_json::to_string(&domain["Properties"]["AccessPolicies"]).unwrap();
        assert!(policy.contains("domain/logs/*"));
        assert!(policy.contains("aws:SourceIp"));
    }
}
