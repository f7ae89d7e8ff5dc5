//! Data models for tile and deployment manifests.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Manifest API version accepted by this catalog.
pub const API_VERSION: &str = "mosaic.io/v1alpha1";

/// Category of a tile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    Network,
    Compute,
    ContainerProvider,
    Storage,
    Database,
    Application,
    Analysis,
    #[serde(rename = "ML")]
    Ml,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Network => "Network",
            Category::Compute => "Compute",
            Category::ContainerProvider => "ContainerProvider",
            Category::Storage => "Storage",
            Category::Database => "Database",
            Category::Application => "Application",
            Category::Analysis => "Analysis",
            Category::Ml => "ML",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Type tag of a tile input parameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum InputType {
    #[default]
    String,
    Number,
    Boolean,
    StringList,
    /// A construct-level reference produced by another tile.
    Construct,
    Secret,
}

/// Type tag of a tile output attribute.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum OutputType {
    #[default]
    String,
    Number,
    StringList,
    Construct,
}

/// Shared metadata block for tiles and deployments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_service: Option<String>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released: Option<DateTime<Utc>>,
}

impl Metadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            vendor_service: None,
            version: version.into(),
            description: None,
            author: None,
            license: None,
            released: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.license = Some(license.into());
        self
    }
}

/// Hint that an input is normally fed by another tile's output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InputDependency {
    /// Tile name the value usually comes from.
    pub tile: String,
    /// Output field on that tile.
    pub field: String,
}

/// A declared tile input parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileInput {
    pub name: String,
    #[serde(default)]
    pub input_type: InputType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<InputDependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_values: Option<Vec<String>>,
    #[serde(default)]
    pub require: bool,
}

impl TileInput {
    pub fn new(name: impl Into<String>, input_type: InputType) -> Self {
        Self {
            name: name.into(),
            input_type,
            description: None,
            dependencies: Vec::new(),
            default_value: None,
            default_values: None,
            require: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.require = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_defaults(mut self, values: Vec<String>) -> Self {
        self.default_values = Some(values);
        self
    }
}

/// A declared tile output attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileOutput {
    pub name: String,
    #[serde(default)]
    pub output_type: OutputType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TileOutput {
    pub fn new(name: impl Into<String>, output_type: OutputType) -> Self {
        Self {
            name: name.into(),
            output_type,
            description: None,
        }
    }
}

/// Tile spec body: ordered inputs and outputs plus free-form notes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileSpecBody {
    #[serde(default)]
    pub inputs: Vec<TileInput>,
    #[serde(default)]
    pub outputs: Vec<TileOutput>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// A complete tile manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileManifest {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: TileSpecBody,
}

impl TileManifest {
    pub const KIND: &'static str = "Tile";

    pub fn new(metadata: Metadata, spec: TileSpecBody) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: Self::KIND.to_string(),
            metadata,
            spec,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// Declared inputs that must be bound at composition time.
    pub fn required_inputs(&self) -> impl Iterator<Item = &TileInput> {
        self.spec.inputs.iter().filter(|i| i.require)
    }

    pub fn input(&self, name: &str) -> Option<&TileInput> {
        self.spec.inputs.iter().find(|i| i.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&TileOutput> {
        self.spec.outputs.iter().find(|o| o.name == name)
    }

    /// Output names in declaration order.
    pub fn output_order(&self) -> Vec<&str> {
        self.spec.outputs.iter().map(|o| o.name.as_str()).collect()
    }
}

/// Reference to a producer tile instance's output, written
/// `$(instance.output)` in deployment input bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRef {
    pub instance: String,
    pub output: String,
}

impl OutputRef {
    /// Parse a binding value; returns `None` for plain literals.
    pub fn parse(value: &str) -> Option<Self> {
        let inner = value.trim().strip_prefix("$(")?.strip_suffix(')')?;
        let (instance, output) = inner.split_once('.')?;
        if instance.is_empty() || output.is_empty() {
            return None;
        }
        Some(Self {
            instance: instance.to_string(),
            output: output.to_string(),
        })
    }
}

impl std::fmt::Display for OutputRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "$({}.{})", self.instance, self.output)
    }
}

/// A concrete input binding on a tile instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputBinding {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_values: Option<Vec<String>>,
}

impl InputBinding {
    pub fn value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_value: Some(value.into()),
            input_values: None,
        }
    }

    pub fn values(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            input_value: None,
            input_values: Some(values),
        }
    }

    /// The output reference carried by this binding, if it is one.
    pub fn output_ref(&self) -> Option<OutputRef> {
        self.input_value.as_deref().and_then(OutputRef::parse)
    }
}

/// One tile instance inside a deployment template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileInstance {
    pub tile_reference: String,
    pub tile_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub inputs: Vec<InputBinding>,
    /// Optional region override for this instance's stack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl TileInstance {
    pub fn binding(&self, name: &str) -> Option<&InputBinding> {
        self.inputs.iter().find(|b| b.name == name)
    }
}

/// Named output echoed in the deployment summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub name: String,
    pub value: String,
}

/// Summary block echoed after synthesis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentSummary {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<SummaryOutput>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Deployment template: tile instances in authoring order.
///
/// Instance order is the file's order; the composition plan refines it
/// with data-flow edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentTemplate {
    pub tiles: IndexMap<String, TileInstance>,
}

/// Deployment spec body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentSpec {
    pub template: DeploymentTemplate,
    #[serde(default)]
    pub summary: DeploymentSummary,
}

/// A complete deployment manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentManifest {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: DeploymentSpec,
}

impl DeploymentManifest {
    pub const KIND: &'static str = "Deployment";

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Tile instance names in authoring order.
    pub fn instance_order(&self) -> Vec<&str> {
        self.spec.template.tiles.keys().map(String::as_str).collect()
    }

    pub fn instance(&self, name: &str) -> Option<&TileInstance> {
        self.spec.template.tiles.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_ref_parsing() {
        let r = OutputRef::parse("$(network.vpcId)").unwrap();
        assert_eq!(r.instance, "network");
        assert_eq!(r.output, "vpcId");

        assert!(OutputRef::parse("10.0.0.0/16").is_none());
        assert!(OutputRef::parse("$(noField)").is_none());
        assert!(OutputRef::parse("$(.vpcId)").is_none());
    }

    #[test]
    fn test_tile_manifest_accessors() {
        let manifest = TileManifest::new(
            Metadata::new("network", "0.1.0").with_category(Category::Network),
            TileSpecBody {
                inputs: vec![TileInput::new("cidr", InputType::String).with_default("10.0.0.0/16")],
                outputs: vec![TileOutput::new("vpcId", OutputType::String)],
                notes: vec![],
            },
        );

        assert_eq!(manifest.name(), "network");
        assert!(manifest.input("cidr").is_some());
        assert!(manifest.output("vpcId").is_some());
        assert_eq!(manifest.required_inputs().count(), 0);
        assert_eq!(manifest.output_order(), vec!["vpcId"]);
    }

    #[test]
    fn test_category_round_trip() {
        let yaml = serde_yaml::to_string(&Category::ContainerProvider).unwrap();
        assert_eq!(yaml.trim(), "ContainerProvider");
        let parsed: Category = serde_yaml::from_str("ML").unwrap();
        assert_eq!(parsed, Category::Ml);
    }
}
