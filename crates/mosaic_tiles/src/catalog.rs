//! Generic tile instantiation from deployment bindings.
//!
//! The typed constructors in each tile module are the primary API; this
//! module lets the synthesizer instantiate any catalog tile from the
//! string bindings of a deployment manifest.

use std::collections::HashMap;

use indexmap::IndexMap;
use mosaic_synth::{Stack, Value};
use tracing::debug;

use crate::error::{TileError, TileResult};
use crate::{
    aurora_mysql, efs, eks, eks_spot, elasticache_redis, elasticsearch, network,
};

/// A value bound to a tile input at composition time.
#[derive(Debug, Clone)]
pub enum Bound {
    /// Literal scalar from the manifest.
    Literal(String),
    /// Literal list from the manifest.
    List(Vec<String>),
    /// A wired value produced by another tile.
    Wired(Value),
}

/// Input bindings for one tile instance.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    map: HashMap<String, Bound>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, bound: Bound) {
        self.map.insert(name.into(), bound);
    }

    pub fn set_literal(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set(name, Bound::Literal(value.into()));
    }

    pub fn set_wired(&mut self, name: impl Into<String>, value: Value) {
        self.set(name, Bound::Wired(value));
    }

    /// Literal value of an input, when bound as one.
    pub fn literal(&self, name: &str) -> Option<String> {
        match self.map.get(name) {
            Some(Bound::Literal(v)) => Some(v.clone()),
            _ => None,
        }
    }

    /// Literal list of an input, when bound as one.
    pub fn list(&self, name: &str) -> Option<Vec<String>> {
        match self.map.get(name) {
            Some(Bound::List(v)) => Some(v.clone()),
            _ => None,
        }
    }

    /// The bound value as a declaration-time value, literal or wired.
    pub fn value(&self, name: &str) -> Option<Value> {
        match self.map.get(name)? {
            Bound::Literal(v) => Some(Value::from(v.as_str())),
            Bound::List(v) => Some(Value::from(v.clone())),
            Bound::Wired(v) => Some(v.clone()),
        }
    }

    /// Like [`Bindings::value`], erroring when the input is unbound.
    pub fn require(&self, tile: &str, name: &str) -> TileResult<Value> {
        self.value(name).ok_or_else(|| TileError::MissingInput {
            tile: tile.to_string(),
            input: name.to_string(),
        })
    }

    /// Required literal string input.
    pub fn require_literal(&self, tile: &str, name: &str) -> TileResult<String> {
        self.literal(name).ok_or_else(|| TileError::MissingInput {
            tile: tile.to_string(),
            input: name.to_string(),
        })
    }

    /// Optional numeric input, parsed from its literal.
    pub fn number(&self, tile: &str, name: &str) -> TileResult<Option<i64>> {
        match self.literal(name) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| TileError::InvalidInput {
                tile: tile.to_string(),
                input: name.to_string(),
                message: format!("expected a number, got '{}'", raw),
            }),
        }
    }
}

/// Output attributes of an instantiated tile, keyed by declared name.
#[derive(Debug, Clone, Default)]
pub struct TileOutputs {
    map: IndexMap<String, Value>,
}

impl TileOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.map.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.map.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Instantiate a catalog tile by name into `stack`.
pub fn instantiate(
    stack: &mut Stack,
    tile_name: &str,
    id: &str,
    bindings: &Bindings,
) -> TileResult<TileOutputs> {
    debug!(tile = tile_name, id, "instantiating tile");
    match tile_name {
        network::NAME => network::NetworkTile::from_bindings(stack, id, bindings),
        eks::NAME => eks::EksTile::from_bindings(stack, id, bindings),
        eks_spot::NAME => eks_spot::EksSpotTile::from_bindings(stack, id, bindings),
        aurora_mysql::NAME => aurora_mysql::AuroraMysqlTile::from_bindings(stack, id, bindings),
        elasticache_redis::NAME => {
            elasticache_redis::RedisTile::from_bindings(stack, id, bindings)
        }
        elasticsearch::NAME => {
            elasticsearch::ElasticsearchTile::from_bindings(stack, id, bindings)
        }
        efs::NAME => efs::EfsTile::from_bindings(stack, id, bindings),
        other => Err(TileError::UnknownTile(other.to_string())),
    }
}

/// Manifests of every tile shipped with the catalog.
pub fn builtin_manifests() -> Vec<mosaic_spec::TileManifest> {
    vec![
        network::manifest(),
        eks::manifest(),
        eks_spot::manifest(),
        aurora_mysql::manifest(),
        elasticache_redis::manifest(),
        elasticsearch::manifest(),
        efs::manifest(),
    ]
}

/// Look up a builtin manifest by tile name.
pub fn builtin_manifest(name: &str) -> Option<mosaic_spec::TileManifest> {
    builtin_manifests().into_iter().find(|m| m.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_complete() {
        let names: Vec<String> = builtin_manifests()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "network",
                "eks",
                "eks-spot",
                "aurora-mysql",
                "elasticache-redis",
                "elasticsearch",
                "efs"
            ]
        );
    }

    #[test]
    fn test_unknown_tile_is_an_error() {
        let mut stack = Stack::new("S", mosaic_synth::Environment::default());
        let err = instantiate(&mut stack, "ghost", "G", &Bindings::new()).unwrap_err();
        assert!(matches!(err, TileError::UnknownTile(_)));
    }

    #[test]
    fn test_bindings_number_parsing() {
        let mut bindings = Bindings::new();
        bindings.set_literal("onDemandPercentage", "25");
        assert_eq!(bindings.number("eks-spot", "onDemandPercentage").unwrap(), Some(25));

        bindings.set_literal("onDemandPercentage", "a-quarter");
        assert!(bindings.number("eks-spot", "onDemandPercentage").is_err());
    }
}
