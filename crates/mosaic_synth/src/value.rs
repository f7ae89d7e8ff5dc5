//! Declaration-time values.
//!
//! A [`Value`] is either a literal or a deferred intrinsic that the
//! provisioning engine resolves at deployment time. Intrinsics serialize
//! to the engine's JSON forms (`{"Ref": ...}`, `{"Fn::GetAtt": ...}`).

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Pseudo parameters supplied by the provisioning engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoParam {
    Region,
    AccountId,
    Partition,
    StackName,
    UrlSuffix,
}

impl PseudoParam {
    pub fn as_str(&self) -> &'static str {
        match self {
            PseudoParam::Region => "AWS::Region",
            PseudoParam::AccountId => "AWS::AccountId",
            PseudoParam::Partition => "AWS::Partition",
            PseudoParam::StackName => "AWS::StackName",
            PseudoParam::UrlSuffix => "AWS::URLSuffix",
        }
    }
}

/// A property value in a resource declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Str(String),
    Num(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    /// Reference to another resource in the same stack.
    Ref(String),
    /// Pseudo parameter reference.
    Pseudo(PseudoParam),
    /// Runtime attribute of a resource in the same stack.
    GetAtt(String, String),
    /// Delimiter-joined concatenation of values.
    Join(String, Vec<Value>),
    /// Base64 encoding, resolved by the engine.
    Base64(Box<Value>),
    /// String substitution with `${}` placeholders.
    Sub(String),
    /// Consume an export from another stack.
    ImportValue(String),
    /// Select one element from a list value.
    Select(usize, Box<Value>),
    /// Availability zones of the target region.
    GetAzs,
    /// Carve `count` subnet blocks of `bits` host bits out of a CIDR.
    Cidr(Box<Value>, usize, usize),
}

impl Value {
    pub fn r#ref(logical_id: impl Into<String>) -> Self {
        Value::Ref(logical_id.into())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Value::GetAtt(logical_id.into(), attribute.into())
    }

    pub fn join(delimiter: impl Into<String>, parts: Vec<Value>) -> Self {
        Value::Join(delimiter.into(), parts)
    }

    pub fn base64(value: Value) -> Self {
        Value::Base64(Box::new(value))
    }

    pub fn sub(template: impl Into<String>) -> Self {
        Value::Sub(template.into())
    }

    pub fn import(export_name: impl Into<String>) -> Self {
        Value::ImportValue(export_name.into())
    }

    pub fn select(index: usize, list: Value) -> Self {
        Value::Select(index, Box::new(list))
    }

    pub fn get_azs() -> Self {
        Value::GetAzs
    }

    pub fn cidr(block: Value, count: usize, bits: usize) -> Self {
        Value::Cidr(Box::new(block), count, bits)
    }

    pub fn region() -> Self {
        Value::Pseudo(PseudoParam::Region)
    }

    pub fn account_id() -> Self {
        Value::Pseudo(PseudoParam::AccountId)
    }

    pub fn partition() -> Self {
        Value::Pseudo(PseudoParam::Partition)
    }

    pub fn stack_name() -> Self {
        Value::Pseudo(PseudoParam::StackName)
    }

    /// Literal string value, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Num(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Num(i64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(list: Vec<Value>) -> Self {
        Value::List(list)
    }
}

impl From<Vec<String>> for Value {
    fn from(list: Vec<String>) -> Self {
        Value::List(list.into_iter().map(Value::Str).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Num(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Num(n) => serializer.serialize_i64(*n),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Ref(id) => single_entry(serializer, "Ref", id),
            Value::Pseudo(p) => single_entry(serializer, "Ref", p.as_str()),
            Value::GetAtt(id, attr) => {
                single_entry(serializer, "Fn::GetAtt", &vec![id.clone(), attr.clone()])
            }
            Value::Join(delim, parts) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Join", &(delim, parts))?;
                map.end()
            }
            Value::Base64(inner) => single_entry(serializer, "Fn::Base64", inner),
            Value::Sub(template) => single_entry(serializer, "Fn::Sub", template),
            Value::ImportValue(name) => single_entry(serializer, "Fn::ImportValue", name),
            Value::Select(index, list) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Select", &(index, list))?;
                map.end()
            }
            Value::GetAzs => single_entry(serializer, "Fn::GetAZs", ""),
            Value::Cidr(block, count, bits) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(
                    "Fn::Cidr",
                    &(block, count.to_string(), bits.to_string()),
                )?;
                map.end()
            }
        }
    }
}

fn single_entry<S, V>(serializer: S, key: &str, value: &V) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize + ?Sized,
{
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(key, value)?;
    map.end()
}

/// Build a `{Key, Value}` tag entry.
pub fn tag(key: impl Into<String>, value: impl Into<Value>) -> Value {
    let mut map = IndexMap::new();
    map.insert("Key".to_string(), Value::Str(key.into()));
    map.insert("Value".to_string(), value.into());
    Value::Map(map)
}

/// Convenience constructor for property maps.
#[macro_export]
macro_rules! props {
    ( $( $key:expr => $value:expr ),* $(,)? ) => {{
        let mut map = ::indexmap::IndexMap::new();
        $( map.insert($key.to_string(), $crate::Value::from($value)); )*
        $crate::Value::Map(map)
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_json(value: &Value) -> serde_json::Value {
        serde_json::to_value(value).unwrap()
    }

    #[test]
    fn test_literals_serialize_plainly() {
        assert_eq!(to_json(&Value::from("vpc")), serde_json::json!("vpc"));
        assert_eq!(to_json(&Value::from(40i64)), serde_json::json!(40));
        assert_eq!(to_json(&Value::from(true)), serde_json::json!(true));
    }

    #[test]
    fn test_intrinsics_serialize_to_engine_forms() {
        assert_eq!(
            to_json(&Value::r#ref("BaseVpc")),
            serde_json::json!({"Ref": "BaseVpc"})
        );
        assert_eq!(
            to_json(&Value::get_att("Cluster", "Endpoint")),
            serde_json::json!({"Fn::GetAtt": ["Cluster", "Endpoint"]})
        );
        assert_eq!(
            to_json(&Value::import("net0:vpcId")),
            serde_json::json!({"Fn::ImportValue": "net0:vpcId"})
        );
        assert_eq!(
            to_json(&Value::region()),
            serde_json::json!({"Ref": "AWS::Region"})
        );
    }

    #[test]
    fn test_join_and_base64() {
        let user_data = Value::base64(Value::join(
            "\n",
            vec![Value::from("#!/bin/bash"), Value::from("set -e")],
        ));
        assert_eq!(
            to_json(&user_data),
            serde_json::json!({
                "Fn::Base64": {"Fn::Join": ["\n", ["#!/bin/bash", "set -e"]]}
            })
        );
    }

    #[test]
    fn test_tag_shape() {
        assert_eq!(
            to_json(&tag("Name", "nodes-asg")),
            serde_json::json!({"Key": "Name", "Value": "nodes-asg"})
        );
    }
}
