//! Render data and its conversions.

mod cow;
mod from;

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

pub(crate) use crate::value::cow::ValueCow;
use crate::{Error, Result};

/// Render data.
///
/// Maps are ordered by key so that iterating over them is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

/// Convert a `T` to a [`Value`].
///
/// The value is first serialized with `serde_json` and then converted, so any
/// type that implements [`serde::Serialize`] can be used as render data.
pub fn to_value<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value)
        .map(Value::from)
        .map_err(Error::serialize)
}

impl Value {
    /// The name of the value's type, as used in error messages.
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_unit(),
            Self::Bool(b) => b.serialize(serializer),
            Self::Integer(n) => n.serialize(serializer),
            Self::Float(n) => n.serialize(serializer),
            Self::String(s) => s.serialize(serializer),
            Self::List(list) => list.serialize(serializer),
            Self::Map(map) => map.serialize(serializer),
        }
    }
}
