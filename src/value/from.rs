use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use crate::Value;

macro_rules! impl_from {
    ($($ty:ty => |$v:ident| $convert:expr;)+) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $convert
                }
            }
        )+
    };
}

impl_from! {
    () => |_unit| Value::None;
    bool => |b| Value::Bool(b);
    u8 => |i| Value::Integer(i64::from(i));
    u16 => |i| Value::Integer(i64::from(i));
    u32 => |i| Value::Integer(i64::from(i));
    i8 => |i| Value::Integer(i64::from(i));
    i16 => |i| Value::Integer(i64::from(i));
    i32 => |i| Value::Integer(i64::from(i));
    i64 => |i| Value::Integer(i);
    f32 => |f| Value::Float(f64::from(f));
    f64 => |f| Value::Float(f);
    String => |s| Value::String(s);
    &str => |s| Value::String(s.to_owned());
    Cow<'_, str> => |s| Value::String(s.into_owned());
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::None, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(list: Vec<T>) -> Self {
        Self::List(list.into_iter().map(Into::into).collect())
    }
}

/// Builds a map value from key-value pairs.
fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Value
where
    K: Into<String>,
    V: Into<Value>,
{
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect(),
    )
}

impl<K: Into<String>, V: Into<Value>> From<BTreeMap<K, V>> for Value {
    fn from(m: BTreeMap<K, V>) -> Self {
        map(m)
    }
}

impl<K: Into<String>, V: Into<Value>, S> From<HashMap<K, V, S>> for Value {
    fn from(m: HashMap<K, V, S>) -> Self {
        map(m)
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Value {
    fn from(entries: [(K, V); N]) -> Self {
        map(entries)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => Self::None,
            Json::Bool(b) => Self::Bool(b),
            // Unsigned integers above `i64::MAX` degrade to floats.
            Json::Number(n) => n.as_i64().map_or_else(
                || Self::Float(n.as_f64().unwrap_or(f64::NAN)),
                Self::Integer,
            ),
            Json::String(s) => Self::String(s),
            Json::Array(list) => Self::List(list.into_iter().map(Self::from).collect()),
            Json::Object(m) => map(m.into_iter().map(|(k, v)| (k, Self::from(v)))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_numbers() {
        let json = serde_json::json!([1, -2, 1.5, u64::MAX]);
        let Value::List(list) = Value::from(json) else {
            panic!("expected a list");
        };
        assert_eq!(list[0], Value::Integer(1));
        assert_eq!(list[1], Value::Integer(-2));
        assert_eq!(list[2], Value::Float(1.5));
        assert_eq!(list[3], Value::Float(u64::MAX as f64));
    }

    #[test]
    fn from_option() {
        assert_eq!(Value::from(None::<i32>), Value::None);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
