//! # JSON <-> Thrift Value Mapping
//!
//! ## JSON -> Thrift ([`Value::from_json`])
//!
//! | JSON                                        | Thrift                          |
//! |---------------------------------------------|---------------------------------|
//! | `true` / `false`                            | `bool`                          |
//! | integer                                     | `i64`                           |
//! | float                                       | `double`                        |
//! | string                                      | `string`                        |
//! | array                                       | `list` (typed by its first element, `string` when empty) |
//! | object with `i16` keys, e.g. `{"1": "x"}`   | `struct` with those field ids   |
//! | object with one type key, e.g. `{"i32": 5}` | exactly that type               |
//!
//! Typed objects accept `byte`, `i16`, `i32`, `i64`, `double`, `bool`, `string` (a string or
//! an array of byte values), `struct`, `list`, `set` and `map` (an array of `[key, value]`
//! pairs). `null` has no Thrift counterpart and is rejected.
//!
//! ## Thrift -> JSON ([`Value::to_json`])
//!
//! Numbers become JSON numbers (non-finite doubles become `null`), UTF-8 strings become
//! strings and other binaries arrays of bytes, structs become objects keyed by field id,
//! maps become arrays of `[key, value]` pairs, and sets/lists become arrays.
use super::Value;
use crate::protocol::TType;
use bytes::Bytes;
use serde_json::{Map, Number};

#[derive(Debug, thiserror::Error)]
pub enum JsonValueError {
    #[error("null has no Thrift representation")]
    Null,
    #[error("{value} is out of range for {ttype}")]
    OutOfRange { ttype: TType, value: String },
    #[error("Container elements must share one type: expected {expected}, found {found}")]
    MixedElementTypes { expected: TType, found: TType },
    #[error("'{0}' is not a valid field id")]
    InvalidFieldId(String),
    #[error("Field id {0} is given more than once")]
    DuplicateFieldId(i16),
    #[error("Invalid value for type '{ttype}': {reason}")]
    InvalidTypedValue { ttype: TType, reason: String },
}

impl Value {
    /// Builds a Thrift value out of a JSON value.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, JsonValueError> {
        match json {
            serde_json::Value::Null => Err(JsonValueError::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::Number(n) => number_to_value(n),
            serde_json::Value::String(s) => Ok(Value::string(s.clone())),
            serde_json::Value::Array(items) => {
                let (element_type, elements) = homogeneous(items)?;
                Ok(Value::List {
                    element_type,
                    elements,
                })
            }
            serde_json::Value::Object(map) => match single_typed_entry(map) {
                Some((ttype, inner)) => typed_value(ttype, inner),
                None => struct_from_object(map),
            },
        }
    }

    /// Renders the value as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Byte(v) => serde_json::Value::from(*v),
            Value::I16(v) => serde_json::Value::from(*v),
            Value::I32(v) => serde_json::Value::from(*v),
            Value::I64(v) => serde_json::Value::from(*v),
            Value::Double(v) => Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Binary(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => serde_json::Value::String(text.to_string()),
                Err(_) => bytes.iter().copied().collect(),
            },
            Value::Struct(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(id, value)| (id.to_string(), value.to_json()))
                    .collect(),
            ),
            Value::Map { entries, .. } => entries
                .iter()
                .map(|(k, v)| serde_json::Value::Array(vec![k.to_json(), v.to_json()]))
                .collect(),
            Value::Set { elements, .. } | Value::List { elements, .. } => {
                elements.iter().map(Value::to_json).collect()
            }
        }
    }
}

fn number_to_value(n: &Number) -> Result<Value, JsonValueError> {
    if let Some(v) = n.as_i64() {
        return Ok(Value::I64(v));
    }
    if n.is_u64() {
        return Err(JsonValueError::OutOfRange {
            ttype: TType::I64,
            value: n.to_string(),
        });
    }
    n.as_f64()
        .map(Value::Double)
        .ok_or_else(|| JsonValueError::OutOfRange {
            ttype: TType::Double,
            value: n.to_string(),
        })
}

fn single_typed_entry(map: &Map<String, serde_json::Value>) -> Option<(TType, &serde_json::Value)> {
    if map.len() != 1 {
        return None;
    }
    let (key, value) = map.iter().next()?;
    let ttype = match key.as_str() {
        "bool" => TType::Bool,
        "byte" => TType::Byte,
        "i16" => TType::I16,
        "i32" => TType::I32,
        "i64" => TType::I64,
        "double" => TType::Double,
        "string" => TType::String,
        "struct" => TType::Struct,
        "map" => TType::Map,
        "set" => TType::Set,
        "list" => TType::List,
        _ => return None,
    };
    Some((ttype, value))
}

fn struct_from_object(map: &Map<String, serde_json::Value>) -> Result<Value, JsonValueError> {
    let mut fields = map
        .iter()
        .map(|(key, value)| {
            let id = key
                .trim()
                .parse::<i16>()
                .map_err(|_| JsonValueError::InvalidFieldId(key.clone()))?;
            Ok((id, Value::from_json(value)?))
        })
        .collect::<Result<Vec<_>, JsonValueError>>()?;
    fields.sort_by_key(|(id, _)| *id);
    if let Some(pair) = fields.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(JsonValueError::DuplicateFieldId(pair[0].0));
    }
    Ok(Value::Struct(fields))
}

fn typed_value(ttype: TType, json: &serde_json::Value) -> Result<Value, JsonValueError> {
    let invalid = |reason: &str| JsonValueError::InvalidTypedValue {
        ttype,
        reason: reason.to_string(),
    };

    match ttype {
        TType::Bool => json
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| invalid("expected a boolean")),
        TType::Byte => integer(ttype, json).map(Value::Byte),
        TType::I16 => integer(ttype, json).map(Value::I16),
        TType::I32 => integer(ttype, json).map(Value::I32),
        TType::I64 => integer(ttype, json).map(Value::I64),
        TType::Double => json
            .as_f64()
            .map(Value::Double)
            .ok_or_else(|| invalid("expected a number")),
        TType::String => match json {
            serde_json::Value::String(s) => Ok(Value::string(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(|| invalid("binary arrays may only contain values 0-255"))
                })
                .collect::<Result<Vec<u8>, _>>()
                .map(|bytes| Value::Binary(Bytes::from(bytes))),
            _ => Err(invalid("expected a string or an array of bytes")),
        },
        TType::Struct => match json {
            serde_json::Value::Object(map) => struct_from_object(map),
            _ => Err(invalid("expected an object keyed by field id")),
        },
        TType::List | TType::Set => {
            let items = json.as_array().ok_or_else(|| invalid("expected an array"))?;
            let (element_type, elements) = homogeneous(items)?;
            Ok(if ttype == TType::Set {
                Value::Set {
                    element_type,
                    elements,
                }
            } else {
                Value::List {
                    element_type,
                    elements,
                }
            })
        }
        TType::Map => {
            let pairs = json
                .as_array()
                .ok_or_else(|| invalid("expected an array of [key, value] pairs"))?;
            let mut keys = Vec::with_capacity(pairs.len());
            let mut values = Vec::with_capacity(pairs.len());
            for pair in pairs {
                match pair.as_array().map(Vec::as_slice) {
                    Some([k, v]) => {
                        keys.push(k.clone());
                        values.push(v.clone());
                    }
                    _ => return Err(invalid("every entry must be a [key, value] pair")),
                }
            }
            let (key_type, keys) = homogeneous(&keys)?;
            let (value_type, values) = homogeneous(&values)?;
            Ok(Value::Map {
                key_type,
                value_type,
                entries: keys.into_iter().zip(values).collect(),
            })
        }
        TType::Stop | TType::Void => Err(invalid("type carries no value")),
    }
}

fn integer<T: TryFrom<i64>>(ttype: TType, json: &serde_json::Value) -> Result<T, JsonValueError> {
    let out_of_range = || JsonValueError::OutOfRange {
        ttype,
        value: json.to_string(),
    };
    let v = json.as_i64().ok_or_else(|| match json {
        serde_json::Value::Number(_) => out_of_range(),
        _ => JsonValueError::InvalidTypedValue {
            ttype,
            reason: "expected an integer".to_string(),
        },
    })?;
    T::try_from(v).map_err(|_| out_of_range())
}

fn homogeneous(items: &[serde_json::Value]) -> Result<(TType, Vec<Value>), JsonValueError> {
    let elements = items
        .iter()
        .map(Value::from_json)
        .collect::<Result<Vec<_>, _>>()?;
    let element_type = elements.first().map(Value::ttype).unwrap_or(TType::String);
    if let Some(other) = elements.iter().find(|e| e.ttype() != element_type) {
        return Err(JsonValueError::MixedElementTypes {
            expected: element_type,
            found: other.ttype(),
        });
    }
    Ok((element_type, elements))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_json_maps_to_natural_types() {
        assert_eq!(Value::from_json(&json!("world")).unwrap(), Value::string("world"));
        assert_eq!(Value::from_json(&json!(7)).unwrap(), Value::I64(7));
        assert_eq!(Value::from_json(&json!(1.5)).unwrap(), Value::Double(1.5));
        assert_eq!(Value::from_json(&json!(false)).unwrap(), Value::Bool(false));
        assert_eq!(
            Value::from_json(&json!([1, 2])).unwrap(),
            Value::List {
                element_type: TType::I64,
                elements: vec![Value::I64(1), Value::I64(2)],
            }
        );
    }

    #[test]
    fn numeric_keys_build_a_struct_sorted_by_id() {
        let value = Value::from_json(&json!({ "10": "b", "2": true })).unwrap();
        assert_eq!(
            value,
            Value::Struct(vec![(2, Value::Bool(true)), (10, Value::string("b"))])
        );
    }

    #[test]
    fn typed_objects_pick_the_exact_wire_type() {
        assert_eq!(Value::from_json(&json!({ "i32": 5 })).unwrap(), Value::I32(5));
        assert_eq!(Value::from_json(&json!({ "byte": -1 })).unwrap(), Value::Byte(-1));
        assert_eq!(
            Value::from_json(&json!({ "string": [104, 105] })).unwrap(),
            Value::string("hi")
        );
        assert_eq!(
            Value::from_json(&json!({ "map": [["a", { "i16": 1 }]] })).unwrap(),
            Value::Map {
                key_type: TType::String,
                value_type: TType::I16,
                entries: vec![(Value::string("a"), Value::I16(1))],
            }
        );
        assert_eq!(
            Value::from_json(&json!({ "set": [] })).unwrap(),
            Value::Set {
                element_type: TType::String,
                elements: vec![],
            }
        );
    }

    #[test]
    fn rejects_what_thrift_cannot_carry() {
        assert!(matches!(
            Value::from_json(&json!(null)),
            Err(JsonValueError::Null)
        ));
        assert!(matches!(
            Value::from_json(&json!({ "i16": 70000 })),
            Err(JsonValueError::OutOfRange { .. })
        ));
        assert!(matches!(
            Value::from_json(&json!([1, "two"])),
            Err(JsonValueError::MixedElementTypes {
                expected: TType::I64,
                found: TType::String
            })
        ));
        assert!(matches!(
            Value::from_json(&json!({ "name": "x", "other": 1 })),
            Err(JsonValueError::InvalidFieldId(_))
        ));
    }

    #[test]
    fn rejects_field_ids_given_twice() {
        assert!(matches!(
            Value::from_json(&json!({ "1": "a", "01": "b" })),
            Err(JsonValueError::DuplicateFieldId(1))
        ));
        assert!(matches!(
            Value::from_json(&json!({ "2": 1, " 2": 2, "3": 3 })),
            Err(JsonValueError::DuplicateFieldId(2))
        ));
    }

    #[test]
    fn renders_replies_as_json() {
        let value = Value::Struct(vec![
            (0, Value::string("hello world")),
            (1, Value::Binary(Bytes::from_static(&[0xff, 0x00]))),
            (2, Value::Double(f64::NAN)),
            (
                3,
                Value::Map {
                    key_type: TType::I32,
                    value_type: TType::Bool,
                    entries: vec![(Value::I32(1), Value::Bool(true))],
                },
            ),
        ]);

        assert_eq!(
            value.to_json(),
            json!({
                "0": "hello world",
                "1": [255, 0],
                "2": null,
                "3": [[1, true]],
            })
        );
    }
}
