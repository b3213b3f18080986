//! # Dynamic Thrift Values
//!
//! The binary protocol tags every field and container element with its type, so a frame can
//! be decoded without knowing the IDL it was produced from. [`Value`] is that schema-less
//! representation.
//!
//! It is what the dynamic client path works with: arguments are built from JSON with
//! [`Value::from_json`], encoded, and replies are decoded back into a [`Value`] and rendered
//! with [`Value::to_json`] (see the [`json`] module for the mapping rules).
pub mod json;

use crate::protocol::{
    BinaryDecoder, BinaryEncoder, ListIdentifier, MapIdentifier, ProtocolError, TType,
};
use bytes::Bytes;

pub use json::JsonValueError;

/// Any value that can travel on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    /// Strings and binaries share the same wire representation.
    Binary(Bytes),
    /// Fields in wire order, keyed by field id.
    Struct(Vec<(i16, Value)>),
    Map {
        key_type: TType,
        value_type: TType,
        entries: Vec<(Value, Value)>,
    },
    Set {
        element_type: TType,
        elements: Vec<Value>,
    },
    List {
        element_type: TType,
        elements: Vec<Value>,
    },
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Value::Binary(Bytes::from(value.into()))
    }

    pub fn ttype(&self) -> TType {
        match self {
            Value::Bool(_) => TType::Bool,
            Value::Byte(_) => TType::Byte,
            Value::I16(_) => TType::I16,
            Value::I32(_) => TType::I32,
            Value::I64(_) => TType::I64,
            Value::Double(_) => TType::Double,
            Value::Binary(_) => TType::String,
            Value::Struct(_) => TType::Struct,
            Value::Map { .. } => TType::Map,
            Value::Set { .. } => TType::Set,
            Value::List { .. } => TType::List,
        }
    }

    /// Returns the contents as UTF-8 text if this is a valid string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Binary(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    /// Looks up a field of a struct value.
    pub fn field(&self, id: i16) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.iter().find(|(f, _)| *f == id).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn encode(&self, enc: &mut BinaryEncoder) {
        match self {
            Value::Bool(v) => enc.write_bool(*v),
            Value::Byte(v) => enc.write_byte(*v),
            Value::I16(v) => enc.write_i16(*v),
            Value::I32(v) => enc.write_i32(*v),
            Value::I64(v) => enc.write_i64(*v),
            Value::Double(v) => enc.write_double(*v),
            Value::Binary(v) => enc.write_binary(v),
            Value::Struct(fields) => encode_struct(fields, enc),
            Value::Map {
                key_type,
                value_type,
                entries,
            } => {
                enc.write_map_begin(MapIdentifier {
                    key_type: *key_type,
                    value_type: *value_type,
                    size: entries.len(),
                });
                for (k, v) in entries {
                    k.encode(enc);
                    v.encode(enc);
                }
            }
            Value::Set {
                element_type,
                elements,
            } => {
                enc.write_set_begin(ListIdentifier {
                    element_type: *element_type,
                    size: elements.len(),
                });
                elements.iter().for_each(|e| e.encode(enc));
            }
            Value::List {
                element_type,
                elements,
            } => {
                enc.write_list_begin(ListIdentifier {
                    element_type: *element_type,
                    size: elements.len(),
                });
                elements.iter().for_each(|e| e.encode(enc));
            }
        }
    }

    /// Reads a value of type `ttype` from the decoder.
    pub fn decode(dec: &mut BinaryDecoder, ttype: TType) -> Result<Self, ProtocolError> {
        decode_at_depth(dec, ttype, 0)
    }
}

/// Writes the fields of a struct followed by the STOP marker.
pub fn encode_struct(fields: &[(i16, Value)], enc: &mut BinaryEncoder) {
    for (id, value) in fields {
        enc.write_field_begin(value.ttype(), *id);
        value.encode(enc);
    }
    enc.write_field_stop();
}

/// Reads every field of a struct until the STOP marker.
pub fn decode_struct(dec: &mut BinaryDecoder) -> Result<Vec<(i16, Value)>, ProtocolError> {
    decode_fields(dec, 0)
}

fn decode_fields(
    dec: &mut BinaryDecoder,
    depth: usize,
) -> Result<Vec<(i16, Value)>, ProtocolError> {
    dec.check_depth(depth)?;
    let mut fields = Vec::new();
    loop {
        let field = dec.read_field_begin()?;
        let Some(id) = field.id else { break };
        fields.push((id, decode_at_depth(dec, field.field_type, depth + 1)?));
    }
    Ok(fields)
}

fn decode_at_depth(
    dec: &mut BinaryDecoder,
    ttype: TType,
    depth: usize,
) -> Result<Value, ProtocolError> {
    dec.check_depth(depth)?;
    let value = match ttype {
        TType::Bool => Value::Bool(dec.read_bool()?),
        TType::Byte => Value::Byte(dec.read_byte()?),
        TType::I16 => Value::I16(dec.read_i16()?),
        TType::I32 => Value::I32(dec.read_i32()?),
        TType::I64 => Value::I64(dec.read_i64()?),
        TType::Double => Value::Double(dec.read_double()?),
        TType::String => Value::Binary(dec.read_binary()?),
        TType::Struct => Value::Struct(decode_fields(dec, depth)?),
        TType::Map => {
            let map = dec.read_map_begin()?;
            let mut entries = Vec::with_capacity(map.size);
            for _ in 0..map.size {
                let k = decode_at_depth(dec, map.key_type, depth + 1)?;
                let v = decode_at_depth(dec, map.value_type, depth + 1)?;
                entries.push((k, v));
            }
            Value::Map {
                key_type: map.key_type,
                value_type: map.value_type,
                entries,
            }
        }
        TType::Set => {
            let set = dec.read_set_begin()?;
            Value::Set {
                element_type: set.element_type,
                elements: decode_elements(dec, set, depth)?,
            }
        }
        TType::List => {
            let list = dec.read_list_begin()?;
            Value::List {
                element_type: list.element_type,
                elements: decode_elements(dec, list, depth)?,
            }
        }
        TType::Stop | TType::Void => {
            return Err(ProtocolError::InvalidData(format!(
                "no value can be decoded for type {ttype}"
            )));
        }
    };
    Ok(value)
}

fn decode_elements(
    dec: &mut BinaryDecoder,
    list: ListIdentifier,
    depth: usize,
) -> Result<Vec<Value>, ProtocolError> {
    (0..list.size)
        .map(|_| decode_at_depth(dec, list.element_type, depth + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_with_nested_containers_survives_the_wire() {
        let value = Value::Struct(vec![
            (1, Value::string("world")),
            (
                2,
                Value::Map {
                    key_type: TType::String,
                    value_type: TType::I32,
                    entries: vec![(Value::string("a"), Value::I32(1))],
                },
            ),
            (
                -3,
                Value::List {
                    element_type: TType::Double,
                    elements: vec![Value::Double(0.5), Value::Double(-2.0)],
                },
            ),
            (4, Value::Struct(vec![(1, Value::Bool(true))])),
        ]);

        let mut enc = BinaryEncoder::new();
        value.encode(&mut enc);
        let mut dec = BinaryDecoder::new(enc.finish());

        assert_eq!(Value::decode(&mut dec, TType::Struct).unwrap(), value);
        assert_eq!(dec.remaining(), 0);
    }

    #[test]
    fn field_lookup_and_text_access() {
        let value = Value::Struct(vec![(0, Value::string("hello world"))]);
        assert_eq!(value.field(0).and_then(Value::as_str), Some("hello world"));
        assert!(value.field(1).is_none());
        assert!(Value::I32(1).as_str().is_none());
    }

    #[test]
    fn void_cannot_be_decoded() {
        let mut dec = BinaryDecoder::new(Bytes::new());
        assert!(matches!(
            Value::decode(&mut dec, TType::Void),
            Err(ProtocolError::InvalidData(_))
        ));
    }
}
