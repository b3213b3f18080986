//! # Thrift Binary Protocol
//!
//! This module contains the wire-level building blocks of the Thrift binary protocol.
//!
//! Every value on the wire is prefixed (where a prefix is needed) by a one byte type tag,
//! integers are big-endian and strings/binaries carry an `i32` length prefix.
//!
//! * **[`BinaryEncoder`]**: Appends messages, structs, containers and primitives to a `BytesMut`.
//! * **[`BinaryDecoder`]**: Reads them back from a `Bytes` buffer, enforcing the limits in [`DecoderConfig`].
//!
//! ## Message Header
//!
//! The encoder always writes the *strict* header:
//!
//! ```text
//! i32 (VERSION_1 | message type) | string name | i32 sequence id
//! ```
//!
//! The decoder also understands the older non-strict header (name length first) unless
//! [`DecoderConfig::strict_read`] is set.
pub mod decoder;
pub mod encoder;

pub use decoder::{BinaryDecoder, DecoderConfig};
pub use encoder::BinaryEncoder;

/// Version marker stored in the upper 16 bits of a strict message header.
pub const VERSION_1: u32 = 0x8001_0000;
pub(crate) const VERSION_MASK: u32 = 0xffff_0000;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Unexpected end of frame: needed {needed} more byte(s)")]
    UnexpectedEof { needed: usize },
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Negative size {0} read from the wire")]
    NegativeSize(i32),
    #[error("Size {size} exceeds the configured limit of {limit}")]
    SizeLimit { size: usize, limit: usize },
    #[error("Bad protocol version 0x{0:08x}")]
    BadVersion(u32),
    #[error("Missing protocol version, the peer sent a non-strict message header")]
    MissingVersion,
    #[error("Nesting depth exceeds the configured limit of {0}")]
    DepthLimit(usize),
}

/// The type tag of a value on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TType {
    Stop,
    Void,
    Bool,
    Byte,
    Double,
    I16,
    I32,
    I64,
    String,
    Struct,
    Map,
    Set,
    List,
}

impl TType {
    pub fn as_u8(self) -> u8 {
        match self {
            TType::Stop => 0,
            TType::Void => 1,
            TType::Bool => 2,
            TType::Byte => 3,
            TType::Double => 4,
            TType::I16 => 6,
            TType::I32 => 8,
            TType::I64 => 10,
            TType::String => 11,
            TType::Struct => 12,
            TType::Map => 13,
            TType::Set => 14,
            TType::List => 15,
        }
    }

    /// Human readable name, also used as the type key of typed JSON values.
    pub fn name(self) -> &'static str {
        match self {
            TType::Stop => "stop",
            TType::Void => "void",
            TType::Bool => "bool",
            TType::Byte => "byte",
            TType::Double => "double",
            TType::I16 => "i16",
            TType::I32 => "i32",
            TType::I64 => "i64",
            TType::String => "string",
            TType::Struct => "struct",
            TType::Map => "map",
            TType::Set => "set",
            TType::List => "list",
        }
    }
}

impl TryFrom<u8> for TType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let ttype = match value {
            0 => TType::Stop,
            1 => TType::Void,
            2 => TType::Bool,
            3 => TType::Byte,
            4 => TType::Double,
            6 => TType::I16,
            8 => TType::I32,
            10 => TType::I64,
            11 => TType::String,
            12 => TType::Struct,
            13 => TType::Map,
            14 => TType::Set,
            15 => TType::List,
            other => {
                return Err(ProtocolError::InvalidData(format!(
                    "unknown type tag {other}"
                )));
            }
        };
        Ok(ttype)
    }
}

impl std::fmt::Display for TType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The kind of a message envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Call,
    Reply,
    Exception,
    Oneway,
}

impl MessageType {
    pub fn as_u8(self) -> u8 {
        match self {
            MessageType::Call => 1,
            MessageType::Reply => 2,
            MessageType::Exception => 3,
            MessageType::Oneway => 4,
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MessageType::Call),
            2 => Ok(MessageType::Reply),
            3 => Ok(MessageType::Exception),
            4 => Ok(MessageType::Oneway),
            other => Err(ProtocolError::InvalidData(format!(
                "unknown message type {other}"
            ))),
        }
    }
}

/// The envelope preceding every call, reply or exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageIdentifier {
    pub name: String,
    pub message_type: MessageType,
    pub sequence_number: i32,
}

impl MessageIdentifier {
    pub fn new(name: impl Into<String>, message_type: MessageType, sequence_number: i32) -> Self {
        Self {
            name: name.into(),
            message_type,
            sequence_number,
        }
    }
}

/// Header of a struct field. `id` is `None` for the STOP marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldIdentifier {
    pub field_type: TType,
    pub id: Option<i16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListIdentifier {
    pub element_type: TType,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapIdentifier {
    pub key_type: TType,
    pub value_type: TType,
    pub size: usize,
}
