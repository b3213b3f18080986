//! # Application Exceptions
//!
//! Errors raised by the RPC layer itself (as opposed to exceptions declared in a service's
//! IDL). They travel in an `EXCEPTION` message as the struct `{1: string message, 2: i32 type}`.
use crate::protocol::{BinaryDecoder, BinaryEncoder, ProtocolError, TType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationExceptionKind {
    Unknown,
    UnknownMethod,
    InvalidMessageType,
    WrongMethodName,
    BadSequenceId,
    MissingResult,
    InternalError,
    ProtocolError,
}

impl ApplicationExceptionKind {
    pub fn code(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::UnknownMethod => 1,
            Self::InvalidMessageType => 2,
            Self::WrongMethodName => 3,
            Self::BadSequenceId => 4,
            Self::MissingResult => 5,
            Self::InternalError => 6,
            Self::ProtocolError => 7,
        }
    }

    /// Codes this implementation doesn't know collapse into [`Self::Unknown`].
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::UnknownMethod,
            2 => Self::InvalidMessageType,
            3 => Self::WrongMethodName,
            4 => Self::BadSequenceId,
            5 => Self::MissingResult,
            6 => Self::InternalError,
            7 => Self::ProtocolError,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct ApplicationException {
    pub kind: ApplicationExceptionKind,
    pub message: String,
}

impl ApplicationException {
    pub fn new(kind: ApplicationExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn encode(&self, enc: &mut BinaryEncoder) {
        enc.write_field_begin(TType::String, 1);
        enc.write_string(&self.message);
        enc.write_field_begin(TType::I32, 2);
        enc.write_i32(self.kind.code());
        enc.write_field_stop();
    }

    /// Reads the exception struct. Unknown fields are skipped and missing ones default.
    pub fn decode(dec: &mut BinaryDecoder) -> Result<Self, ProtocolError> {
        let mut message = String::new();
        let mut kind = ApplicationExceptionKind::Unknown;

        loop {
            let field = dec.read_field_begin()?;
            match (field.id, field.field_type) {
                (None, _) => break,
                (Some(1), TType::String) => message = dec.read_string()?,
                (Some(2), TType::I32) => {
                    kind = ApplicationExceptionKind::from_code(dec.read_i32()?)
                }
                (Some(_), ttype) => dec.skip(ttype)?,
            }
        }

        Ok(Self { kind, message })
    }
}
