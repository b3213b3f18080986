//! Argument and result structs of the `Test` service methods.
use thrift_http_core::protocol::{BinaryDecoder, BinaryEncoder, ProtocolError, TType};

/// `struct Test_hello_args { 1: string name }`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelloArgs {
    pub name: Option<String>,
}

impl HelloArgs {
    pub fn encode(&self, enc: &mut BinaryEncoder) {
        if let Some(name) = &self.name {
            enc.write_field_begin(TType::String, 1);
            enc.write_string(name);
        }
        enc.write_field_stop();
    }

    pub fn decode(dec: &mut BinaryDecoder) -> Result<Self, ProtocolError> {
        let mut args = Self::default();
        loop {
            let field = dec.read_field_begin()?;
            match (field.id, field.field_type) {
                (None, _) => break,
                (Some(1), TType::String) => args.name = Some(dec.read_string()?),
                (Some(_), ttype) => dec.skip(ttype)?,
            }
        }
        Ok(args)
    }
}

/// `struct Test_hello_result { 0: string success }`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelloResult {
    pub success: Option<String>,
}

impl HelloResult {
    pub fn encode(&self, enc: &mut BinaryEncoder) {
        if let Some(success) = &self.success {
            enc.write_field_begin(TType::String, 0);
            enc.write_string(success);
        }
        enc.write_field_stop();
    }

    pub fn decode(dec: &mut BinaryDecoder) -> Result<Self, ProtocolError> {
        let mut result = Self::default();
        loop {
            let field = dec.read_field_begin()?;
            match (field.id, field.field_type) {
                (None, _) => break,
                (Some(0), TType::String) => result.success = Some(dec.read_string()?),
                (Some(_), ttype) => dec.skip(ttype)?,
            }
        }
        Ok(result)
    }
}
