use super::{
    FieldIdentifier, ListIdentifier, MapIdentifier, MessageIdentifier, MessageType, ProtocolError,
    TType, VERSION_1, VERSION_MASK,
};
use bytes::{Buf, Bytes};

/// Limits and compatibility switches applied while decoding a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Reject message headers that don't carry a protocol version.
    pub strict_read: bool,
    /// Upper bound for string, binary and container lengths.
    pub max_size: usize,
    /// Upper bound for struct/container nesting when skipping or decoding dynamic values.
    pub max_depth: usize,
}

impl DecoderConfig {
    pub const DEFAULT_MAX_SIZE: usize = 16 * 1024 * 1024;
    pub const DEFAULT_MAX_DEPTH: usize = 64;
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            strict_read: false,
            max_size: Self::DEFAULT_MAX_SIZE,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}

/// Reads Thrift binary protocol values from a received frame.
///
/// Every read checks the remaining length first, so a truncated frame surfaces as
/// [`ProtocolError::UnexpectedEof`] instead of a panic.
#[derive(Debug, Clone)]
pub struct BinaryDecoder {
    buf: Bytes,
    config: DecoderConfig,
}

impl BinaryDecoder {
    pub fn new(buf: Bytes) -> Self {
        Self::with_config(buf, DecoderConfig::default())
    }

    pub fn with_config(buf: Bytes, config: DecoderConfig) -> Self {
        Self { buf, config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Number of unread bytes left in the frame.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn read_message_begin(&mut self) -> Result<MessageIdentifier, ProtocolError> {
        let first = self.read_i32()?;

        if first < 0 {
            let header = first as u32;
            let version = header & VERSION_MASK;
            if version != VERSION_1 {
                return Err(ProtocolError::BadVersion(version));
            }
            let message_type = MessageType::try_from((header & 0xff) as u8)?;
            let name = self.read_string()?;
            let sequence_number = self.read_i32()?;
            return Ok(MessageIdentifier::new(name, message_type, sequence_number));
        }

        if self.config.strict_read {
            return Err(ProtocolError::MissingVersion);
        }

        // Non-strict header: the first word is the length of the method name.
        let len = self.checked_size(first)?;
        let name = self.read_utf8(len)?;
        let message_type = MessageType::try_from(self.read_byte()? as u8)?;
        let sequence_number = self.read_i32()?;
        Ok(MessageIdentifier::new(name, message_type, sequence_number))
    }

    pub fn read_field_begin(&mut self) -> Result<FieldIdentifier, ProtocolError> {
        let field_type = TType::try_from(self.read_byte()? as u8)?;
        if field_type == TType::Stop {
            return Ok(FieldIdentifier {
                field_type,
                id: None,
            });
        }
        let id = self.read_i16()?;
        Ok(FieldIdentifier {
            field_type,
            id: Some(id),
        })
    }

    pub fn read_list_begin(&mut self) -> Result<ListIdentifier, ProtocolError> {
        let element_type = TType::try_from(self.read_byte()? as u8)?;
        let size = self.read_i32()?;
        let size = self.checked_container_size(size)?;
        Ok(ListIdentifier { element_type, size })
    }

    pub fn read_set_begin(&mut self) -> Result<ListIdentifier, ProtocolError> {
        self.read_list_begin()
    }

    pub fn read_map_begin(&mut self) -> Result<MapIdentifier, ProtocolError> {
        let key_type = TType::try_from(self.read_byte()? as u8)?;
        let value_type = TType::try_from(self.read_byte()? as u8)?;
        let size = self.read_i32()?;
        let size = self.checked_container_size(size)?;
        Ok(MapIdentifier {
            key_type,
            value_type,
            size,
        })
    }

    pub fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.read_byte()? != 0)
    }

    pub fn read_byte(&mut self) -> Result<i8, ProtocolError> {
        self.ensure(1)?;
        Ok(self.buf.get_i8())
    }

    pub fn read_i16(&mut self) -> Result<i16, ProtocolError> {
        self.ensure(2)?;
        Ok(self.buf.get_i16())
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_i32())
    }

    pub fn read_i64(&mut self) -> Result<i64, ProtocolError> {
        self.ensure(8)?;
        Ok(self.buf.get_i64())
    }

    pub fn read_double(&mut self) -> Result<f64, ProtocolError> {
        self.ensure(8)?;
        Ok(f64::from_bits(self.buf.get_u64()))
    }

    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        let size = self.read_i32()?;
        let len = self.checked_size(size)?;
        self.read_utf8(len)
    }

    pub fn read_binary(&mut self) -> Result<Bytes, ProtocolError> {
        let size = self.read_i32()?;
        let len = self.checked_size(size)?;
        self.ensure(len)?;
        Ok(self.buf.split_to(len))
    }

    /// Discards a value of the given type, including any nested values.
    pub fn skip(&mut self, ttype: TType) -> Result<(), ProtocolError> {
        self.skip_at_depth(ttype, 0)
    }

    fn skip_at_depth(&mut self, ttype: TType, depth: usize) -> Result<(), ProtocolError> {
        self.check_depth(depth)?;
        match ttype {
            TType::Bool | TType::Byte => self.advance(1),
            TType::I16 => self.advance(2),
            TType::I32 => self.advance(4),
            TType::I64 | TType::Double => self.advance(8),
            TType::String => {
                let size = self.read_i32()?;
                let len = self.checked_size(size)?;
                self.advance(len)
            }
            TType::Struct => loop {
                let field = self.read_field_begin()?;
                if field.id.is_none() {
                    return Ok(());
                }
                self.skip_at_depth(field.field_type, depth + 1)?;
            },
            TType::Map => {
                let map = self.read_map_begin()?;
                for _ in 0..map.size {
                    self.skip_at_depth(map.key_type, depth + 1)?;
                    self.skip_at_depth(map.value_type, depth + 1)?;
                }
                Ok(())
            }
            TType::Set | TType::List => {
                let list = self.read_list_begin()?;
                for _ in 0..list.size {
                    self.skip_at_depth(list.element_type, depth + 1)?;
                }
                Ok(())
            }
            TType::Stop | TType::Void => Err(ProtocolError::InvalidData(format!(
                "cannot skip a value of type {ttype}"
            ))),
        }
    }

    pub(crate) fn check_depth(&self, depth: usize) -> Result<(), ProtocolError> {
        if depth > self.config.max_depth {
            return Err(ProtocolError::DepthLimit(self.config.max_depth));
        }
        Ok(())
    }

    fn read_utf8(&mut self, len: usize) -> Result<String, ProtocolError> {
        self.ensure(len)?;
        let bytes = self.buf.split_to(len);
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ProtocolError::InvalidData(format!("string is not valid UTF-8: {e}")))
    }

    fn advance(&mut self, len: usize) -> Result<(), ProtocolError> {
        self.ensure(len)?;
        self.buf.advance(len);
        Ok(())
    }

    fn ensure(&self, len: usize) -> Result<(), ProtocolError> {
        let remaining = self.buf.remaining();
        if remaining < len {
            return Err(ProtocolError::UnexpectedEof {
                needed: len - remaining,
            });
        }
        Ok(())
    }

    fn checked_size(&self, size: i32) -> Result<usize, ProtocolError> {
        let size = usize::try_from(size).map_err(|_| ProtocolError::NegativeSize(size))?;
        if size > self.config.max_size {
            return Err(ProtocolError::SizeLimit {
                size,
                limit: self.config.max_size,
            });
        }
        Ok(size)
    }

    // Every element takes at least one byte, so a count larger than the rest of the
    // frame can be rejected before anything is allocated for it.
    fn checked_container_size(&self, size: i32) -> Result<usize, ProtocolError> {
        let size = self.checked_size(size)?;
        self.ensure(size)?;
        Ok(size)
    }
}
