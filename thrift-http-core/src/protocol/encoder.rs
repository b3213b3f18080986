use super::{
    FieldIdentifier, ListIdentifier, MapIdentifier, MessageIdentifier, TType, VERSION_1,
};
use bytes::{BufMut, Bytes, BytesMut};

/// Writes Thrift binary protocol values into an in-memory frame.
///
/// The encoder never fails: sizes are written as `i32`, so callers are expected to keep
/// strings and containers below `i32::MAX` elements.
#[derive(Debug, Default)]
pub struct BinaryEncoder {
    buf: BytesMut,
}

impl BinaryEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Writes the strict message header.
    pub fn write_message_begin(&mut self, identifier: &MessageIdentifier) {
        let header = VERSION_1 | u32::from(identifier.message_type.as_u8());
        self.buf.put_u32(header);
        self.write_string(&identifier.name);
        self.write_i32(identifier.sequence_number);
    }

    pub fn write_field_begin(&mut self, field_type: TType, id: i16) {
        self.buf.put_u8(field_type.as_u8());
        self.write_i16(id);
    }

    /// Writes the STOP marker that terminates a struct.
    pub fn write_field_stop(&mut self) {
        self.buf.put_u8(TType::Stop.as_u8());
    }

    pub fn write_field(&mut self, field: FieldIdentifier) {
        match field.id {
            Some(id) => self.write_field_begin(field.field_type, id),
            None => self.write_field_stop(),
        }
    }

    pub fn write_list_begin(&mut self, identifier: ListIdentifier) {
        self.buf.put_u8(identifier.element_type.as_u8());
        self.write_size(identifier.size);
    }

    pub fn write_set_begin(&mut self, identifier: ListIdentifier) {
        self.write_list_begin(identifier);
    }

    pub fn write_map_begin(&mut self, identifier: MapIdentifier) {
        self.buf.put_u8(identifier.key_type.as_u8());
        self.buf.put_u8(identifier.value_type.as_u8());
        self.write_size(identifier.size);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    pub fn write_byte(&mut self, value: i8) {
        self.buf.put_i8(value);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buf.put_i16(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.put_i64(value);
    }

    pub fn write_double(&mut self, value: f64) {
        self.buf.put_u64(value.to_bits());
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_binary(value.as_bytes());
    }

    pub fn write_binary(&mut self, value: &[u8]) {
        self.write_size(value.len());
        self.buf.put_slice(value);
    }

    fn write_size(&mut self, size: usize) {
        // Sizes beyond i32::MAX cannot be represented on the wire; saturate so the peer
        // rejects the frame instead of reading a wrapped length.
        self.write_i32(i32::try_from(size).unwrap_or(i32::MAX));
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consumes the encoder and returns the finished frame.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MessageType;

    #[test]
    fn strict_call_header_layout() {
        let mut enc = BinaryEncoder::new();
        enc.write_message_begin(&MessageIdentifier::new("hello", MessageType::Call, 1));

        let frame = enc.finish();
        assert_eq!(
            &frame[..],
            &[
                0x80, 0x01, 0x00, 0x01, // version | CALL
                0x00, 0x00, 0x00, 0x05, b'h', b'e', b'l', b'l', b'o', // name
                0x00, 0x00, 0x00, 0x01, // seqid
            ]
        );
    }

    #[test]
    fn string_field_followed_by_stop() {
        let mut enc = BinaryEncoder::new();
        enc.write_field_begin(TType::String, 1);
        enc.write_string("world");
        enc.write_field_stop();

        let frame = enc.finish();
        assert_eq!(
            &frame[..],
            &[
                11, 0x00, 0x01, // STRING, id 1
                0x00, 0x00, 0x00, 0x05, b'w', b'o', b'r', b'l', b'd', 0, // STOP
            ]
        );
    }

    #[test]
    fn double_is_written_as_big_endian_bits() {
        let mut enc = BinaryEncoder::new();
        enc.write_double(1.0);
        assert_eq!(&enc.finish()[..], &1.0f64.to_bits().to_be_bytes());
    }
}
