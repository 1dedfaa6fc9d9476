//! Varint framing and protobuf wire primitives.
//!
//! Varint encoding is little-endian base-128: each byte carries the low
//! 7 value bits, with the high bit set iff more bytes follow. Decoding
//! supports the full 64-bit range.

use thiserror::Error;

/// Protobuf wire type for varint-encoded scalars.
pub const WIRE_VARINT: u8 = 0;
/// Protobuf wire type for length-delimited fields.
pub const WIRE_LEN: u8 = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("truncated input at byte {0}")]
    Truncated(usize),

    #[error("varint exceeds 64 bits")]
    VarintOverflow,

    #[error("unsupported wire type {0}")]
    UnsupportedWireType(u8),

    #[error("length-delimited field overruns buffer")]
    LengthOverrun,
}

/// Append the varint encoding of `value` to `buf`.
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let bits = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(bits);
            return;
        }
        buf.push(bits | 0x80);
    }
}

/// Decode a varint from `data` starting at `offset`.
///
/// Returns the value and the offset just past the final byte.
pub fn decode_varint(data: &[u8], offset: usize) -> Result<(u64, usize), CodecError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    let mut pos = offset;

    loop {
        let byte = *data.get(pos).ok_or(CodecError::Truncated(pos))?;
        pos += 1;

        let bits = u64::from(byte & 0x7f);
        if shift >= 64 || (shift == 63 && bits > 1) {
            return Err(CodecError::VarintOverflow);
        }
        result |= bits << shift;

        if byte & 0x80 == 0 {
            return Ok((result, pos));
        }
        shift += 7;
    }
}

/// Incremental protobuf message encoder.
///
/// Zero-valued scalar fields are omitted, matching proto3 semantics.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(&mut self, field: u32, wire_type: u8) {
        encode_varint(u64::from(field) << 3 | u64::from(wire_type), &mut self.buf);
    }

    /// Varint scalar field; skipped when zero.
    pub fn uint(&mut self, field: u32, value: u64) -> &mut Self {
        if value != 0 {
            self.key(field, WIRE_VARINT);
            encode_varint(value, &mut self.buf);
        }
        self
    }

    /// Bool field; skipped when false.
    pub fn boolean(&mut self, field: u32, value: bool) -> &mut Self {
        self.uint(field, u64::from(value))
    }

    /// Length-delimited bytes field; skipped when empty.
    pub fn bytes(&mut self, field: u32, value: &[u8]) -> &mut Self {
        if !value.is_empty() {
            self.key(field, WIRE_LEN);
            encode_varint(value.len() as u64, &mut self.buf);
            self.buf.extend_from_slice(value);
        }
        self
    }

    /// Embedded message field, always emitted so oneof arms are visible
    /// even when every inner field is at its default.
    pub fn message(&mut self, field: u32, encoded: &[u8]) -> &mut Self {
        self.key(field, WIRE_LEN);
        encode_varint(encoded.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(encoded);
        self
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// One decoded field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Varint(u64),
    Bytes(&'a [u8]),
}

/// Streaming protobuf message decoder; unknown fields are skippable.
#[derive(Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Next `(field_number, value)` pair, or `None` at end of input.
    pub fn next_field(&mut self) -> Option<Result<(u32, FieldValue<'a>), CodecError>> {
        if self.pos >= self.data.len() {
            return None;
        }
        Some(self.read_field())
    }

    fn read_field(&mut self) -> Result<(u32, FieldValue<'a>), CodecError> {
        let (key, next) = decode_varint(self.data, self.pos)?;
        self.pos = next;

        let field = (key >> 3) as u32;
        let wire_type = (key & 0x07) as u8;

        match wire_type {
            WIRE_VARINT => {
                let (value, next) = decode_varint(self.data, self.pos)?;
                self.pos = next;
                Ok((field, FieldValue::Varint(value)))
            }
            WIRE_LEN => {
                let (len, next) = decode_varint(self.data, self.pos)?;
                let len = usize::try_from(len).map_err(|_| CodecError::LengthOverrun)?;
                let end = next.checked_add(len).ok_or(CodecError::LengthOverrun)?;
                if end > self.data.len() {
                    return Err(CodecError::LengthOverrun);
                }
                self.pos = end;
                Ok((field, FieldValue::Bytes(&self.data[next..end])))
            }
            other => Err(CodecError::UnsupportedWireType(other)),
        }
    }
}
