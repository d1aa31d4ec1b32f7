//! Int32 layout: 4 bytes per element, big-endian two's complement.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, WireError};
use crate::kind::CodecKind;

/// Bytes per element.
pub const STRIDE: usize = 4;

/// Encode each element as 4 big-endian bytes.
pub fn encode(values: &[i32]) -> Bytes {
    let mut buf = BytesMut::with_capacity(values.len() * STRIDE);
    for &value in values {
        buf.put_i32(value);
    }
    buf.freeze()
}

/// Decode one element per 4-byte chunk.
pub fn decode(mut buf: &[u8]) -> Result<Vec<i32>> {
    if buf.len() % STRIDE != 0 {
        return Err(WireError::format(
            CodecKind::Int32Vector,
            format!("{} bytes is not a multiple of {}", buf.len(), STRIDE),
        ));
    }

    let mut values = Vec::with_capacity(buf.len() / STRIDE);
    while buf.has_remaining() {
        values.push(buf.get_i32());
    }
    Ok(values)
}
