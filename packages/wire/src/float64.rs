//! Float64 layout: 8 bytes per element, big-endian IEEE-754.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, WireError};
use crate::kind::CodecKind;

/// Bytes per element.
pub const STRIDE: usize = 8;

/// Encode each element as 8 big-endian bytes. Bit patterns are kept exactly.
pub fn encode(values: &[f64]) -> Bytes {
    let mut buf = BytesMut::with_capacity(values.len() * STRIDE);
    for &value in values {
        buf.put_f64(value);
    }
    buf.freeze()
}

/// Decode one element per 8-byte chunk.
pub fn decode(mut buf: &[u8]) -> Result<Vec<f64>> {
    if buf.len() % STRIDE != 0 {
        return Err(WireError::format(
            CodecKind::Float64Vector,
            format!("{} bytes is not a multiple of {}", buf.len(), STRIDE),
        ));
    }

    let mut values = Vec::with_capacity(buf.len() / STRIDE);
    while buf.has_remaining() {
        values.push(buf.get_f64());
    }
    Ok(values)
}
