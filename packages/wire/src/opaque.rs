//! Opaque layout: JSON text stored one byte per character.
//!
//! Text is walked as UTF-16 code units and each unit keeps only its low
//! eight bits. Characters below U+0100 survive a round trip unchanged;
//! anything above loses its high bits. Existing producers and consumers of
//! this layout rely on the truncation, so it is kept as is.

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, WireError};
use crate::kind::CodecKind;

/// Serialize `value` to JSON and narrow it to one byte per character.
///
/// Fails with [`WireError::Serialization`] when JSON cannot represent the
/// value, for example a map whose keys are not strings.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    let text = serde_json::to_string(value)
        .map_err(|e| WireError::serialization(CodecKind::Opaque, e.to_string()))?;
    Ok(narrow(&text))
}

/// Encode an optional value. "No value" is the empty buffer.
pub fn encode_value(value: Option<&Value>) -> Result<Bytes> {
    match value {
        Some(value) => encode(value),
        None => Ok(Bytes::new()),
    }
}

/// Decode a buffer back into a JSON value.
///
/// The empty buffer is "no value" and decodes to `None`.
pub fn decode(buf: &[u8]) -> Result<Option<Value>> {
    if buf.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&widen(buf))
        .map(Some)
        .map_err(|e| WireError::format(CodecKind::Opaque, e.to_string()))
}

/// Keep the low byte of every UTF-16 code unit.
pub fn narrow(text: &str) -> Bytes {
    text.encode_utf16()
        .map(|unit| (unit & 0xFF) as u8)
        .collect::<Vec<u8>>()
        .into()
}

/// Map every byte to the character with that code point.
pub fn widen(buf: &[u8]) -> String {
    buf.iter().map(|&b| char::from(b)).collect()
}
