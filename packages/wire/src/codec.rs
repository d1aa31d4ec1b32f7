//! The `Codec` trait and kind-directed dispatch.

use bytes::Bytes;
use serde_json::Value;

use crate::error::Result;
use crate::kind::CodecKind;
use crate::values::Values;
use crate::{float64, int32, opaque};

/// A stateless translation between a typed value and one wire layout.
///
/// # Example
///
/// ```rust
/// use offload_wire::{Codec, Int32Codec};
///
/// let bytes = Int32Codec.encode(&vec![2, 3]).unwrap();
/// assert_eq!(&bytes[..], &[0, 0, 0, 2, 0, 0, 0, 3]);
/// assert_eq!(Int32Codec.decode(&bytes).unwrap(), vec![2, 3]);
/// ```
pub trait Codec {
    /// The decoded representation.
    type Value;

    /// The layout this codec implements.
    const KIND: CodecKind;

    fn encode(&self, value: &Self::Value) -> Result<Bytes>;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Value>;
}

/// JSON text, one byte per character. See [`crate::opaque`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueCodec;

impl Codec for OpaqueCodec {
    type Value = Option<Value>;
    const KIND: CodecKind = CodecKind::Opaque;

    fn encode(&self, value: &Self::Value) -> Result<Bytes> {
        opaque::encode_value(value.as_ref())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Self::Value> {
        opaque::decode(bytes)
    }
}

/// Big-endian 32-bit integers. See [`crate::int32`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Int32Codec;

impl Codec for Int32Codec {
    type Value = Vec<i32>;
    const KIND: CodecKind = CodecKind::Int32Vector;

    fn encode(&self, value: &Self::Value) -> Result<Bytes> {
        Ok(int32::encode(value))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Self::Value> {
        int32::decode(bytes)
    }
}

/// Big-endian doubles. See [`crate::float64`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Float64Codec;

impl Codec for Float64Codec {
    type Value = Vec<f64>;
    const KIND: CodecKind = CodecKind::Float64Vector;

    fn encode(&self, value: &Self::Value) -> Result<Bytes> {
        Ok(float64::encode(value))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Self::Value> {
        float64::decode(bytes)
    }
}

/// Encode values with the layout they are tagged with.
pub fn encode(values: &Values) -> Result<Bytes> {
    match values {
        Values::Opaque(v) => OpaqueCodec.encode(v),
        Values::Int32(v) => Int32Codec.encode(v),
        Values::Float64(v) => Float64Codec.encode(v),
    }
}

/// Decode a buffer with the given layout.
pub fn decode(kind: CodecKind, bytes: &[u8]) -> Result<Values> {
    match kind {
        CodecKind::Opaque => OpaqueCodec.decode(bytes).map(Values::Opaque),
        CodecKind::Int32Vector => Int32Codec.decode(bytes).map(Values::Int32),
        CodecKind::Float64Vector => Float64Codec.decode(bytes).map(Values::Float64),
    }
}
