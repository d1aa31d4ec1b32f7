//! Offload wire layouts.
//!
//! Everything that crosses the isolation boundary between a pool and its
//! execution units is one of three byte layouts:
//!
//! - [`CodecKind::Opaque`]: JSON text, one byte per character (see [`opaque`])
//! - [`CodecKind::Int32Vector`]: 4-byte big-endian two's-complement integers
//! - [`CodecKind::Float64Vector`]: 8-byte big-endian IEEE-754 doubles
//!
//! The layouts are shared with existing producers and consumers, so they
//! are reproduced byte for byte, including the opaque layout's truncation
//! of characters above U+00FF.
//!
//! # Example
//!
//! ```rust
//! use offload_wire::{decode, encode, CodecKind, Values};
//!
//! let args = Values::Int32(vec![6, 7]);
//! let bytes = encode(&args).unwrap();
//! assert_eq!(bytes.len(), 8);
//! assert_eq!(decode(CodecKind::Int32Vector, &bytes).unwrap(), args);
//! ```

pub use bytes::Bytes;

mod codec;
mod error;
pub mod float64;
pub mod int32;
mod kind;
pub mod opaque;
mod values;

pub use codec::{decode, encode, Codec, Float64Codec, Int32Codec, OpaqueCodec};
pub use error::{Result, WireError};
pub use kind::{CodecKind, ParseKindError};
pub use values::Values;
