//! The codec selector.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Selects one of the three wire layouts.
///
/// A kind is bound once when a computation is registered and governs both
/// the argument and the result buffers of every call made through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodecKind {
    /// JSON text, one byte per character.
    #[serde(rename = "opaque")]
    Opaque,
    /// Big-endian two's-complement 32-bit integers.
    #[serde(rename = "int32")]
    Int32Vector,
    /// Big-endian IEEE-754 doubles.
    #[serde(rename = "float64")]
    Float64Vector,
}

impl CodecKind {
    /// Every kind, in declaration order.
    pub const ALL: [CodecKind; 3] = [
        CodecKind::Opaque,
        CodecKind::Int32Vector,
        CodecKind::Float64Vector,
    ];

    /// The short name used in configuration and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            CodecKind::Opaque => "opaque",
            CodecKind::Int32Vector => "int32",
            CodecKind::Float64Vector => "float64",
        }
    }

    /// Bytes per element for the fixed-width layouts.
    pub fn stride(&self) -> Option<usize> {
        match self {
            CodecKind::Opaque => None,
            CodecKind::Int32Vector => Some(crate::int32::STRIDE),
            CodecKind::Float64Vector => Some(crate::float64::STRIDE),
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known codec kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown codec kind: {0} (expected opaque, int32 or float64)")]
pub struct ParseKindError(pub String);

impl FromStr for CodecKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "opaque" | "json" => Ok(CodecKind::Opaque),
            "int32" => Ok(CodecKind::Int32Vector),
            "float64" => Ok(CodecKind::Float64Vector),
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_parse() {
        for kind in CodecKind::ALL {
            assert_eq!(kind.to_string().parse::<CodecKind>().unwrap(), kind);
        }
    }

    #[test]
    fn parse_accepts_json_alias_and_case() {
        assert_eq!("JSON".parse::<CodecKind>().unwrap(), CodecKind::Opaque);
        assert_eq!("Int32".parse::<CodecKind>().unwrap(), CodecKind::Int32Vector);
    }

    #[test]
    fn parse_unknown() {
        let err = "int64".parse::<CodecKind>().unwrap_err();
        assert!(err.to_string().contains("int64"));
    }

    #[test]
    fn strides() {
        assert_eq!(CodecKind::Opaque.stride(), None);
        assert_eq!(CodecKind::Int32Vector.stride(), Some(4));
        assert_eq!(CodecKind::Float64Vector.stride(), Some(8));
    }

    #[test]
    fn serde_names() {
        let json = serde_json::to_string(&CodecKind::Float64Vector).unwrap();
        assert_eq!(json, "\"float64\"");
        let kind: CodecKind = serde_json::from_str("\"int32\"").unwrap();
        assert_eq!(kind, CodecKind::Int32Vector);
    }
}
