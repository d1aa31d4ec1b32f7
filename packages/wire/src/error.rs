//! Error types for the wire layouts.

use thiserror::Error;

use crate::kind::CodecKind;

/// Errors raised while translating between values and wire buffers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The value has no representation under the selected layout.
    #[error("serialization error ({kind}): {message}")]
    Serialization { kind: CodecKind, message: String },

    /// The buffer does not follow the selected layout.
    #[error("format error ({kind}): {message}")]
    Format { kind: CodecKind, message: String },
}

impl WireError {
    pub fn serialization(kind: CodecKind, message: impl Into<String>) -> Self {
        WireError::Serialization {
            kind,
            message: message.into(),
        }
    }

    pub fn format(kind: CodecKind, message: impl Into<String>) -> Self {
        WireError::Format {
            kind,
            message: message.into(),
        }
    }

    /// The layout that raised this error.
    pub fn kind(&self) -> CodecKind {
        match self {
            WireError::Serialization { kind, .. } | WireError::Format { kind, .. } => *kind,
        }
    }
}

/// Result type alias for wire operations.
pub type Result<T> = std::result::Result<T, WireError>;
