//! Error types for the offload runtime.

use offload_wire::{CodecKind, WireError};
use thiserror::Error;

/// Errors raised by the pool, its dispatchers and its isolation backends.
///
/// Nothing here is reported for work that already ran inside a unit; that
/// path reports a [`CallFailure`] on the call instead.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Arguments could not be encoded. The call was never admitted.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// A computation was registered under a kind it does not take.
    #[error("computation `{name}` takes {expected} arguments, not {requested}")]
    KindMismatch {
        name: String,
        expected: CodecKind,
        requested: CodecKind,
    },

    /// Values handed to a dispatcher are tagged with another kind.
    #[error("dispatcher `{name}` expects {expected} values, got {actual}")]
    ValuesMismatch {
        name: String,
        expected: CodecKind,
        actual: CodecKind,
    },

    /// More units are running than the pool admits. Scheduler bug; fatal.
    #[error("capacity invariant violated: {active} active units exceed capacity {capacity}")]
    CapacityInvariantViolation { active: usize, capacity: usize },

    /// A completion arrived while no unit was running. Scheduler bug; fatal.
    #[error("completion signal with no active unit")]
    UnexpectedCompletion,

    /// The isolation backend could not spawn a unit.
    #[error("failed to spawn unit: {0}")]
    Spawn(String),

    /// The pool was shut down or its event loop has exited.
    #[error("pool is closed")]
    PoolClosed,

    /// Pools must be created inside a tokio runtime.
    #[error("no tokio runtime: {0}")]
    NoRuntime(String),

    /// A WebAssembly component could not be loaded.
    #[error("wasm error: {0}")]
    Wasm(String),

    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// The failed-call signal.
///
/// Every dispatched call ends with either its encoded result or exactly one
/// of these. Either way the unit's slot is released.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallFailure {
    /// The inbound message did not follow the dispatcher's layout.
    #[error("could not decode arguments: {0}")]
    Decode(WireError),

    /// The computation's result has no representation in the layout.
    #[error("could not encode result: {0}")]
    Encode(WireError),

    /// The computation reported an error.
    #[error("computation failed: {0}")]
    Computation(String),

    /// The computation panicked.
    #[error("computation panicked: {0}")]
    Panicked(String),

    /// The isolation backend refused to spawn a unit for the call.
    #[error("unit could not be spawned: {0}")]
    Spawn(String),

    /// The unit went away without reporting.
    #[error("unit terminated without reporting a result")]
    Vanished,

    /// The call was still in the backlog when the pool shut down.
    #[error("call discarded before dispatch")]
    Discarded,

    /// The WebAssembly sandbox trapped or could not be instantiated.
    #[error("wasm unit failed: {0}")]
    Wasm(String),
}
