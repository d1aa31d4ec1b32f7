//! Offload: run computations in isolated, single-use execution units.
//!
//! This crate re-exports the pool runtime and the wire layouts. See
//! [`runtime`] for the execution model and [`wire`] for the message
//! formats.

pub use offload_runtime as runtime;
pub use offload_wire as wire;

pub use offload_runtime::{
    computation, Batch, CallFailure, CodecKind, Computation, Dispatcher, Pending, Pool,
    PoolConfig, PoolStatus, Result, RuntimeError, ThreadIsolation, Values, WasmComputation,
};
