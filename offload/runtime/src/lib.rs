//! # Offload Runtime
//!
//! A bounded pool of isolated, single-use execution units.
//!
//! A caller registers a computation once and gets back a [`Dispatcher`].
//! Each dispatcher call encodes its arguments into a binary message, spawns
//! a fresh execution unit, hands it the message and resolves with the
//! unit's one reply. At most `capacity` units run at any moment; calls made
//! while the pool is full wait in a FIFO backlog.
//!
//! ## Execution units
//!
//! A unit shares no memory with its caller or with other units. It receives
//! exactly one inbound message, runs its [`Bootstrap`], emits exactly one
//! outbound message and terminates. Units are never reused: only
//! concurrency slots are pooled.
//!
//! Where units run is up to the [`Isolation`] backend:
//!
//! - [`ThreadIsolation`] spawns a fresh, named OS thread per unit
//! - custom backends (process pools, sandboxes) implement [`Isolation`]
//!
//! A computation itself can also be sandboxed: [`WasmComputation`] runs a
//! WebAssembly component, instantiated fresh for every call.
//!
//! ## Wire layouts
//!
//! Messages use one of three layouts from [`offload_wire`], chosen per
//! dispatcher by [`CodecKind`]:
//!
//! | Kind | Message |
//! |------|---------|
//! | `Opaque` | JSON text, one byte per UTF-16 code unit (low byte kept) |
//! | `Int32Vector` | big-endian 32-bit signed integers |
//! | `Float64Vector` | big-endian IEEE-754 doubles |
//!
//! ## Example
//!
//! ```rust,no_run
//! use offload_runtime::{computation, CodecKind, Pool, Values};
//!
//! #[tokio::main]
//! async fn main() -> offload_runtime::Result<()> {
//!     let pool = Pool::new(2)?;
//!     let add = pool.register(
//!         computation::int32("add", |args| args[0] + args[1]),
//!         CodecKind::Int32Vector,
//!     )?;
//!
//!     let pending: Vec<_> = [vec![2, 3], vec![4, 5], vec![6, 7]]
//!         .into_iter()
//!         .map(|args| add.call(args))
//!         .collect::<Result<_, _>>()?;
//!
//!     for p in pending {
//!         println!("{:?}", p.values().await);
//!     }
//!
//!     let batch = pool.idle().await?;
//!     println!("batch took {:?}", batch.elapsed);
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! Errors that can be caught before a call is admitted (values of the wrong
//! kind, arguments that cannot be serialized) are returned by the
//! dispatcher and leave the pool untouched. Anything that goes wrong inside
//! a unit resolves the call with a [`CallFailure`] and still frees the
//! unit's slot. There are no timeouts: a unit that never finishes holds its
//! slot for the life of the pool.

pub mod bootstrap;
pub mod computation;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod isolation;
pub mod pool;
pub mod scheduler;
pub mod telemetry;
pub mod thread_unit;
pub mod unit;
pub mod wasm_unit;

pub use bootstrap::Bootstrap;
pub use computation::{Computation, FnComputation, Numeric, Returned};
pub use config::{Capacity, PoolConfig};
pub use dispatcher::{Dispatcher, Pending};
pub use error::{CallFailure, Result, RuntimeError, RuntimeError as Error};
pub use isolation::{Completion, Isolation, Outbox, Unit};
pub use pool::Pool;
pub use scheduler::{Admission, PoolStatus};
pub use telemetry::{Batch, Clock, SystemClock};
pub use thread_unit::ThreadIsolation;
pub use unit::{BootstrapId, CallId, UnitId};
pub use wasm_unit::WasmComputation;

pub use offload_wire::{CodecKind, Values, WireError};
