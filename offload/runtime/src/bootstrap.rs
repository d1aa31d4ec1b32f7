//! Unit bootstraps.
//!
//! A [`Bootstrap`] is the program a unit runs. It is built once per
//! registration and shared by every call made through the resulting
//! dispatcher. The program is always the same template:
//!
//! 1. decode the single inbound message with the bound layout
//! 2. invoke the computation with the decoded argument list
//! 3. normalize a scalar numeric result to a one-element sequence
//! 4. encode the result with the bound layout
//!
//! Waiting for the message, emitting the result and terminating belong to
//! the execution unit (see [`crate::isolation`]). The computation sits in
//! an explicit entry slot of the template, so there are no binding names
//! that could collide with anything inside it.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;
use offload_wire::{CodecKind, Values, WireError};
use tracing::debug;

use crate::computation::{Computation, Returned};
use crate::error::{CallFailure, Result, RuntimeError};
use crate::unit::BootstrapId;

/// A computation packed for execution inside an isolated unit.
#[derive(Clone)]
pub struct Bootstrap {
    id: BootstrapId,
    kind: CodecKind,
    entry: Arc<dyn Computation>,
}

impl Bootstrap {
    /// Pack `computation` for units speaking `kind`.
    ///
    /// Fails with [`RuntimeError::KindMismatch`] if the computation declares
    /// a different argument layout.
    pub fn prepare(computation: Arc<dyn Computation>, kind: CodecKind) -> Result<Self> {
        if let Some(expected) = computation.accepts() {
            if expected != kind {
                return Err(RuntimeError::KindMismatch {
                    name: computation.name().to_string(),
                    expected,
                    requested: kind,
                });
            }
        }

        let id = BootstrapId::new();
        debug!(bootstrap = %id, name = computation.name(), %kind, "prepared bootstrap");

        Ok(Self {
            id,
            kind,
            entry: computation,
        })
    }

    pub fn id(&self) -> BootstrapId {
        self.id
    }

    pub fn kind(&self) -> CodecKind {
        self.kind
    }

    /// Name of the embedded computation.
    pub fn name(&self) -> &str {
        self.entry.name()
    }

    /// Run the program over one inbound message and produce the outbound one.
    ///
    /// Panics inside the computation are caught and reported as
    /// [`CallFailure::Panicked`].
    pub fn run(&self, message: &[u8]) -> std::result::Result<Bytes, CallFailure> {
        let args = offload_wire::decode(self.kind, message).map_err(CallFailure::Decode)?;

        let returned = panic::catch_unwind(AssertUnwindSafe(|| self.entry.invoke(args)))
            .map_err(|payload| CallFailure::Panicked(panic_message(payload.as_ref())))??;

        let result = normalize(self.kind, returned)?;
        offload_wire::encode(&result).map_err(CallFailure::Encode)
    }
}

impl fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bootstrap")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.entry.name())
            .finish()
    }
}

/// Turn a computation's return value into values of `kind`.
///
/// Vector kinds always get a sequence. An Int32 result under the Float64
/// layout widens without loss; any other cross-kind result cannot be
/// encoded.
pub fn normalize(kind: CodecKind, returned: Returned) -> std::result::Result<Values, CallFailure> {
    match (kind, returned) {
        (CodecKind::Opaque, Returned::Opaque(value)) => Ok(Values::Opaque(value)),
        (CodecKind::Int32Vector, Returned::Int32(n)) => Ok(Values::Int32(n.into_vec())),
        (CodecKind::Float64Vector, Returned::Float64(n)) => Ok(Values::Float64(n.into_vec())),
        (CodecKind::Float64Vector, Returned::Int32(n)) => Ok(Values::Float64(
            n.into_vec().into_iter().map(f64::from).collect(),
        )),
        (kind, returned) => Err(CallFailure::Encode(WireError::serialization(
            kind,
            format!("cannot encode {} result", returned_kind(&returned)),
        ))),
    }
}

fn returned_kind(returned: &Returned) -> CodecKind {
    match returned {
        Returned::Opaque(_) => CodecKind::Opaque,
        Returned::Int32(_) => CodecKind::Int32Vector,
        Returned::Float64(_) => CodecKind::Float64Vector,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
