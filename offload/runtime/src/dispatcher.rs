//! Dispatchers and pending results.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use offload_wire::{CodecKind, Values};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use crate::error::{CallFailure, Result, RuntimeError};
use crate::isolation::Isolation;
use crate::pool::Command;
use crate::scheduler::Call;
use crate::thread_unit::ThreadIsolation;
use crate::unit::CallId;

/// Runs one registered computation through the pool.
///
/// Every [`call`](Dispatcher::call) becomes one execution unit. Dispatchers
/// are cheap to clone and share the bootstrap staged at registration.
pub struct Dispatcher<I: Isolation = ThreadIsolation> {
    name: Arc<str>,
    kind: CodecKind,
    resource: I::Resource,
    commands: mpsc::UnboundedSender<Command<I::Resource>>,
}

impl<I: Isolation> Dispatcher<I> {
    pub(crate) fn new(
        name: &str,
        kind: CodecKind,
        resource: I::Resource,
        commands: mpsc::UnboundedSender<Command<I::Resource>>,
    ) -> Self {
        Self {
            name: Arc::from(name),
            kind,
            resource,
            commands,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CodecKind {
        self.kind
    }

    /// Encode `values` and submit them as one call.
    ///
    /// Fails without touching the pool if the values have the wrong kind or
    /// cannot be encoded.
    pub fn call(&self, values: impl Into<Values>) -> Result<Pending> {
        let values = values.into();
        if values.kind() != self.kind {
            return Err(RuntimeError::ValuesMismatch {
                name: self.name.to_string(),
                expected: self.kind,
                actual: values.kind(),
            });
        }

        let message = offload_wire::encode(&values)?;
        self.call_encoded(message)
    }

    /// Serialize `args` as an opaque argument list and submit it.
    ///
    /// ```rust,no_run
    /// # async fn demo(pool: offload_runtime::Pool) -> offload_runtime::Result<()> {
    /// use offload_runtime::{computation, CodecKind};
    ///
    /// let greet = pool.register(
    ///     computation::opaque("greet", |args| Some(format!("hi {}", args[0]))),
    ///     CodecKind::Opaque,
    /// )?;
    /// let pending = greet.call_serialize(&("ada",))?;
    /// # drop(pending);
    /// # Ok(())
    /// # }
    /// ```
    pub fn call_serialize<A: Serialize + ?Sized>(&self, args: &A) -> Result<Pending> {
        self.call(Values::opaque(args)?)
    }

    /// Submit an already encoded argument buffer.
    ///
    /// The buffer is not validated here; a malformed one fails inside the
    /// unit with [`CallFailure::Decode`].
    pub fn call_encoded(&self, message: Bytes) -> Result<Pending> {
        let (call, rx) = Call::new(self.resource.clone(), message, self.kind);
        let id = call.id();
        trace!(dispatcher = %self.name, call = %id, "submitting call");

        self.commands
            .send(Command::Submit(call))
            .map_err(|_| RuntimeError::PoolClosed)?;

        Ok(Pending {
            call: id,
            kind: self.kind,
            rx,
        })
    }
}

impl<I: Isolation> Clone for Dispatcher<I> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            kind: self.kind,
            resource: self.resource.clone(),
            commands: self.commands.clone(),
        }
    }
}

impl<I: Isolation> fmt::Debug for Dispatcher<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// The eventual outcome of one call.
///
/// Dropping it does not cancel the call; the unit still runs and its slot
/// is still released.
#[derive(Debug)]
pub struct Pending {
    call: CallId,
    kind: CodecKind,
    rx: oneshot::Receiver<std::result::Result<Bytes, CallFailure>>,
}

impl Pending {
    pub fn call_id(&self) -> CallId {
        self.call
    }

    /// Wait for the unit's encoded result.
    pub async fn recv(self) -> std::result::Result<Bytes, CallFailure> {
        // A dropped reply slot means the call never reached a unit.
        self.rx.await.unwrap_or(Err(CallFailure::Discarded))
    }

    /// Wait for the result and decode it with the dispatcher's layout.
    pub async fn values(self) -> std::result::Result<Values, CallFailure> {
        let kind = self.kind;
        let bytes = self.recv().await?;
        offload_wire::decode(kind, &bytes).map_err(CallFailure::Decode)
    }
}
