//! The isolation capability.
//!
//! An isolation backend spawns execution units from staged bootstraps. A
//! unit accepts exactly one inbound message, runs its bootstrap, emits
//! exactly one outbound message and terminates. The pool never reuses a
//! unit.
//!
//! Units talk back through an [`Outbox`]:
//!
//! - **emit**: delivers the outcome to whoever made the call, then signals
//!   the scheduler that the unit's slot is free
//! - **drop without emitting**: the unit died without reporting; the caller
//!   gets [`CallFailure::Vanished`] and the slot is still freed
//!
//! So every dispatched unit produces exactly one completion signal, whatever
//! happens inside it.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::bootstrap::Bootstrap;
use crate::error::{CallFailure, Result};
use crate::unit::{CallId, UnitId};

/// Where a call's outcome is delivered.
pub type Reply = oneshot::Sender<std::result::Result<Bytes, CallFailure>>;

/// Signal sent to the scheduler when a unit has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// The unit whose slot is now free.
    pub unit: UnitId,
    /// The call the unit ran.
    pub call: CallId,
    /// Whether the unit delivered a result rather than a failure.
    pub succeeded: bool,
}

/// A facility that can run bootstraps in isolated, single-use units.
///
/// Thread pools, process pools and sandboxed VMs all fit, as long as each
/// spawned unit handles one message and is then discarded.
pub trait Isolation: Send + Sync + 'static {
    /// Whatever `spawn` needs to start a unit, produced once per registration.
    type Resource: Clone + Send + 'static;

    /// Turn a bootstrap into a spawnable resource.
    fn stage(&self, bootstrap: Bootstrap) -> Result<Self::Resource>;

    /// Start a fresh unit. The unit idles until it is sent its message.
    fn spawn(&self, resource: &Self::Resource, unit: UnitId) -> Result<Box<dyn Unit>>;
}

/// A spawned execution unit awaiting its one inbound message.
pub trait Unit: Send {
    fn id(&self) -> UnitId;

    /// Hand over the inbound message. The unit reports through `outbox`.
    fn send(self: Box<Self>, message: Bytes, outbox: Outbox);
}

/// A unit's one-shot return path.
pub struct Outbox {
    unit: UnitId,
    call: CallId,
    reply: Option<Reply>,
    done: Option<mpsc::UnboundedSender<Completion>>,
}

impl Outbox {
    pub(crate) fn new(
        unit: UnitId,
        call: CallId,
        reply: Reply,
        done: mpsc::UnboundedSender<Completion>,
    ) -> Self {
        Self {
            unit,
            call,
            reply: Some(reply),
            done: Some(done),
        }
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn call(&self) -> CallId {
        self.call
    }

    /// Emit the unit's one outbound message and signal termination.
    pub fn emit(mut self, outcome: std::result::Result<Bytes, CallFailure>) {
        self.deliver(outcome);
    }

    fn deliver(&mut self, outcome: std::result::Result<Bytes, CallFailure>) {
        let succeeded = outcome.is_ok();
        match &outcome {
            Ok(bytes) => debug!(
                unit = %self.unit,
                call = %self.call,
                bytes = bytes.len(),
                "unit emitted result"
            ),
            Err(failure) => warn!(unit = %self.unit, call = %self.call, %failure, "unit failed"),
        }

        // The caller may have dropped its pending handle.
        if let Some(reply) = self.reply.take() {
            let _ = reply.send(outcome);
        }

        if let Some(done) = self.done.take() {
            let _ = done.send(Completion {
                unit: self.unit,
                call: self.call,
                succeeded,
            });
        }
    }
}

impl Drop for Outbox {
    fn drop(&mut self) {
        if self.done.is_some() {
            self.deliver(Err(CallFailure::Vanished));
        }
    }
}
