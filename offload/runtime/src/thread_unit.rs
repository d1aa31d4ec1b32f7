//! Thread-backed execution units.
//!
//! Every unit is a freshly spawned OS thread. It waits for its one message,
//! runs the bootstrap, emits through its outbox and returns, which ends the
//! thread. Threads are never parked and reused.

use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use tokio::sync::oneshot;
use tracing::trace;

use crate::bootstrap::Bootstrap;
use crate::config::PoolConfig;
use crate::error::{CallFailure, Result, RuntimeError};
use crate::isolation::{Isolation, Outbox, Unit};
use crate::unit::UnitId;

/// Runs each unit on its own short-lived thread.
#[derive(Debug, Clone)]
pub struct ThreadIsolation {
    thread_name: String,
    stack_size: Option<usize>,
}

impl ThreadIsolation {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            thread_name: config.thread_name.clone(),
            stack_size: config.stack_size,
        }
    }
}

impl Default for ThreadIsolation {
    fn default() -> Self {
        Self::new(&PoolConfig::default())
    }
}

impl Isolation for ThreadIsolation {
    type Resource = Arc<Bootstrap>;

    fn stage(&self, bootstrap: Bootstrap) -> Result<Arc<Bootstrap>> {
        Ok(Arc::new(bootstrap))
    }

    fn spawn(&self, program: &Arc<Bootstrap>, unit: UnitId) -> Result<Box<dyn Unit>> {
        let (inbox_tx, inbox_rx) = oneshot::channel::<(Bytes, Outbox)>();
        let program = Arc::clone(program);

        let mut builder =
            thread::Builder::new().name(format!("{}-{}", self.thread_name, unit.short()));
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }

        builder
            .spawn(move || {
                // Dropped unsent: the scheduler already reported the call.
                let Ok((message, outbox)) = inbox_rx.blocking_recv() else {
                    return;
                };
                trace!(%unit, bytes = message.len(), "unit received message");
                let outcome = program.run(&message);
                outbox.emit(outcome);
            })
            .map_err(|e| RuntimeError::Spawn(e.to_string()))?;

        Ok(Box::new(ThreadUnit {
            id: unit,
            inbox: inbox_tx,
        }))
    }
}

struct ThreadUnit {
    id: UnitId,
    inbox: oneshot::Sender<(Bytes, Outbox)>,
}

impl Unit for ThreadUnit {
    fn id(&self) -> UnitId {
        self.id
    }

    fn send(self: Box<Self>, message: Bytes, outbox: Outbox) {
        if let Err((_, outbox)) = self.inbox.send((message, outbox)) {
            outbox.emit(Err(CallFailure::Vanished));
        }
    }
}
