//! Admission control for execution units.
//!
//! The [`Scheduler`] is a plain state machine. It does no I/O of its own and
//! is driven by exactly one owner (the pool's event loop), which feeds it
//! submissions and completion signals one at a time. Every transition keeps
//! `active <= capacity`.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use bytes::Bytes;
use offload_wire::CodecKind;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::Capacity;
use crate::error::{CallFailure, Result, RuntimeError};
use crate::isolation::{Completion, Isolation, Outbox, Reply};
use crate::telemetry::{Batch, BatchTimer, Clock, SystemClock};
use crate::unit::{CallId, UnitId};

/// One dispatcher invocation: the staged bootstrap, the encoded arguments,
/// their layout and the caller's reply slot.
pub(crate) struct Call<R> {
    id: CallId,
    resource: R,
    message: Bytes,
    kind: CodecKind,
    reply: Reply,
}

impl<R> Call<R> {
    pub(crate) fn new(
        resource: R,
        message: Bytes,
        kind: CodecKind,
    ) -> (
        Self,
        oneshot::Receiver<std::result::Result<Bytes, CallFailure>>,
    ) {
        let (reply, rx) = oneshot::channel();
        let call = Self {
            id: CallId::new(),
            resource,
            message,
            kind,
            reply,
        };
        (call, rx)
    }

    pub(crate) fn id(&self) -> CallId {
        self.id
    }

    /// Drop the call without running it.
    pub(crate) fn discard(self) {
        let _ = self.reply.send(Err(CallFailure::Discarded));
    }
}

/// What `submit` did with a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A unit was spawned for the call right away.
    Dispatched { unit: UnitId },
    /// The pool was full; the call sits at this 1-based backlog position.
    Queued { position: usize },
}

/// Point-in-time view of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Maximum number of units running at once.
    pub capacity: usize,
    /// Units dispatched and not yet completed.
    pub active: usize,
    /// Calls waiting in the backlog.
    pub queued: usize,
}

impl PoolStatus {
    pub fn is_idle(&self) -> bool {
        self.active == 0 && self.queued == 0
    }
}

pub(crate) struct Scheduler<I: Isolation> {
    isolation: Arc<I>,
    capacity: Capacity,
    active: HashMap<UnitId, CallId>,
    backlog: VecDeque<Call<I::Resource>>,
    completions: mpsc::UnboundedSender<Completion>,
    timer: BatchTimer,
}

impl<I: Isolation> Scheduler<I> {
    pub(crate) fn new(
        isolation: Arc<I>,
        capacity: Capacity,
        completions: mpsc::UnboundedSender<Completion>,
    ) -> Self {
        Self::with_clock(isolation, capacity, completions, Arc::new(SystemClock))
    }

    pub(crate) fn with_clock(
        isolation: Arc<I>,
        capacity: Capacity,
        completions: mpsc::UnboundedSender<Completion>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            isolation,
            capacity,
            active: HashMap::new(),
            backlog: VecDeque::new(),
            completions,
            timer: BatchTimer::new(clock),
        }
    }

    /// Admit a call: dispatch it if a slot is free, else queue it.
    pub(crate) fn submit(&mut self, call: Call<I::Resource>) -> Result<Admission> {
        if self.active.len() < self.capacity.get() && self.backlog.is_empty() {
            if self.active.is_empty() {
                self.timer.start();
            }
            let unit = self.dispatch(call)?;
            return Ok(Admission::Dispatched { unit });
        }

        debug!(call = %call.id(), position = self.backlog.len() + 1, "pool full, queued call");
        self.backlog.push_back(call);
        Ok(Admission::Queued {
            position: self.backlog.len(),
        })
    }

    /// Handle one unit's completion signal.
    ///
    /// Returns the finished batch when this completion left the pool idle.
    pub(crate) fn on_complete(&mut self, completion: Completion) -> Result<Option<Batch>> {
        if self.active.remove(&completion.unit).is_none() {
            return Err(RuntimeError::UnexpectedCompletion);
        }
        debug!(
            unit = %completion.unit,
            call = %completion.call,
            succeeded = completion.succeeded,
            active = self.active.len(),
            "unit completed"
        );

        if let Some(next) = self.backlog.pop_front() {
            self.dispatch(next)?;
            return Ok(None);
        }

        if self.active.is_empty() {
            let batch = self.timer.finish();
            if let Some(elapsed) = batch.and_then(|b| b.elapsed) {
                info!(elapsed_ms = elapsed.as_millis() as u64, "batch finished");
            }
            return Ok(batch);
        }

        Ok(None)
    }

    fn dispatch(&mut self, call: Call<I::Resource>) -> Result<UnitId> {
        let unit = UnitId::new();
        self.active.insert(unit, call.id);
        if self.active.len() > self.capacity.get() {
            return Err(RuntimeError::CapacityInvariantViolation {
                active: self.active.len(),
                capacity: self.capacity.get(),
            });
        }

        let Call {
            id,
            resource,
            message,
            kind,
            reply,
        } = call;
        let outbox = Outbox::new(unit, id, reply, self.completions.clone());

        match self.isolation.spawn(&resource, unit) {
            Ok(spawned) => {
                debug!(
                    %unit,
                    call = %id,
                    %kind,
                    bytes = message.len(),
                    active = self.active.len(),
                    "dispatched call"
                );
                spawned.send(message, outbox);
            }
            Err(e) => {
                warn!(%unit, call = %id, error = %e, "isolation refused to spawn unit");
                outbox.emit(Err(CallFailure::Spawn(e.to_string())));
            }
        }

        Ok(unit)
    }

    /// Drop every queued call. Returns how many were discarded.
    pub(crate) fn discard_backlog(&mut self) -> usize {
        let discarded = self.backlog.len();
        for call in self.backlog.drain(..) {
            call.discard();
        }
        if discarded > 0 {
            warn!(discarded, "discarded backlog");
        }
        discarded
    }

    pub(crate) fn status(&self) -> PoolStatus {
        PoolStatus {
            capacity: self.capacity.get(),
            active: self.active.len(),
            queued: self.backlog.len(),
        }
    }

    pub(crate) fn batch(&self) -> Batch {
        self.timer.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::bootstrap::Bootstrap;
    use crate::isolation::Unit;
    use crate::telemetry::manual::ManualClock;

    type Parked = Arc<Mutex<Vec<(String, Bytes, Outbox)>>>;

    /// Units that park their message until the test completes them.
    #[derive(Default)]
    struct Parking {
        parked: Parked,
        refuse: bool,
    }

    impl Isolation for Parking {
        type Resource = String;

        fn stage(&self, bootstrap: Bootstrap) -> Result<String> {
            Ok(bootstrap.name().to_string())
        }

        fn spawn(&self, resource: &String, unit: UnitId) -> Result<Box<dyn Unit>> {
            if self.refuse {
                return Err(RuntimeError::Spawn("no threads left".to_string()));
            }
            Ok(Box::new(ParkedUnit {
                id: unit,
                label: resource.clone(),
                parked: self.parked.clone(),
            }))
        }
    }

    struct ParkedUnit {
        id: UnitId,
        label: String,
        parked: Parked,
    }

    impl Unit for ParkedUnit {
        fn id(&self) -> UnitId {
            self.id
        }

        fn send(self: Box<Self>, message: Bytes, outbox: Outbox) {
            self.parked.lock().unwrap().push((self.label, message, outbox));
        }
    }

    struct Harness {
        scheduler: Scheduler<Parking>,
        parked: Parked,
        completions: mpsc::UnboundedReceiver<Completion>,
        clock: Arc<ManualClock>,
    }

    impl Harness {
        fn new(requested: i64) -> Self {
            Self::with_isolation(requested, Parking::default())
        }

        fn with_isolation(requested: i64, isolation: Parking) -> Self {
            let parked = isolation.parked.clone();
            let (tx, rx) = mpsc::unbounded_channel();
            let clock = Arc::new(ManualClock::new());
            Self {
                scheduler: Scheduler::with_clock(
                    Arc::new(isolation),
                    Capacity::new(requested),
                    tx,
                    clock.clone(),
                ),
                parked,
                completions: rx,
                clock,
            }
        }

        fn submit(
            &mut self,
            label: &str,
        ) -> (
            Admission,
            oneshot::Receiver<std::result::Result<Bytes, CallFailure>>,
        ) {
            let (call, rx) = Call::new(
                label.to_string(),
                Bytes::copy_from_slice(label.as_bytes()),
                CodecKind::Opaque,
            );
            (self.scheduler.submit(call).unwrap(), rx)
        }

        fn running(&self) -> Vec<String> {
            self.parked.lock().unwrap().iter().map(|(l, _, _)| l.clone()).collect()
        }

        /// Finish the running unit labelled `label` and feed its completion back.
        fn finish(&mut self, label: &str) -> Option<Batch> {
            let outbox = {
                let mut parked = self.parked.lock().unwrap();
                let index = parked.iter().position(|(l, _, _)| l == label).unwrap();
                parked.remove(index).2
            };
            outbox.emit(Ok(Bytes::from_static(b"ok")));
            let completion = self.completions.try_recv().unwrap();
            self.scheduler.on_complete(completion).unwrap()
        }
    }

    #[test]
    fn capacity_floor_applies() {
        let harness = Harness::new(0);
        assert_eq!(harness.scheduler.status().capacity, 2);
    }

    #[test]
    fn backlog_is_fifo() {
        let mut h = Harness::new(2);

        assert!(matches!(h.submit("A").0, Admission::Dispatched { .. }));
        assert!(matches!(h.submit("B").0, Admission::Dispatched { .. }));
        assert_eq!(h.submit("C").0, Admission::Queued { position: 1 });
        assert_eq!(h.submit("D").0, Admission::Queued { position: 2 });
        assert_eq!(h.running(), ["A", "B"]);
        assert_eq!(
            h.scheduler.status(),
            PoolStatus {
                capacity: 2,
                active: 2,
                queued: 2
            }
        );

        assert_eq!(h.finish("A"), None);
        assert_eq!(h.running(), ["B", "C"]);

        assert_eq!(h.finish("C"), None);
        assert_eq!(h.running(), ["B", "D"]);
        assert_eq!(h.scheduler.status().queued, 0);

        h.finish("B");
        assert!(h.finish("D").is_some());
        assert!(h.scheduler.status().is_idle());
    }

    #[test]
    fn dispatched_units_receive_their_buffer() {
        let mut h = Harness::new(2);
        h.submit("payload");
        let parked = h.parked.lock().unwrap();
        assert_eq!(&parked[0].1[..], b"payload");
    }

    #[test]
    fn active_never_exceeds_capacity() {
        let mut h = Harness::new(3);
        for label in ["a", "b", "c", "d", "e", "f", "g"] {
            h.submit(label);
            assert!(h.scheduler.status().active <= 3);
        }
        for label in ["a", "b", "c", "d"] {
            h.finish(label);
            assert!(h.scheduler.status().active <= 3);
        }
        assert_eq!(h.scheduler.status().active, 3);
        assert_eq!(h.scheduler.status().queued, 0);
    }

    #[test]
    fn telemetry_spans_the_busy_interval() {
        let mut h = Harness::new(2);
        assert_eq!(h.scheduler.batch(), Batch::default());

        h.submit("A");
        h.submit("B");
        let running = h.scheduler.batch();
        assert!(running.start.is_some());
        assert_eq!(running.end, None);
        assert_eq!(running.elapsed, None);

        h.clock.advance(Duration::from_millis(40));
        assert_eq!(h.finish("A"), None);
        assert_eq!(h.scheduler.batch().end, None);

        h.clock.advance(Duration::from_millis(60));
        let batch = h.finish("B").unwrap();
        assert_eq!(batch.start, running.start);
        assert_eq!(batch.elapsed, Some(Duration::from_millis(100)));
    }

    #[test]
    fn new_batch_after_idle() {
        let mut h = Harness::new(2);
        h.submit("A");
        let first = h.finish("A").unwrap();

        h.clock.advance(Duration::from_secs(5));
        h.submit("B");
        let second = h.scheduler.batch();
        assert!(second.start > first.start);
        assert_eq!(second.end, None);
    }

    #[test]
    fn spawn_failure_reports_and_frees_the_slot() {
        let mut h = Harness::with_isolation(
            2,
            Parking {
                refuse: true,
                ..Default::default()
            },
        );
        let (admission, mut reply) = h.submit("A");
        assert!(matches!(admission, Admission::Dispatched { .. }));
        assert!(matches!(reply.try_recv().unwrap(), Err(CallFailure::Spawn(_))));

        let completion = h.completions.try_recv().unwrap();
        assert!(!completion.succeeded);
        assert!(h.scheduler.on_complete(completion).unwrap().is_some());
        assert!(h.scheduler.status().is_idle());
    }

    #[test]
    fn unknown_completion_is_rejected() {
        let mut h = Harness::new(2);
        let err = h
            .scheduler
            .on_complete(Completion {
                unit: UnitId::new(),
                call: CallId::new(),
                succeeded: true,
            })
            .unwrap_err();
        assert!(matches!(err, RuntimeError::UnexpectedCompletion));
    }

    #[test]
    fn discarded_calls_are_told() {
        let mut h = Harness::new(2);
        h.submit("A");
        h.submit("B");
        let (_, mut queued) = h.submit("C");

        assert_eq!(h.scheduler.discard_backlog(), 1);
        assert_eq!(queued.try_recv().unwrap(), Err(CallFailure::Discarded));
        assert_eq!(h.scheduler.status().active, 2);
    }
}
