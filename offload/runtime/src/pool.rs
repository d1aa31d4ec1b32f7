//! The offload pool.
//!
//! A [`Pool`] is a handle to an event-loop task that owns the
//! [`Scheduler`](crate::scheduler). Dispatchers submit calls to the loop
//! over a channel and units report completions over another, so admission,
//! dispatch and completion handling never run concurrently.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info};

use crate::bootstrap::Bootstrap;
use crate::computation::Computation;
use crate::config::{Capacity, PoolConfig};
use crate::dispatcher::Dispatcher;
use crate::error::{Result, RuntimeError};
use crate::isolation::{Completion, Isolation};
use crate::scheduler::{Call, PoolStatus, Scheduler};
use crate::telemetry::Batch;
use crate::thread_unit::ThreadIsolation;

use offload_wire::CodecKind;

/// Messages from pool handles and dispatchers to the event loop.
pub(crate) enum Command<R> {
    Submit(Call<R>),
    Idle(oneshot::Sender<Batch>),
    Shutdown,
}

/// A bounded pool of single-use execution units.
///
/// Cloning gives another handle to the same pool. Must be created from
/// within a tokio runtime, which hosts the pool's event loop.
///
/// # Example
///
/// ```rust,no_run
/// use offload_runtime::{computation, CodecKind, Pool, Values};
///
/// # async fn demo() -> offload_runtime::Result<()> {
/// let pool = Pool::new(4)?;
/// let add = pool.register(
///     computation::int32("add", |args| args[0] + args[1]),
///     CodecKind::Int32Vector,
/// )?;
///
/// let sum = add.call(vec![2, 3])?.values().await.unwrap();
/// assert_eq!(sum, Values::Int32(vec![5]));
/// # Ok(())
/// # }
/// ```
pub struct Pool<I: Isolation = ThreadIsolation> {
    shared: Arc<Shared<I>>,
}

struct Shared<I: Isolation> {
    isolation: Arc<I>,
    capacity: Capacity,
    commands: mpsc::UnboundedSender<Command<I::Resource>>,
    status: watch::Receiver<PoolStatus>,
    current: watch::Receiver<Batch>,
    telemetry: watch::Receiver<Batch>,
}

impl Pool {
    /// Create a thread-backed pool running up to `threads` units at once.
    ///
    /// Requests below two, including zero and negatives, get two.
    pub fn new(threads: i64) -> Result<Self> {
        Self::with_config(PoolConfig::default().threads(threads))
    }

    pub fn with_config(config: PoolConfig) -> Result<Self> {
        let isolation = ThreadIsolation::new(&config);
        Self::with_isolation(config, isolation)
    }
}

impl<I: Isolation> Pool<I> {
    /// Create a pool over a custom isolation backend.
    pub fn with_isolation(config: PoolConfig, isolation: I) -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| RuntimeError::NoRuntime(e.to_string()))?;

        let capacity = config.capacity();
        let isolation = Arc::new(isolation);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let scheduler = Scheduler::new(Arc::clone(&isolation), capacity, completions_tx);
        let (status_tx, status_rx) = watch::channel(scheduler.status());
        let (current_tx, current_rx) = watch::channel(scheduler.batch());
        let (telemetry_tx, telemetry_rx) = watch::channel(Batch::default());

        let event_loop = EventLoop {
            scheduler,
            commands: commands_rx,
            completions: completions_rx,
            status: status_tx,
            current: current_tx,
            telemetry: telemetry_tx,
            last: Batch::default(),
            waiters: Vec::new(),
            accepting: true,
        };
        handle.spawn(event_loop.run());
        info!(%capacity, "offload pool started");

        Ok(Self {
            shared: Arc::new(Shared {
                isolation,
                capacity,
                commands: commands_tx,
                status: status_rx,
                current: current_rx,
                telemetry: telemetry_rx,
            }),
        })
    }

    /// Stage `computation` once and return a dispatcher for it.
    pub fn register(
        &self,
        computation: impl Computation,
        kind: CodecKind,
    ) -> Result<Dispatcher<I>> {
        self.register_shared(Arc::new(computation), kind)
    }

    /// Like [`register`](Pool::register), for a computation that is already
    /// shared.
    pub fn register_shared(
        &self,
        computation: Arc<dyn Computation>,
        kind: CodecKind,
    ) -> Result<Dispatcher<I>> {
        let bootstrap = Bootstrap::prepare(computation, kind)?;
        let name = bootstrap.name().to_string();
        let resource = self.shared.isolation.stage(bootstrap)?;
        debug!(%name, %kind, "registered computation");

        Ok(Dispatcher::new(
            &name,
            kind,
            resource,
            self.shared.commands.clone(),
        ))
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity.get()
    }

    pub fn status(&self) -> PoolStatus {
        *self.shared.status.borrow()
    }

    /// The last completed batch. All fields are unset until one completes.
    pub fn telemetry(&self) -> Batch {
        *self.shared.telemetry.borrow()
    }

    /// The batch in progress, or the last one while the pool is idle.
    pub fn current_batch(&self) -> Batch {
        *self.shared.current.borrow()
    }

    /// Wait until nothing is running or queued.
    ///
    /// Calls submitted before this one are accounted for. Returns the batch
    /// that just finished, or the last one if the pool was already idle.
    pub async fn idle(&self) -> Result<Batch> {
        let (tx, rx) = oneshot::channel();
        self.shared
            .commands
            .send(Command::Idle(tx))
            .map_err(|_| RuntimeError::PoolClosed)?;
        rx.await.map_err(|_| RuntimeError::PoolClosed)
    }

    /// Stop admitting calls and discard the backlog.
    ///
    /// Units already running finish and deliver their results.
    pub fn shutdown(&self) {
        let _ = self.shared.commands.send(Command::Shutdown);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.commands.is_closed()
    }
}

impl<I: Isolation> Clone for Pool<I> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<I: Isolation> fmt::Debug for Pool<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("capacity", &self.shared.capacity)
            .field("status", &self.status())
            .finish()
    }
}

struct EventLoop<I: Isolation> {
    scheduler: Scheduler<I>,
    commands: mpsc::UnboundedReceiver<Command<I::Resource>>,
    completions: mpsc::UnboundedReceiver<Completion>,
    status: watch::Sender<PoolStatus>,
    current: watch::Sender<Batch>,
    telemetry: watch::Sender<Batch>,
    last: Batch,
    waiters: Vec<oneshot::Sender<Batch>>,
    accepting: bool,
}

impl<I: Isolation> EventLoop<I> {
    async fn run(mut self) {
        loop {
            let step = tokio::select! {
                biased;

                Some(completion) = self.completions.recv() => self.complete(completion),
                command = self.commands.recv(), if self.accepting => match command {
                    Some(command) => self.handle(command),
                    None => {
                        self.stop_accepting();
                        Ok(())
                    }
                },
                else => break,
            };

            if let Err(e) = step {
                error!(error = %e, "offload pool event loop stopped");
                break;
            }

            self.publish();
            if !self.accepting && self.scheduler.status().is_idle() {
                break;
            }
        }

        self.release_waiters();
        debug!("offload pool event loop exited");
    }

    fn handle(&mut self, command: Command<I::Resource>) -> Result<()> {
        match command {
            Command::Submit(call) => {
                self.scheduler.submit(call)?;
            }
            Command::Idle(waiter) => self.wait_idle(waiter),
            Command::Shutdown => self.shutdown(),
        }
        Ok(())
    }

    fn complete(&mut self, completion: Completion) -> Result<()> {
        if let Some(batch) = self.scheduler.on_complete(completion)? {
            self.last = batch;
            self.telemetry.send_replace(batch);
            for waiter in self.waiters.drain(..) {
                let _ = waiter.send(batch);
            }
        }
        Ok(())
    }

    fn wait_idle(&mut self, waiter: oneshot::Sender<Batch>) {
        if self.scheduler.status().is_idle() {
            let _ = waiter.send(self.last);
        } else {
            self.waiters.push(waiter);
        }
    }

    /// Stop admitting. Admitted work, queued or running, still completes.
    fn stop_accepting(&mut self) {
        self.accepting = false;
        self.commands.close();
        debug!(status = ?self.scheduler.status(), "offload pool draining");
    }

    /// Stop admitting and discard everything not yet running, including
    /// calls still buffered in the channel.
    fn shutdown(&mut self) {
        if !self.accepting {
            return;
        }
        self.stop_accepting();

        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Submit(call) => call.discard(),
                Command::Idle(waiter) => self.waiters.push(waiter),
                Command::Shutdown => {}
            }
        }
        self.scheduler.discard_backlog();
        info!(
            active = self.scheduler.status().active,
            "offload pool shutting down"
        );
    }

    fn publish(&self) {
        self.status.send_replace(self.scheduler.status());
        self.current.send_replace(self.scheduler.batch());
    }

    fn release_waiters(&mut self) {
        let batch = self.last;
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(batch);
        }
    }
}
