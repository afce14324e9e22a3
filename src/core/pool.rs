//! Bounded worker pool with graceful, timeout-bounded shutdown.
//!
//! A [`Pool`] owns `size` dedicated OS threads that pull items from a bounded
//! queue and hand them to a caller-supplied run function. A background monitor
//! thread is the only writer of the processed counter and the error
//! accumulator, and drives the [`PoolStatus`] machine.
//!
//! # Shutdown
//!
//! [`Pool::stop`] fans a stop signal out to every worker. An idle worker exits
//! at once. A worker with an item in flight grants it one more stop-timeout
//! window; if the item still has not finished it is pushed to the leftover
//! queue and the worker reports a timeout. Items still sitting in the queue are
//! drained into the leftover queue after the workers have acknowledged, so
//! [`Pool::leftovers`] lists abandoned in-flight items before never-started ones.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use allocator_vacate::core::{Pool, PoolParams, Timeout};
//!
//! let pool = Pool::new(
//!     PoolParams::new(4, Arc::new(|job: &MyJob| job.execute()))
//!         .with_timeout(Timeout::new(Duration::from_millis(10), Duration::from_secs(30))),
//! )?;
//! pool.add(jobs)?;
//! pool.start()?;
//! pool.wait()?;
//! pool.stop()?;
//! ```

mod monitor;
mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, SendTimeoutError, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::counter::Counter;
use super::error::{AddError, AppResult, PoolError};
use super::multierror::{Errors, MultiError};
use super::status::PoolStatus;
use super::validator::Validator;
use crate::output::OutputDevice;

use worker::Worker;

/// Queue slots reserved per worker.
pub const QUEUE_CAPACITY_PER_WORKER: usize = 128;

/// Default time `add` waits for a queue slot, per item.
pub const DEFAULT_ADD_TIMEOUT: Duration = Duration::from_millis(100);

/// Default grace window granted to in-flight items on `stop`.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval at which `wait` polls the pool status.
const WAIT_TICK: Duration = Duration::from_millis(1);

/// Extra time `stop` allows for acknowledgements beyond the workers' own grace.
const STOP_ACK_GRACE: Duration = Duration::from_millis(250);

/// Function run by a worker for each item.
pub type RunFn<T> = Arc<dyn Fn(&T) -> AppResult<()> + Send + Sync>;

/// Pool timeouts. Both must be non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    /// Time `add` waits for a free queue slot, per item.
    pub add: Duration,
    /// Grace window for in-flight items once `stop` is called.
    pub stop: Duration,
}

impl Timeout {
    /// Build timeouts from explicit durations.
    #[must_use]
    pub const fn new(add: Duration, stop: Duration) -> Self {
        Self { add, stop }
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Self::new(DEFAULT_ADD_TIMEOUT, DEFAULT_STOP_TIMEOUT)
    }
}

/// Construction parameters for a [`Pool`].
pub struct PoolParams<T> {
    /// Number of workers.
    pub size: usize,
    /// Function each worker runs per item.
    pub run: Option<RunFn<T>>,
    /// Add and stop timeouts.
    pub timeout: Timeout,
    /// Stop the pool as soon as any item fails.
    pub fail_fast: bool,
    /// Cancellation source; the first message received triggers a stop.
    pub interrupt: Option<Receiver<()>>,
    /// Optional sink for lifecycle notices such as interrupts.
    pub writer: Option<OutputDevice>,
}

impl<T> PoolParams<T> {
    /// Parameters with default timeouts, no fail-fast and no interrupt source.
    #[must_use]
    pub fn new(size: usize, run: RunFn<T>) -> Self {
        Self {
            size,
            run: Some(run),
            timeout: Timeout::default(),
            fail_fast: false,
            interrupt: None,
            writer: None,
        }
    }

    /// Set the add and stop timeouts.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stop on the first failed item.
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Attach a cancellation source.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Receiver<()>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Attach a sink for lifecycle notices.
    #[must_use]
    pub fn with_writer(mut self, writer: OutputDevice) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Check every parameter, reporting all defects at once.
    ///
    /// # Errors
    ///
    /// Returns one entry per invalid parameter.
    pub fn validate(&self) -> Result<(), MultiError> {
        let mut merr = MultiError::new();
        if self.size == 0 {
            merr.push_msg("size cannot be 0");
        }
        if self.run.is_none() {
            merr.push_msg("run function cannot be empty");
        }
        if self.timeout.add.is_zero() {
            merr.push_msg("add timeout cannot be 0");
        }
        if self.timeout.stop.is_zero() {
            merr.push_msg("stop timeout cannot be 0");
        }
        merr.into_result()
    }
}

/// Counters and errors; `processed` and `errors` are written by the monitor only.
#[derive(Debug, Default)]
struct State {
    queued: Counter,
    processed: Counter,
    status: Counter,
    errors: Errors,
}

/// Queue and leftover channels, recreated when a stopped pool restarts.
struct Channels<T> {
    queue_tx: Option<Sender<T>>,
    queue_rx: Receiver<T>,
    leftovers_tx: Sender<T>,
    leftovers_rx: Receiver<T>,
}

impl<T> Channels<T> {
    fn new(capacity: usize, leftover_capacity: usize) -> Self {
        let (queue_tx, queue_rx) = bounded(capacity);
        let (leftovers_tx, leftovers_rx) = bounded(leftover_capacity);
        Self {
            queue_tx: Some(queue_tx),
            queue_rx,
            leftovers_tx,
            leftovers_rx,
        }
    }
}

/// One-way signal channels between the caller, the workers and the monitor.
struct Signals {
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    stopped_tx: Sender<bool>,
    stopped_rx: Receiver<bool>,
    finished_tx: Sender<AppResult<()>>,
    finished_rx: Receiver<AppResult<()>>,
    added_tx: Sender<()>,
    added_rx: Receiver<()>,
    monitor_stop_tx: Sender<()>,
    monitor_stop_rx: Receiver<()>,
}

impl Signals {
    fn new(size: usize) -> Self {
        let (stop_tx, stop_rx) = bounded(size);
        let (stopped_tx, stopped_rx) = bounded(size);
        let (finished_tx, finished_rx) = unbounded();
        let (added_tx, added_rx) = bounded(1);
        let (monitor_stop_tx, monitor_stop_rx) = bounded(1);
        Self {
            stop_tx,
            stop_rx,
            stopped_tx,
            stopped_rx,
            finished_tx,
            finished_rx,
            added_tx,
            added_rx,
            monitor_stop_tx,
            monitor_stop_rx,
        }
    }
}

struct Inner<T> {
    size: usize,
    capacity: usize,
    run: RunFn<T>,
    timeout: Timeout,
    fail_fast: bool,
    interrupt: Option<Receiver<()>>,
    writer: Option<OutputDevice>,
    state: State,
    channels: RwLock<Channels<T>>,
    signals: Signals,
    /// Serialises `start` and `stop`.
    lifecycle: Mutex<()>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    monitor: Mutex<Option<JoinHandle<()>>>,
    /// Set by the first interrupt; an interrupted pool never starts again.
    interrupted: AtomicBool,
    /// One-shot guard for fail-fast stops, reset on every start.
    fail_fast_triggered: AtomicBool,
}

/// Bounded worker pool generic over its work item type.
pub struct Pool<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Pool<T>
where
    T: Validator + Clone + Send + Sync + 'static,
{
    /// Validate `params` and create a pool. The monitor starts immediately;
    /// workers start on [`Pool::start`].
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidParams` listing every invalid parameter
    /// - `PoolError::Internal` if the monitor thread cannot be spawned
    pub fn new(params: PoolParams<T>) -> Result<Self, PoolError> {
        params.validate().map_err(PoolError::InvalidParams)?;
        let PoolParams {
            size,
            run,
            timeout,
            fail_fast,
            interrupt,
            writer,
        } = params;
        let run = run.ok_or_else(|| PoolError::Internal("run function missing".into()))?;

        let capacity = size * QUEUE_CAPACITY_PER_WORKER;
        let inner = Arc::new(Inner {
            size,
            capacity,
            run,
            timeout,
            fail_fast,
            interrupt,
            writer,
            state: State::default(),
            channels: RwLock::new(Channels::new(capacity, capacity + size)),
            signals: Signals::new(size),
            lifecycle: Mutex::new(()),
            workers: Mutex::new(Vec::with_capacity(size)),
            monitor: Mutex::new(None),
            interrupted: AtomicBool::new(false),
            fail_fast_triggered: AtomicBool::new(false),
        });

        let handle = monitor::spawn(Arc::clone(&inner))
            .map_err(|e| PoolError::Internal(format!("failed to spawn monitor: {e}")))?;
        *inner.monitor.lock() = Some(handle);

        info!(
            size = size,
            queue_capacity = capacity,
            add_timeout_ms = u64::try_from(timeout.add.as_millis()).unwrap_or(u64::MAX),
            stop_timeout_ms = u64::try_from(timeout.stop.as_millis()).unwrap_or(u64::MAX),
            fail_fast = fail_fast,
            "Pool created"
        );

        Ok(Self { inner })
    }

    /// Spawn the workers.
    ///
    /// A pool that stopped cleanly may be started again; its queue is
    /// recreated and its counters and errors are reset. Undrained leftovers
    /// are kept.
    ///
    /// # Errors
    ///
    /// - `PoolError::AlreadyStarted` unless the pool is `Stopped` or
    ///   `StoppedSuccess`; a pool that stopped on a timeout stays stopped
    /// - `PoolError::Interrupted` once the interrupt source has fired
    /// - `PoolError::Internal` if a thread cannot be spawned
    pub fn start(&self) -> Result<(), PoolError> {
        self.inner.start()
    }

    /// Enqueue items, waiting up to the add timeout for each one.
    ///
    /// Work may be added before [`Pool::start`]; it waits in the queue.
    ///
    /// # Errors
    ///
    /// Returns every item that was not enqueued together with the reason:
    /// `PoolError::AddOperationTimedOut` when the queue stayed full, or
    /// `PoolError::CannotAddWorkToStoppingPool` once a stop was requested.
    pub fn add<I>(&self, items: I) -> Result<(), AddError<T>>
    where
        I: IntoIterator<Item = T>,
    {
        self.inner.add(items.into_iter().collect())
    }

    /// Block until every queued item is processed or the pool stops, then
    /// return the aggregated item errors.
    ///
    /// # Errors
    ///
    /// - `PoolError::CannotWaitOnStoppedPool` if the pool never started
    /// - `PoolError::Work` with every item failure
    pub fn wait(&self) -> Result<(), PoolError> {
        if self.status() == PoolStatus::Stopped {
            return Err(PoolError::CannotWaitOnStoppedPool);
        }
        loop {
            let status = self.status();
            if status.is_stopping() || (status >= PoolStatus::Idle && self.inner.drained()) {
                break;
            }
            thread::sleep(WAIT_TICK);
        }
        self.result()
    }

    /// Stop every worker and move unprocessed items to the leftover queue.
    ///
    /// # Errors
    ///
    /// - `PoolError::AlreadyStopped` if the pool is not running
    /// - `PoolError::StopOperationTimedOut` if any worker abandoned its item;
    ///   the pool is still stopped and the item is in [`Pool::leftovers`]
    pub fn stop(&self) -> Result<(), PoolError> {
        self.inner.stop()
    }

    /// Drain the leftover queue.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::CannotGetLeftovers` unless the pool has stopped.
    pub fn leftovers(&self) -> Result<Vec<T>, PoolError> {
        if !self.status().is_stopped() {
            return Err(PoolError::CannotGetLeftovers);
        }
        let channels = self.inner.channels.read();
        Ok(channels.leftovers_rx.try_iter().collect())
    }
}

impl<T> Pool<T> {
    /// Current status.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        self.inner.status()
    }

    /// Aggregated errors of every processed item so far.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Work` when at least one item failed.
    pub fn result(&self) -> Result<(), PoolError> {
        self.inner.state.errors.result().map_err(PoolError::Work)
    }

    /// Number of workers.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Items accepted into the queue during the current run.
    #[must_use]
    pub fn queued(&self) -> u64 {
        self.inner.state.queued.get()
    }

    /// Items whose run finished during the current run.
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.inner.state.processed.get()
    }

    /// Queue capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl<T> Drop for Pool<T> {
    fn drop(&mut self) {
        let status = self.inner.status();
        if status > PoolStatus::Stopped && !status.is_stopping() {
            // Workers are detached, not joined, so dropping never blocks.
            for _ in 0..self.inner.size {
                let _ = self.inner.signals.stop_tx.try_send(());
            }
            debug!("Pool dropped without explicit stop - workers detached");
        }
        let _ = self.inner.signals.monitor_stop_tx.try_send(());
    }
}

impl<T> Inner<T> {
    fn status(&self) -> PoolStatus {
        PoolStatus::from(self.state.status.get())
    }

    fn set_status(&self, status: PoolStatus) {
        self.state.status.set(status.as_u64());
    }

    fn queue_len(&self) -> usize {
        self.channels.read().queue_rx.len()
    }

    /// Every enqueued item has been processed.
    fn drained(&self) -> bool {
        self.state.processed.get() == self.state.queued.get() && self.queue_len() == 0
    }

    /// Take an idle pool back to `Started` as soon as new work is enqueued,
    /// ahead of the monitor seeing the added signal.
    fn mark_busy(&self) {
        for from in [PoolStatus::Idle, PoolStatus::Finished] {
            if self
                .state
                .status
                .compare_exchange(from.as_u64(), PoolStatus::Started.as_u64())
            {
                debug!(from = %from, to = %PoolStatus::Started, "Pool status changed");
                return;
            }
        }
    }

    /// Recompute the status from the counters. Called by the monitor only.
    fn update_status(&self) {
        let status = self.status();
        if status == PoolStatus::Stopped || status.is_stopping() {
            return;
        }
        let queued = self.state.queued.get();
        let processed = self.state.processed.get();
        let queue_len = self.queue_len();
        let drained = processed == queued;

        let next = match status {
            PoolStatus::Starting if queued > processed => PoolStatus::Started,
            PoolStatus::Starting if queue_len == 0 && drained => PoolStatus::Idle,
            PoolStatus::Started if queue_len == 0 && drained => PoolStatus::Idle,
            PoolStatus::Idle | PoolStatus::Finished if queued > processed => PoolStatus::Started,
            PoolStatus::Idle if queue_len > 0 && drained => PoolStatus::Finished,
            PoolStatus::Finished if queue_len == 0 && drained => PoolStatus::Idle,
            _ => return,
        };

        // Start and stop may have moved the status since it was read.
        if self.state.status.compare_exchange(status.as_u64(), next.as_u64()) {
            debug!(from = %status, to = %next, queued, processed, "Pool status changed");
        }
    }

    /// Record a finished item. Called by the monitor only.
    fn record_finished(&self, result: AppResult<()>) -> bool {
        let failed = match result {
            Ok(()) => false,
            Err(err) => {
                debug!(error = %err, "Work item failed");
                self.state.errors.add(err);
                true
            }
        };
        self.state.processed.add(1);
        failed
    }
}

impl<T> Inner<T>
where
    T: Validator + Clone + Send + Sync + 'static,
{
    fn start(self: &Arc<Self>) -> Result<(), PoolError> {
        let _lifecycle = self.lifecycle.lock();
        if self.interrupted.load(Ordering::SeqCst) {
            return Err(PoolError::Interrupted);
        }
        // An abandoned item may still be running after a stop that timed out.
        let status = self.status();
        if !matches!(status, PoolStatus::Stopped | PoolStatus::StoppedSuccess) {
            return Err(PoolError::AlreadyStarted);
        }

        if status == PoolStatus::StoppedSuccess {
            self.reset()?;
        }

        let mut workers = self.workers.lock();
        let channels = self.channels.read();
        for id in 0..self.size {
            let worker = Worker {
                id,
                queue: channels.queue_rx.clone(),
                leftovers: channels.leftovers_tx.clone(),
                stop: self.signals.stop_rx.clone(),
                stopped: self.signals.stopped_tx.clone(),
                finished: self.signals.finished_tx.clone(),
                run: Arc::clone(&self.run),
                stop_timeout: self.timeout.stop,
            };
            match worker.spawn() {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    for _ in 0..workers.len() {
                        let _ = self.signals.stop_tx.try_send(());
                    }
                    workers.clear();
                    return Err(PoolError::Internal(format!("failed to spawn worker {id}: {e}")));
                }
            }
        }

        self.set_status(PoolStatus::Starting);
        info!(workers = self.size, "Pool started");
        Ok(())
    }

    /// Prepare a stopped pool for another run.
    fn reset(self: &Arc<Self>) -> Result<(), PoolError> {
        if let Some(previous) = self.monitor.lock().take() {
            let _ = self.signals.monitor_stop_tx.try_send(());
            if previous.join().is_err() {
                warn!("Previous pool monitor panicked");
            }
        }

        // Drop stale signals left behind by a stop that timed out.
        while self.signals.stop_rx.try_recv().is_ok() {}
        while self.signals.stopped_rx.try_recv().is_ok() {}
        while self.signals.monitor_stop_rx.try_recv().is_ok() {}

        {
            let mut channels = self.channels.write();
            let fresh = Channels::new(self.capacity, self.capacity + self.size);
            channels.queue_tx = fresh.queue_tx;
            channels.queue_rx = fresh.queue_rx;
            if channels.leftovers_rx.is_empty() {
                channels.leftovers_tx = fresh.leftovers_tx;
                channels.leftovers_rx = fresh.leftovers_rx;
            } else {
                debug!(
                    leftovers = channels.leftovers_rx.len(),
                    "Keeping undrained leftovers across restart"
                );
            }
        }

        self.state.queued.set(0);
        self.state.processed.set(0);
        self.state.errors.clear();
        self.fail_fast_triggered.store(false, Ordering::SeqCst);

        let handle = monitor::spawn(Arc::clone(self))
            .map_err(|e| PoolError::Internal(format!("failed to spawn monitor: {e}")))?;
        *self.monitor.lock() = Some(handle);
        Ok(())
    }

    fn add(&self, items: Vec<T>) -> Result<(), AddError<T>> {
        if self.status().is_stopping() {
            return Err(AddError {
                reason: PoolError::CannotAddWorkToStoppingPool,
                items,
            });
        }

        // The read guard keeps `stop` from closing and draining the queue
        // while items are being sent into it.
        let channels = self.channels.read();
        let Some(queue) = channels.queue_tx.as_ref() else {
            return Err(AddError {
                reason: PoolError::CannotAddWorkToStoppingPool,
                items,
            });
        };

        let mut rejected = Vec::new();
        let mut reason = None;
        for item in items {
            if self.status().is_stopping() {
                reason = Some(PoolError::CannotAddWorkToStoppingPool);
                rejected.push(item);
                continue;
            }
            // Counted before the send so the monitor never sees an item in
            // flight that is not yet accounted for.
            self.state.queued.add(1);
            match queue.send_timeout(item, self.timeout.add) {
                Ok(()) => {
                    self.mark_busy();
                    let _ = self.signals.added_tx.try_send(());
                }
                Err(SendTimeoutError::Timeout(item)) => {
                    self.state.queued.sub(1);
                    rejected.push(item);
                    if reason.is_none() {
                        reason = Some(PoolError::AddOperationTimedOut);
                    }
                }
                Err(SendTimeoutError::Disconnected(item)) => {
                    self.state.queued.sub(1);
                    rejected.push(item);
                    reason = Some(PoolError::CannotAddWorkToStoppingPool);
                }
            }
        }

        match reason {
            None => Ok(()),
            Some(reason) => {
                warn!(rejected = rejected.len(), error = %reason, "Work not enqueued");
                Err(AddError {
                    reason,
                    items: rejected,
                })
            }
        }
    }

    fn stop(&self) -> Result<(), PoolError> {
        self.shutdown(false)
    }

    /// Stop the workers and drain the queue. With `unstarted`, a pool that
    /// never started is stopped too: its queue is drained into leftovers.
    fn shutdown(&self, unstarted: bool) -> Result<(), PoolError> {
        let _lifecycle = self.lifecycle.lock();
        let status = self.status();
        if status.is_stopping() || (status == PoolStatus::Stopped && !unstarted) {
            return Err(PoolError::AlreadyStopped);
        }
        self.set_status(PoolStatus::Stopping);
        info!(workers = self.size, "Stopping pool");

        let timed_out = if status == PoolStatus::Stopped {
            false
        } else {
            self.stop_workers()
        };

        {
            let mut channels = self.channels.write();
            channels.queue_tx = None;
            let pending: Vec<T> = channels.queue_rx.try_iter().collect();
            if !pending.is_empty() {
                debug!(count = pending.len(), "Moving unprocessed work to leftovers");
            }
            for item in pending {
                if channels.leftovers_tx.try_send(item).is_err() {
                    warn!("Leftover queue full, dropping unprocessed item");
                }
            }
        }

        let final_status = if timed_out {
            PoolStatus::StoppedTimeout
        } else {
            PoolStatus::StoppedSuccess
        };
        // Results reported during the grace window are recorded before the
        // final status becomes visible.
        let _ = self.signals.monitor_stop_tx.try_send(());
        if let Some(monitor) = self.monitor.lock().take() {
            if monitor.join().is_err() {
                warn!("Pool monitor panicked");
            }
        }
        self.set_status(final_status);
        info!(status = %final_status, "Pool stopped");

        if timed_out {
            Err(PoolError::StopOperationTimedOut)
        } else {
            Ok(())
        }
    }

    /// Signal every worker and collect their acknowledgements. Returns whether
    /// any worker abandoned its item or failed to acknowledge in time.
    fn stop_workers(&self) -> bool {
        for _ in 0..self.size {
            let _ = self.signals.stop_tx.try_send(());
        }

        // Every worker acknowledges within its own stop timeout.
        let deadline = Instant::now() + self.timeout.stop + STOP_ACK_GRACE;
        let mut timed_out = false;
        let mut acknowledged = 0;
        while acknowledged < self.size {
            match self.signals.stopped_rx.recv_deadline(deadline) {
                Ok(worker_timed_out) => {
                    timed_out |= worker_timed_out;
                    acknowledged += 1;
                }
                Err(_) => {
                    warn!(
                        acknowledged,
                        workers = self.size,
                        "Workers did not acknowledge stop in time"
                    );
                    timed_out = true;
                    break;
                }
            }
        }

        let mut workers = self.workers.lock();
        if acknowledged == self.size {
            for handle in workers.drain(..) {
                if handle.join().is_err() {
                    warn!("Worker thread panicked");
                }
            }
        } else {
            workers.clear();
        }
        timed_out
    }

    /// Stop from a helper thread so the caller (the monitor) never blocks.
    /// Unlike [`Inner::stop`], this also stops a pool that never started.
    fn stop_async(self: &Arc<Self>, reason: &'static str) {
        let inner = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("pool-stop".into())
            .spawn(move || match inner.shutdown(true) {
                Ok(()) | Err(PoolError::AlreadyStopped) => {}
                Err(e) => debug!(error = %e, reason, "Asynchronous stop finished with error"),
            });
        if let Err(e) = spawned {
            warn!(error = %e, reason, "Failed to spawn stop thread");
        }
    }
}
