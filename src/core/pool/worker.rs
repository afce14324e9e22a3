//! Worker loop.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use super::RunFn;
use crate::core::error::AppResult;
use crate::core::validator::Validator;

/// A single pool worker and the channel ends it owns.
pub(super) struct Worker<T> {
    pub(super) id: usize,
    pub(super) queue: Receiver<T>,
    pub(super) leftovers: Sender<T>,
    pub(super) stop: Receiver<()>,
    pub(super) stopped: Sender<bool>,
    pub(super) finished: Sender<AppResult<()>>,
    pub(super) run: RunFn<T>,
    pub(super) stop_timeout: Duration,
}

/// What happened to an item once it left the queue.
enum Outcome {
    /// The item finished; keep pulling work.
    Done,
    /// A stop arrived while the item was in flight.
    Stopped { timed_out: bool },
}

impl<T> Worker<T>
where
    T: Validator + Clone + Send + Sync + 'static,
{
    pub(super) fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("pool-worker-{}", self.id))
            .spawn(move || self.work())
    }

    fn work(self) {
        debug!(worker_id = self.id, "Worker started");
        let timed_out = loop {
            select! {
                recv(self.stop) -> _ => break false,
                recv(self.queue) -> msg => match msg {
                    Ok(item) => match self.process(item) {
                        Outcome::Done => {}
                        Outcome::Stopped { timed_out } => break timed_out,
                    },
                    Err(_) => {
                        debug!(worker_id = self.id, "Worker queue closed");
                        break false;
                    }
                },
            }
        };
        let _ = self.stopped.send(timed_out);
        debug!(worker_id = self.id, timed_out, "Worker exiting");
    }

    /// Run `item` on a nested thread so a stop can still be observed while it
    /// is in flight.
    fn process(&self, item: T) -> Outcome {
        let (done_tx, done_rx) = bounded::<AppResult<()>>(1);
        let run = Arc::clone(&self.run);
        let job = item.clone();
        let spawned = thread::Builder::new()
            .name(format!("pool-worker-{}-run", self.id))
            .spawn(move || {
                let result = job.validate().and_then(|()| run(&job));
                let _ = done_tx.send(result);
            });
        if let Err(e) = spawned {
            self.finish(Err(anyhow::anyhow!("failed to spawn run thread: {e}")));
            return Outcome::Done;
        }

        select! {
            recv(done_rx) -> result => {
                self.finish(result.unwrap_or_else(|_| Err(panicked())));
                Outcome::Done
            },
            recv(self.stop) -> _ => match done_rx.recv_timeout(self.stop_timeout) {
                Ok(result) => {
                    self.finish(result);
                    Outcome::Stopped { timed_out: false }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.finish(Err(panicked()));
                    Outcome::Stopped { timed_out: false }
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        worker_id = self.id,
                        stop_timeout_ms = u64::try_from(self.stop_timeout.as_millis()).unwrap_or(u64::MAX),
                        "In-flight work did not finish before the stop timeout, abandoning it"
                    );
                    if self.leftovers.try_send(item).is_err() {
                        warn!(worker_id = self.id, "Leftover queue full, dropping abandoned item");
                    }
                    Outcome::Stopped { timed_out: true }
                }
            },
        }
    }

    fn finish(&self, result: AppResult<()>) {
        let _ = self.finished.send(result);
    }
}

fn panicked() -> anyhow::Error {
    anyhow::anyhow!("work item panicked")
}
