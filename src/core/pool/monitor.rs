//! Background monitor: the single writer of pool progress and status.

use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{never, select};
use tracing::{debug, warn};

use super::Inner;
use crate::core::validator::Validator;

/// Status is recomputed at least this often even without events.
const MONITOR_TICK: Duration = Duration::from_millis(5);

pub(super) fn spawn<T>(inner: Arc<Inner<T>>) -> io::Result<JoinHandle<()>>
where
    T: Validator + Clone + Send + Sync + 'static,
{
    thread::Builder::new()
        .name("pool-monitor".into())
        .spawn(move || run(&inner))
}

fn run<T>(inner: &Arc<Inner<T>>)
where
    T: Validator + Clone + Send + Sync + 'static,
{
    let signals = &inner.signals;
    let mut interrupt = inner.interrupt.clone().unwrap_or_else(never);
    debug!("Pool monitor started");

    loop {
        let mut interrupt_closed = false;
        select! {
            recv(signals.finished_rx) -> msg => {
                if let Ok(result) = msg {
                    on_finished(inner, result);
                }
            },
            recv(signals.added_rx) -> _ => {},
            recv(interrupt) -> msg => match msg {
                Ok(()) => on_interrupt(inner),
                Err(_) => interrupt_closed = true,
            },
            recv(signals.monitor_stop_rx) -> _ => {
                for result in signals.finished_rx.try_iter() {
                    inner.record_finished(result);
                }
                debug!("Pool monitor stopped");
                return;
            },
            default(MONITOR_TICK) => {},
        }
        if interrupt_closed {
            // A dropped source can never fire again.
            interrupt = never();
        }
        inner.update_status();
    }
}

fn on_finished<T>(inner: &Arc<Inner<T>>, result: crate::core::AppResult<()>)
where
    T: Validator + Clone + Send + Sync + 'static,
{
    let failed = inner.record_finished(result);
    if failed && inner.fail_fast && !inner.fail_fast_triggered.swap(true, Ordering::SeqCst) {
        warn!("Work item failed with fail-fast enabled, stopping pool");
        inner.stop_async("fail fast");
    }
}

fn on_interrupt<T>(inner: &Arc<Inner<T>>)
where
    T: Validator + Clone + Send + Sync + 'static,
{
    if inner.interrupted.swap(true, Ordering::SeqCst) {
        debug!("Ignoring repeated interrupt");
        return;
    }
    warn!("Received interrupt, stopping pool");
    if let Some(writer) = &inner.writer {
        if let Err(e) = writer.write_line("Received interrupt, stopping pool...") {
            debug!(error = %e, "Failed to write interrupt notice");
        }
    }
    inner.stop_async("interrupt");
}
