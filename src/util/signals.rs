//! Process signals as a pool cancellation source.

use std::io;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

/// Spawn a listener that sends `()` on every SIGINT (and SIGTERM on unix).
///
/// The receiver is meant for [`PoolParams::with_interrupt`]; the pool acts on
/// the first signal only. Only one listener should exist per process.
///
/// [`PoolParams::with_interrupt`]: crate::core::PoolParams::with_interrupt
///
/// # Errors
///
/// Returns the I/O error if the listener thread or its runtime cannot be
/// created.
pub fn os_interrupt() -> io::Result<Receiver<()>> {
    let (tx, rx) = bounded(1);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()?;
    thread::Builder::new()
        .name("signal-listener".into())
        .spawn(move || runtime.block_on(listen(tx)))?;
    Ok(rx)
}

async fn listen(tx: Sender<()>) {
    loop {
        if let Err(e) = next_signal().await {
            warn!(error = %e, "Signal listener failed");
            return;
        }
        debug!("Interrupt signal received");
        // A full channel already holds an undelivered interrupt.
        if let Err(TrySendError::Disconnected(())) = tx.try_send(()) {
            return;
        }
    }
}

#[cfg(unix)]
async fn next_signal() -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = term.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn next_signal() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}
