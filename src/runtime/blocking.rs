//! A multi-threaded tokio runtime entered from plain OS threads.

use std::future::Future;
use std::io;

use tokio::runtime::{Handle, Runtime};

/// Owns a tokio runtime and lets synchronous code block on futures.
///
/// Pool workers run their items on dedicated OS threads; each of those
/// threads calls [`BlockingRuntime::block_on`] to drive the async API
/// client. Dropping the runtime shuts it down in the background, so it may
/// be dropped from any context.
pub struct BlockingRuntime {
    runtime: Option<Runtime>,
    handle: Handle,
}

impl BlockingRuntime {
    /// Create a runtime with `worker_threads` threads (at least one, at most
    /// the number of CPUs).
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the runtime cannot be built.
    pub fn with_worker_threads(worker_threads: usize) -> io::Result<Self> {
        let threads = worker_threads.clamp(1, num_cpus::get().max(1));
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name("vacate-runtime")
            .enable_all()
            .build()?;
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    /// Handle to the runtime, cheap to clone into worker closures.
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// Run `future` to completion on the current thread.
    ///
    /// Must not be called from within an async context.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }
}

impl Drop for BlockingRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_block_on_from_plain_threads() {
        let runtime = BlockingRuntime::with_worker_threads(2).unwrap();
        let handles: Vec<_> = (0..4u64)
            .map(|i| {
                let handle = runtime.handle();
                thread::spawn(move || {
                    handle.block_on(async move {
                        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                        i * 2
                    })
                })
            })
            .collect();
        let results: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results, vec![0, 2, 4, 6]);
    }

    #[tokio::test]
    async fn test_drop_inside_async_context() {
        let runtime = BlockingRuntime::with_worker_threads(1).unwrap();
        drop(runtime);
    }
}
