//! # Allocator Vacate
//!
//! A bounded worker pool with graceful, timeout-bounded shutdown, and the
//! orchestrator that uses it to drain cloud resources off allocators.
//!
//! ## Pool
//!
//! [`core::Pool`] owns a fixed number of OS worker threads pulling from a
//! bounded queue. Stopping the pool gives in-flight items one stop timeout
//! to finish; anything abandoned or never picked up is kept in a leftover
//! queue so the caller can follow up.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use allocator_vacate::core::{Pool, PoolParams, RunFn};
//!
//! let run: RunFn<Job> = Arc::new(|job: &Job| job.execute());
//! let pool = Pool::new(PoolParams::new(4, run))?;
//! pool.add(jobs)?;
//! pool.start()?;
//! pool.wait()?;
//! pool.stop()?;
//! let unprocessed = pool.leftovers()?;
//! ```
//!
//! ## Vacate
//!
//! [`vacate::vacate`] discovers the movable resources on each allocator,
//! moves them through the pool with bounded concurrency, tracks each
//! deployment plan to completion and returns every failure in one
//! [`core::MultiError`].
//!
//! ```rust,ignore
//! use allocator_vacate::config::VacateConfig;
//! use allocator_vacate::output::OutputDevice;
//!
//! let params = VacateConfig::from_env()?.into_params(api, OutputDevice::stdout());
//! if let Err(merr) = allocator_vacate::vacate::vacate(params) {
//!     eprintln!("{merr}");
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Worker pool and its primitives.
pub mod core;
/// Configuration models for the pool and the orchestrator.
pub mod config;
/// Progress output sinks and formats.
pub mod output;
/// Tokio runtime used by the orchestrator.
pub mod runtime;
/// Shared utilities.
pub mod util;
/// Allocator vacate orchestration.
pub mod vacate;
