//! Worker pool: a fixed number of workers draining one job queue.
//!
//! Each worker dequeues a job, fetches or remuxes it depending on its kind,
//! hands the artifact to the result sink, removes the local copy and sends
//! the final notification. Every failure, panics included, is contained to
//! the job that caused it; the worker moves on to the next item.
//!
//! # Example
//!
//! ```ignore
//! use batchfetch_core::pool::{PoolDeps, WorkerPool};
//!
//! let pool = WorkerPool::start(&config, deps);
//! pool.submit(batch).await;
//! pool.stop().await;
//! ```

mod board;
mod error;
mod types;
mod worker;
mod worker_pool;

pub use board::JobBoard;
pub use error::JobError;
pub use types::{BatchSummary, PoolDeps, PoolStatus};
pub use worker_pool::WorkerPool;
