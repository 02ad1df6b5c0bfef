//! Generic parallel execution framework
//!
//! This module provides the worker-pool plumbing used by the verification
//! runner. It knows nothing about videos or checkpoints.
//!
//! # Architecture Responsibilities
//!
//! ## What This Module Does:
//! - **Execution**: Fixed-size pool of named worker threads fed by a crossbeam queue
//! - **Fan-in**: Unordered completion stream, first finished first delivered
//! - **Cancellation**: Shared [`CancelToken`] and a [`PoolHandle`] that can stop and join workers
//! - **Progress**: Rate/ETA accounting and status-line rendering
//!
//! ## What This Module Does NOT Do:
//! - **Domain Logic**: Does not interpret work items or their results
//! - **Persistence**: Does not checkpoint anything
//!
//! # Example Usage
//!
//! ```rust
//! use vidguard::parallel::WorkerPool;
//!
//! let mut pool = WorkerPool::spawn(2, "doc", |x: &u32, _cancel| Some(x * 2)).unwrap();
//! pool.submit_all(vec![1, 2, 3]);
//!
//! let mut doubled: Vec<u32> = pool.completions().collect();
//! pool.join();
//!
//! doubled.sort();
//! assert_eq!(doubled, vec![2, 4, 6]);
//! ```

pub mod pool;
pub mod progress;

// Re-export main types for easier access
pub use pool::{CancelToken, PoolError, PoolHandle, WorkerPool};
pub use progress::{
    CompletionSummary, ProgressReporter, ProgressSnapshot, ProgressTracker, format_time,
};
