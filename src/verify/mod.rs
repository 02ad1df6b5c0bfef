//! Batch verification engine
//!
//! [`Runner`] fans items out over a worker pool, records outcomes in finish
//! order, checkpoints every N completions and once more at the end.
//! [`InterruptController`] makes sure whatever was recorded survives Ctrl-C
//! or SIGTERM.

pub mod checkpoint;
pub mod interrupt;
pub mod runner;
pub mod scanner;
pub mod types;
pub mod validator;

pub use checkpoint::{CheckpointError, CheckpointSink, JsonCheckpointStore, pending_items};
pub use interrupt::{FlushOnExit, InterruptController};
pub use runner::{DEFAULT_CHECKPOINT_INTERVAL, Runner, RunnerConfig};
pub use types::{Outcome, ResultMap, WorkItem, failure_count};
pub use validator::{FfmpegValidator, Validator, ValidatorError, Verdict};
