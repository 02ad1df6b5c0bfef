//! # Vidguard - integrity verification for video libraries
//!
//! Vidguard decodes every video file under a directory with ffmpeg, in
//! parallel, and reports the ones that fail.
//!
//! ## Features
//!
//! - **Parallel**: A fixed pool of workers, each supervising one ffmpeg process
//! - **Resumable**: Results are checkpointed every N files and on Ctrl-C or SIGTERM
//! - **Bounded**: Each file gets a time limit; hung decoders are killed
//! - **Reports**: Text report grouped by course, JSON report of failures for re-verification
//!
//! ## Quick Start
//!
//! ```bash
//! # Verify a library, checkpointing as it goes
//! vidguard verify ~/Videos -c verify.json
//!
//! # Pick up where an interrupted run stopped
//! vidguard verify ~/Videos -c verify.json --resume
//!
//! # Re-check only the files a previous JSON report flagged
//! vidguard verify --reverify report.json
//! ```

pub mod cli;
pub mod config;
pub mod parallel;
pub mod reports;
pub mod verify;

pub use cli::{Cli, Output};
pub use config::VidguardConfig;

/// Result type alias for Vidguard operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Process exit status after an interrupt (128 + SIGINT)
pub const EXIT_INTERRUPTED: i32 = 130;
