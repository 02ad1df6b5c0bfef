//! Configuration management for Vidguard
//!
//! Settings are layered with figment: embedded defaults, user and project
//! TOML files, `VIDGUARD_*` environment variables, then command-line flags.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod core;
pub mod overrides;

pub use self::core::VidguardConfig;

/// Fully merged settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub runner: RunnerSettings,
    pub validator: ValidatorSettings,
    pub scanner: ScannerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// Parallel workers (0 = one per CPU)
    pub jobs: usize,

    /// Checkpoint every N completions
    pub checkpoint_interval: usize,

    /// Checkpoint file location
    #[serde(default)]
    pub checkpoint: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorSettings {
    /// ffmpeg executable
    pub ffmpeg: String,

    /// Per-file limit (seconds)
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerSettings {
    pub extensions: Vec<String>,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.validator.timeout_secs == 0 {
            anyhow::bail!("validator.timeout_secs must be at least 1");
        }

        if self.runner.checkpoint_interval == 0 {
            anyhow::bail!("runner.checkpoint_interval must be at least 1");
        }

        if self.validator.ffmpeg.trim().is_empty() {
            anyhow::bail!("validator.ffmpeg cannot be empty");
        }

        if self.scanner.extensions.is_empty() {
            anyhow::bail!("At least one scanner extension must be specified");
        }

        Ok(())
    }

    /// Requested worker count with 0 resolved to the CPU count
    pub fn worker_count(&self) -> usize {
        match self.runner.jobs {
            0 => num_cpus::get(),
            jobs => jobs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.validator.timeout_secs)
    }
}

/// Values given on the command line; `None` leaves the lower layers in charge
#[derive(Debug, Clone, Default, Serialize)]
pub struct CliOverrides {
    pub runner: RunnerOverrides,
    pub validator: ValidatorOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunnerOverrides {
    pub jobs: Option<usize>,
    pub checkpoint: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidatorOverrides {
    pub timeout_secs: Option<u64>,
}
