//! Per-item validation via an external checker process
//!
//! The runner only knows the [`Validator`] trait. [`FfmpegValidator`] is the
//! production implementation: it decodes the whole file with ffmpeg and treats
//! anything written to stderr as corruption.

use crate::parallel::CancelToken;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

/// How often a running child is polled for exit, timeout and cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Pass/fail judgement from a validator that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub valid: bool,
    pub diagnostic: Option<String>,
}

impl Verdict {
    pub fn pass() -> Self {
        Self {
            valid: true,
            diagnostic: None,
        }
    }

    pub fn fail(diagnostic: impl Into<String>) -> Self {
        Self {
            valid: false,
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// Ways a validator call can end without a verdict
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("Verification timed out (>{}s)", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("{0} not found - please install ffmpeg")]
    NotFound(String),

    #[error("Unexpected error: {0}")]
    Execution(String),

    /// The pool is shutting down; the item must not be recorded
    #[error("Verification cancelled")]
    Cancelled,
}

/// A blocking per-item check with an enforced time limit
pub trait Validator: Send + Sync {
    fn validate(
        &self,
        item: &Path,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<Verdict, ValidatorError>;

    /// Fail early when the checker itself cannot run
    fn ensure_available(&self) -> Result<(), ValidatorError> {
        Ok(())
    }
}

/// Validates media files with `ffmpeg -v error -i <file> -f null -`
#[derive(Debug, Clone)]
pub struct FfmpegValidator {
    program: String,
}

impl FfmpegValidator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Resolve the ffmpeg executable on PATH (or as given, when it is a path)
    pub fn locate(&self) -> Result<PathBuf, ValidatorError> {
        which::which(&self.program).map_err(|_| ValidatorError::NotFound(self.program.clone()))
    }

    fn interpret(status: ExitStatus, stderr: &str) -> Verdict {
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            Verdict::fail(stderr)
        } else if !status.success() {
            Verdict::fail(format!("ffmpeg exited with {status}"))
        } else {
            Verdict::pass()
        }
    }
}

impl Default for FfmpegValidator {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Validator for FfmpegValidator {
    fn validate(
        &self,
        item: &Path,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<Verdict, ValidatorError> {
        let mut command = Command::new(&self.program);
        command
            .args(["-v", "error", "-i"])
            .arg(item)
            .args(["-f", "null", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // Own process group: a terminal Ctrl-C reaches vidguard only, the
        // child is stopped through the cancel token
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let spawned = command.spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ValidatorError::NotFound(self.program.clone()));
            }
            Err(e) => return Err(ValidatorError::Execution(e.to_string())),
        };

        // Drain stderr concurrently so a chatty decoder can't fill the pipe and stall
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut buffer = String::new();
                let _ = stderr.read_to_string(&mut buffer);
                buffer
            })
        });

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ValidatorError::Execution(e.to_string()));
                }
            }

            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ValidatorError::Cancelled);
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                tracing::debug!("Killed ffmpeg for {} after {:?}", item.display(), elapsed);
                return Err(ValidatorError::Timeout(timeout));
            }

            std::thread::sleep(POLL_INTERVAL.min(timeout - elapsed));
        };

        let stderr = stderr_reader
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();

        Ok(Self::interpret(status, &stderr))
    }

    fn ensure_available(&self) -> Result<(), ValidatorError> {
        let resolved = self.locate()?;
        tracing::debug!("Using ffmpeg at {}", resolved.display());
        Ok(())
    }
}
