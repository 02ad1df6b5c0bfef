//! Flush-on-termination coordination
//!
//! The controller holds a locked mirror of the results recorded so far and
//! the handle of the live pool. Every exit path (Ctrl-C, SIGTERM, normal
//! return, early error) ends in the same [`InterruptController::flush`], which
//! is a whole-map overwrite and therefore safe to run more than once.

use super::checkpoint::CheckpointSink;
use super::types::{Outcome, ResultMap, WorkItem};
use crate::EXIT_INTERRUPTED;
use crate::parallel::PoolHandle;
use anyhow::{Context, Result};
use console::style;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

pub struct InterruptController {
    checkpoint: Option<Arc<dyn CheckpointSink>>,
    snapshot: Mutex<ResultMap>,
    pool: Mutex<Option<PoolHandle>>,
    interrupted: AtomicBool,
    torn_down: (Mutex<bool>, Condvar),
}

impl InterruptController {
    pub fn new(checkpoint: Option<Arc<dyn CheckpointSink>>) -> Arc<Self> {
        Arc::new(Self {
            checkpoint,
            snapshot: Mutex::new(ResultMap::new()),
            pool: Mutex::new(None),
            interrupted: AtomicBool::new(false),
            torn_down: (Mutex::new(false), Condvar::new()),
        })
    }

    /// Install Ctrl-C / SIGTERM handling and return the exit-hook guard.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(self: &Arc<Self>) -> Result<FlushOnExit> {
        let runtime = tokio::runtime::Handle::try_current()
            .context("Interrupt handling requires a tokio runtime")?;

        let controller = Arc::clone(self);
        runtime.spawn(async move {
            loop {
                shutdown_signal().await;
                let controller = Arc::clone(&controller);
                // Teardown joins worker threads, keep it off the async workers
                tokio::task::spawn_blocking(move || controller.interrupt());
            }
        });

        tracing::debug!("Interrupt handlers armed");
        Ok(FlushOnExit {
            controller: Arc::clone(self),
        })
    }

    /// Tell the controller which pool to stop on interrupt (`None` once it has shut down)
    pub fn bind_pool(&self, pool: Option<PoolHandle>) {
        *self.pool.lock().unwrap_or_else(PoisonError::into_inner) = pool;
    }

    /// Start the mirror from previously recorded results
    pub fn seed(&self, results: &ResultMap) {
        let mut snapshot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        snapshot.extend(results.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Record one completion in the mirror
    pub fn publish(&self, item: &WorkItem, outcome: &Outcome) {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(item.clone(), outcome.clone());
    }

    /// Consistent copy of everything recorded so far
    pub fn snapshot(&self) -> ResultMap {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Persist the current snapshot.
    ///
    /// Returns `Ok(false)` when there is nothing to write (no checkpoint
    /// configured or no results yet).
    pub fn flush(&self) -> Result<bool> {
        let Some(checkpoint) = &self.checkpoint else {
            return Ok(false);
        };

        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return Ok(false);
        }

        checkpoint.save(&snapshot)?;
        Ok(true)
    }

    /// Save state and stop the bound pool, without exiting the process
    pub fn teardown(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
        self.shut_down();
    }

    fn shut_down(&self) {
        eprintln!(
            "\n\n{} Interrupted! Saving checkpoint before exit...",
            style("⚠").yellow()
        );

        match self.flush() {
            Ok(true) => {
                if let Some(checkpoint) = &self.checkpoint {
                    eprintln!("Checkpoint saved to: {}", checkpoint.location().display());
                    eprintln!("You can resume with: --resume -c <checkpoint_file>");
                }
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!("Failed to save checkpoint on interrupt: {e:#}");
                eprintln!("{} Failed to save checkpoint: {e:#}", style("✖").red());
            }
        }

        let pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(pool) = pool {
            pool.terminate();
        }

        let (done, cvar) = &self.torn_down;
        *done.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    /// Block until an interrupt's flush and pool shutdown have finished.
    ///
    /// Only meaningful once [`is_interrupted`](Self::is_interrupted) is true.
    pub fn wait_for_teardown(&self) {
        let (done, cvar) = &self.torn_down;
        let mut done = done.lock().unwrap_or_else(PoisonError::into_inner);
        while !*done {
            done = cvar.wait(done).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Full interrupt path: teardown, then exit with the interrupted status.
    ///
    /// A repeated interrupt while the first one is still running only
    /// re-flushes.
    pub fn interrupt(&self) {
        if self.interrupted.swap(true, Ordering::SeqCst) {
            tracing::warn!("Already shutting down, re-saving checkpoint");
            if let Err(e) = self.flush() {
                tracing::error!("Failed to save checkpoint: {e:#}");
                eprintln!("{} Failed to save checkpoint: {e:#}", style("✖").red());
            }
            return;
        }

        self.shut_down();
        std::process::exit(EXIT_INTERRUPTED);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

/// Last-resort exit hook: flushes the controller's snapshot when dropped
pub struct FlushOnExit {
    controller: Arc<InterruptController>,
}

impl Drop for FlushOnExit {
    fn drop(&mut self) {
        if let Err(e) = self.controller.flush() {
            tracing::error!("Failed to save checkpoint at exit: {e:#}");
            eprintln!("{} Failed to save checkpoint at exit: {e:#}", style("✖").red());
        }
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C signal"),
            Err(e) => {
                tracing::warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                tracing::info!("Received terminate signal");
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
