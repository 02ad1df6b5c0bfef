use super::checkpoint::CheckpointSink;
use super::interrupt::InterruptController;
use super::types::{Outcome, ResultMap, WorkItem};
use super::validator::{Validator, ValidatorError};
use crate::parallel::{CancelToken, ProgressReporter, ProgressTracker, WorkerPool};
use anyhow::{Context, Result};
use console::style;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 10;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Requested worker count; clamped to the number of items
    pub workers: usize,
    /// Per-item limit forwarded to the validator
    pub timeout: Duration,
    /// Persist a checkpoint every N completions
    pub checkpoint_interval: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            timeout: Duration::from_secs(300),
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }
}

/// Which cadence point a checkpoint write belongs to
#[derive(Debug, Clone, Copy)]
enum CheckpointKind {
    Periodic,
    Final,
}

/// Drives a worker pool over a batch of items and collects their outcomes
pub struct Runner<V> {
    validator: Arc<V>,
    config: RunnerConfig,
    controller: Arc<InterruptController>,
    checkpoint: Option<Arc<dyn CheckpointSink>>,
    reporter: ProgressReporter,
    prior: ResultMap,
}

impl<V: Validator + 'static> Runner<V> {
    pub fn new(validator: V, config: RunnerConfig, controller: Arc<InterruptController>) -> Self {
        Self {
            validator: Arc::new(validator),
            config,
            controller,
            checkpoint: None,
            reporter: ProgressReporter::hidden(),
            prior: ResultMap::new(),
        }
    }

    pub fn with_checkpoint(mut self, checkpoint: Arc<dyn CheckpointSink>) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    pub fn with_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Results recorded by an earlier run; they stay in every checkpoint written by this one
    pub fn with_prior(mut self, prior: ResultMap) -> Self {
        self.prior = prior;
        self
    }

    /// Verify every item and return the merged result map.
    ///
    /// Item failures are recorded as failing outcomes. Only failing to start
    /// the pool is an error.
    pub fn run(self, items: Vec<WorkItem>) -> Result<ResultMap> {
        let mut results = self.prior.clone();
        if items.is_empty() {
            return Ok(results);
        }

        let total = items.len();
        let workers = self.config.workers.clamp(1, total);
        let interval = self.config.checkpoint_interval.max(1);
        let mut tracker = ProgressTracker::new(total);

        let validator = Arc::clone(&self.validator);
        let timeout = self.config.timeout;
        let mut pool = WorkerPool::spawn(workers, "vidguard-worker", move |item: &WorkItem, cancel| {
            verify_item(validator.as_ref(), item, timeout, cancel).map(|outcome| (item.clone(), outcome))
        })
        .context("Failed to start verification workers")?;

        tracing::info!("Verifying {} item(s) with {} worker(s)", total, pool.size());
        self.controller.seed(&self.prior);
        self.controller.bind_pool(Some(pool.handle()));
        pool.submit_all(items);

        for (item, outcome) in pool.completions() {
            // Teardown owns the checkpoint from here on; anything still
            // arriving was in flight when the interrupt landed
            if self.controller.is_interrupted() {
                tracing::debug!("Dropping in-flight result for {}", item.display());
                continue;
            }
            if outcome.is_failure() {
                tracing::debug!("{}: {}", item.display(), outcome.message());
            }
            self.controller.publish(&item, &outcome);
            results.insert(item, outcome);

            let completed = tracker.increment();
            self.reporter.render(&tracker.snapshot());

            if completed % interval == 0 {
                self.save_checkpoint(&results, CheckpointKind::Periodic);
            }

            if completed == total {
                break;
            }
        }

        pool.join();
        self.controller.bind_pool(None);

        if self.controller.is_interrupted() {
            self.reporter.abandon();
        } else {
            self.save_checkpoint(&results, CheckpointKind::Final);
            self.reporter.finish(&tracker.summary());
        }

        Ok(results)
    }

    /// Checkpoint failures are reported and the run carries on
    fn save_checkpoint(&self, results: &ResultMap, kind: CheckpointKind) {
        let Some(checkpoint) = &self.checkpoint else {
            return;
        };

        match checkpoint.save(results) {
            Ok(()) => tracing::debug!("{:?} checkpoint written ({} entries)", kind, results.len()),
            Err(e) => {
                tracing::warn!("{:?} checkpoint failed: {}", kind, e);
                self.reporter
                    .suspend(|| eprintln!("{} Could not save checkpoint: {}", style("⚠").yellow(), e));
            }
        }
    }
}

/// Worker step for one item: stat, validate, map failures to an outcome.
///
/// Returns `None` when the item was abandoned because the pool is stopping.
fn verify_item<V: Validator + ?Sized>(
    validator: &V,
    item: &WorkItem,
    timeout: Duration,
    cancel: &CancelToken,
) -> Option<Outcome> {
    let size = std::fs::metadata(item).map(|meta| meta.len()).unwrap_or(0);

    let result = catch_unwind(AssertUnwindSafe(|| validator.validate(item, timeout, cancel)))
        .unwrap_or_else(|_| Err(ValidatorError::Execution("validator panicked".to_string())));

    match result {
        Ok(verdict) if verdict.valid => Some(Outcome::valid(size)),
        Ok(verdict) => Some(Outcome::invalid(verdict.diagnostic.unwrap_or_default(), size)),
        Err(ValidatorError::Cancelled) => None,
        Err(e) => Some(Outcome::invalid(e.to_string(), size)),
    }
}
