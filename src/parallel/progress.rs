use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

/// Format seconds into a short human-readable duration
pub fn format_time(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{seconds:.0}s")
    } else if seconds < 3600.0 {
        format!("{:.1}m", seconds / 60.0)
    } else {
        format!("{:.1}h", seconds / 3600.0)
    }
}

/// Point-in-time view of a run's progress; derived, never persisted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,
    pub elapsed: Duration,
    /// Completions per second
    pub rate: f64,
    /// Estimated seconds remaining (0 while the rate is unknown)
    pub eta: f64,
    pub percent: f64,
}

impl ProgressSnapshot {
    pub fn status_line(&self) -> String {
        format!(
            "Progress: {}/{} ({:.1}%) | Rate: {:.1} files/s | ETA: {} | Elapsed: {}",
            self.completed,
            self.total,
            self.percent,
            self.rate,
            format_time(self.eta),
            format_time(self.elapsed.as_secs_f64())
        )
    }
}

/// Overall figures for a finished run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionSummary {
    pub total: usize,
    pub elapsed: Duration,
    /// `total / elapsed`, independent of the instantaneous rate
    pub average_rate: f64,
}

/// Counts completions against a fixed total and derives rate and ETA
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    completed: usize,
    started: Instant,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            started: Instant::now(),
        }
    }

    pub fn increment(&mut self) -> usize {
        self.completed += 1;
        self.completed
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot_at(self.elapsed())
    }

    /// Compute the snapshot for a given elapsed time
    pub fn snapshot_at(&self, elapsed: Duration) -> ProgressSnapshot {
        let seconds = elapsed.as_secs_f64();
        let rate = if seconds > 0.0 {
            self.completed as f64 / seconds
        } else {
            0.0
        };
        let remaining = self.total.saturating_sub(self.completed);
        let eta = if rate > 0.0 {
            remaining as f64 / rate
        } else {
            0.0
        };
        let percent = if self.total > 0 {
            self.completed as f64 / self.total as f64 * 100.0
        } else {
            0.0
        };

        ProgressSnapshot {
            completed: self.completed,
            total: self.total,
            elapsed,
            rate,
            eta,
            percent,
        }
    }

    pub fn summary(&self) -> CompletionSummary {
        self.summary_at(self.elapsed())
    }

    pub fn summary_at(&self, elapsed: Duration) -> CompletionSummary {
        let seconds = elapsed.as_secs_f64();
        let average_rate = if seconds > 0.0 {
            self.total as f64 / seconds
        } else {
            0.0
        };

        CompletionSummary {
            total: self.total,
            elapsed,
            average_rate,
        }
    }
}

/// Draws the live status line and the completion summary
pub struct ProgressReporter {
    bar: ProgressBar,
    visible: bool,
}

impl ProgressReporter {
    /// Reporter drawing to stdout, overwriting the previous status line
    pub fn stdout(total: usize) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stdout());
        let style = ProgressStyle::with_template("{bar:30.cyan/blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);

        Self { bar, visible: true }
    }

    /// Reporter that draws nothing (quiet mode and tests)
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            visible: false,
        }
    }

    pub fn render(&self, snapshot: &ProgressSnapshot) {
        self.bar.set_length(snapshot.total as u64);
        self.bar.set_position(snapshot.completed as u64);
        self.bar.set_message(snapshot.status_line());
    }

    pub fn finish(&self, summary: &CompletionSummary) {
        self.bar.finish_and_clear();
        if self.visible {
            println!(
                "\nVerification complete in {}!",
                format_time(summary.elapsed.as_secs_f64())
            );
            println!("Average rate: {:.1} files/second\n", summary.average_rate);
        }
    }

    /// Run `f` with the status line hidden so its output lands on a clean line
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    /// Remove the status line without printing a summary
    pub fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}
