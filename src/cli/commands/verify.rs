//! `vidguard verify`: scan, verify in parallel, report

use crate::EXIT_INTERRUPTED;
use crate::cli::Output;
use crate::config::{CliOverrides, RunnerOverrides, Settings, ValidatorOverrides, VidguardConfig};
use crate::parallel::ProgressReporter;
use crate::reports::{
    JsonReportGenerator, ReportGenerator, ReportMetadata, TextReportGenerator, load_corrupted_files,
    non_timeout_failures, reverify_root, save_report,
};
use crate::verify::scanner::find_video_files;
use crate::verify::{
    CheckpointSink, FfmpegValidator, InterruptController, JsonCheckpointStore, ResultMap, Runner,
    RunnerConfig, Validator, WorkItem, failure_count, pending_items,
};
use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Library root to scan recursively
    pub directory: Option<PathBuf>,

    /// Save the text report to FILE
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Save a JSON report of the failing files to FILE
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Number of parallel jobs (0 = one per CPU)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Checkpoint file path
    #[arg(short, long, value_name = "FILE")]
    pub checkpoint: Option<PathBuf>,

    /// Skip files already recorded in the checkpoint
    #[arg(long)]
    pub resume: bool,

    /// Per-file verification limit in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Re-verify the failing files listed in a JSON report instead of scanning
    #[arg(long, value_name = "FILE", conflicts_with = "directory")]
    pub reverify: Option<PathBuf>,
}

impl VerifyArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            runner: RunnerOverrides {
                jobs: self.jobs,
                checkpoint: self.checkpoint.clone(),
            },
            validator: ValidatorOverrides {
                timeout_secs: self.timeout,
            },
        }
    }
}

/// Files selected for this run, the report root and any results carried over
struct Plan {
    items: Vec<WorkItem>,
    root: PathBuf,
    prior: ResultMap,
}

pub async fn execute(args: VerifyArgs, custom_config: Option<&str>, output: &Output) -> Result<ExitCode> {
    let settings = VidguardConfig::load_with_overrides(custom_config, &args.overrides())?.settings()?;

    let validator = FfmpegValidator::new(settings.validator.ffmpeg.clone());
    if let Err(e) = validator.ensure_available() {
        tracing::debug!("ffmpeg check failed: {}", e);
        output.error("ffmpeg is not installed or not in PATH");
        output.indent("Please install ffmpeg: https://ffmpeg.org/download.html");
        return Ok(ExitCode::FAILURE);
    }

    let store = settings.runner.checkpoint.clone().map(|path| Arc::new(JsonCheckpointStore::new(path)));

    let Some(plan) = plan_run(&args, &settings, store.as_deref(), output)? else {
        return Ok(ExitCode::SUCCESS);
    };

    if plan.items.is_empty() {
        output.info("No files to verify.");
        return Ok(ExitCode::SUCCESS);
    }

    let config = RunnerConfig {
        workers: settings.worker_count(),
        timeout: settings.timeout(),
        checkpoint_interval: settings.runner.checkpoint_interval,
    };
    output.info(&format!(
        "Using {} parallel worker(s)",
        config.workers.clamp(1, plan.items.len())
    ));
    output.info(&format!("Verification timeout: {} seconds", settings.validator.timeout_secs));
    if let Some(store) = &store {
        output.verbose(&format!("Checkpointing to {}", store.path().display()));
    }
    output.step("Starting parallel verification...");
    output.blank_line();

    let sink = store
        .clone()
        .map(|store| store as Arc<dyn CheckpointSink>);
    let controller = InterruptController::new(sink.clone());
    let _exit_guard = controller.arm()?;

    let reporter = if output.is_quiet() {
        ProgressReporter::hidden()
    } else {
        ProgressReporter::stdout(plan.items.len())
    };

    let mut runner = Runner::new(validator, config, Arc::clone(&controller))
        .with_reporter(reporter)
        .with_prior(plan.prior);
    if let Some(sink) = sink {
        runner = runner.with_checkpoint(sink);
    }

    let items = plan.items;
    let results = tokio::task::spawn_blocking(move || runner.run(items))
        .await
        .context("Verification task failed")??;

    // The signal handler owns the exit; reports are only written for complete runs
    if controller.is_interrupted() {
        controller.wait_for_teardown();
        return Ok(ExitCode::from(EXIT_INTERRUPTED as u8));
    }

    write_reports(&results, &plan.root, &args, output)?;

    let failures = failure_count(&results);
    if failures == 0 {
        return Ok(ExitCode::SUCCESS);
    }

    let timeouts = failures - non_timeout_failures(&results).len();
    if timeouts > 0 {
        output.warning(&format!(
            "{} of {} failure(s) timed out; a larger --timeout may let them pass",
            timeouts, failures
        ));
    }
    Ok(ExitCode::FAILURE)
}

/// Decide what to verify. `None` means there is nothing to do.
fn plan_run(
    args: &VerifyArgs,
    settings: &Settings,
    store: Option<&JsonCheckpointStore>,
    output: &Output,
) -> Result<Option<Plan>> {
    if let Some(report) = &args.reverify {
        output.info(&format!("Loading files from JSON report: {}", report.display()));
        let items = load_corrupted_files(report)?;
        output.info(&format!("Loaded {} file(s) to re-verify", items.len()));

        let root = reverify_root(&items).unwrap_or_else(|| PathBuf::from("."));
        return Ok(Some(Plan {
            items,
            root,
            prior: ResultMap::new(),
        }));
    }

    let Some(directory) = args.directory.clone() else {
        anyhow::bail!("directory argument is required when not using --reverify");
    };
    validate_directory(&directory)?;

    output.info(&format!("Scanning for video files in: {}", directory.display()));
    let items = find_video_files(&directory, &settings.scanner.extensions)?;
    if items.is_empty() {
        output.info("No video files found in the specified directory");
        return Ok(None);
    }
    output.info(&format!("Found {} video file(s)", items.len()));

    let mut prior = ResultMap::new();
    let items = match (args.resume, store) {
        (true, Some(store)) => {
            prior = store.load()?;
            if prior.is_empty() {
                items
            } else {
                output.info(&format!(
                    "Resumed from checkpoint: {} files already verified",
                    prior.len()
                ));
                let remaining = pending_items(items, &prior);
                output.info(&format!("Remaining files to verify: {}", remaining.len()));
                remaining
            }
        }
        (true, None) => {
            output.warning("--resume has no effect without a checkpoint file (-c)");
            items
        }
        (false, _) => items,
    };

    Ok(Some(Plan {
        items,
        root: directory,
        prior,
    }))
}

fn validate_directory(directory: &Path) -> Result<()> {
    if !directory.exists() {
        anyhow::bail!("Directory '{}' does not exist", directory.display());
    }
    if !directory.is_dir() {
        anyhow::bail!("'{}' is not a directory", directory.display());
    }
    Ok(())
}

fn write_reports(results: &ResultMap, root: &Path, args: &VerifyArgs, output: &Output) -> Result<()> {
    let metadata = ReportMetadata::new(root);

    let text = TextReportGenerator.generate(results, &metadata)?;
    println!("{}", text);

    if let Some(path) = &args.output {
        save_report(path, &text)?;
        output.success(&format!("Report saved to: {}", path.display()));
    }

    if let Some(path) = &args.json {
        let json = JsonReportGenerator.generate(results, &metadata)?;
        save_report(path, &json)?;
        output.success(&format!("JSON report saved to: {}", path.display()));
    }

    Ok(())
}
