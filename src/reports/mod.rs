//! Verification reports
//!
//! Renders a result map as a human-readable text report or a JSON document

use crate::verify::ResultMap;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

/// Core reporting trait - allows pluggable report formats
pub trait ReportGenerator {
    /// Generate report content as a string
    fn generate(&self, results: &ResultMap, metadata: &ReportMetadata) -> Result<String>;
}

// Public re-exports
pub use json::{JsonFileEntry, JsonMetadata, JsonReport, JsonReportGenerator, load_corrupted_files, reverify_root};
pub use stats::{ErrorCategories, ReportStats, categorize_errors, group_corrupted_by_course, non_timeout_failures};
pub use text::TextReportGenerator;

// Module declarations
mod json;
pub mod stats;
mod text;

/// Metadata about the report generation
#[derive(Debug, Clone)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Local>,
    pub root_directory: PathBuf,
}

impl ReportMetadata {
    pub fn new(root_directory: impl Into<PathBuf>) -> Self {
        Self {
            generated_at: Local::now(),
            root_directory: root_directory.into(),
        }
    }
}

/// Write generated report content to `path`, creating parent directories
pub fn save_report(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write report {}", path.display()))
}
