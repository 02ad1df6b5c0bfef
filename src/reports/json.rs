use super::stats::{ReportStats, relative_path};
use super::{ReportGenerator, ReportMetadata};
use crate::verify::ResultMap;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Machine-readable report document; `files` lists failures only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    pub metadata: JsonMetadata,
    pub files: Vec<JsonFileEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonMetadata {
    pub generated: String,
    pub root_directory: PathBuf,
    pub total_files: usize,
    pub corrupted_files: usize,
    pub valid_files: usize,
    pub total_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonFileEntry {
    pub path: PathBuf,
    pub relative_path: PathBuf,
    pub size: u64,
    pub is_valid: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct JsonReportGenerator;

impl JsonReportGenerator {
    pub fn build(&self, results: &ResultMap, metadata: &ReportMetadata) -> JsonReport {
        let root = metadata.root_directory.as_path();
        let stats = ReportStats::calculate(results);

        // ResultMap iterates in path order, so files come out sorted
        let files = results
            .iter()
            .filter(|(_, outcome)| outcome.is_failure())
            .map(|(path, outcome)| JsonFileEntry {
                path: path.clone(),
                relative_path: relative_path(path, root),
                size: outcome.size,
                is_valid: outcome.valid,
                error: outcome.message.clone(),
            })
            .collect();

        JsonReport {
            metadata: JsonMetadata {
                generated: metadata.generated_at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
                root_directory: root.to_path_buf(),
                total_files: stats.total,
                corrupted_files: stats.corrupted,
                valid_files: stats.valid,
                total_size: stats.total_size,
            },
            files,
        }
    }
}

impl ReportGenerator for JsonReportGenerator {
    fn generate(&self, results: &ResultMap, metadata: &ReportMetadata) -> Result<String> {
        serde_json::to_string_pretty(&self.build(results, metadata))
            .context("Failed to serialize JSON report")
    }
}

/// Failing paths listed in a previously written JSON report
pub fn load_corrupted_files(path: &Path) -> Result<Vec<PathBuf>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON report {}", path.display()))?;
    let report: JsonReport = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON report {}", path.display()))?;

    Ok(report
        .files
        .into_iter()
        .filter(|entry| !entry.is_valid)
        .map(|entry| entry.path)
        .collect())
}

/// Root directory for re-verified files: the grandparent of the first one
pub fn reverify_root(files: &[PathBuf]) -> Option<PathBuf> {
    let first = files.first()?;
    let parent = first.parent()?;
    Some(parent.parent().unwrap_or(parent).to_path_buf())
}
