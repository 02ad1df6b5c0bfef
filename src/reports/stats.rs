//! Aggregate figures over a result map

use crate::verify::scanner::course_name;
use crate::verify::{ResultMap, WorkItem};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Failing items of one course: `(path, error message)`
pub type CourseFailures<'a> = Vec<(&'a Path, &'a str)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportStats {
    pub total: usize,
    pub corrupted: usize,
    pub valid: usize,
    pub total_size: u64,
}

impl ReportStats {
    pub fn calculate(results: &ResultMap) -> Self {
        let total = results.len();
        let corrupted = results.values().filter(|outcome| outcome.is_failure()).count();
        let total_size = results.values().map(|outcome| outcome.size).sum();

        Self {
            total,
            corrupted,
            valid: total - corrupted,
            total_size,
        }
    }
}

/// Failures split by likely cause
#[derive(Debug, Default)]
pub struct ErrorCategories<'a> {
    pub dts_warnings: CourseFailures<'a>,
    pub severe_corruption: CourseFailures<'a>,
    pub timeout: CourseFailures<'a>,
}

pub fn is_timeout_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("timed out") || lower.contains("timeout")
}

/// Group failing items by course, courses and files both in path order
pub fn group_corrupted_by_course<'a>(
    results: &'a ResultMap,
    root: &Path,
) -> BTreeMap<String, CourseFailures<'a>> {
    let mut grouped: BTreeMap<String, CourseFailures<'a>> = BTreeMap::new();
    for (path, outcome) in results.iter().filter(|(_, outcome)| outcome.is_failure()) {
        grouped
            .entry(course_name(path, root))
            .or_default()
            .push((path.as_path(), outcome.message()));
    }
    grouped
}

pub fn categorize_errors(results: &ResultMap) -> ErrorCategories<'_> {
    let mut categories = ErrorCategories::default();

    for (path, outcome) in results.iter().filter(|(_, outcome)| outcome.is_failure()) {
        let message = outcome.message();
        let entry = (path.as_path(), message);
        if is_timeout_message(message) {
            categories.timeout.push(entry);
        } else if message.to_lowercase().contains("non monotonically increasing dts") {
            categories.dts_warnings.push(entry);
        } else {
            categories.severe_corruption.push(entry);
        }
    }

    categories
}

/// Items that failed for a reason other than the time limit
pub fn non_timeout_failures(results: &ResultMap) -> Vec<WorkItem> {
    results
        .iter()
        .filter(|(_, outcome)| {
            outcome.is_failure() && !outcome.message().is_empty() && !is_timeout_message(outcome.message())
        })
        .map(|(path, _)| path.clone())
        .collect()
}

/// Path relative to `root`, or the path itself when it lies elsewhere
pub fn relative_path(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
