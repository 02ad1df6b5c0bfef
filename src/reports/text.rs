use super::stats::{ReportStats, categorize_errors, format_file_size, group_corrupted_by_course, relative_path};
use super::{ReportGenerator, ReportMetadata};
use crate::verify::ResultMap;
use anyhow::Result;
use std::fmt::Write;

const RULE_WIDTH: usize = 80;

/// Plain-text report, grouped by course
#[derive(Debug, Default)]
pub struct TextReportGenerator;

impl ReportGenerator for TextReportGenerator {
    fn generate(&self, results: &ResultMap, metadata: &ReportMetadata) -> Result<String> {
        let root = metadata.root_directory.as_path();
        let stats = ReportStats::calculate(results);
        let by_course = group_corrupted_by_course(results, root);
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);

        let mut out = String::new();
        writeln!(out, "{heavy}")?;
        writeln!(out, "VIDEO INTEGRITY VERIFICATION REPORT")?;
        writeln!(out, "{heavy}")?;
        writeln!(out, "Generated: {}", metadata.generated_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(out, "Root Directory: {}", root.display())?;
        writeln!(out, "Total Files Scanned: {}", stats.total)?;
        writeln!(out, "Corrupted Files: {}", stats.corrupted)?;
        writeln!(out, "Valid Files: {}", stats.valid)?;
        writeln!(out, "Total Size: {}", format_file_size(stats.total_size))?;
        writeln!(out, "{heavy}")?;
        writeln!(out)?;

        if stats.corrupted == 0 {
            writeln!(out, "✓ All video files passed integrity verification!")?;
            writeln!(out)?;
        } else {
            writeln!(
                out,
                "✗ Found {} corrupted file(s) in {} course(s)",
                stats.corrupted,
                by_course.len()
            )?;
            writeln!(out)?;

            let categories = categorize_errors(results);
            writeln!(out, "Error categories:")?;
            writeln!(out, "  Severe corruption: {}", categories.severe_corruption.len())?;
            writeln!(out, "  DTS warnings: {}", categories.dts_warnings.len())?;
            writeln!(out, "  Timeouts: {}", categories.timeout.len())?;
            writeln!(out)?;
        }

        for (course, files) in &by_course {
            writeln!(out, "{light}")?;
            writeln!(out, "COURSE: {course}")?;
            writeln!(out, "Corrupted files: {}", files.len())?;
            writeln!(out, "{light}")?;
            for (path, error) in files {
                writeln!(out)?;
                writeln!(out, "  File: {}", relative_path(path, root).display())?;
                writeln!(out, "  Error: {error}")?;
            }
            writeln!(out)?;
        }

        out.push_str(&heavy);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::Outcome;

    #[test]
    fn test_all_passed_report() {
        let mut results = ResultMap::new();
        results.insert("/lib/Course/a.mp4".into(), Outcome::valid(2048));

        let report = TextReportGenerator
            .generate(&results, &ReportMetadata::new("/lib"))
            .unwrap();

        assert!(report.contains("VIDEO INTEGRITY VERIFICATION REPORT"));
        assert!(report.contains("Root Directory: /lib"));
        assert!(report.contains("Total Files Scanned: 1"));
        assert!(report.contains("Total Size: 2.0 KB"));
        assert!(report.contains("All video files passed"));
        assert!(!report.contains("COURSE:"));
    }

    #[test]
    fn test_failures_grouped_by_course() {
        let mut results = ResultMap::new();
        results.insert("/lib/Course A/1.mp4".into(), Outcome::invalid("moov atom not found", 1));
        results.insert("/lib/Course A/2.mp4".into(), Outcome::valid(1));
        results.insert(
            "/lib/Course B/1.mp4".into(),
            Outcome::invalid("Verification timed out (>300s)", 1),
        );

        let report = TextReportGenerator
            .generate(&results, &ReportMetadata::new("/lib"))
            .unwrap();

        assert!(report.contains("Found 2 corrupted file(s) in 2 course(s)"));
        assert!(report.contains("  Timeouts: 1"));
        assert!(report.contains("COURSE: Course A"));
        assert!(report.contains("  File: Course A/1.mp4\n  Error: moov atom not found"));
        assert!(!report.contains("Course A/2.mp4"));
        assert!(report.find("COURSE: Course A") < report.find("COURSE: Course B"));
    }
}
