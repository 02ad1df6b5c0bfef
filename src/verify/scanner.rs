use super::types::WorkItem;
use anyhow::{Context, Result};
use std::path::Path;
use walkdir::WalkDir;

pub const ROOT_COURSE: &str = "Root Directory";
pub const UNKNOWN_COURSE: &str = "Unknown";

/// Recursively find files under `root` whose extension is in `extensions` (case-insensitive)
pub fn find_video_files(root: &Path, extensions: &[String]) -> Result<Vec<WorkItem>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Unreadable subtrees are skipped, an unreadable root is fatal
                if e.depth() == 0 {
                    return Err(e).with_context(|| format!("Failed to scan {}", root.display()));
                }
                tracing::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    tracing::debug!("Found {} candidate file(s) under {}", files.len(), root.display());
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
}

/// The course a file belongs to: the first directory below `root`
pub fn course_name(path: &Path, root: &Path) -> String {
    let Ok(relative) = path.strip_prefix(root) else {
        return UNKNOWN_COURSE.to_string();
    };

    let mut components = relative.components();
    match (components.next(), components.next()) {
        (Some(first), Some(_)) => first.as_os_str().to_string_lossy().into_owned(),
        _ => ROOT_COURSE.to_string(),
    }
}
