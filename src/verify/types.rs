use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One unit of work: the path of a video file to verify
pub type WorkItem = PathBuf;

/// Verification results keyed by item.
///
/// Keys are unique; iteration order is path order and carries no meaning
/// about when an item completed.
pub type ResultMap = BTreeMap<WorkItem, Outcome>;

/// Result of verifying a single item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub valid: bool,
    /// Diagnostic text; only ever present when `valid` is false
    pub message: Option<String>,
    /// Size in bytes captured before the check (0 when unknown)
    pub size: u64,
}

impl Outcome {
    pub fn valid(size: u64) -> Self {
        Self {
            valid: true,
            message: None,
            size,
        }
    }

    pub fn invalid(message: impl Into<String>, size: u64) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
            size,
        }
    }

    /// Build an outcome from raw stored fields, dropping a message attached to a passing record
    pub fn from_parts(valid: bool, message: Option<String>, size: u64) -> Self {
        if valid {
            Self::valid(size)
        } else {
            Self::invalid(message.unwrap_or_default(), size)
        }
    }

    pub fn is_failure(&self) -> bool {
        !self.valid
    }

    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}

/// Count the failing entries of a result map
pub fn failure_count(results: &ResultMap) -> usize {
    results.values().filter(|outcome| outcome.is_failure()).count()
}
