use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Overall outcome of a run, derived from what was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Every attempted removal succeeded.
    AllSucceeded,
    /// At least one removal failed.
    PartialFailure,
    /// No removal was attempted (nothing found, or every section declined).
    NothingEligible,
}

/// Final, read-only summary of a cleanup run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub status: RunStatus,
    pub skipped_sections: IndexSet<String>,
    pub deleted_by_category: IndexMap<String, Vec<String>>,
    pub failed_by_category: IndexMap<String, Vec<String>>,
}

impl CleanupReport {
    pub fn deleted_count(&self) -> usize {
        self.deleted_by_category.values().map(Vec::len).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.failed_by_category.values().map(Vec::len).sum()
    }

    /// One line describing the run outcome; each status has its own wording.
    pub fn summary_line(&self) -> String {
        match self.status {
            RunStatus::AllSucceeded => {
                format!("Cleanup complete: all {} item(s) removed", self.deleted_count())
            }
            RunStatus::PartialFailure => format!(
                "Cleanup partially complete: {} item(s) removed, {} item(s) could not be removed",
                self.deleted_count(),
                self.failed_count()
            ),
            RunStatus::NothingEligible => "Nothing was eligible for removal".to_string(),
        }
    }
}
