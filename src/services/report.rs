use crate::models::{Artifact, CleanupReport, RunStatus};
use indexmap::{IndexMap, IndexSet};

/// Result of handing one artifact to its remover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Deleted,
    Failed(String),
}

/// Accumulates per-category results for one run.
///
/// Categories appear in the order they were first recorded; items keep the
/// order they were processed in.
#[derive(Debug, Default)]
pub struct ReportAggregator {
    deleted: IndexMap<String, Vec<String>>,
    failed: IndexMap<String, Vec<String>>,
    skipped: IndexSet<String>,
}

impl ReportAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, category: &str, artifact: &Artifact, outcome: &Outcome) {
        let target = match outcome {
            Outcome::Deleted => &mut self.deleted,
            Outcome::Failed(_) => &mut self.failed,
        };
        target
            .entry(category.to_string())
            .or_default()
            .push(artifact.describe());
    }

    pub fn skip_section(&mut self, section: &str) {
        self.skipped.insert(section.to_string());
    }

    pub fn finalize(self) -> CleanupReport {
        let attempted: usize = self
            .deleted
            .values()
            .chain(self.failed.values())
            .map(Vec::len)
            .sum();

        let status = if attempted == 0 {
            RunStatus::NothingEligible
        } else if self.failed.values().all(Vec::is_empty) {
            RunStatus::AllSucceeded
        } else {
            RunStatus::PartialFailure
        };

        CleanupReport {
            status,
            skipped_sections: self.skipped,
            deleted_by_category: self.deleted,
            failed_by_category: self.failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArtifactKind;

    fn dir(path: &str) -> Artifact {
        Artifact::new(ArtifactKind::Directory, path)
    }

    #[test]
    fn test_empty_run_is_nothing_eligible() {
        let mut aggregator = ReportAggregator::new();
        aggregator.skip_section("Registry keys");
        let report = aggregator.finalize();

        assert_eq!(report.status, RunStatus::NothingEligible);
        assert!(report.skipped_sections.contains("Registry keys"));
        assert_eq!(report.summary_line(), "Nothing was eligible for removal");
    }

    #[test]
    fn test_all_succeeded() {
        let mut aggregator = ReportAggregator::new();
        aggregator.record("Directories", &dir("/opt/A"), &Outcome::Deleted);
        aggregator.record("Directories", &dir("/opt/B"), &Outcome::Deleted);
        let report = aggregator.finalize();

        assert_eq!(report.status, RunStatus::AllSucceeded);
        assert_eq!(report.deleted_by_category["Directories"], vec!["/opt/A", "/opt/B"]);
        assert!(report.failed_by_category.is_empty());
        assert!(report.summary_line().contains("all 2 item(s)"));
    }

    #[test]
    fn test_partial_failure_keeps_processing_order() {
        let mut aggregator = ReportAggregator::new();
        let first = Artifact::new(ArtifactKind::Service, "SvcA");
        let second = Artifact::new(ArtifactKind::Service, "SvcB");
        aggregator.record("Services", &first, &Outcome::Deleted);
        aggregator.record("Services", &second, &Outcome::Failed("Access denied".into()));
        let report = aggregator.finalize();

        assert_eq!(report.status, RunStatus::PartialFailure);
        assert_eq!(report.deleted_by_category["Services"], vec!["SvcA"]);
        assert_eq!(report.failed_by_category["Services"], vec!["SvcB"]);
        assert!(report.summary_line().contains("partially"));
    }
}
