//! The scan / confirm / act / report pipeline.
//!
//! A run walks its sections in a fixed order. Each section moves through
//!
//! ```text
//! Pending -> Discovered -> Skipped   -> Completed
//!                       \-> Confirmed -> Completed
//! ```
//!
//! - Discovery runs every source of the section and de-duplicates the
//!   result. An empty result completes the section without asking.
//! - The gate sees the full list. A decline records the section as skipped
//!   and touches nothing.
//! - On confirm, the list captured at discovery is handed to the removers
//!   unchanged, one artifact at a time, and every artifact is attempted
//!   whatever happened to the ones before it.
//!
//! Sections never influence each other. The only early exit of a run is
//! the elevation check, which happens before the engine is started.

use super::gate::ConfirmationGate;
use super::matching::MatchRule;
use super::removers::RemoverSet;
use super::report::{Outcome, ReportAggregator};
use super::sources::{
    ArtifactSource, DirectorySource, RegistryKeySource, ScheduledTaskSource, ServiceSource,
    StartupFileSource, StartupValueSource, TempEntrySource,
};
use crate::models::{Artifact, CleanupReport, VendorProfile};
use crate::platform::{PathResolver, Platform};
use indexmap::IndexSet;
use serde::Serialize;

pub const SECTION_DIRECTORIES: &str = "Installation directories";
pub const SECTION_REGISTRY: &str = "Registry keys";
pub const SECTION_TEMP: &str = "Temporary files";
pub const SECTION_BACKGROUND: &str = "Services, scheduled tasks and startup entries";

/// Where a section is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SectionState {
    Pending,
    Discovered,
    Skipped,
    Confirmed,
    Completed,
}

/// A named pipeline stage: the sources whose findings are confirmed together.
pub struct Section {
    name: String,
    sources: Vec<Box<dyn ArtifactSource>>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: impl ArtifactSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An artifact whose removal failed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedArtifact {
    pub artifact: Artifact,
    pub error: String,
}

/// What happened in one section.
#[derive(Debug, Clone)]
pub struct SectionRecord {
    pub name: String,
    pub state: SectionState,
    pub discovered: Vec<Artifact>,
    pub confirmed: bool,
    pub skipped: bool,
    pub deleted: Vec<Artifact>,
    pub failed: Vec<FailedArtifact>,
}

impl SectionRecord {
    fn pending(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: SectionState::Pending,
            discovered: Vec::new(),
            confirmed: false,
            skipped: false,
            deleted: Vec::new(),
            failed: Vec::new(),
        }
    }

    fn transition(&mut self, next: SectionState) {
        tracing::debug!("Section '{}': {:?} -> {:?}", self.name, self.state, next);
        self.state = next;
    }
}

/// Hooks for presenting progress. All methods default to doing nothing.
pub trait EngineObserver {
    fn section_started(&mut self, _section: &str) {}
    fn nothing_found(&mut self, _section: &str) {}
    fn section_skipped(&mut self, _section: &str, _items: usize) {}
    fn artifact_processed(&mut self, _artifact: &Artifact, _outcome: &Outcome) {}
    fn section_completed(&mut self, _record: &SectionRecord) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl EngineObserver for NoopObserver {}

/// Everything a run produced.
#[derive(Debug)]
pub struct CleanupRun {
    pub sections: Vec<SectionRecord>,
    pub report: CleanupReport,
}

/// Result of a run that was subject to the elevation check.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every section ran.
    Completed(CleanupRun),
    /// The process lacked administrator rights; no section ran.
    NotElevated,
}

impl RunOutcome {
    /// Process exit code: 0 for a completed run, whatever its status.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Completed(_) => 0,
            RunOutcome::NotElevated => 1,
        }
    }
}

/// Drives sections through discovery, confirmation and removal.
pub struct CleanupEngine {
    sections: Vec<Section>,
    removers: RemoverSet,
}

impl CleanupEngine {
    pub fn new(removers: RemoverSet) -> Self {
        Self {
            sections: Vec::new(),
            removers,
        }
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Standard four-section pipeline for a vendor profile.
    ///
    /// Order: directories, registry keys, temp entries, then services,
    /// scheduled tasks and startup entries confirmed together.
    pub fn for_profile(
        profile: &VendorProfile,
        platform: &Platform,
        paths: &PathResolver,
    ) -> Result<Self, regex::Error> {
        let rule = MatchRule::from_terms(&profile.match_terms)?;
        if rule.is_empty() {
            tracing::warn!(
                "Profile '{}' has no match terms; only fixed directories will be found",
                profile.name
            );
        }

        let directories = Section::new(SECTION_DIRECTORIES)
            .with_source(DirectorySource::new(paths.resolve_all(&profile.directories)));

        let registry = Section::new(SECTION_REGISTRY).with_source(RegistryKeySource::new(
            platform.registry.clone(),
            profile.registry_roots.clone(),
            rule.clone(),
        ));

        let temp = Section::new(SECTION_TEMP)
            .with_source(TempEntrySource::new(paths.temp_dir().clone(), rule.clone()));

        let background = Section::new(SECTION_BACKGROUND)
            .with_source(ServiceSource::new(platform.services.clone(), rule.clone()))
            .with_source(ScheduledTaskSource::new(platform.tasks.clone(), rule.clone()))
            .with_source(StartupValueSource::new(
                platform.registry.clone(),
                profile.run_keys.clone(),
                rule.clone(),
            ))
            .with_source(StartupFileSource::new(
                paths.resolve_all(&profile.startup_folders),
                rule,
            ));

        Ok(Self::new(RemoverSet::new(platform))
            .with_section(directories)
            .with_section(registry)
            .with_section(temp)
            .with_section(background))
    }

    /// Run every section, but only when `elevated`.
    ///
    /// Without elevation nothing is discovered and the gate is never asked.
    pub async fn run_if_elevated(
        &self,
        elevated: bool,
        gate: &mut dyn ConfirmationGate,
        observer: &mut dyn EngineObserver,
    ) -> RunOutcome {
        if !elevated {
            tracing::error!("Not running elevated, aborting before any section");
            return RunOutcome::NotElevated;
        }
        RunOutcome::Completed(self.run(gate, observer).await)
    }

    /// Run every section in order and build the report.
    pub async fn run(
        &self,
        gate: &mut dyn ConfirmationGate,
        observer: &mut dyn EngineObserver,
    ) -> CleanupRun {
        let mut aggregator = ReportAggregator::new();
        let mut records = Vec::with_capacity(self.sections.len());

        for section in &self.sections {
            let record = self
                .run_section(section, gate, observer, &mut aggregator)
                .await;
            observer.section_completed(&record);
            records.push(record);
        }

        let report = aggregator.finalize();
        tracing::info!("{}", report.summary_line());

        CleanupRun {
            sections: records,
            report,
        }
    }

    /// Run every source of `section`, dropping duplicate artifacts.
    ///
    /// A failing source is logged and contributes nothing; its siblings
    /// still run.
    async fn discover(&self, section: &Section) -> Vec<Artifact> {
        let mut seen = IndexSet::new();
        let mut found = Vec::new();

        for source in &section.sources {
            match source.discover().await {
                Ok(artifacts) => {
                    tracing::debug!("{}: {} candidate(s)", source.name(), artifacts.len());
                    for artifact in artifacts {
                        if seen.insert(artifact.identity()) {
                            found.push(artifact);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Discovery of {} failed: {}", source.name(), e);
                }
            }
        }

        found
    }

    async fn run_section(
        &self,
        section: &Section,
        gate: &mut dyn ConfirmationGate,
        observer: &mut dyn EngineObserver,
        aggregator: &mut ReportAggregator,
    ) -> SectionRecord {
        let mut record = SectionRecord::pending(section.name());
        observer.section_started(section.name());

        record.discovered = self.discover(section).await;
        record.transition(SectionState::Discovered);
        tracing::info!(
            "Section '{}': {} artifact(s) found",
            section.name(),
            record.discovered.len()
        );

        if record.discovered.is_empty() {
            observer.nothing_found(section.name());
            record.transition(SectionState::Completed);
            return record;
        }

        if !gate.confirm(section.name(), &record.discovered) {
            tracing::info!("Section '{}' declined", section.name());
            record.skipped = true;
            record.transition(SectionState::Skipped);
            aggregator.skip_section(section.name());
            observer.section_skipped(section.name(), record.discovered.len());
            record.transition(SectionState::Completed);
            return record;
        }

        record.confirmed = true;
        record.transition(SectionState::Confirmed);

        for artifact in &record.discovered {
            let remover = self.removers.for_kind(artifact.kind);
            let outcome = match remover.remove(artifact).await {
                Ok(()) => {
                    tracing::info!("Deleted {} {}", artifact.kind, artifact.identifier);
                    Outcome::Deleted
                }
                Err(e) if e.is_not_found() => {
                    tracing::debug!("{} {} already gone", artifact.kind, artifact.identifier);
                    Outcome::Deleted
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to delete {} {}: {}",
                        artifact.kind,
                        artifact.identifier,
                        e
                    );
                    Outcome::Failed(e.to_string())
                }
            };

            aggregator.record(artifact.category(), artifact, &outcome);
            observer.artifact_processed(artifact, &outcome);
            match outcome {
                Outcome::Deleted => record.deleted.push(artifact.clone()),
                Outcome::Failed(error) => record.failed.push(FailedArtifact {
                    artifact: artifact.clone(),
                    error,
                }),
            }
        }

        record.transition(SectionState::Completed);
        record
    }
}
