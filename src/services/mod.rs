//! Services module - the cleanup pipeline.
//!
//! The pipeline is framework-agnostic: it talks to the OS only through the
//! [`crate::platform`] facades and to the user only through a
//! [`ConfirmationGate`] and an [`EngineObserver`].
//!
//! # Components
//!
//! - [`MatchRule`]: vendor identification (case-insensitive substrings and regexes)
//! - [`ArtifactSource`]: discovery adapters, one per artifact kind
//! - [`Remover`]: deletion strategies, one per artifact kind, collected in a [`RemoverSet`]
//! - [`ConfirmationGate`]: the per-section yes/no decision
//! - [`ReportAggregator`]: per-category deleted/failed/skipped bookkeeping
//! - [`CleanupEngine`]: runs [`Section`]s through discover, confirm, remove and record
//!
//! # Usage Example
//!
//! ```ignore
//! use vendor_purge::services::{CleanupEngine, NoopObserver, PolicyGate};
//!
//! let engine = CleanupEngine::for_profile(&profile, &platform, &paths)?;
//! let run = engine.run(&mut PolicyGate::accept_all(), &mut NoopObserver).await;
//! println!("{}", run.report.summary_line());
//! ```

pub mod engine;
pub mod gate;
pub mod matching;
pub mod removers;
pub mod report;
pub mod sources;

pub use engine::{
    CleanupEngine, CleanupRun, EngineObserver, FailedArtifact, NoopObserver, RunOutcome,
    Section, SectionRecord, SectionState,
};
pub use gate::{AffirmativeTokens, ConfirmationGate, DecisionPolicy, PolicyGate};
pub use matching::MatchRule;
pub use removers::{RemovalError, Remover, RemoverSet};
pub use report::{Outcome, ReportAggregator};
pub use sources::{ArtifactSource, SourceError, collapse_nested_keys};
