//! Data models for vendor-purge.
//!
//! - [`Artifact`]: one discovered system object, tagged with its [`ArtifactKind`]
//! - [`VendorProfile`]: match terms and candidate locations for one vendor
//! - [`Settings`]: runtime knobs (affirmative answers, command timeout, logging)
//! - [`CleanupReport`]: the finalized per-category result of a run
//!
//! Models carry no behaviour beyond small accessors; the pipeline lives in
//! [`crate::services`].

pub mod artifact;
pub mod config;
pub mod report;

pub use artifact::{Artifact, ArtifactKind};
pub use config::{MatchTerms, Settings, VendorProfile};
pub use report::{CleanupReport, RunStatus};
