// vendor-purge - remove every trace of a vendor's software suite
//
// This is the library crate containing the cleanup pipeline, the OS facades
// and the data structures. The binary crate (main.rs) provides the CLI.

pub mod config;
pub mod logging;
pub mod models;
pub mod platform;
pub mod services;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{Artifact, ArtifactKind, CleanupReport, RunStatus, Settings, VendorProfile};
pub use services::{CleanupEngine, CleanupRun, ConfirmationGate, EngineObserver};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
