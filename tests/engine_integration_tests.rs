//! Integration tests for CleanupEngine
//!
//! These tests drive the full four-section pipeline against a temporary
//! directory tree and the in-memory OS facades:
//! - End-to-end removal and reporting
//! - Per-item failure isolation
//! - Decline semantics
//! - Registry key collapsing and startup value matching
//! - Idempotence of a second run
//! - Removal limited to what was shown at confirmation
//! - Nothing runs without elevation

use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;
use vendor_purge::models::RunStatus;
use vendor_purge::platform::PathResolver;
use vendor_purge::platform::memory::MemoryPlatform;
use vendor_purge::services::engine::{
    SECTION_BACKGROUND, SECTION_DIRECTORIES, SECTION_REGISTRY, SECTION_TEMP,
};
use vendor_purge::services::{
    DecisionPolicy, EngineObserver, NoopObserver, PolicyGate, RunOutcome, SectionState,
};
use vendor_purge::{Artifact, CleanupEngine, ConfigManager, ConfirmationGate, VendorProfile};

const PROFILE: &str = r#"
name: VendorX
description: Test vendor
match:
  substrings: [VendorX]
  patterns: ['^VX\d+$']
directories:
  - '${ROOT}/opt/VendorX'
  - '${ROOT}/opt/VendorX-missing'
  - '${NOT_SET_ANYWHERE}/VendorX'
registry_roots:
  - 'HKLM\SOFTWARE'
  - 'HKCU\SOFTWARE'
run_keys:
  - 'HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Run'
startup_folders:
  - '${ROOT}/autostart'
"#;

const RUN_KEY: &str = r"HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Run";

struct Fixture {
    _temp_dir: TempDir,
    root: Utf8PathBuf,
    memory: MemoryPlatform,
    paths: PathResolver,
    profile: VendorProfile,
}

impl Fixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("tmp")).unwrap();
        fs::create_dir_all(root.join("autostart")).unwrap();

        let paths = PathResolver::with_vars(
            [("ROOT", root.as_str())],
            None,
            root.join("tmp").as_str(),
        );
        let profile = ConfigManager::parse_profile(PROFILE, "test").unwrap();

        let memory = MemoryPlatform::new();
        memory.registry.add_key(r"HKLM\SOFTWARE\Microsoft");
        memory.registry.add_value(RUN_KEY, "OneDrive", r"C:\OneDrive\OneDrive.exe");

        Self {
            _temp_dir: temp_dir,
            root,
            memory,
            paths,
            profile,
        }
    }

    fn engine(&self) -> CleanupEngine {
        CleanupEngine::for_profile(&self.profile, &self.memory.platform(), &self.paths).unwrap()
    }
}

#[tokio::test]
async fn test_end_to_end_directory_removal() {
    let fixture = Fixture::new();
    let install_dir = fixture.root.join("opt").join("VendorX");
    fs::create_dir_all(install_dir.join("bin")).unwrap();
    fs::write(install_dir.join("bin").join("app.exe"), b"binary").unwrap();

    let run = fixture
        .engine()
        .run(&mut PolicyGate::accept_all(), &mut NoopObserver)
        .await;

    assert!(!install_dir.exists());
    assert_eq!(
        run.report.deleted_by_category["Directories"],
        vec![install_dir.to_string()]
    );
    assert!(!run.report.failed_by_category.contains_key("Directories"));
    assert_eq!(run.report.status, RunStatus::AllSucceeded);
    assert!(run.sections.iter().all(|s| s.state == SectionState::Completed));
}

#[tokio::test]
async fn test_nothing_found_means_nothing_eligible() {
    let fixture = Fixture::new();
    let mut gate = PolicyGate::accept_all();

    let run = fixture.engine().run(&mut gate, &mut NoopObserver).await;

    assert!(gate.prompts().is_empty());
    assert_eq!(run.report.status, RunStatus::NothingEligible);
    assert_eq!(run.report.summary_line(), "Nothing was eligible for removal");
}

#[tokio::test]
async fn test_partial_failure_is_isolated() {
    let fixture = Fixture::new();
    fixture.memory.services.add("VendorXUpdate", "VendorX Update Service");
    fixture.memory.services.add("VendorXHelper", "VendorX Helper");
    fixture.memory.services.fail_delete("VendorXHelper");

    let run = fixture
        .engine()
        .run(&mut PolicyGate::accept_all(), &mut NoopObserver)
        .await;

    assert_eq!(run.report.status, RunStatus::PartialFailure);
    assert_eq!(run.report.deleted_by_category["Services"].len(), 1);
    assert_eq!(run.report.failed_by_category["Services"].len(), 1);
    assert!(run.report.failed_by_category["Services"][0].starts_with("VendorXHelper"));
    assert!(run.report.summary_line().contains("partially"));
    assert_eq!(fixture.memory.services.names(), vec!["VendorXHelper"]);
}

#[tokio::test]
async fn test_declined_section_touches_nothing() {
    let fixture = Fixture::new();
    let install_dir = fixture.root.join("opt").join("VendorX");
    fs::create_dir_all(&install_dir).unwrap();
    fixture.memory.registry.add_key(r"HKLM\SOFTWARE\VendorX");

    let mut accepted = indexmap::IndexSet::new();
    accepted.insert(SECTION_REGISTRY.to_string());
    let mut gate = PolicyGate::new(DecisionPolicy::AcceptOnly(accepted));

    let run = fixture.engine().run(&mut gate, &mut NoopObserver).await;

    assert!(install_dir.exists());
    assert!(!fixture.memory.registry.contains_key(r"HKLM\SOFTWARE\VendorX"));
    assert!(run.report.skipped_sections.contains(SECTION_DIRECTORIES));
    assert!(!run.report.deleted_by_category.contains_key("Directories"));

    let directories = &run.sections[0];
    assert!(directories.skipped);
    assert!(directories.deleted.is_empty() && directories.failed.is_empty());
}

#[tokio::test]
async fn test_registry_keys_collapse_to_topmost() {
    let fixture = Fixture::new();
    for key in [
        r"HKLM\SOFTWARE\VendorX",
        r"HKLM\SOFTWARE\VendorX\VendorX Licensing",
        r"HKLM\SOFTWARE\VendorX\VendorX Licensing\VX2024",
        r"HKCU\SOFTWARE\VendorX Cloud",
    ] {
        fixture.memory.registry.add_key(key);
    }

    let mut gate = PolicyGate::accept_all();
    let run = fixture.engine().run(&mut gate, &mut NoopObserver).await;

    let registry = run
        .sections
        .iter()
        .find(|s| s.name == SECTION_REGISTRY)
        .unwrap();
    let identifiers: Vec<&str> = registry
        .discovered
        .iter()
        .map(|a| a.identifier.as_str())
        .collect();
    assert_eq!(
        identifiers,
        vec![r"HKCU\SOFTWARE\VendorX Cloud", r"HKLM\SOFTWARE\VendorX"]
    );
    assert_eq!(
        fixture.memory.registry.calls(),
        vec![
            r"delete_key:HKCU\SOFTWARE\VendorX Cloud",
            r"delete_key:HKLM\SOFTWARE\VendorX",
        ]
    );
    assert!(fixture.memory.registry.contains_key(r"HKLM\SOFTWARE\Microsoft"));
}

#[tokio::test]
async fn test_startup_value_matched_by_data() {
    let fixture = Fixture::new();
    fixture
        .memory
        .registry
        .add_value(RUN_KEY, "Updater1", r"C:\Program Files\VendorX\update.exe");

    let mut gate = PolicyGate::accept_all();
    let run = fixture.engine().run(&mut gate, &mut NoopObserver).await;

    let (section, items) = gate
        .prompts()
        .iter()
        .find(|(section, _)| section == SECTION_BACKGROUND)
        .unwrap();
    assert_eq!(section, SECTION_BACKGROUND);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].identifier, format!(r"{}\Updater1", RUN_KEY));

    assert_eq!(fixture.memory.registry.value_names(RUN_KEY), vec!["OneDrive"]);
    assert_eq!(run.report.deleted_by_category["StartupEntries"].len(), 1);
}

#[tokio::test]
async fn test_background_section_covers_tasks_and_startup_files() {
    let fixture = Fixture::new();
    fixture.memory.tasks.add(r"\VendorX\VendorX Updater");
    fixture.memory.tasks.add(r"\Microsoft\Windows\Defrag");
    let shortcut = fixture.root.join("autostart").join("VendorX Tray.desktop");
    fs::write(&shortcut, "[Desktop Entry]").unwrap();

    let run = fixture
        .engine()
        .run(&mut PolicyGate::accept_all(), &mut NoopObserver)
        .await;

    assert!(!shortcut.exists());
    assert_eq!(fixture.memory.tasks.paths(), vec![r"\Microsoft\Windows\Defrag"]);
    assert_eq!(run.report.deleted_by_category["ScheduledTasks"].len(), 1);
    assert_eq!(run.report.deleted_by_category["StartupEntries"].len(), 1);
}

#[tokio::test]
async fn test_temp_entries_are_matched_by_name() {
    let fixture = Fixture::new();
    let tmp = fixture.root.join("tmp");
    fs::write(tmp.join("VendorX_installer.log"), "log").unwrap();
    fs::create_dir_all(tmp.join("vx42")).unwrap();
    fs::write(tmp.join("unrelated.txt"), "keep").unwrap();

    let run = fixture
        .engine()
        .run(&mut PolicyGate::accept_all(), &mut NoopObserver)
        .await;

    assert!(!tmp.join("VendorX_installer.log").exists());
    assert!(!tmp.join("vx42").exists());
    assert!(tmp.join("unrelated.txt").exists());
    assert_eq!(run.report.deleted_by_category["TempFiles"].len(), 2);
}

#[tokio::test]
async fn test_second_run_finds_nothing() {
    let fixture = Fixture::new();
    fs::create_dir_all(fixture.root.join("opt").join("VendorX")).unwrap();
    fs::write(fixture.root.join("tmp").join("VendorX.tmp"), "x").unwrap();
    fixture.memory.registry.add_key(r"HKLM\SOFTWARE\VendorX");
    fixture.memory.services.add("VendorXService", "VendorX Service");
    fixture
        .memory
        .registry
        .add_value(RUN_KEY, "VendorX Tray", r"C:\VendorX\tray.exe");

    let engine = fixture.engine();
    let first = engine
        .run(&mut PolicyGate::accept_all(), &mut NoopObserver)
        .await;
    assert_eq!(first.report.status, RunStatus::AllSucceeded);
    assert_eq!(first.report.deleted_count(), 5);

    let mut gate = PolicyGate::accept_all();
    let second = engine.run(&mut gate, &mut NoopObserver).await;
    assert!(gate.prompts().is_empty());
    assert_eq!(second.report.status, RunStatus::NothingEligible);
    assert!(second.sections.iter().all(|s| s.discovered.is_empty()));
}

#[tokio::test]
async fn test_access_denied_registry_key_is_reported() {
    let fixture = Fixture::new();
    fixture.memory.registry.add_key(r"HKLM\SOFTWARE\VendorX");
    fixture.memory.registry.add_key(r"HKCU\SOFTWARE\VendorX");

    // Discovery of the HKCU root is refused entirely, HKLM is readable
    fixture.memory.registry.deny(r"HKCU\SOFTWARE");

    let run = fixture
        .engine()
        .run(&mut PolicyGate::accept_all(), &mut NoopObserver)
        .await;

    assert_eq!(
        run.report.deleted_by_category["RegistryKeys"],
        vec![r"HKLM\SOFTWARE\VendorX"]
    );
    assert!(fixture.memory.registry.contains_key(r"HKCU\SOFTWARE\VendorX"));
    assert_eq!(run.report.status, RunStatus::AllSucceeded);
}

/// Accepts everything, creating a new vendor temp file while the temp
/// section is being confirmed.
struct LateArrivalGate {
    late_file: Utf8PathBuf,
}

impl ConfirmationGate for LateArrivalGate {
    fn confirm(&mut self, section: &str, _items: &[Artifact]) -> bool {
        if section == SECTION_TEMP {
            fs::write(&self.late_file, "late").unwrap();
        }
        true
    }
}

#[tokio::test]
async fn test_artifacts_created_after_discovery_are_left_alone() {
    let fixture = Fixture::new();
    let tmp = fixture.root.join("tmp");
    fs::write(tmp.join("VendorX-early.tmp"), "early").unwrap();

    let mut gate = LateArrivalGate {
        late_file: tmp.join("VendorX-late.tmp"),
    };
    let run = fixture.engine().run(&mut gate, &mut NoopObserver).await;

    assert!(!tmp.join("VendorX-early.tmp").exists());
    assert!(tmp.join("VendorX-late.tmp").exists());
    assert_eq!(
        run.report.deleted_by_category["TempFiles"],
        vec![tmp.join("VendorX-early.tmp").to_string()]
    );
}

#[derive(Default)]
struct CountingObserver {
    sections_started: usize,
}

impl EngineObserver for CountingObserver {
    fn section_started(&mut self, _section: &str) {
        self.sections_started += 1;
    }
}

#[tokio::test]
async fn test_not_elevated_runs_no_section() {
    let fixture = Fixture::new();
    let install_dir = fixture.root.join("opt").join("VendorX");
    fs::create_dir_all(&install_dir).unwrap();
    fixture.memory.services.add("VendorXService", "VendorX Service");

    let mut gate = PolicyGate::accept_all();
    let mut observer = CountingObserver::default();
    let outcome = fixture
        .engine()
        .run_if_elevated(false, &mut gate, &mut observer)
        .await;

    assert!(matches!(outcome, RunOutcome::NotElevated));
    assert_eq!(outcome.exit_code(), 1);
    assert!(gate.prompts().is_empty());
    assert_eq!(observer.sections_started, 0);
    assert!(install_dir.exists());
    assert_eq!(fixture.memory.services.names(), vec!["VendorXService"]);
}

#[tokio::test]
async fn test_elevated_run_completes_with_exit_code_zero() {
    let fixture = Fixture::new();
    fixture.memory.services.add("VendorXService", "VendorX Service");
    fixture.memory.services.fail_delete("VendorXService");

    let mut observer = CountingObserver::default();
    let outcome = fixture
        .engine()
        .run_if_elevated(true, &mut PolicyGate::accept_all(), &mut observer)
        .await;

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(observer.sections_started, 4);
    let RunOutcome::Completed(run) = outcome else {
        panic!("elevated run did not complete");
    };
    assert_eq!(run.report.status, RunStatus::PartialFailure);
}
