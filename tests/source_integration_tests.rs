//! Integration tests for the discovery adapters
//!
//! Each source is run on its own against a temporary directory or the
//! in-memory facades.

use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;
use vendor_purge::models::ArtifactKind;
use vendor_purge::models::artifact::{META_KEY, META_VALUE_NAME};
use vendor_purge::platform::memory::MemoryPlatform;
use vendor_purge::services::sources::{
    DirectorySource, RegistryKeySource, ScheduledTaskSource, ServiceSource, StartupFileSource,
    StartupValueSource, TempEntrySource,
};
use vendor_purge::services::{ArtifactSource, MatchRule};

fn rule() -> MatchRule {
    MatchRule::new(["VendorX"], [r"^VX\d+$"]).unwrap()
}

fn create_test_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, path)
}

#[tokio::test]
async fn test_directory_source_keeps_existing_candidates() {
    let (_temp_dir, dir) = create_test_dir();
    fs::create_dir_all(dir.join("VendorX")).unwrap();

    let source = DirectorySource::new(vec![dir.join("VendorX"), dir.join("VendorX Missing")]);
    let found = source.discover().await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind, ArtifactKind::Directory);
    assert_eq!(found[0].identifier, dir.join("VendorX").as_str());
}

#[tokio::test]
async fn test_temp_source_matches_files_and_directories() {
    let (_temp_dir, dir) = create_test_dir();
    fs::write(dir.join("vendorx-setup.log"), "log").unwrap();
    fs::create_dir_all(dir.join("VX7")).unwrap();
    fs::write(dir.join("VX7-notes.txt"), "no match for the anchored pattern").unwrap();

    let source = TempEntrySource::new(dir.clone(), rule());
    let mut found: Vec<String> = source
        .discover()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.identifier)
        .collect();
    found.sort();

    assert_eq!(
        found,
        vec![dir.join("VX7").to_string(), dir.join("vendorx-setup.log").to_string()]
    );
}

#[tokio::test]
async fn test_temp_source_missing_directory_is_empty() {
    let (_temp_dir, dir) = create_test_dir();
    let source = TempEntrySource::new(dir.join("absent"), rule());
    assert!(source.discover().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_startup_file_source_ignores_directories() {
    let (_temp_dir, dir) = create_test_dir();
    fs::write(dir.join("VendorX Tray.lnk"), "shortcut").unwrap();
    fs::create_dir_all(dir.join("VendorX Folder")).unwrap();

    let source = StartupFileSource::new(vec![dir.clone(), dir.join("absent")], rule());
    let found = source.discover().await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind, ArtifactKind::StartupFile);
    assert!(found[0].identifier.ends_with("VendorX Tray.lnk"));
}

#[tokio::test]
async fn test_registry_source_skips_denied_subtree() {
    let memory = MemoryPlatform::new();
    memory.registry.add_key(r"HKLM\SOFTWARE\VendorX");
    memory.registry.add_key(r"HKLM\SOFTWARE\Locked\VendorX Secret");
    memory.registry.add_key(r"HKLM\SOFTWARE\Contoso");
    memory.registry.deny(r"HKLM\SOFTWARE\Locked");

    let source = RegistryKeySource::new(
        memory.registry.clone(),
        vec![r"HKLM\SOFTWARE".to_string(), r"HKLM\SOFTWARE\Missing".to_string()],
        rule(),
    );
    let found = source.discover().await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].identifier, r"HKLM\SOFTWARE\VendorX");
}

#[tokio::test]
async fn test_registry_source_matches_leaf_name_only() {
    let memory = MemoryPlatform::new();
    memory.registry.add_key(r"HKLM\SOFTWARE\VendorX\Settings");
    memory.registry.add_key(r"HKLM\SOFTWARE\Classes\VendorX.Document\shell");

    let source = RegistryKeySource::new(
        memory.registry.clone(),
        vec![r"HKLM\SOFTWARE".to_string()],
        rule(),
    );
    let found = source.discover().await.unwrap();

    assert!(found.is_empty());
}

#[tokio::test]
async fn test_service_source_matches_display_name() {
    let memory = MemoryPlatform::new();
    memory.services.add("vxhlp", "VendorX Helper");
    memory.services.add("Spooler", "Print Spooler");

    let found = ServiceSource::new(memory.services.clone(), rule())
        .discover()
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].identifier, "vxhlp");
    assert_eq!(found[0].describe(), "vxhlp (VendorX Helper)");
}

#[tokio::test]
async fn test_task_source_matches_folder_path() {
    let memory = MemoryPlatform::new();
    memory.tasks.add(r"\VendorX\Updater");
    memory.tasks.add(r"\Microsoft\Windows\Defrag\ScheduledDefrag");

    let found = ScheduledTaskSource::new(memory.tasks.clone(), rule())
        .discover()
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].identifier, r"\VendorX\Updater");
    assert_eq!(found[0].describe(), r"\VendorX\Updater (Updater)");
}

#[tokio::test]
async fn test_startup_value_source_matches_name_or_data() {
    let memory = MemoryPlatform::new();
    let run_key = r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Run";
    memory.registry.add_value(run_key, "VendorX Tray", r"C:\Tools\tray.exe");
    memory.registry.add_value(run_key, "Updater1", r"C:\Program Files\VendorX\update.exe");
    memory.registry.add_value(run_key, "SecurityHealth", r"C:\Windows\SecurityHealth.exe");

    let source = StartupValueSource::new(
        memory.registry.clone(),
        vec![run_key.to_string(), r"HKCU\Missing\Run".to_string()],
        rule(),
    );
    let found = source.discover().await.unwrap();

    let names: Vec<&str> = found.iter().filter_map(|a| a.meta(META_VALUE_NAME)).collect();
    assert_eq!(names, vec!["VendorX Tray", "Updater1"]);
    assert!(found.iter().all(|a| a.meta(META_KEY) == Some(run_key)));
    assert!(found.iter().all(|a| a.kind == ArtifactKind::StartupRegistryValue));
}
