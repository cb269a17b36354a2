use serde::{Deserialize, Serialize};

/// A vendor profile: everything that identifies one vendor's leftovers.
///
/// Profiles are pure data. The compiled-in ones live in `profiles/*.yaml`;
/// custom ones can be loaded from a file through
/// [`ConfigManager`](crate::config::ConfigManager).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorProfile {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "match")]
    pub match_terms: MatchTerms,

    /// Candidate install/data directories as path templates.
    #[serde(default)]
    pub directories: Vec<String>,

    /// Registry subtrees searched for vendor keys.
    #[serde(default)]
    pub registry_roots: Vec<String>,

    /// Auto-run keys whose values are inspected.
    #[serde(default = "default_run_keys")]
    pub run_keys: Vec<String>,

    /// Startup folders whose files are inspected, as path templates.
    #[serde(default = "default_startup_folders")]
    pub startup_folders: Vec<String>,
}

/// Vendor identification terms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchTerms {
    /// Case-insensitive substrings.
    #[serde(default)]
    pub substrings: Vec<String>,

    /// Regular expressions, matched case-insensitively.
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl MatchTerms {
    pub fn is_empty(&self) -> bool {
        self.substrings.is_empty() && self.patterns.is_empty()
    }
}

fn default_run_keys() -> Vec<String> {
    vec![
        r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Run".to_string(),
        r"HKLM\SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Run".to_string(),
        r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\RunOnce".to_string(),
        r"HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Run".to_string(),
        r"HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\RunOnce".to_string(),
    ]
}

fn default_startup_folders() -> Vec<String> {
    vec![
        r"%APPDATA%\Microsoft\Windows\Start Menu\Programs\Startup".to_string(),
        r"%ProgramData%\Microsoft\Windows\Start Menu\Programs\StartUp".to_string(),
        "~/.config/autostart".to_string(),
        "/etc/xdg/autostart".to_string(),
    ]
}

/// Runtime settings, layered from defaults, an optional settings file and
/// `VENDOR_PURGE_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Answers accepted as "yes" by the interactive gate (case-insensitive).
    #[serde(default = "default_affirmative_tokens")]
    pub affirmative_tokens: Vec<String>,

    /// Upper bound for every OS tool invocation.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default)]
    pub debug_mode: bool,

    /// Overrides the OS temp directory scanned for temp entries.
    #[serde(default)]
    pub temp_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            affirmative_tokens: default_affirmative_tokens(),
            command_timeout_secs: default_command_timeout_secs(),
            log_dir: default_log_dir(),
            debug_mode: false,
            temp_dir: None,
        }
    }
}

pub(crate) fn default_affirmative_tokens() -> Vec<String> {
    vec!["y".to_string(), "yes".to_string()]
}

pub(crate) fn default_command_timeout_secs() -> u64 {
    120
}

pub(crate) fn default_log_dir() -> String {
    dirs::data_local_dir()
        .map(|dir| dir.join("vendor-purge").join("logs"))
        .and_then(|dir| dir.to_str().map(str::to_string))
        .unwrap_or_else(|| "logs".to_string())
}
