use crate::models::{Settings, VendorProfile};
use crate::services::MatchRule;
use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Prefix of environment variables overriding [`Settings`].
pub const ENV_PREFIX: &str = "VENDOR_PURGE";

const ADOBE_PROFILE: &str = include_str!("../../profiles/adobe.yaml");
const AUTODESK_PROFILE: &str = include_str!("../../profiles/autodesk.yaml");

/// Profiles compiled into the binary, by lookup key.
const BUILTIN_PROFILES: &[(&str, &str)] =
    &[("adobe", ADOBE_PROFILE), ("autodesk", AUTODESK_PROFILE)];

/// Configuration manager for settings and vendor profiles.
///
/// Settings are layered, later layers winning:
/// 1. Built-in defaults
/// 2. An optional settings file (YAML, TOML or JSON, by extension)
/// 3. `VENDOR_PURGE_*` environment variables
///    (`VENDOR_PURGE_AFFIRMATIVE_TOKENS=y,o,oui`)
///
/// Vendor profiles are YAML documents, either compiled in or read from a file.
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    settings_path: Option<Utf8PathBuf>,
}

impl ConfigManager {
    /// Create a ConfigManager, optionally reading settings from `settings_path`.
    pub fn new<P: AsRef<Utf8Path>>(settings_path: Option<P>) -> Self {
        Self {
            settings_path: settings_path.map(|p| p.as_ref().to_path_buf()),
        }
    }

    /// Load the layered settings.
    ///
    /// A settings path that was given explicitly must exist.
    pub fn load_settings(&self) -> Result<Settings> {
        let defaults = Settings::default();

        let mut builder = config::Config::builder()
            .set_default("affirmative_tokens", defaults.affirmative_tokens)?
            .set_default("command_timeout_secs", defaults.command_timeout_secs as i64)?
            .set_default("log_dir", defaults.log_dir)?
            .set_default("debug_mode", defaults.debug_mode)?;

        if let Some(path) = &self.settings_path {
            if !path.exists() {
                bail!("Settings file not found: {}", path);
            }
            builder = builder.add_source(config::File::from(path.as_std_path()).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("affirmative_tokens"),
        );

        let settings: Settings = builder
            .build()
            .context("Failed to assemble settings")?
            .try_deserialize()
            .context("Failed to parse settings")?;

        if settings.affirmative_tokens.iter().all(|t| t.trim().is_empty()) {
            bail!("Settings must accept at least one affirmative answer");
        }

        if settings.command_timeout_secs == 0 {
            bail!("command_timeout_secs must be at least 1");
        }

        match &self.settings_path {
            Some(path) => tracing::info!("Loaded settings from {}", path),
            None => tracing::debug!("Using default settings"),
        }
        Ok(settings)
    }

    /// Names of the compiled-in profiles.
    pub fn builtin_profile_names() -> Vec<&'static str> {
        BUILTIN_PROFILES.iter().map(|(name, _)| *name).collect()
    }

    /// Load a compiled-in profile by name (case-insensitive).
    pub fn load_builtin_profile(name: &str) -> Result<VendorProfile> {
        let (key, yaml) = BUILTIN_PROFILES
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .with_context(|| {
                format!(
                    "Unknown profile '{}' (available: {})",
                    name,
                    Self::builtin_profile_names().join(", ")
                )
            })?;
        Self::parse_profile(yaml, key)
    }

    /// Load a profile from a YAML file.
    pub fn load_profile_file<P: AsRef<Utf8Path>>(path: P) -> Result<VendorProfile> {
        let path = path.as_ref();
        let file_contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile: {}", path))?;

        let profile = Self::parse_profile(&file_contents, path.as_str())?;
        tracing::info!("Loaded profile '{}' from {}", profile.name, path);
        Ok(profile)
    }

    /// Parse and validate a profile document. `origin` names it in errors.
    pub fn parse_profile(yaml: &str, origin: &str) -> Result<VendorProfile> {
        let profile: VendorProfile = serde_yaml_ng::from_str(yaml)
            .with_context(|| format!("Failed to parse profile: {}", origin))?;

        if profile.name.trim().is_empty() {
            bail!("Profile {} has no name", origin);
        }

        MatchRule::from_terms(&profile.match_terms)
            .with_context(|| format!("Invalid match pattern in profile {}", origin))?;

        Ok(profile)
    }
}
