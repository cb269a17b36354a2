//! vendor-purge - remove residual traces of a vendor's software suite
//!
//! Main entry point for the command line tool.
//!
//! # Overview
//!
//! The binary wires the library pieces together:
//! - Settings ([`ConfigManager`]: defaults, optional file, `VENDOR_PURGE_*` env)
//! - Logging (daily rotating audit log, stderr mirror in debug mode)
//! - Vendor profile (compiled-in by name, or a YAML file)
//! - OS facades ([`Platform::native`]) bounded by the configured command timeout
//! - The [`CleanupEngine`] driven by a console gate and observer
//!
//! # Execution Flow
//!
//! 1. Parse arguments and load settings
//! 2. Initialize logging → `<log_dir>/vendor-purge.<date>`
//! 3. Resolve the vendor profile
//! 4. Check elevation; stop with exit code 1 if missing
//! 5. Run the four sections: directories, registry keys, temp entries,
//!    then services, scheduled tasks and startup entries
//! 6. Print the summary and optionally write it as YAML
//!
//! # Exit codes
//!
//! - `0`: the run completed (failed items are reported, not fatal)
//! - `1`: not running with administrator/root rights
//! - `2`: configuration or startup error

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use owo_colors::OwoColorize;
use std::fs;
use std::io;
use std::process::ExitCode;
use std::time::Duration;
use vendor_purge::platform::{CommandRunner, PathResolver, Platform, is_elevated};
use vendor_purge::services::{AffirmativeTokens, RunOutcome};
use vendor_purge::ui::{ConsoleGate, ConsoleObserver, PromptMode, render_report};
use vendor_purge::{APP_NAME, CleanupEngine, ConfigManager, VERSION, VendorProfile};

#[derive(Parser)]
#[command(name = "vendor-purge")]
#[command(about = "Remove every trace of a vendor's software suite, section by section")]
#[command(version)]
struct Cli {
    /// Built-in vendor profile
    #[arg(long, default_value = "adobe", conflicts_with = "profile_file")]
    profile: String,

    /// Load the vendor profile from a YAML file instead
    #[arg(long)]
    profile_file: Option<Utf8PathBuf>,

    /// Settings file (YAML, TOML or JSON)
    #[arg(long, env = "VENDOR_PURGE_SETTINGS")]
    settings: Option<Utf8PathBuf>,

    /// Confirm every section without asking
    #[arg(short, long, conflicts_with = "dry_run")]
    yes: bool,

    /// List what would be removed, remove nothing
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Write the final report to this file as YAML
    #[arg(long)]
    report_file: Option<Utf8PathBuf>,

    /// Debug logging, mirrored to stderr
    #[arg(long)]
    debug: bool,

    /// Print the built-in profiles and exit
    #[arg(long)]
    list_profiles: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    if cli.list_profiles {
        list_profiles()?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut settings = ConfigManager::new(cli.settings.as_ref()).load_settings()?;
    settings.debug_mode |= cli.debug;

    // Held until the end of the run so buffered log lines are flushed
    let _guard = vendor_purge::logging::setup_logging(
        Utf8PathBuf::from(&settings.log_dir).as_path(),
        APP_NAME,
        settings.debug_mode,
        settings.debug_mode,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let profile = load_profile(&cli)?;
    tracing::info!("Using profile '{}'", profile.name);

    let runner = CommandRunner::new(Duration::from_secs(settings.command_timeout_secs));
    let elevated = is_elevated(&runner).await;

    let platform = Platform::native(runner);
    let paths = PathResolver::from_env(settings.temp_dir.as_deref());
    let engine = CleanupEngine::for_profile(&profile, &platform, &paths)
        .with_context(|| format!("Invalid match pattern in profile '{}'", profile.name))?;

    let mode = if cli.yes {
        PromptMode::Automatic(true)
    } else if cli.dry_run {
        PromptMode::Automatic(false)
    } else {
        PromptMode::Interactive(AffirmativeTokens::new(&settings.affirmative_tokens))
    };

    if elevated {
        println!(
            "{} {} v{}: removing {}",
            "==>".blue().bold(),
            APP_NAME,
            VERSION,
            profile.name.bold()
        );
    }

    let mut gate = ConsoleGate::new(io::stdin().lock(), io::stdout(), mode);
    let mut observer = ConsoleObserver::new(io::stdout());
    let cleanup = match engine.run_if_elevated(elevated, &mut gate, &mut observer).await {
        RunOutcome::Completed(cleanup) => cleanup,
        outcome @ RunOutcome::NotElevated => {
            eprintln!(
                "{} {} must be run as administrator (root on Unix)",
                "error:".red().bold(),
                APP_NAME
            );
            return Ok(ExitCode::from(outcome.exit_code()));
        }
    };

    render_report(&cleanup.report, &mut io::stdout()).context("Failed to print the report")?;

    if let Some(path) = &cli.report_file {
        let yaml =
            serde_yaml_ng::to_string(&cleanup.report).context("Failed to serialize the report")?;
        fs::write(path, yaml).with_context(|| format!("Failed to write report: {}", path))?;
        tracing::info!("Report written to {}", path);
    }

    tracing::info!("Finished: {:?}", cleanup.report.status);
    Ok(ExitCode::SUCCESS)
}

fn load_profile(cli: &Cli) -> Result<VendorProfile> {
    match &cli.profile_file {
        Some(path) => ConfigManager::load_profile_file(path),
        None => ConfigManager::load_builtin_profile(&cli.profile),
    }
}

fn list_profiles() -> Result<()> {
    for name in ConfigManager::builtin_profile_names() {
        let profile = ConfigManager::load_builtin_profile(name)?;
        println!("{:<10} {}", name.bold(), profile.description);
    }
    Ok(())
}
