//! Console presentation: section listings, prompts, status lines and the
//! final report.
//!
//! Everything writes to an injected [`Write`] so the rendering can be
//! tested without a terminal.

use crate::models::{Artifact, CleanupReport, RunStatus};
use crate::services::{AffirmativeTokens, ConfirmationGate, EngineObserver, Outcome};
use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};

/// How the console gate answers after printing a section's list.
#[derive(Debug, Clone)]
pub enum PromptMode {
    /// Read one line and compare it against the accepted answers.
    Interactive(AffirmativeTokens),
    /// Answer without reading input (`--yes` / `--dry-run`).
    Automatic(bool),
}

/// Confirmation gate that lists every item, then asks once.
pub struct ConsoleGate<R, W> {
    input: R,
    output: W,
    mode: PromptMode,
}

impl<R: BufRead, W: Write> ConsoleGate<R, W> {
    pub fn new(input: R, output: W, mode: PromptMode) -> Self {
        Self {
            input,
            output,
            mode,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn list(&mut self, section: &str, items: &[Artifact]) -> io::Result<()> {
        writeln!(
            self.output,
            "{} {} ({} found)",
            "==>".blue().bold(),
            section.bold(),
            items.len()
        )?;
        for item in items {
            writeln!(
                self.output,
                "  {} {} {}",
                "-".cyan(),
                item,
                format!("[{}]", item.kind).dimmed()
            )?;
        }
        Ok(())
    }

    fn ask(&mut self, count: usize, tokens: &AffirmativeTokens) -> io::Result<bool> {
        write!(
            self.output,
            "{} Delete these {} item(s)? [{} to confirm]: ",
            "::".cyan(),
            count,
            tokens.hint()
        )?;
        self.output.flush()?;

        let mut answer = String::new();
        let read = self.input.read_line(&mut answer)?;
        Ok(read > 0 && tokens.is_affirmative(&answer))
    }
}

impl<R: BufRead, W: Write> ConfirmationGate for ConsoleGate<R, W> {
    fn confirm(&mut self, section: &str, items: &[Artifact]) -> bool {
        if let Err(e) = self.list(section, items) {
            tracing::warn!("Could not print listing for '{}': {}", section, e);
            return false;
        }

        let accepted = match self.mode.clone() {
            PromptMode::Automatic(answer) => {
                let label = if answer {
                    "confirmed automatically"
                } else {
                    "left untouched (dry run)"
                };
                let _ = writeln!(self.output, "{} {}", "::".cyan(), label.dimmed());
                answer
            }
            PromptMode::Interactive(tokens) => match self.ask(items.len(), &tokens) {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::warn!("Could not read confirmation: {}", e);
                    false
                }
            },
        };

        tracing::info!(
            "Section '{}' {} by user",
            section,
            if accepted { "confirmed" } else { "declined" }
        );
        accepted
    }
}

/// Prints colored status lines as the engine progresses.
pub struct ConsoleObserver<W> {
    output: W,
}

impl<W: Write> ConsoleObserver<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<W: Write> EngineObserver for ConsoleObserver<W> {
    fn section_started(&mut self, section: &str) {
        let _ = writeln!(self.output, "\n{} Scanning {}...", "==>".blue().bold(), section);
    }

    fn nothing_found(&mut self, section: &str) {
        let message = format!("No {} found", section.to_lowercase());
        let _ = writeln!(self.output, "  {}", message.dimmed());
    }

    fn section_skipped(&mut self, section: &str, items: usize) {
        let _ = writeln!(
            self.output,
            "  {}",
            format!("Skipped {} ({} item(s) left in place)", section, items).yellow()
        );
    }

    fn artifact_processed(&mut self, artifact: &Artifact, outcome: &Outcome) {
        let _ = match outcome {
            Outcome::Deleted => writeln!(self.output, "  {} {}", "Deleted:".green(), artifact),
            Outcome::Failed(error) => writeln!(
                self.output,
                "  {} {} {}",
                "Failed:".red(),
                artifact,
                format!("({})", error).dimmed()
            ),
        };
    }
}

/// Render the final report.
pub fn render_report<W: Write>(report: &CleanupReport, out: &mut W) -> io::Result<()> {
    writeln!(out, "\n{} {}", "==>".blue().bold(), "Summary".bold())?;

    for (category, items) in &report.deleted_by_category {
        writeln!(out, "  {} {} ({})", "Deleted".green(), category, items.len())?;
        for item in items {
            writeln!(out, "    {}", item)?;
        }
    }

    for (category, items) in &report.failed_by_category {
        writeln!(out, "  {} {} ({})", "Failed".red(), category, items.len())?;
        for item in items {
            writeln!(out, "    {}", item)?;
        }
    }

    if !report.skipped_sections.is_empty() {
        writeln!(out, "  {}", "Skipped sections:".yellow())?;
        for section in &report.skipped_sections {
            writeln!(out, "    {}", section)?;
        }
    }

    let line = report.summary_line();
    match report.status {
        RunStatus::AllSucceeded => writeln!(out, "{} {}", "==>".green().bold(), line.green()),
        RunStatus::PartialFailure => writeln!(out, "{} {}", "==>".yellow().bold(), line.yellow()),
        RunStatus::NothingEligible => writeln!(out, "{} {}", "==>".dimmed(), line.dimmed()),
    }
}
