//! Command-line interface module for sortbox.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Configuration loading and inbox resolution
//! - Building the standard registry from configuration
//! - Running the pipeline and presenting its report

use crate::action::OpenWithAction;
use crate::config::{ConfigError, ProbeBackend, SortConfig};
use crate::inspector::{ContentInspector, FileCommandInspector, InferInspector};
use crate::output::OutputFormatter;
use crate::pipeline::{Pipeline, PipelineError, RunReport};
use crate::registry::{ClassifierRegistry, RegistryError, standard_registry};
use clap::Parser;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Sort the files in an inbox directory into numbered category folders.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "sortbox", version, about)]
pub struct Cli {
    /// Inbox to sort (defaults to $HOME/$TARGET_DIR, or $HOME/Downloads).
    #[arg(long, value_name = "DIR")]
    pub inbox: Option<PathBuf>,

    /// Configuration file (defaults to .sortboxrc.toml, then ~/.config/sortbox/config.toml).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show where files would go without moving them or running actions.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("failed to render report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Builds the content inspector selected in the configuration.
pub fn build_inspector(config: &SortConfig) -> Box<dyn ContentInspector> {
    match config.probe.backend {
        ProbeBackend::File => Box::new(FileCommandInspector::new(
            config.probe.command.clone(),
            config.probe.timeout(),
        )),
        ProbeBackend::Infer => Box::new(InferInspector),
    }
}

/// Builds the standard registry for `inbox` from configuration.
pub fn build_registry(
    config: &SortConfig,
    inbox: &Path,
) -> Result<ClassifierRegistry, RegistryError> {
    let torrent_action = OpenWithAction::new(
        config.actions.opener.clone(),
        config.actions.torrent_app.clone(),
        config.actions.timeout(),
    );
    standard_registry(inbox, build_inspector(config), Arc::new(torrent_action))
}

/// Runs one pass over the inbox described by `cli`, printing the outcome.
///
/// Per-file problems are reported but do not make this fail; only
/// configuration errors and an unreadable inbox do.
///
/// # Examples
///
/// ```no_run
/// use sortbox::cli::{Cli, run_cli};
///
/// let cli = Cli { dry_run: true, ..Cli::default() };
/// match run_cli(&cli) {
///     Ok(report) => println!("{} files sorted", report.sorted_count()),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<RunReport, CliError> {
    let config = SortConfig::load(cli.config.as_deref())?;
    let inbox = config.resolve_inbox(cli.inbox.as_deref())?;
    let excludes = config.compile_excludes()?;
    let registry = build_registry(&config, &inbox)?;
    info!(inbox = %inbox.display(), classifiers = registry.len(), "starting run");

    if !cli.json {
        if cli.dry_run {
            OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", inbox.display()));
        } else {
            OutputFormatter::info(&format!("Sorting contents of: {}", inbox.display()));
        }
    }

    let progress = if cli.json {
        ProgressBar::hidden()
    } else {
        OutputFormatter::create_progress_bar(0)
    };

    let report = Pipeline::new(&registry, &excludes)
        .with_collision_policy(config.moves.on_collision)
        .dry_run(cli.dry_run)
        .with_progress(progress)
        .run(&inbox)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        present(&report);
    }

    Ok(report)
}

fn present(report: &RunReport) {
    if report.entries.is_empty() {
        OutputFormatter::info("Nothing to sort.");
        return;
    }

    OutputFormatter::entries(report);
    OutputFormatter::summary_table(report);

    if report.dry_run {
        OutputFormatter::dry_run_notice("No files were modified.");
    } else if report.is_clean() {
        OutputFormatter::success("Inbox sorted.");
    } else {
        OutputFormatter::warning("Some entries need attention. Please review the lines above.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from([
            "sortbox",
            "--inbox",
            "/tmp/inbox",
            "--dry-run",
            "--json",
            "-vv",
        ]);
        assert_eq!(cli.inbox, Some(PathBuf::from("/tmp/inbox")));
        assert!(cli.dry_run);
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_build_registry_uses_configured_backend() {
        let config = SortConfig::from_toml("[probe]\nbackend = \"infer\"\n").unwrap();
        let registry = build_registry(&config, Path::new("/inbox")).unwrap();
        assert_eq!(registry.len(), 8);
        assert!(format!("{:?}", registry).contains("InferInspector"));
    }
}
