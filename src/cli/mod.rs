//! CLI module for nbvalx
//!
//! This module provides the command-line interface to the notebook session.
//!
//! ## Commands
//!
//! - `create <paths>` - Materialize notebooks for a user to run by hand
//! - `collect <paths>` - Materialize notebooks and list their cell items
//! - `check <file>` - Parse a condition or declaration snippet and report syntax errors
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::session::config::{Action, SessionConfig};

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    /// Invalid options, pytest's usage-error code.
    pub const USAGE: ExitCode = ExitCode(4);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Create an error with a custom exit code.
    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        Self::new(message, ExitCode(code))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Run notebooks as tests, once per combination of their declared tags
#[derive(Parser, Debug)]
#[command(name = "nbvalx")]
#[command(version = VERSION)]
#[command(about = "Tag expansion and conditional cell execution for notebook tests", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub session: SessionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every session command.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Number of MPI processes used to run each notebook
    #[arg(long, global = true, default_value_t = 1)]
    pub np: usize,

    /// Remove cells that are unreachable for each tag combination
    #[arg(long = "tag-collapse", global = true)]
    pub tag_collapse: bool,

    /// Output directory, relative to each notebook's directory [default: .ipynb_pytest/np_<N>/collapse_<True|False>]
    #[arg(long = "work-dir", global = true, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Only materialize the tag combination with this label (e.g. `backend=cpu`)
    #[arg(short = 'k', global = true, value_name = "KEYWORD")]
    pub keyword: Option<String>,

    /// Disable garbage collection while a parallel notebook runs
    #[arg(long = "gc-bracket", global = true)]
    pub gc_bracket: bool,
}

impl SessionArgs {
    pub fn to_config(&self, action: Action) -> SessionConfig {
        let config = SessionConfig::default()
            .with_np(self.np)
            .with_action(action)
            .with_tag_collapse(self.tag_collapse)
            .with_keyword(self.keyword.clone())
            .with_gc_bracket(self.gc_bracket);
        match &self.work_dir {
            Some(work_dir) => config.with_work_dir(work_dir),
            None => config,
        }
    }
}

/// Which grammar `check` parses the snippet with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SnippetKind {
    /// A `%%run_if` condition
    #[default]
    Condition,
    /// An allowed-values block (`name: v1, v2`)
    Allowed,
    /// A current-values block (`name = value`)
    Current,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Materialize notebooks for a user to run by hand
    Create {
        /// Notebooks or directories to search
        #[arg(value_name = "PATH", default_value = ".")]
        paths: Vec<PathBuf>,
    },

    /// Materialize notebooks and list their cell items
    Collect {
        /// Notebooks or directories to search
        #[arg(value_name = "PATH", default_value = ".")]
        paths: Vec<PathBuf>,
        /// Also run the cells against an in-process shell that dispatches nbvalx magics and ignores other code
        #[arg(long = "dry-run")]
        dry_run: bool,
        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Parse a snippet and report syntax errors (debug)
    Check {
        /// File holding the snippet
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Grammar to parse with
        #[arg(long = "as", value_enum, default_value_t = SnippetKind::Condition)]
        kind: SnippetKind,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Create { paths } => commands::create(&cli.session.to_config(Action::CreateNotebooks), &paths),
        Command::Collect {
            paths,
            dry_run,
            verbose,
        } => commands::collect(
            &cli.session.to_config(Action::CollectNotebooks),
            &paths,
            dry_run,
            verbose,
        ),
        Command::Check { file, kind } => commands::check_file(&file, kind),
    }
}

// ============================================================================
// Tests
// ============================================================================
