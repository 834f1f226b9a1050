//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::fs;
use std::path::{Path, PathBuf};

use nbvalx_syntax::diagnostics::CompileError;
use nbvalx_syntax::parser::{allowed_block_from_source, assignment_block_from_source, expression_from_source};

use super::{CliError, CliResult, ExitCode, SnippetKind};
use crate::magics::RecordingShell;
use crate::notebook::expand::ExpandError;
use crate::outcome::OutcomeTracker;
use crate::session::config::SessionConfig;
use crate::session::runner::{ConsoleReporter, ExtensionExecutor, run_items};
use crate::session::{Materialized, Session, SessionError};

// ============================================================================
// Session commands
// ============================================================================

/// Validate the configuration and run the start pass over `paths`.
fn start_session(config: &SessionConfig, paths: &[PathBuf]) -> CliResult<(Session, Vec<Materialized>)> {
    let session = Session::new(config.clone()).map_err(session_error)?;
    let materialized = session.start(paths).map_err(session_error)?;
    Ok((session, materialized))
}

/// Materialize notebooks for a user to run by hand.
pub fn create(config: &SessionConfig, paths: &[PathBuf]) -> CliResult<ExitCode> {
    let (_, materialized) = start_session(config, paths)?;
    for notebook in &materialized {
        println!("{}", notebook.path.display());
    }
    Ok(ExitCode::SUCCESS)
}

/// Materialize notebooks and list (or dry-run) their cell items.
pub fn collect(config: &SessionConfig, paths: &[PathBuf], dry_run: bool, verbose: bool) -> CliResult<ExitCode> {
    let (session, materialized) = start_session(config, paths)?;
    let items = session.collect(&materialized);
    if !dry_run {
        for item in &items {
            println!("{}", item.node_id());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut executor = ExtensionExecutor::new(RecordingShell::new());
    let mut reporter = ConsoleReporter::new(verbose);
    let summary = run_items(items, OutcomeTracker::new(config.np), &mut executor, &mut reporter);
    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn session_error(err: SessionError) -> CliError {
    match err {
        SessionError::Config(err) => CliError::new(format!("Error: {err}"), ExitCode::USAGE),
        SessionError::Expand { path, source } => CliError::failure(format_expand_error(&path, &source)),
        other => CliError::failure(format!("Error: {other}")),
    }
}

fn format_expand_error(path: &Path, err: &ExpandError) -> String {
    let mut msg = format!("Error: {}: {err}", path.display());
    let name = format!("{} (cell {})", path.display(), err.cell());
    for diagnostic in err.diagnostics(&name) {
        msg.push('\n');
        msg.push_str(&format!("{:?}", miette::Report::new(diagnostic)));
    }
    msg
}

// ============================================================================
// Debug commands
// ============================================================================

fn read_source(file_path: &Path) -> CliResult<String> {
    fs::read_to_string(file_path)
        .map_err(|e| CliError::failure(format!("Error reading file '{}': {}", file_path.display(), e)))
}

fn format_errors(file_path: &Path, source: &str, errors: &[CompileError]) -> String {
    let name = file_path.display().to_string();
    let mut msg = String::new();
    for err in errors {
        msg.push_str(&format!("{:?}", miette::Report::new(err.to_report(&name, source))));
    }
    msg.trim_end().to_string()
}

/// Parse a snippet and print its syntax tree.
pub fn check_file(file_path: &Path, kind: SnippetKind) -> CliResult<ExitCode> {
    let source = read_source(file_path)?;
    let source = source.trim_end();
    let parsed = match kind {
        SnippetKind::Condition => expression_from_source(source).map(|expr| format!("{:#?}", expr.node)),
        SnippetKind::Allowed => allowed_block_from_source(source).map(|decls| format!("{decls:#?}")),
        SnippetKind::Current => assignment_block_from_source(source).map(|assignments| format!("{assignments:#?}")),
    };
    match parsed {
        Ok(tree) => {
            println!("{tree}");
            Ok(ExitCode::SUCCESS)
        }
        Err(errors) => Err(CliError::failure(format_errors(file_path, source, &errors))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_check_file_reports_syntax_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cond.txt");
        fs::write(&path, "backend ==\n").unwrap();
        let err = check_file(&path, SnippetKind::Condition).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
        assert!(err.message.contains("SyntaxError"));

        fs::write(&path, "backend == \"cpu\"\n").unwrap();
        assert_eq!(check_file(&path, SnippetKind::Condition).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn test_missing_file() {
        let err = check_file(Path::new("/definitely/not/here.txt"), SnippetKind::Current).unwrap_err();
        assert!(err.message.starts_with("Error reading file"));
    }

    #[test]
    fn test_invalid_config_is_a_usage_error() {
        let config = SessionConfig::default().with_np(0);
        let err = create(&config, &[PathBuf::from(".")]).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::USAGE);
    }
}
