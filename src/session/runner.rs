//! Session runner (pytest-style) for collected notebook cells.
//!
//! ## Execution Boundary
//!
//! Cells are run by a [`CellExecutor`]. A real kernel lives behind that trait; [`ExtensionExecutor`] runs cells
//! through the in-process [`Extension`] on top of any [`Shell`], which is what the tests use.
//!
//! ## TestReporter Trait
//!
//! Reporting is separated from execution by the [`TestReporter`] trait, so other output formats only need a new
//! implementation. [`ConsoleReporter`] prints pytest-like progress and a summary line.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde_json::Value as Json;

use super::live_log::{self, FAILURE_SECTION, OUTPUT_SECTION};
use crate::magics::{Execution, Extension, Shell};
use crate::outcome::{CellItem, FailureReport, OutcomeTracker};

// ============================================================================
// Cell Executor
// ============================================================================

/// What running one cell produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellRun {
    /// nbformat output objects.
    pub outputs: Vec<Json>,
    /// Error text when the cell failed.
    pub failure: Option<String>,
}

impl CellRun {
    pub fn passed() -> Self {
        Self::default()
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            outputs: Vec::new(),
            failure: Some(message.into()),
        }
    }
}

/// Runs the cells of one notebook after another in a single session.
pub trait CellExecutor {
    /// A new notebook begins; its cells run in a fresh session.
    fn start_notebook(&mut self, _path: &Path) {}

    fn execute(&mut self, item: &CellItem) -> CellRun;

    /// The last cell of the notebook has run.
    fn finish_notebook(&mut self, _path: &Path) {}
}

/// Runs cells through an [`Extension`], forwarding plain code to `shell`.
#[derive(Debug)]
pub struct ExtensionExecutor<S: Shell> {
    extension: Extension,
    pub shell: S,
}

impl<S: Shell> ExtensionExecutor<S> {
    pub fn new(shell: S) -> Self {
        Self {
            extension: Extension::new(),
            shell,
        }
    }
}

impl<S: Shell> CellExecutor for ExtensionExecutor<S> {
    fn start_notebook(&mut self, _path: &Path) {
        self.extension = Extension::new();
    }

    fn execute(&mut self, item: &CellItem) -> CellRun {
        match self.extension.run_cell_source(&item.source, &mut self.shell) {
            Ok(Execution::Ran | Execution::Skipped) => CellRun::passed(),
            Ok(Execution::Failed(failure)) => {
                if !failure.already_reported {
                    self.shell.report_failure(&failure);
                }
                CellRun::failed(failure.message)
            }
            Err(err) => CellRun::failed(err.to_string()),
        }
    }

    fn finish_notebook(&mut self, _path: &Path) {
        if self.extension.is_loaded() {
            self.extension.unload(&mut self.shell);
        }
    }
}

// ============================================================================
// Test Reporter Trait
// ============================================================================

/// Trait for reporting cell results.
pub trait TestReporter {
    /// Called when the cells of a new notebook start running
    fn on_notebook_start(&mut self, _path: &Path) {}

    /// Called when collection is complete
    fn on_collection_complete(&mut self, item_count: usize);

    /// Called before a cell runs
    fn on_test_start(&mut self, item: &CellItem);

    /// Called when a cell completes
    fn on_test_complete(&mut self, item: &CellItem, result: &TestResult);

    /// Called when all cells have completed
    fn on_run_complete(&mut self, summary: &TestSummary);
}

/// Result of running a single cell
#[derive(Debug, Clone, PartialEq)]
pub enum TestResult {
    Passed(Duration),
    Failed(Duration, String),
    Skipped(String),
    XFailed(Duration, String),
}

/// Summary of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub xfailed: usize,
    pub duration: Duration,
}

impl TestSummary {
    fn record(&mut self, result: &TestResult) {
        self.total += 1;
        match result {
            TestResult::Passed(_) => self.passed += 1,
            TestResult::Failed(..) => self.failed += 1,
            TestResult::Skipped(_) => self.skipped += 1,
            TestResult::XFailed(..) => self.xfailed += 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Default console reporter (pytest-style)
#[derive(Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl TestReporter for ConsoleReporter {
    fn on_notebook_start(&mut self, path: &Path) {
        if self.verbose {
            eprintln!("{}", path.display());
        }
    }

    fn on_collection_complete(&mut self, item_count: usize) {
        if item_count == 0 {
            eprintln!("No cells collected");
        } else {
            eprintln!("collected {item_count} items");
        }
    }

    fn on_test_start(&mut self, item: &CellItem) {
        if self.verbose {
            eprint!("{} ... ", item.node_id());
        }
    }

    fn on_test_complete(&mut self, item: &CellItem, result: &TestResult) {
        let status = match result {
            TestResult::Passed(d) => {
                if self.verbose {
                    format!("\x1b[32mPASSED\x1b[0m ({:.0}ms)", d.as_millis())
                } else {
                    "\x1b[32m.\x1b[0m".to_string()
                }
            }
            TestResult::Failed(d, _) => {
                if self.verbose {
                    format!("\x1b[31mFAILED\x1b[0m ({:.0}ms)", d.as_millis())
                } else {
                    "\x1b[31mF\x1b[0m".to_string()
                }
            }
            TestResult::Skipped(reason) => {
                if self.verbose {
                    format!("\x1b[33mSKIPPED\x1b[0m ({reason})")
                } else {
                    "\x1b[33ms\x1b[0m".to_string()
                }
            }
            TestResult::XFailed(_, reason) => {
                if self.verbose {
                    let headline = reason.lines().next().unwrap_or_default();
                    format!("\x1b[33mXFAIL\x1b[0m ({headline})")
                } else {
                    "\x1b[33mx\x1b[0m".to_string()
                }
            }
        };

        if self.verbose {
            eprintln!("{status}");
        } else {
            eprint!("{status}");
        }

        if let TestResult::Failed(_, error) = result {
            eprintln!("\n\x1b[31m{}\x1b[0m", item.node_id());
            eprintln!("{error}");
        }
    }

    fn on_run_complete(&mut self, summary: &TestSummary) {
        if !self.verbose {
            eprintln!();
        }
        eprintln!();

        let mut parts = Vec::new();
        if summary.passed > 0 {
            parts.push(format!("\x1b[32m{} passed\x1b[0m", summary.passed));
        }
        if summary.failed > 0 {
            parts.push(format!("\x1b[31m{} failed\x1b[0m", summary.failed));
        }
        if summary.skipped > 0 {
            parts.push(format!("\x1b[33m{} skipped\x1b[0m", summary.skipped));
        }
        if summary.xfailed > 0 {
            parts.push(format!("\x1b[33m{} xfailed\x1b[0m", summary.xfailed));
        }

        eprintln!(
            "====== {} in {:.2}s ======",
            parts.join(", "),
            summary.duration.as_secs_f64()
        );
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Run every item in order, applying the outcome hooks around each cell.
#[tracing::instrument(skip_all, fields(items = items.len()))]
pub fn run_items(
    mut items: Vec<CellItem>,
    tracker: OutcomeTracker,
    executor: &mut dyn CellExecutor,
    reporter: &mut dyn TestReporter,
) -> TestSummary {
    let start_time = Instant::now();
    let mut summary = TestSummary::default();
    let mut current: Option<PathBuf> = None;

    reporter.on_collection_complete(items.len());
    for index in 0..items.len() {
        let (done, rest) = items.split_at_mut(index + 1);
        let item = &mut done[index];

        if current.as_deref() != Some(item.notebook.as_path()) {
            if let Some(previous) = current.take() {
                executor.finish_notebook(&previous);
            }
            executor.start_notebook(&item.notebook);
            reporter.on_notebook_start(&item.notebook);
            current = Some(item.notebook.clone());
        }

        reporter.on_test_start(item);
        let result = run_one(item, &tracker, executor);
        summary.record(&result);
        reporter.on_test_complete(item, &result);

        tracker.teardown(item, rest.first_mut());
    }
    if let Some(previous) = current {
        executor.finish_notebook(&previous);
    }

    summary.duration = start_time.elapsed();
    reporter.on_run_complete(&summary);
    summary
}

fn run_one(item: &mut CellItem, tracker: &OutcomeTracker, executor: &mut dyn CellExecutor) -> TestResult {
    if let Some(reason) = tracker.setup(item) {
        return TestResult::Skipped(reason.to_string());
    }
    let start = Instant::now();
    let run = executor.execute(item);
    let duration = start.elapsed();

    let result = match &run.failure {
        None => TestResult::Passed(duration),
        Some(message) => {
            write_log_section(item, FAILURE_SECTION, message);
            match tracker.makereport(item) {
                Ok(FailureReport::Expected { reason }) => TestResult::XFailed(duration, format!("{reason}\n{message}")),
                Ok(FailureReport::Unexpected) => TestResult::Failed(duration, message.clone()),
                Err(err) => TestResult::Failed(duration, format!("{message}\n{err}")),
            }
        }
    };
    write_log_section(item, OUTPUT_SECTION, &live_log::render_outputs(&run.outputs));
    result
}

fn write_log_section(item: &CellItem, section: &str, content: &str) {
    if !live_log::is_logged(&item.source) {
        return;
    }
    if let Err(err) = live_log::append_section(&item.notebook, section, content) {
        tracing::warn!(notebook = %item.notebook.display(), error = %err, "failed to write live log");
    }
}
