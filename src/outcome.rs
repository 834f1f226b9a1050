//! Per-notebook failure bookkeeping for collected cells.
//!
//! Every code cell of a materialized notebook becomes a [`CellItem`]. The [`OutcomeTracker`] hooks run around
//! each item, in order:
//!
//! 1. [`OutcomeTracker::setup`] skips the item when an earlier cell forced a skip;
//! 2. [`OutcomeTracker::makereport`] classifies a failure as expected (marker comment) or unexpected;
//! 3. [`OutcomeTracker::teardown`] hands a pending force-skip to the next item of the same notebook.

use std::path::{Path, PathBuf};

use nbvalx_core::lang::bookkeeping;
use nbvalx_core::lang::markers::{self, COMMENT_LEADER, MARKER_FAMILY_PREFIX, MarkerId, REASON_SEPARATOR};

use crate::notebook::Cell;

/// Skip reason of cells following a failure.
pub const PREVIOUS_CELL_FAILED: &str = "A previous cell failed";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutcomeError {
    #[error("malformed expected-failure marker `{0}`: expected `# MARKER: reason`")]
    MalformedMarker(String),
    #[error("unknown expected-failure marker `{0}`")]
    UnknownMarker(String),
}

/// One collected code cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellItem {
    pub notebook: PathBuf,
    /// Position among the code cells of the notebook.
    pub index: usize,
    pub cell_id: Option<String>,
    pub source: String,
    force_skip: bool,
}

impl CellItem {
    pub fn new(notebook: &Path, index: usize, cell: &Cell) -> Self {
        Self {
            notebook: notebook.to_path_buf(),
            index,
            cell_id: cell.id.clone(),
            source: cell.source.clone(),
            force_skip: false,
        }
    }

    pub fn name(&self) -> String {
        format!("Cell {}", self.index)
    }

    /// `<notebook>::Cell N`
    pub fn node_id(&self) -> String {
        format!("{}::{}", self.notebook.display(), self.name())
    }

    pub fn is_force_skipped(&self) -> bool {
        self.force_skip
    }

    /// First cell of a notebook; force-skips never cross into it.
    fn starts_notebook(&self) -> bool {
        self.index == 0
    }
}

/// Items of every code cell of `notebook`, written at `path`.
pub fn collect_items(path: &Path, notebook: &crate::notebook::Notebook) -> Vec<CellItem> {
    notebook
        .code_cells()
        .enumerate()
        .map(|(index, cell)| CellItem::new(path, index, cell))
        .collect()
}

/// A parsed `# MARKER: reason` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedFailure {
    pub marker: MarkerId,
    pub reason: String,
}

/// Read the expected-failure marker of a cell, if any.
///
/// Leading `%` magic lines are skipped as long as more lines follow; the marker must then be the first line and be
/// followed by at least one more line.
pub fn parse_expected_failure(source: &str) -> Result<Option<ExpectedFailure>, OutcomeError> {
    let mut lines: Vec<&str> = source.lines().collect();
    while lines.len() > 1 && lines[0].starts_with('%') {
        lines.remove(0);
    }
    if lines.len() <= 1 || !lines[0].starts_with(MARKER_FAMILY_PREFIX) {
        return Ok(None);
    }
    let comment = lines[0].replace(COMMENT_LEADER, "");
    let (name, reason) = comment
        .split_once(REASON_SEPARATOR)
        .ok_or_else(|| OutcomeError::MalformedMarker(lines[0].to_string()))?;
    let marker = markers::from_str(name).ok_or_else(|| OutcomeError::UnknownMarker(name.to_string()))?;
    Ok(Some(ExpectedFailure {
        marker,
        reason: reason.to_string(),
    }))
}

/// How a failed cell is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReport {
    Unexpected,
    /// `reason` is the capitalized marker reason.
    Expected { reason: String },
}

#[derive(Debug, Clone, Copy)]
pub struct OutcomeTracker {
    np: usize,
}

impl OutcomeTracker {
    pub fn new(np: usize) -> Self {
        Self { np }
    }

    /// The skip reason when `item` must not run.
    pub fn setup(&self, item: &CellItem) -> Option<&'static str> {
        let exempt = item
            .cell_id
            .as_deref()
            .is_some_and(bookkeeping::is_exempt_from_force_skip);
        (item.force_skip && !exempt).then_some(PREVIOUS_CELL_FAILED)
    }

    /// Classify a failure of `item`.
    ///
    /// A marker that does not apply to this run leaves the failure unexpected without forcing a skip. An error
    /// about the marker itself forces a skip like any unexpected failure.
    pub fn makereport(&self, item: &mut CellItem) -> Result<FailureReport, OutcomeError> {
        let expected = match parse_expected_failure(&item.source) {
            Ok(expected) => expected,
            Err(err) => {
                item.force_skip = true;
                return Err(err);
            }
        };
        let Some(expected) = expected else {
            item.force_skip = true;
            return Ok(FailureReport::Unexpected);
        };
        if markers::skips_next(expected.marker) {
            item.force_skip = true;
        }
        if markers::applies(expected.marker, self.np) {
            Ok(FailureReport::Expected {
                reason: capitalize(&expected.reason),
            })
        } else {
            Ok(FailureReport::Unexpected)
        }
    }

    pub fn teardown(&self, item: &CellItem, next: Option<&mut CellItem>) {
        if !item.force_skip {
            return;
        }
        if let Some(next) = next.filter(|next| !next.starts_notebook()) {
            tracing::debug!(from = %item.node_id(), to = %next.node_id(), "propagating force-skip");
            next.force_skip = true;
        }
    }
}

/// First character upper case, the rest lower case.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(index: usize, source: &str) -> CellItem {
        CellItem::new(Path::new("nb.ipynb"), index, &Cell::code(source))
    }

    #[test]
    fn test_parse_after_magic_lines() {
        let parsed = parse_expected_failure("%%px\n%%run_if a == 1\n# PYTEST_XFAIL: known issue\nboom()").unwrap();
        assert_eq!(
            parsed,
            Some(ExpectedFailure {
                marker: MarkerId::Xfail,
                reason: "known issue".to_string()
            })
        );
    }

    #[test]
    fn test_parse_requires_code_after_marker() {
        assert_eq!(parse_expected_failure("# PYTEST_XFAIL: alone").unwrap(), None);
        assert_eq!(parse_expected_failure("x = 1\n# PYTEST_XFAIL: late").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_expected_failure("# PYTEST_XFAIL no reason\nf()"),
            Err(OutcomeError::MalformedMarker("# PYTEST_XFAIL no reason".to_string()))
        );
        assert_eq!(
            parse_expected_failure("# PYTEST_XFAIL_SOMETIMES: x\nf()"),
            Err(OutcomeError::UnknownMarker("PYTEST_XFAIL_SOMETIMES".to_string()))
        );
    }

    #[test]
    fn test_expected_failure_keeps_running() {
        let tracker = OutcomeTracker::new(1);
        let mut failed = item(1, "# PYTEST_XFAIL: known issue\nraise RuntimeError()");
        let mut next = item(2, "x = 1");
        assert_eq!(
            tracker.makereport(&mut failed).unwrap(),
            FailureReport::Expected {
                reason: "Known issue".to_string()
            }
        );
        tracker.teardown(&failed, Some(&mut next));
        assert_eq!(tracker.setup(&next), None);
    }

    #[test]
    fn test_skip_next_marker() {
        let tracker = OutcomeTracker::new(1);
        let mut failed = item(1, "# PYTEST_XFAIL_AND_SKIP_NEXT: BROKEN Upstream\nf()");
        let mut next = item(2, "x = 1");
        assert_eq!(
            tracker.makereport(&mut failed).unwrap(),
            FailureReport::Expected {
                reason: "Broken upstream".to_string()
            }
        );
        tracker.teardown(&failed, Some(&mut next));
        assert_eq!(tracker.setup(&next), Some(PREVIOUS_CELL_FAILED));
    }

    #[test]
    fn test_parallel_only_marker_in_serial_run() {
        let mut failed = item(0, "# PYTEST_XFAIL_IN_PARALLEL: races\nf()");
        assert_eq!(
            OutcomeTracker::new(1).makereport(&mut failed).unwrap(),
            FailureReport::Unexpected
        );
        assert!(!failed.is_force_skipped());

        let mut failed = item(0, "# PYTEST_XFAIL_IN_PARALLEL_AND_SKIP_NEXT: races\nf()");
        assert!(matches!(
            OutcomeTracker::new(2).makereport(&mut failed).unwrap(),
            FailureReport::Expected { .. }
        ));
        assert!(failed.is_force_skipped());
    }

    #[test]
    fn test_unexpected_failure_skips_rest_but_not_cluster_stop() {
        let tracker = OutcomeTracker::new(2);
        let mut failed = item(3, "%%px --no-stream\n1 / 0");
        assert_eq!(tracker.makereport(&mut failed).unwrap(), FailureReport::Unexpected);

        let mut next = item(4, "y = 2");
        tracker.teardown(&failed, Some(&mut next));
        assert_eq!(tracker.setup(&next), Some(PREVIOUS_CELL_FAILED));

        let mut stop = CellItem::new(
            Path::new("nb.ipynb"),
            5,
            &Cell::code("cluster.stop_cluster_sync()").with_id("cluster_stop"),
        );
        tracker.teardown(&next, Some(&mut stop));
        assert!(stop.is_force_skipped());
        assert_eq!(tracker.setup(&stop), None);
    }

    #[test]
    fn test_skip_does_not_cross_notebooks() {
        let tracker = OutcomeTracker::new(1);
        let mut failed = item(7, "f()");
        tracker.makereport(&mut failed).unwrap();
        let mut first_of_next_notebook = CellItem::new(Path::new("other.ipynb"), 0, &Cell::code("x = 1"));
        tracker.teardown(&failed, Some(&mut first_of_next_notebook));
        assert_eq!(tracker.setup(&first_of_next_notebook), None);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("hello World"), "Hello world");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_node_id() {
        assert_eq!(item(3, "x").node_id(), "nb.ipynb::Cell 3");
    }
}
