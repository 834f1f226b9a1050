//! Expected-failure marker vocabulary.
//!
//! A cell whose failure is anticipated starts (after any magic lines) with a comment such as
//! `# PYTEST_XFAIL: known issue`. The marker kind decides when the expectation applies and whether the rest of the
//! notebook is skipped afterwards.
//!
//! | marker | applies | skips rest |
//! |---|---|---|
//! | `PYTEST_XFAIL` | always | no |
//! | `PYTEST_XFAIL_IN_PARALLEL` | only when `np > 1` | no |
//! | `PYTEST_XFAIL_AND_SKIP_NEXT` | always | yes |
//! | `PYTEST_XFAIL_IN_PARALLEL_AND_SKIP_NEXT` | only when `np > 1` | yes |
//!
//! ## Examples
//! ```rust
//! use nbvalx_core::lang::markers::{self, MarkerId};
//!
//! let id = markers::from_str("PYTEST_XFAIL_IN_PARALLEL").unwrap();
//! assert!(!markers::applies(id, 1));
//! assert!(markers::applies(id, 2));
//! ```

use super::registry::LangItemInfo;

/// Prefix shared by every marker comment line.
pub const MARKER_FAMILY_PREFIX: &str = "# PYTEST_XFAIL";

/// Comment leader stripped before the marker name.
pub const COMMENT_LEADER: &str = "# ";

/// Separates the marker name from the reason text.
pub const REASON_SEPARATOR: &str = ": ";

/// Stable identifier for every expected-failure marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerId {
    Xfail,
    XfailInParallel,
    XfailAndSkipNext,
    XfailInParallelAndSkipNext,
}

/// Metadata for a marker.
#[derive(Debug, Clone, Copy)]
pub struct MarkerInfo {
    pub item: LangItemInfo<MarkerId>,
    /// Only an expected failure when running with more than one process.
    pub parallel_only: bool,
    /// Force-skip the remaining cells of the notebook after the expected failure.
    pub skip_next: bool,
}

/// Registry of all markers.
pub const MARKERS: &[MarkerInfo] = &[
    info(MarkerId::Xfail, "PYTEST_XFAIL", false, false, "Expected failure."),
    info(
        MarkerId::XfailInParallel,
        "PYTEST_XFAIL_IN_PARALLEL",
        true,
        false,
        "Expected failure when running in parallel.",
    ),
    info(
        MarkerId::XfailAndSkipNext,
        "PYTEST_XFAIL_AND_SKIP_NEXT",
        false,
        true,
        "Expected failure; skip the remaining cells.",
    ),
    info(
        MarkerId::XfailInParallelAndSkipNext,
        "PYTEST_XFAIL_IN_PARALLEL_AND_SKIP_NEXT",
        true,
        true,
        "Expected failure when running in parallel; skip the remaining cells.",
    ),
];

/// Canonical spelling.
pub fn as_str(id: MarkerId) -> &'static str {
    info_for(id).item.canonical
}

/// Full metadata.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: MarkerId) -> &'static MarkerInfo {
    MARKERS.iter().find(|m| m.item.id == id).expect("marker info missing")
}

/// Lookup by spelling (exact, case-sensitive).
pub fn from_str(s: &str) -> Option<MarkerId> {
    MARKERS.iter().find(|e| e.item.matches(s)).map(|e| e.item.id)
}

/// Whether the marker converts a failure into an expected failure for a run with `np` processes.
pub fn applies(id: MarkerId, np: usize) -> bool {
    !info_for(id).parallel_only || np > 1
}

/// Whether the marker force-skips the rest of the notebook.
pub fn skips_next(id: MarkerId) -> bool {
    info_for(id).skip_next
}

const fn info(
    id: MarkerId,
    canonical: &'static str,
    parallel_only: bool,
    skip_next: bool,
    description: &'static str,
) -> MarkerInfo {
    MarkerInfo {
        item: LangItemInfo {
            id,
            canonical,
            aliases: &[],
            description,
        },
        parallel_only,
        skip_next,
    }
}
