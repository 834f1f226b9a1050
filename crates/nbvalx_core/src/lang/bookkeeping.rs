//! Ids of the bookkeeping cells injected into materialized notebooks.
//!
//! The decorator tags every synthetic cell with one of these ids so the outcome tracker (and humans reading the
//! notebook) can tell them apart from user cells. Teardown cells are exempt from force-skip: they must run even when
//! an earlier cell failed, otherwise the parallel cluster would be left running.
//!
//! ## Examples
//! ```rust
//! use nbvalx_core::lang::bookkeeping::{self, BookkeepingCellId};
//!
//! assert!(bookkeeping::is_exempt_from_force_skip("cluster_stop"));
//! assert!(!bookkeeping::is_exempt_from_force_skip("cluster_start"));
//! assert_eq!(bookkeeping::as_str(BookkeepingCellId::LiveLogMagic), "live_log_magic");
//! ```

use super::registry::LangItemInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookkeepingCellId {
    LiveLogMagic,
    ClusterStart,
    ClusterStop,
    GcDisable,
    GcEnable,
}

#[derive(Debug, Clone, Copy)]
pub struct BookkeepingInfo {
    pub item: LangItemInfo<BookkeepingCellId>,
    pub exempt_from_force_skip: bool,
}

pub const BOOKKEEPING_CELLS: &[BookkeepingInfo] = &[
    info(
        BookkeepingCellId::LiveLogMagic,
        "live_log_magic",
        false,
        "Defines the live_log cell magic and truncates the notebook log file.",
    ),
    info(
        BookkeepingCellId::ClusterStart,
        "cluster_start",
        false,
        "Starts the parallel cluster.",
    ),
    info(
        BookkeepingCellId::ClusterStop,
        "cluster_stop",
        true,
        "Stops the parallel cluster.",
    ),
    info(
        BookkeepingCellId::GcDisable,
        "gc_disable",
        false,
        "Disables garbage collection on every engine.",
    ),
    info(
        BookkeepingCellId::GcEnable,
        "gc_enable",
        true,
        "Re-enables garbage collection on every engine.",
    ),
];

pub fn as_str(id: BookkeepingCellId) -> &'static str {
    info_for(id).item.canonical
}

/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: BookkeepingCellId) -> &'static BookkeepingInfo {
    BOOKKEEPING_CELLS
        .iter()
        .find(|b| b.item.id == id)
        .expect("bookkeeping cell info missing")
}

pub fn from_str(s: &str) -> Option<BookkeepingCellId> {
    BOOKKEEPING_CELLS.iter().find(|e| e.item.matches(s)).map(|e| e.item.id)
}

/// Whether a cell with this id still runs after a previous cell forced a skip.
pub fn is_exempt_from_force_skip(cell_id: &str) -> bool {
    from_str(cell_id).is_some_and(|id| info_for(id).exempt_from_force_skip)
}

const fn info(
    id: BookkeepingCellId,
    canonical: &'static str,
    exempt_from_force_skip: bool,
    description: &'static str,
) -> BookkeepingInfo {
    BookkeepingInfo {
        item: LangItemInfo {
            id,
            canonical,
            aliases: &[],
            description,
        },
        exempt_from_force_skip,
    }
}
