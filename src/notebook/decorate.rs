//! Bookkeeping cells added to materialized notebooks.
//!
//! The host kernel is opaque, so logging and parallel execution are requested by rewriting cell text: every
//! code cell gets a wrapper cell magic, and bootstrap cells define what the wrapper does. All wrapping goes
//! through [`inject_cell_magic`].
//!
//! Final layout with every option on:
//!
//! ```text
//! [cluster_start, gc_disable, live_log_magic, cells..., gc_enable, cluster_stop]
//! ```

use std::path::Path;

use nbvalx_core::lang::bookkeeping::{self, BookkeepingCellId};
use nbvalx_core::lang::magics::{self, MagicId};
use nbvalx_core::lang::markers::MARKER_FAMILY_PREFIX;

use super::{Cell, Notebook};
use crate::session::config::Action;

/// Comment appended to the closing quotes of a quoted expected failure.
const QUOTE_CLOSING_COMMENT: &str = "  # noqa: D";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecorateOptions {
    pub action: Action,
    pub np: usize,
    pub gc_bracket: bool,
}

/// Prefix every code cell with `magic_line`.
///
/// This is the only place where cell sources are wrapped: `%%live_log` and `%%px` both go through here.
pub fn inject_cell_magic(notebook: &mut Notebook, magic_line: &str) {
    for cell in notebook.cells.iter_mut().filter(|cell| cell.is_code()) {
        cell.source = format!("{magic_line}\n{}", cell.source);
    }
}

/// The `%%px` line for `action`: output streams are only silenced when a collector runs the notebook.
pub fn px_magic_line(action: Action) -> String {
    match action {
        Action::CollectNotebooks => format!("{} --no-stream", magics::cell_prefix(MagicId::Px)),
        Action::CreateNotebooks => magics::cell_prefix(MagicId::Px),
    }
}

/// Log file of a materialized notebook: the notebook path with `.log` instead of `.ipynb`.
pub fn live_log_path(ipynb_path: &Path) -> String {
    ipynb_path.with_extension("log").to_string_lossy().into_owned()
}

fn bookkeeping_cell(id: BookkeepingCellId, source: String) -> Cell {
    Cell::code(source).with_id(bookkeeping::as_str(id))
}

/// Python that registers the `%%live_log` magic, mirroring each cell and its stdout to `log_path`.
///
/// Under MPI every rank writes its own `<log_path>-<rank>` file.
pub fn live_log_bootstrap(log_path: &str) -> String {
    let quoted = serde_json::to_string(log_path).unwrap_or_else(|_| format!("\"{log_path}\""));
    format!(
        r#"import contextlib

import IPython


class LiveLogSuppressedTraceback(Exception):
    """A cell failure whose traceback was already shown."""


def live_log(line, cell=None):
    """Run the cell while mirroring its input and stdout to the log file."""
    with contextlib.redirect_stdout(open(live_log.__file__, "a", buffering=1)):
        print("---------------------------")
        print()
        print("Input:")
        print(cell.strip("\n"))
        print()
        print("Output (stdout):")
        result = IPython.get_ipython().run_cell(cell)
        try:
            result.raise_error()
        except Exception as e:
            raise LiveLogSuppressedTraceback(e)
        finally:
            print()


def _suppress_traceback(shell, etype, evalue, tb, tb_offset=None):
    return []


live_log.__file__ = {quoted}  # noqa: E501
try:
    import mpi4py.MPI
except ImportError:
    pass
else:
    if mpi4py.MPI.COMM_WORLD.size > 1:
        live_log.__file__ += "-" + str(mpi4py.MPI.COMM_WORLD.rank)
open(live_log.__file__, "w").close()

IPython.get_ipython().register_magic_function(live_log, "cell")
IPython.get_ipython().set_custom_exc((LiveLogSuppressedTraceback, ), _suppress_traceback)"#
    )
}

pub fn cluster_start_source(np: usize) -> String {
    format!(
        "import ipyparallel as ipp\n\ncluster = ipp.Cluster(engines=\"MPI\", profile=\"mpi\", n={np})\ncluster.start_and_connect_sync()"
    )
}

pub const CLUSTER_STOP_SOURCE: &str = "cluster.stop_cluster_sync()";
pub const GC_DISABLE_SOURCE: &str = "import gc\n\ngc.disable()";
pub const GC_ENABLE_SOURCE: &str = "import gc\n\ngc.enable()\ngc.collect()";

/// Add logging and parallel bookkeeping to a materialized notebook written to `ipynb_path`.
#[tracing::instrument(skip_all, fields(path = %ipynb_path.display(), np = options.np))]
pub fn decorate(notebook: &mut Notebook, ipynb_path: &Path, options: DecorateOptions) {
    if options.action == Action::CollectNotebooks {
        inject_cell_magic(notebook, &magics::cell_prefix(MagicId::LiveLog));
        let bootstrap = live_log_bootstrap(&live_log_path(ipynb_path));
        notebook
            .cells
            .insert(0, bookkeeping_cell(BookkeepingCellId::LiveLogMagic, bootstrap));
    }

    if options.np > 1 {
        inject_cell_magic(notebook, &px_magic_line(options.action));
        if options.gc_bracket {
            let px = px_magic_line(options.action);
            notebook.cells.insert(
                0,
                bookkeeping_cell(BookkeepingCellId::GcDisable, format!("{px}\n{GC_DISABLE_SOURCE}")),
            );
            notebook.cells.push(bookkeeping_cell(
                BookkeepingCellId::GcEnable,
                format!("{px}\n{GC_ENABLE_SOURCE}"),
            ));
        }
        notebook.cells.insert(
            0,
            bookkeeping_cell(BookkeepingCellId::ClusterStart, cluster_start_source(options.np)),
        );
        notebook.cells.push(bookkeeping_cell(
            BookkeepingCellId::ClusterStop,
            CLUSTER_STOP_SOURCE.to_string(),
        ));
    }
}

/// Turn the code of every expected-failure cell into a string literal, so that every cell of a created notebook
/// can be run by hand.
///
/// The code starts after the marker comment and any comment lines that follow it.
pub fn quote_expected_failures(notebook: &mut Notebook) {
    for cell in notebook.cells.iter_mut().filter(|cell| cell.is_code()) {
        if let Some(quoted) = quote_expected_failure(&cell.source) {
            cell.source = quoted;
        }
    }
}

fn quote_expected_failure(source: &str) -> Option<String> {
    let mut lines: Vec<&str> = source.lines().collect();
    let marker = lines.iter().position(|line| line.starts_with(MARKER_FAMILY_PREFIX))?;
    let code = (marker + 1..lines.len()).find(|&i| !lines[i].starts_with('#'))?;
    let quotes = if source.contains("\"\"\"") { "'''" } else { "\"\"\"" };
    let closing = format!("{quotes}{QUOTE_CLOSING_COMMENT}");
    lines.insert(code, quotes);
    lines.push(&closing);
    Some(lines.join("\n"))
}
