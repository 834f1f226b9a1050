#![forbid(unsafe_code)]
//! nbvalx: notebook tests parameterized by tags.
//!
//! A notebook declares tags (and parameters) with their allowed values through IPython magics, and guards cells
//! with `%%run_if <condition>`. This crate materializes one notebook per tag combination, decorates it for live
//! logging and parallel runs, and tracks cell outcomes when the materialized notebooks are run as tests.
//!
//! ## Module Structure
//!
//! - `magics` - The in-session extension: declarations, bindings and condition evaluation
//! - `notebook` - Notebook model, combination expansion and decoration
//! - `outcome` - Expected failures and skip propagation between cells
//! - `session` - Configuration, the session start pass and the cell runner
//! - `parallel_tempfile` - Temporary paths shared by every rank of a parallel run
//! - `cli` - Command-line interface
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **True invariants**: registry lookups for ids that are guaranteed to be present use `.expect` with a message
//!   naming the missing entry.

pub mod cli;
pub mod magics;
pub mod notebook;
pub mod outcome;
pub mod parallel_tempfile;
pub mod session;

pub use magics::{Extension, MagicError, Shell};
pub use notebook::{Notebook, NotebookError, read_notebook, write_notebook};
pub use session::config::{Action, SessionConfig};
pub use session::{Session, SessionError};
