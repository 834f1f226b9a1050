//! nbvalx vocabulary registries.
//!
//! This module is the “front door” for vocabulary shared between the condition-language frontend and the notebook
//! tooling: reserved keywords, operators, punctuation, magics, expected-failure markers, and the ids of the
//! bookkeeping cells injected into materialized notebooks.
//!
//! The design goal is to avoid stringly-typed checks scattered across the tooling. Instead, callers work with
//! **stable IDs** (e.g. `MagicId`, `MarkerId`) and look up spellings/metadata via registry tables.
//!
//! ## Notes
//! - Registries are intentionally **pure**: no AST types, no IO, no side effects.
//! - The lexer/parser enforce syntax; registries provide spellings and metadata for shared use.
//!
//! ## Examples
//! ```rust
//! use nbvalx_core::lang::magics::{self, MagicId};
//!
//! assert_eq!(magics::from_str("run_if"), Some(MagicId::RunIf));
//! assert_eq!(magics::as_str(MagicId::RunIf), "run_if");
//! ```

pub mod bookkeeping;
pub mod keywords;
pub mod magics;
pub mod markers;
pub mod operators;
pub mod punctuation;
pub mod registry;
