//! The in-session extension: run-if conditions over registered tags and parameters.
//!
//! ## Module Structure
//!
//! - `value` - Runtime values with Python semantics
//! - `evaluator` - Condition evaluation over a [`evaluator::Scope`]
//! - `registry` - Allowed-value declarations and current bindings
//! - `splitter` - Line-continued magic arguments
//! - `shell` - The host capability contract and an in-memory host
//! - `runtime` - The [`Extension`] context and magic dispatch

pub mod evaluator;
pub mod registry;
pub mod runtime;
pub mod shell;
pub mod splitter;
pub mod value;

use nbvalx_syntax::diagnostics::{CompileError, SourceDiagnostic, join_errors};

pub use evaluator::{EvalError, Scope};
pub use registry::{AllowedValues, Bindings, RunIfKind};
pub use runtime::{Execution, Extension};
pub use shell::{CellFailure, FailureHandler, RecordingShell, Shell};
pub use value::Value;

/// Errors raised by the extension magics.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MagicError {
    /// The text of a declaration block or condition does not parse.
    #[error("{}", join_errors(.errors))]
    Syntax { text: String, errors: Vec<CompileError> },
    /// A declaration block is well-formed but not acceptable (empty, duplicated or mixed-type values).
    #[error("ValueError: {0}")]
    Declaration(String),
    /// A binding names an undeclared tag/parameter or a value outside its allowed set.
    #[error("AssertionError: {0}")]
    Binding(String),
    #[error(transparent)]
    Eval(#[from] EvalError),
    /// Forwarding a parameter assignment to the session failed.
    #[error("{0}")]
    Execution(String),
    #[error("UsageError: magic `{0}` not found")]
    UnknownMagic(String),
    #[error("the {} extension is not loaded", nbvalx_core::lang::magics::EXTENSION_NAME)]
    NotLoaded,
}

impl MagicError {
    pub fn syntax(text: &str, errors: Vec<CompileError>) -> Self {
        MagicError::Syntax {
            text: text.to_string(),
            errors,
        }
    }

    /// Labelled source snippets for syntax errors (empty for every other kind).
    pub fn diagnostics(&self, name: &str) -> Vec<SourceDiagnostic> {
        match self {
            MagicError::Syntax { text, errors } => errors.iter().map(|e| e.to_report(name, text)).collect(),
            _ => Vec::new(),
        }
    }
}
