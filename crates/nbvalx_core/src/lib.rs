//! Provide shared, pure vocabulary and semantic helpers for nbvalx.
//!
//! This crate is intentionally small and dependency-light. It contains deterministic helpers that both:
//! - the condition-language frontend (`nbvalx_syntax`) uses to tokenize and parse, and
//! - the notebook tooling (`nbvalx`) uses to recognize magics, markers and bookkeeping cells.
//!
//! ## Notes
//!
//! - This is a “semantic core” crate: **no IO**, no global state, and no notebook-specific types.
//! - Current scope: Python-like numeric policy for the condition evaluator, and canonical vocabulary (keywords,
//!   operators, punctuation, magics, expected-failure markers, bookkeeping cell ids).

pub mod lang;
pub mod num;

/// Message used when a division or modulo by zero is evaluated.
pub const ZERO_DIVISION_MSG: &str = "ZeroDivisionError: division by zero";

/// Message used when an integer result does not fit in 64 bits.
pub const INT_OVERFLOW_MSG: &str = "OverflowError: integer result too large";
