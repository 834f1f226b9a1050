//! Syntax frontend for nbvalx: lexer, parser, AST, diagnostics.
//!
//! Three small grammars share one token stream:
//! - **conditions** (`%%run_if tag == 1 and param > 0.5`), parsed with [`parser::parse_expression`];
//! - **allowed-value declarations** (`tag: 1, 2, 3`, one per line), parsed with [`parser::parse_allowed_block`];
//! - **current-value assignments** (`tag = 1`, one per line), parsed with [`parser::parse_assignment_block`].
//!
//! ## Notes
//! - This crate is intentionally “syntax-only”: it does not evaluate anything and knows nothing about notebooks.
//! - Vocabulary identity (keywords/operators/punctuation) comes from `nbvalx_core::lang` registries.
//!
//! ## Examples
//! ```rust
//! use nbvalx_syntax::{lexer, parser};
//!
//! let tokens = lexer::lex("tag == 1 and not flag\n").unwrap();
//! let expr = parser::parse_expression(&tokens).unwrap();
//! assert_eq!(expr.node.to_string(), "tag == 1 and not flag");
//! ```

pub mod ast;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod token_helpers;
