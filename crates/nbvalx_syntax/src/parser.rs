//! Parser for run-if conditions and declaration blocks
//!
//! Converts a token stream into an AST. Expressions follow Python precedence
//! (`or` < `and` < `not` < comparisons < `+ -` < `* / // %` < unary `- +` < `**`).
//!
//! ## Examples
//!
//! ```rust
//! use nbvalx_syntax::{lexer, parser};
//!
//! let tokens = lexer::lex("a: 1, 2\nb: 'x', 'y'\n").unwrap();
//! let decls = parser::parse_allowed_block(&tokens).unwrap();
//! assert_eq!(decls.len(), 2);
//! assert_eq!(decls[1].node.to_string(), "b: 'x', 'y'");
//! ```

use crate::ast::*;
use crate::diagnostics::CompileError;
use crate::lexer::{Token, TokenKind};
use nbvalx_core::lang::keywords::KeywordId;
use nbvalx_core::lang::operators::OperatorId;
use nbvalx_core::lang::punctuation::PunctuationId;

// NOTE: This module is split across multiple files using `include!` to keep all parser
// methods in the same Rust module (preserving privacy + call patterns) while avoiding
// a single large source file.

include!("parser/core.rs");
include!("parser/helpers.rs");
include!("parser/decl.rs");
include!("parser/expr.rs");
include!("parser/api.rs");
include!("parser/tests.rs");
