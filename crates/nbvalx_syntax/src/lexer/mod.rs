//! Lexer for run-if conditions and declaration blocks
//!
//! Handles tokenization including:
//! - Keywords (`True`, `False`, `None`) and word operators (`and`, `or`, `not`, `in`, `is`)
//! - Identifiers and literals (int, float, string)
//! - Operators and punctuation
//! - Logical lines: `Newline` tokens separate declarations; newlines inside brackets and after a trailing `\` are
//!   continuations
//!
//! ## Module Structure
//!
//! - `tokens` - Token types (TokenKind, Token)
//! - `strings` - String scanning
//! - `numbers` - Numeric literal scanning

mod numbers;
mod strings;
pub mod tokens;

pub use tokens::{Token, TokenKind, keyword_id};

use crate::ast::Span;
use crate::diagnostics::CompileError;
use nbvalx_core::lang::magics::CONTINUATION;
use nbvalx_core::lang::operators::{self, OperatorId};
use nbvalx_core::lang::punctuation;

/// Lexer for nbvalx source snippets.
///
/// There is no indentation handling: every snippet is a flat sequence of logical lines.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    /// Bracket depth for implicit line continuation
    bracket_depth: usize,
    symbol_operators: Vec<(&'static str, OperatorId)>,
    tokens: Vec<Token>,
    errors: Vec<CompileError>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            bracket_depth: 0,
            symbol_operators: operators::symbol_spellings_longest_first(),
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source.
    ///
    /// The token stream always ends with an `Eof` token, preceded by a `Newline` if the last logical line was not
    /// already terminated.
    pub fn tokenize(mut self) -> Result<Vec<Token>, Vec<CompileError>> {
        while !self.is_at_end() {
            self.scan_token();
        }

        if self.bracket_depth > 0 {
            self.errors.push(CompileError::syntax(
                "unexpected end of input: unclosed bracket".to_string(),
                Span::new(self.current_pos, self.current_pos),
            ));
        }
        self.push_newline(self.current_pos);
        self.tokens.push(Token::new(
            TokenKind::Eof,
            Span::new(self.current_pos, self.current_pos),
        ));

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    // ========================================================================
    // Core character handling
    // ========================================================================

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((pos, c)) = self.chars.next() {
            self.current_pos = pos + c.len_utf8();
            Some(c)
        } else {
            None
        }
    }

    fn add_token(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token::new(kind, Span::new(start, self.current_pos)));
    }

    /// Emit a `Newline` unless the stream is empty or already ends a logical line.
    fn push_newline(&mut self, start: usize) {
        if matches!(self.tokens.last(), None | Some(Token { kind: TokenKind::Newline, .. })) {
            return;
        }
        self.tokens.push(Token::new(TokenKind::Newline, Span::new(start, self.current_pos)));
    }

    // ========================================================================
    // Main scanning dispatch
    // ========================================================================

    fn scan_token(&mut self) {
        let start = self.current_pos;
        let Some(c) = self.advance() else {
            return;
        };

        match c {
            ' ' | '\t' | '\r' => {}

            // Comments
            '#' => {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            }

            '\n' => {
                if self.bracket_depth == 0 {
                    self.push_newline(start);
                }
            }

            c if c == CONTINUATION => self.scan_continuation(start),

            // Strings
            '"' | '\'' => self.scan_string(start, c),

            // Numbers
            '0'..='9' => self.scan_number(start, c),
            '.' if self.peek().is_some_and(|n| n.is_ascii_digit()) => self.scan_number(start, c),

            // Identifiers, keywords and word operators
            _ if is_ident_start(c) => self.scan_identifier(start, c),

            _ => self.scan_symbol(start, c),
        }
    }

    /// `\` must be the last non-blank character of its line.
    fn scan_continuation(&mut self, start: usize) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
            self.advance();
        }
        match self.peek() {
            Some('\n') => {
                self.advance();
            }
            None => {}
            Some(_) => self.errors.push(CompileError::syntax(
                "unexpected character after line continuation character".to_string(),
                Span::new(start, self.current_pos),
            )),
        }
    }

    fn scan_identifier(&mut self, start: usize, first: char) {
        let mut name = String::from(first);
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let kind = match operators::from_str(&name) {
            Some(op) if operators::info_for(op).is_keyword_spelling => TokenKind::Operator(op),
            _ => match keyword_id(&name) {
                Some(kw) => TokenKind::Keyword(kw),
                None => TokenKind::Ident(name),
            },
        };
        self.add_token(kind, start);
    }

    /// Operators (maximal munch over the registry spellings) and punctuation.
    fn scan_symbol(&mut self, start: usize, c: char) {
        let rest = &self.source[start..];
        let matched = self
            .symbol_operators
            .iter()
            .find(|(spelling, _)| rest.starts_with(spelling))
            .copied();
        if let Some((spelling, id)) = matched {
            // First char is already consumed.
            for _ in spelling.chars().skip(1) {
                self.advance();
            }
            self.add_token(TokenKind::Operator(id), start);
            return;
        }

        let mut buf = [0u8; 4];
        match punctuation::from_str(c.encode_utf8(&mut buf)) {
            Some(id) => {
                if punctuation::is_open(id) {
                    self.bracket_depth += 1;
                } else if punctuation::is_close(id) {
                    if self.bracket_depth == 0 {
                        self.errors.push(CompileError::syntax(
                            format!("unmatched '{}'", c),
                            Span::new(start, self.current_pos),
                        ));
                        return;
                    }
                    self.bracket_depth -= 1;
                }
                self.add_token(TokenKind::Punctuation(id), start);
            }
            None => {
                let mut err = CompileError::syntax(
                    format!("unexpected character '{}'", c),
                    Span::new(start, self.current_pos),
                );
                if c == '!' {
                    err = err.with_hint("use `not` for negation or `!=` for inequality");
                }
                self.errors.push(err);
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenize `source`.
///
/// ## Errors
/// Returns every lexical error found (the lexer keeps going after an error).
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn lex(source: &str) -> Result<Vec<Token>, Vec<CompileError>> {
    Lexer::new(source).tokenize()
}
