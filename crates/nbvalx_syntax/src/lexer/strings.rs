//! String scanning for the nbvalx lexer
//!
//! Single- and double-quoted strings with the usual backslash escapes. A string may not span lines.

use super::Lexer;
use super::tokens::TokenKind;
use crate::ast::Span;
use crate::diagnostics::CompileError;

/// Result of processing an escape sequence
enum EscapeResult {
    Char(char),
    /// Unknown escape - preserve as-is (backslash + char)
    Unknown(char),
    Eof,
}

impl<'a> Lexer<'a> {
    /// Called after consuming the backslash.
    fn scan_text_escape(&mut self, quote: char) -> EscapeResult {
        match self.advance() {
            Some('n') => EscapeResult::Char('\n'),
            Some('t') => EscapeResult::Char('\t'),
            Some('r') => EscapeResult::Char('\r'),
            Some('0') => EscapeResult::Char('\0'),
            Some('\\') => EscapeResult::Char('\\'),
            Some(q) if q == quote || q == '\'' || q == '"' => EscapeResult::Char(q),
            Some(c) => EscapeResult::Unknown(c),
            None => EscapeResult::Eof,
        }
    }

    pub(super) fn scan_string(&mut self, start: usize, quote: char) {
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.errors.push(CompileError::syntax(
                        "unterminated string literal".to_string(),
                        Span::new(start, self.current_pos),
                    ));
                    return;
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.scan_text_escape(quote) {
                        EscapeResult::Char(c) => value.push(c),
                        EscapeResult::Unknown(c) => {
                            value.push('\\');
                            value.push(c);
                        }
                        EscapeResult::Eof => {
                            self.errors.push(CompileError::syntax(
                                "unterminated string literal".to_string(),
                                Span::new(start, self.current_pos),
                            ));
                            return;
                        }
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
        self.add_token(TokenKind::String(value), start);
    }
}
