//! Number scanning for the nbvalx lexer
//!
//! Handles integer and floating-point literals (`1`, `1_000`, `0.5`, `.5`, `1e-3`).

use super::Lexer;
use super::tokens::TokenKind;
use crate::ast::Span;
use crate::diagnostics::CompileError;

impl<'a> Lexer<'a> {
    pub(super) fn scan_number(&mut self, start: usize, first: char) {
        let mut value = String::from(first);
        let mut is_float = first == '.';

        let mut well_formed = self.scan_digits(&mut value);

        // Decimal part
        if !is_float && self.peek() == Some('.') {
            is_float = true;
            value.push('.');
            self.advance();
            well_formed &= self.scan_digits(&mut value);
        }

        // Exponent part
        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            value.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                value.push(sign);
                self.advance();
            }
            well_formed &= self.scan_digits(&mut value);
        }

        if !well_formed {
            self.errors.push(CompileError::syntax(
                "invalid decimal literal".to_string(),
                Span::new(start, self.current_pos),
            ));
            return;
        }

        if is_float {
            match value.parse::<f64>() {
                Ok(f) => self.add_token(TokenKind::Float(f), start),
                Err(_) => self.errors.push(CompileError::syntax(
                    format!("invalid float literal: {}", value),
                    Span::new(start, self.current_pos),
                )),
            }
        } else {
            match value.parse::<i64>() {
                Ok(i) => self.add_token(TokenKind::Int(i), start),
                Err(_) => self.errors.push(CompileError::syntax(
                    format!("invalid integer literal: {}", value),
                    Span::new(start, self.current_pos),
                )),
            }
        }
    }

    /// Consume a run of digits, dropping `_` separators.
    ///
    /// Returns `false` when a separator is not placed between two digits (`1_`, `1__0`, `1._5`).
    fn scan_digits(&mut self, value: &mut String) -> bool {
        let mut after_digit = value.ends_with(|c: char| c.is_ascii_digit());
        let mut well_formed = true;
        let mut trailing_separator = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                value.push(c);
                after_digit = true;
                trailing_separator = false;
            } else if c == '_' {
                well_formed &= after_digit;
                after_digit = false;
                trailing_separator = true;
            } else {
                break;
            }
            self.advance();
        }
        well_formed && !trailing_separator
    }
}
