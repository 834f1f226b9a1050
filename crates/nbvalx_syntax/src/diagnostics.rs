//! Diagnostics for the nbvalx syntax frontend.
//!
//! [`CompileError`] is the error value produced by the lexer and parser. It carries a byte [`Span`] into the text
//! that was parsed, so callers can render a labelled snippet with [`CompileError::to_report`].

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, NamedSource, SourceSpan};

use crate::ast::Span;

/// A syntax error with location information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct CompileError {
    pub message: String,
    pub span: Span,
    pub kind: ErrorKind,
    pub notes: Vec<String>,
    pub hints: Vec<String>,
}

impl CompileError {
    pub fn new(message: String, span: Span) -> Self {
        Self {
            message,
            span,
            kind: ErrorKind::Error,
            notes: Vec::new(),
            hints: Vec::new(),
        }
    }

    pub fn syntax(message: String, span: Span) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            ..Self::new(message, span)
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Attach the parsed text so the error renders with a labelled snippet.
    pub fn to_report(&self, name: &str, source: &str) -> SourceDiagnostic {
        let help = (!self.hints.is_empty()).then(|| self.hints.join("\n"));
        let mut message = self.to_string();
        for note in &self.notes {
            message.push_str("\nnote: ");
            message.push_str(note);
        }
        let len = self.span.end.saturating_sub(self.span.start).max(1);
        let start = self.span.start.min(source.len());
        SourceDiagnostic {
            message,
            src: Arc::new(NamedSource::new(name, source.to_string())),
            span: SourceSpan::new(start.into(), len.min(source.len().saturating_sub(start).max(1))),
            help,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    /// Rendered as `SyntaxError`, the name notebook users know.
    Syntax,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Error => write!(f, "error"),
            ErrorKind::Syntax => write!(f, "SyntaxError"),
        }
    }
}

/// A [`CompileError`] bound to its source text, renderable by `miette`.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("{message}")]
pub struct SourceDiagnostic {
    message: String,
    #[source_code]
    src: Arc<NamedSource<String>>,
    #[label("here")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
}

/// Join several errors into one human-readable message (one error per line).
pub fn join_errors(errors: &[CompileError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}
