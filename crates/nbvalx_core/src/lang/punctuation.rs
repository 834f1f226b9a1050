//! Punctuation vocabulary.
//!
//! The condition language and the declaration blocks only need a handful of separators and delimiters: `,` separates
//! allowed values and tuple/list items, `:` separates a name from its allowed values, and brackets group.
//!
//! ## Examples
//! ```rust
//! use nbvalx_core::lang::punctuation::{self, PunctuationId};
//!
//! assert_eq!(punctuation::from_str(":"), Some(PunctuationId::Colon));
//! assert_eq!(punctuation::as_str(PunctuationId::LBracket), "[");
//! ```

use super::registry::{self, LangItemInfo};

/// Stable identifier for punctuation tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunctuationId {
    Comma,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

/// Registry of all punctuation tokens.
pub const PUNCTUATION: &[LangItemInfo<PunctuationId>] = &[
    info(PunctuationId::Comma, ",", "Separates values in declarations, tuples and lists."),
    info(PunctuationId::Colon, ":", "Separates a name from its allowed values."),
    info(PunctuationId::LParen, "(", "Opens a group or tuple."),
    info(PunctuationId::RParen, ")", "Closes a group or tuple."),
    info(PunctuationId::LBracket, "[", "Opens a list."),
    info(PunctuationId::RBracket, "]", "Closes a list."),
];

/// Canonical spelling.
pub fn as_str(id: PunctuationId) -> &'static str {
    info_for(id).canonical
}

/// Full metadata.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: PunctuationId) -> &'static LangItemInfo<PunctuationId> {
    PUNCTUATION.iter().find(|p| p.id == id).expect("punctuation info missing")
}

/// Lookup by spelling.
pub fn from_str(s: &str) -> Option<PunctuationId> {
    registry::lookup(PUNCTUATION, s)
}

/// Return `true` if this token opens a bracketed region.
pub fn is_open(id: PunctuationId) -> bool {
    matches!(id, PunctuationId::LParen | PunctuationId::LBracket)
}

/// Return `true` if this token closes a bracketed region.
pub fn is_close(id: PunctuationId) -> bool {
    matches!(id, PunctuationId::RParen | PunctuationId::RBracket)
}

const fn info(id: PunctuationId, canonical: &'static str, description: &'static str) -> LangItemInfo<PunctuationId> {
    LangItemInfo {
        id,
        canonical,
        aliases: &[],
        description,
    }
}
