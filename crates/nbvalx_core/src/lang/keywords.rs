//! Define the reserved keyword vocabulary of the condition language.
//!
//! Conditions attached to `%%run_if` are small Python-like expressions. This module is the single source of truth
//! for the words that cannot be used as tag or parameter names: a stable identifier ([`KeywordId`]) plus a const
//! metadata table ([`KEYWORDS`]).
//!
//! ## Notes
//! - Lookup via [`from_str`] is **case-sensitive** (`True` is a keyword, `true` is a name).
//! - Some reserved words are also “word operators” (e.g. `and`). If you need operator precedence/fixity, use
//!   [`crate::lang::operators`].
//!
//! ## Examples
//! ```rust
//! use nbvalx_core::lang::keywords::{self, KeywordId};
//!
//! assert_eq!(keywords::from_str("True"), Some(KeywordId::True));
//! assert_eq!(keywords::as_str(KeywordId::Not), "not");
//! assert_eq!(keywords::from_str("true"), None);
//! ```

use super::registry::LangItemInfo;

/// Stable identifier for every reserved keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordId {
    // Literals
    True,
    False,
    None,

    // Word operators
    And,
    Or,
    Not,
    In,
    Is,
}

/// Broad grouping for keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordCategory {
    /// Constant literals (`True`, `False`, `None`).
    Literal,
    /// Word operators (`and`, `or`, `not`, `in`, `is`).
    Operator,
}

/// Metadata for a keyword.
#[derive(Debug, Clone, Copy)]
pub struct KeywordInfo {
    pub item: LangItemInfo<KeywordId>,
    pub category: KeywordCategory,
}

/// Registry of all reserved keywords.
pub const KEYWORDS: &[KeywordInfo] = &[
    info(KeywordId::True, "True", KeywordCategory::Literal, "Boolean true literal."),
    info(KeywordId::False, "False", KeywordCategory::Literal, "Boolean false literal."),
    info(KeywordId::None, "None", KeywordCategory::Literal, "The absent-value literal."),
    info(KeywordId::And, "and", KeywordCategory::Operator, "Short-circuit conjunction."),
    info(KeywordId::Or, "or", KeywordCategory::Operator, "Short-circuit disjunction."),
    info(KeywordId::Not, "not", KeywordCategory::Operator, "Boolean negation; also part of `not in`."),
    info(KeywordId::In, "in", KeywordCategory::Operator, "Membership test."),
    info(KeywordId::Is, "is", KeywordCategory::Operator, "Identity test; also part of `is not`."),
];

/// Canonical spelling.
pub fn as_str(id: KeywordId) -> &'static str {
    info_for(id).item.canonical
}

/// Category.
pub fn category(id: KeywordId) -> KeywordCategory {
    info_for(id).category
}

/// Full metadata.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: KeywordId) -> &'static KeywordInfo {
    KEYWORDS.iter().find(|k| k.item.id == id).expect("keyword info missing")
}

/// Lookup by spelling.
///
/// ## Returns
/// - `Some(KeywordId)` if the spelling matches this registry.
/// - `None` otherwise.
pub fn from_str(s: &str) -> Option<KeywordId> {
    KEYWORDS.iter().find(|k| k.item.matches(s)).map(|k| k.item.id)
}

/// Return `true` if `s` is reserved and therefore cannot name a tag or parameter.
pub fn is_reserved(s: &str) -> bool {
    from_str(s).is_some()
}

// --- helpers -----------------------------------------------------------------

const fn info(
    id: KeywordId,
    canonical: &'static str,
    category: KeywordCategory,
    description: &'static str,
) -> KeywordInfo {
    KeywordInfo {
        item: LangItemInfo {
            id,
            canonical,
            aliases: &[],
            description,
        },
        category,
    }
}
