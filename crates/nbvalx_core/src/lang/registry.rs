//! Shareable metadata for `nbvalx_core::lang` registries.
//!
//! The `nbvalx_core::lang` module is a set of **registry-first** vocabularies. This submodule provides the small,
//! dependency-free metadata shape reused across them.
//!
//! ## Notes
//! - These types are intentionally lightweight and `Copy`-friendly so registries can live in `const` tables.
//! - Metadata is meant for tooling/docs/diagnostics; enforcement of syntax rules still lives in the lexer/parser.

/// Shared metadata shape for “registry-first” vocabulary items.
///
/// Many vocabularies share the same core fields:
/// - stable identity (`id`)
/// - accepted spellings (`canonical` + `aliases`)
/// - documentation (`description`)
///
/// Registries that need extra per-item data (e.g. operator precedence, marker flags) define their own info type.
///
/// ## Notes
/// - `description` is intentionally mandatory to keep docs/tooling consistent.
#[derive(Debug, Clone, Copy)]
pub struct LangItemInfo<Id> {
    pub id: Id,
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
}

impl<Id: Copy + PartialEq> LangItemInfo<Id> {
    /// Return `true` if `spelling` is the canonical spelling or one of the aliases.
    pub fn matches(&self, spelling: &str) -> bool {
        self.canonical == spelling || self.aliases.contains(&spelling)
    }
}

/// Resolve a spelling against a registry table (canonical spellings first, then aliases).
pub fn lookup<Id: Copy + PartialEq>(table: &[LangItemInfo<Id>], spelling: &str) -> Option<Id> {
    if let Some(item) = table.iter().find(|i| i.canonical == spelling) {
        return Some(item.id);
    }
    table.iter().find(|i| i.aliases.contains(&spelling)).map(|i| i.id)
}
