//! Operator vocabulary.
//!
//! This module defines the canonical operator set of the condition language (symbol operators like `+` and word
//! operators like `and`) along with basic metadata such as precedence, associativity, and fixity.
//!
//! ## Notes
//! - Lookup via [`from_str`] is **case-sensitive**.
//! - Some operators are spelled using reserved words (e.g. `"and"`). Those entries have
//!   [`OperatorInfo::is_keyword_spelling`] set to `true`.
//! - `=` is only valid inside parameter assignment blocks, never inside a condition.
//! - Precedence mirrors Python: `or` < `and` < `not` < comparisons < `+ -` < `* / // %` < unary `-`/`+` < `**`.
//!
//! ## Examples
//! ```rust
//! use nbvalx_core::lang::operators::{self, OperatorId};
//!
//! assert_eq!(operators::from_str("//"), Some(OperatorId::SlashSlash));
//! assert!(operators::info_for(OperatorId::Star).precedence > operators::info_for(OperatorId::Plus).precedence);
//! ```

/// Define how operators associate when chained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Associativity {
    Left,
    Right,
    /// Comparisons chain (`a < b < c`) instead of associating.
    Chain,
    None,
}

/// Define whether an operator is infix (binary) or prefix (unary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fixity {
    Infix,
    Prefix,
}

/// Stable identifier for every operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorId {
    // Arithmetic
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,

    // Comparison
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Assignment (parameter blocks only)
    Eq,

    // Word operators
    And,
    Or,
    Not,
    In,
    Is,
}

/// Metadata for an operator.
///
/// ## Notes
/// - `precedence` is a relative ordering where higher binds tighter. The absolute scale is an implementation detail,
///   but must be consistent across the parser.
/// - `+`/`-` are listed once as infix; the parser also accepts them in prefix position with unary precedence
///   [`UNARY_PRECEDENCE`].
#[derive(Debug, Clone, Copy)]
pub struct OperatorInfo {
    pub id: OperatorId,
    pub spellings: &'static [&'static str],
    pub precedence: u8,
    pub associativity: Associativity,
    pub fixity: Fixity,
    pub is_keyword_spelling: bool,
}

/// Binding power of prefix `-` and `+`.
pub const UNARY_PRECEDENCE: u8 = 65;

/// Registry of all operators.
pub const OPERATORS: &[OperatorInfo] = &[
    // Arithmetic
    op(OperatorId::Plus, &["+"], 50, Associativity::Left, Fixity::Infix, false),
    op(OperatorId::Minus, &["-"], 50, Associativity::Left, Fixity::Infix, false),
    op(OperatorId::Star, &["*"], 60, Associativity::Left, Fixity::Infix, false),
    op(OperatorId::StarStar, &["**"], 70, Associativity::Right, Fixity::Infix, false),
    op(OperatorId::Slash, &["/"], 60, Associativity::Left, Fixity::Infix, false),
    op(OperatorId::SlashSlash, &["//"], 60, Associativity::Left, Fixity::Infix, false),
    op(OperatorId::Percent, &["%"], 60, Associativity::Left, Fixity::Infix, false),
    // Comparison
    op(OperatorId::EqEq, &["=="], 40, Associativity::Chain, Fixity::Infix, false),
    op(OperatorId::NotEq, &["!="], 40, Associativity::Chain, Fixity::Infix, false),
    op(OperatorId::Lt, &["<"], 40, Associativity::Chain, Fixity::Infix, false),
    op(OperatorId::LtEq, &["<="], 40, Associativity::Chain, Fixity::Infix, false),
    op(OperatorId::Gt, &[">"], 40, Associativity::Chain, Fixity::Infix, false),
    op(OperatorId::GtEq, &[">="], 40, Associativity::Chain, Fixity::Infix, false),
    // Assignment
    op(OperatorId::Eq, &["="], 10, Associativity::None, Fixity::Infix, false),
    // Word operators (keyword spellings)
    op(OperatorId::And, &["and"], 30, Associativity::Left, Fixity::Infix, true),
    op(OperatorId::Or, &["or"], 20, Associativity::Left, Fixity::Infix, true),
    op(OperatorId::Not, &["not"], 35, Associativity::None, Fixity::Prefix, true),
    op(OperatorId::In, &["in"], 40, Associativity::Chain, Fixity::Infix, true),
    op(OperatorId::Is, &["is"], 40, Associativity::Chain, Fixity::Infix, true),
];

/// Return the full metadata entry for an operator.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: OperatorId) -> &'static OperatorInfo {
    OPERATORS.iter().find(|o| o.id == id).expect("operator info missing")
}

/// Canonical spelling (first entry of `spellings`).
pub fn as_str(id: OperatorId) -> &'static str {
    info_for(id).spellings[0]
}

/// Resolve an operator spelling to its identifier.
///
/// ## Returns
/// - `Some(OperatorId)` if the spelling exists in [`OPERATORS`].
/// - `None` otherwise.
pub fn from_str(spelling: &str) -> Option<OperatorId> {
    OPERATORS
        .iter()
        .find(|o| o.spellings.contains(&spelling))
        .map(|o| o.id)
}

/// Symbol spellings sorted longest-first, for maximal-munch tokenization.
pub fn symbol_spellings_longest_first() -> Vec<(&'static str, OperatorId)> {
    let mut out: Vec<(&'static str, OperatorId)> = OPERATORS
        .iter()
        .filter(|o| !o.is_keyword_spelling)
        .flat_map(|o| o.spellings.iter().map(move |s| (*s, o.id)))
        .collect();
    out.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    out
}

// --- helpers -----------------------------------------------------------------

const fn op(
    id: OperatorId,
    spellings: &'static [&'static str],
    precedence: u8,
    associativity: Associativity,
    fixity: Fixity,
    is_keyword_spelling: bool,
) -> OperatorInfo {
    OperatorInfo {
        id,
        spellings,
        precedence,
        associativity,
        fixity,
        is_keyword_spelling,
    }
}
