//! Magic vocabulary.
//!
//! Notebooks drive nbvalx through IPython-style magics embedded in cell source: `%name args` (line magic, the rest of
//! the line is the argument) and `%%name args` (cell magic, the first line carries the arguments and the rest of the
//! cell is the body). This registry records the magics nbvalx understands or injects, together with the form(s) in
//! which they may appear.
//!
//! ## Notes
//! - Registration magics accept both forms: `%register_allowed_run_if_tags a: 1, 2` and a cell whose first line is
//!   `%%register_allowed_run_if_tags` followed by one declaration per line.
//! - `live_log` and `px` are never written by users; they are injected into materialized notebooks.
//!
//! ## Examples
//! ```rust
//! use nbvalx_core::lang::magics::{self, MagicId, MagicKind};
//!
//! assert_eq!(magics::from_str("run_if"), Some(MagicId::RunIf));
//! assert_eq!(magics::kind(MagicId::RunIf), MagicKind::Cell);
//! assert_eq!(magics::cell_prefix(MagicId::RunIf), "%%run_if");
//! ```

use super::registry::LangItemInfo;

/// Name under which the extension is loaded (`%load_ext nbvalx`).
pub const EXTENSION_NAME: &str = "nbvalx";

/// Trailing character that continues a magic line onto the next physical line.
pub const CONTINUATION: char = '\\';

/// Variable assigned by the notebook-name marker cell.
pub const NOTEBOOK_NAME_MARKER: &str = "__notebook_name__";

/// Stable identifier for every magic nbvalx knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagicId {
    /// `%load_ext` (host magic, recognized to find the extension-load cell).
    LoadExt,
    RegisterAllowedRunIfTags,
    RegisterCurrentRunIfTags,
    RegisterAllowedRunIfParameters,
    RegisterCurrentRunIfParameters,
    RunIf,
    /// Injected logging wrapper.
    LiveLog,
    /// Injected parallel execution wrapper.
    Px,
}

/// Which invocation forms a magic supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagicKind {
    Line,
    Cell,
    LineOrCell,
}

/// Metadata for a magic.
#[derive(Debug, Clone, Copy)]
pub struct MagicInfo {
    pub item: LangItemInfo<MagicId>,
    pub kind: MagicKind,
    /// Registered by the nbvalx extension itself (as opposed to the host or an injected bootstrap cell).
    pub provided_by_extension: bool,
}

/// Registry of all magics.
pub const MAGICS: &[MagicInfo] = &[
    info(MagicId::LoadExt, "load_ext", MagicKind::Line, false, "Load an IPython extension."),
    info(
        MagicId::RegisterAllowedRunIfTags,
        "register_allowed_run_if_tags",
        MagicKind::LineOrCell,
        true,
        "Declare the allowed values of each tag.",
    ),
    info(
        MagicId::RegisterCurrentRunIfTags,
        "register_current_run_if_tags",
        MagicKind::LineOrCell,
        true,
        "Bind each tag to its current value.",
    ),
    info(
        MagicId::RegisterAllowedRunIfParameters,
        "register_allowed_run_if_parameters",
        MagicKind::LineOrCell,
        true,
        "Declare the allowed values of each parameter.",
    ),
    info(
        MagicId::RegisterCurrentRunIfParameters,
        "register_current_run_if_parameters",
        MagicKind::LineOrCell,
        true,
        "Bind each parameter to its current value and define it as a variable.",
    ),
    info(
        MagicId::RunIf,
        "run_if",
        MagicKind::Cell,
        true,
        "Run the cell body only if the condition holds.",
    ),
    info(
        MagicId::LiveLog,
        "live_log",
        MagicKind::Cell,
        false,
        "Run the cell body while mirroring its input and stdout to the notebook log file.",
    ),
    info(MagicId::Px, "px", MagicKind::Cell, false, "Run the cell body on every parallel engine."),
];

/// Canonical name (without `%` prefix).
pub fn as_str(id: MagicId) -> &'static str {
    info_for(id).item.canonical
}

/// Supported invocation forms.
pub fn kind(id: MagicId) -> MagicKind {
    info_for(id).kind
}

/// Full metadata.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: MagicId) -> &'static MagicInfo {
    MAGICS.iter().find(|m| m.item.id == id).expect("magic info missing")
}

/// Lookup by name (without `%` prefix).
pub fn from_str(name: &str) -> Option<MagicId> {
    MAGICS.iter().find(|e| e.item.matches(name)).map(|e| e.item.id)
}

/// `%name`.
pub fn line_prefix(id: MagicId) -> String {
    format!("%{}", as_str(id))
}

/// `%%name`.
pub fn cell_prefix(id: MagicId) -> String {
    format!("%%{}", as_str(id))
}

/// Magics the extension registers into the host on load.
pub fn extension_magics() -> impl Iterator<Item = &'static MagicInfo> {
    MAGICS.iter().filter(|m| m.provided_by_extension)
}

/// A magic invocation recognized at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicInvocation<'a> {
    pub id: MagicId,
    /// `true` for `%%name`, `false` for `%name`.
    pub is_cell: bool,
    /// Text after the magic name, with surrounding whitespace removed.
    pub args: &'a str,
}

/// Recognize `%name args` / `%%name args` at the start of `line`.
///
/// ## Returns
/// - `None` if the line is not a magic, names an unknown magic, or uses a form the magic does not support.
pub fn parse_invocation(line: &str) -> Option<MagicInvocation<'_>> {
    let (is_cell, rest) = if let Some(rest) = line.strip_prefix("%%") {
        (true, rest)
    } else if let Some(rest) = line.strip_prefix('%') {
        (false, rest)
    } else {
        return None;
    };
    let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let id = from_str(&rest[..name_end])?;
    let allowed = match kind(id) {
        MagicKind::Line => !is_cell,
        MagicKind::Cell => is_cell,
        MagicKind::LineOrCell => true,
    };
    allowed.then(|| MagicInvocation {
        id,
        is_cell,
        args: rest[name_end..].trim(),
    })
}

const fn info(
    id: MagicId,
    canonical: &'static str,
    kind: MagicKind,
    provided_by_extension: bool,
    description: &'static str,
) -> MagicInfo {
    MagicInfo {
        item: LangItemInfo {
            id,
            canonical,
            aliases: &[],
            description,
        },
        kind,
        provided_by_extension,
    }
}
