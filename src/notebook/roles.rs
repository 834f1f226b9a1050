//! Classification of code cells by the nbvalx construct they carry.

use nbvalx_core::lang::magics::{self, EXTENSION_NAME, MagicId, MagicInvocation, NOTEBOOK_NAME_MARKER};

use super::Cell;
use crate::magics::RunIfKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRole {
    /// `%load_ext nbvalx`
    LoadExtension,
    /// `%register_allowed_run_if_*`
    AllowedDeclaration(RunIfKind),
    /// `%register_current_run_if_*`
    CurrentDeclaration(RunIfKind),
    /// A cell with a `%%run_if` guard; `line` is the index of the guard line.
    RunIfGuard { line: usize },
    /// `__notebook_name__ = ...`
    NotebookName,
    Other,
}

/// Magic invocations on the leading `%` lines of a cell, with their line index.
pub fn leading_magics(source: &str) -> impl Iterator<Item = (usize, Option<MagicInvocation<'_>>)> {
    source
        .lines()
        .enumerate()
        .take_while(|(_, line)| line.trim_start().starts_with('%'))
        .map(|(index, line)| (index, magics::parse_invocation(line.trim_start())))
}

pub fn classify(cell: &Cell) -> CellRole {
    if !cell.is_code() {
        return CellRole::Other;
    }
    let first = cell.source.lines().next().unwrap_or("").trim_start();
    if let Some(invocation) = magics::parse_invocation(first) {
        match invocation.id {
            MagicId::LoadExt if invocation.args == EXTENSION_NAME => return CellRole::LoadExtension,
            id => {
                if let Some((kind, is_allowed)) = RunIfKind::of_magic(id) {
                    return if is_allowed {
                        CellRole::AllowedDeclaration(kind)
                    } else {
                        CellRole::CurrentDeclaration(kind)
                    };
                }
            }
        }
    }
    if is_name_marker(first) {
        return CellRole::NotebookName;
    }
    leading_magics(&cell.source)
        .find(|(_, invocation)| matches!(invocation, Some(inv) if inv.id == MagicId::RunIf))
        .map_or(CellRole::Other, |(line, _)| CellRole::RunIfGuard { line })
}

fn is_name_marker(line: &str) -> bool {
    line.strip_prefix(NOTEBOOK_NAME_MARKER)
        .map(str::trim_start)
        .is_some_and(|rest| rest.starts_with('=') && !rest.starts_with("=="))
}
