//! Expansion of one notebook into one materialized notebook per tag combination.
//!
//! The setup cells of the notebook (`%load_ext nbvalx` and the registration magics) are replayed through an
//! [`Extension`], so declarations are validated exactly as they would be in a live session. Each combination of
//! the declared tag values then yields an independent copy of the cells in which:
//!
//! - the current-tags cell binds that combination;
//! - with tag collapse, guards are resolved statically: cells whose condition is false are dropped, the guard
//!   line of the others is removed, and the setup cells become unnecessary;
//! - the `__notebook_name__` cell names the materialized file.
//!
//! Guards that depend on parameters cannot be resolved offline and are kept for live evaluation.

use std::path::{Path, PathBuf};

use nbvalx_core::lang::magics::{self, EXTENSION_NAME, MagicId, NOTEBOOK_NAME_MARKER};
use nbvalx_syntax::diagnostics::SourceDiagnostic;
use nbvalx_syntax::parser::expression_from_source;

use super::roles::{CellRole, classify};
use super::{Cell, NOTEBOOK_EXTENSION, Notebook};
use crate::magics::evaluator::evaluate_condition;
use crate::magics::splitter::{first_line, split};
use crate::magics::{AllowedValues, Bindings, EvalError, Extension, MagicError, RecordingShell, RunIfKind};

#[derive(Debug, thiserror::Error)]
pub enum ExpandError {
    #[error("cell {cell}: Use a standalone cell for {magic}")]
    NotStandalone { cell: usize, magic: String },
    #[error("cell {cell}: {magic} is used before %load_ext {}", EXTENSION_NAME)]
    NotLoaded { cell: usize, magic: String },
    #[error("cell {cell}: {source}")]
    Magic { cell: usize, source: MagicError },
    #[error("cell {cell}: '{name}' is neither a declared tag nor a declared parameter")]
    Undeclared { cell: usize, name: String },
}

impl ExpandError {
    fn magic(cell: usize, source: MagicError) -> Self {
        ExpandError::Magic { cell, source }
    }

    pub fn cell(&self) -> usize {
        match self {
            ExpandError::NotStandalone { cell, .. }
            | ExpandError::NotLoaded { cell, .. }
            | ExpandError::Magic { cell, .. }
            | ExpandError::Undeclared { cell, .. } => *cell,
        }
    }

    /// Labelled snippets for syntax errors in the offending cell.
    pub fn diagnostics(&self, name: &str) -> Vec<SourceDiagnostic> {
        match self {
            ExpandError::Magic { source, .. } => source.diagnostics(name),
            _ => Vec::new(),
        }
    }
}

/// Declarations found in a notebook's setup cells.
#[derive(Debug, Clone, Default)]
pub struct Setup {
    pub loaded: bool,
    pub tags: AllowedValues,
    pub parameters: AllowedValues,
}

impl Setup {
    pub fn is_tagged(&self) -> bool {
        self.loaded && !self.tags.is_empty()
    }

    fn declares(&self, name: &str) -> bool {
        self.tags.contains(name) || self.parameters.contains(name)
    }
}

/// One point of the cartesian product of the declared tag values.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    bindings: Bindings,
}

impl Combination {
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// `name=value,...` in declaration order; used in file names and matched by the keyword filter.
    pub fn label(&self) -> String {
        self.bindings
            .iter()
            .map(|(name, value)| format!("{name}={}", value.label()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// All combinations, first declared tag varying slowest.
pub fn combinations(tags: &AllowedValues) -> Vec<Combination> {
    if tags.is_empty() {
        return Vec::new();
    }
    let mut partial = vec![Bindings::new()];
    for (name, values) in tags.iter() {
        partial = partial
            .iter()
            .flat_map(|bindings| {
                values.iter().map(move |value| {
                    let mut next = bindings.clone();
                    next.insert(name, value.clone());
                    next
                })
            })
            .collect();
    }
    partial.into_iter().map(|bindings| Combination { bindings }).collect()
}

#[derive(Debug, Clone, Default)]
pub struct ExpandOptions {
    pub tag_collapse: bool,
    /// Only the combination whose label equals the keyword is produced.
    pub keyword: Option<String>,
    /// Output directory, relative to the directory of the source notebook.
    pub work_dir: PathBuf,
}

/// A materialized notebook and where it goes.
#[derive(Debug, Clone)]
pub struct Expanded {
    pub combination: Option<Combination>,
    pub path: PathBuf,
    pub notebook: Notebook,
}

/// Replay the setup cells and collect the declarations, failing on malformed or misplaced setup cells.
pub fn scan_setup(notebook: &Notebook) -> Result<Setup, ExpandError> {
    let mut extension = Extension::new();
    let mut shell = RecordingShell::new();
    let mut guards = Vec::new();

    for (index, cell) in notebook.cells.iter().enumerate() {
        match classify(cell) {
            CellRole::LoadExtension => {
                require_single_line(cell, index, &format!("%load_ext {EXTENSION_NAME}"))?;
                extension.load(&mut shell);
            }
            CellRole::AllowedDeclaration(kind) => {
                let block = declaration_block(cell, index, kind.allowed_magic(), &extension)?;
                extension
                    .register_allowed(kind, block)
                    .map_err(|source| ExpandError::magic(index, source))?;
            }
            CellRole::CurrentDeclaration(kind) => {
                let block = declaration_block(cell, index, kind.current_magic(), &extension)?;
                extension
                    .register_current(kind, block, &mut shell)
                    .map_err(|source| ExpandError::magic(index, source))?;
            }
            CellRole::NotebookName => require_single_line(cell, index, NOTEBOOK_NAME_MARKER)?,
            CellRole::RunIfGuard { line } => {
                if !extension.is_loaded() {
                    return Err(ExpandError::NotLoaded {
                        cell: index,
                        magic: magics::cell_prefix(MagicId::RunIf),
                    });
                }
                guards.push((index, guard_condition(cell, line, index)?));
            }
            CellRole::Other => {}
        }
    }

    let setup = Setup {
        loaded: extension.is_loaded(),
        tags: extension.allowed(RunIfKind::Tags).clone(),
        parameters: extension.allowed(RunIfKind::Parameters).clone(),
    };
    for (index, condition) in &guards {
        let expr = expression_from_source(condition)
            .map_err(|errors| ExpandError::magic(*index, MagicError::syntax(condition, errors)))?;
        if let Some(name) = expr.node.names().into_iter().find(|name| !setup.declares(name)) {
            return Err(ExpandError::Undeclared {
                cell: *index,
                name: name.to_string(),
            });
        }
    }
    Ok(setup)
}

fn require_single_line(cell: &Cell, index: usize, magic: &str) -> Result<(), ExpandError> {
    if cell.statement_lines() == 1 {
        Ok(())
    } else {
        Err(ExpandError::NotStandalone {
            cell: index,
            magic: magic.to_string(),
        })
    }
}

/// The declaration text of a registration cell: the line arguments, or the body for the cell form.
fn declaration_block<'c>(
    cell: &'c Cell,
    index: usize,
    id: MagicId,
    extension: &Extension,
) -> Result<&'c str, ExpandError> {
    let (head, body) = first_line(&cell.source);
    let name = magics::line_prefix(id);
    if !extension.is_loaded() {
        return Err(ExpandError::NotLoaded { cell: index, magic: name });
    }
    let Some(invocation) = magics::parse_invocation(head.trim_start()) else {
        return Err(ExpandError::NotStandalone { cell: index, magic: name });
    };
    if invocation.is_cell {
        Ok(body)
    } else {
        require_single_line(cell, index, &name)?;
        Ok(invocation.args)
    }
}

/// The reassembled condition of the guard on line `line`.
fn guard_condition(cell: &Cell, line: usize, index: usize) -> Result<String, ExpandError> {
    let parts = GuardParts::locate(&cell.source, line).ok_or_else(|| ExpandError::NotStandalone {
        cell: index,
        magic: magics::cell_prefix(MagicId::RunIf),
    })?;
    Ok(split(parts.args, parts.body).0)
}

/// A cell source cut around its `%%run_if` line.
struct GuardParts<'a> {
    /// Magic lines before the guard, with their newlines.
    before: &'a str,
    /// Text after `%%run_if` on the guard line.
    args: &'a str,
    /// Everything after the guard line.
    body: &'a str,
}

impl<'a> GuardParts<'a> {
    fn locate(source: &'a str, line: usize) -> Option<Self> {
        let start: usize = source.split_inclusive('\n').take(line).map(str::len).sum();
        let rest = source.get(start..)?;
        let (guard, body) = first_line(rest);
        let invocation = magics::parse_invocation(guard.trim_start())?;
        (invocation.id == MagicId::RunIf).then(|| GuardParts {
            before: &source[..start],
            args: invocation.args,
            body,
        })
    }
}

/// What tag collapse does with a guarded cell.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Collapsed {
    /// Condition holds: the cell without its guard.
    Keep(String),
    /// Condition fails: the cell is removed.
    Drop,
    /// Condition needs parameter values: the cell is kept as is.
    Live,
}

fn collapse_guard(cell: &Cell, line: usize, index: usize, tags: &Bindings) -> Result<Collapsed, ExpandError> {
    let parts = GuardParts::locate(&cell.source, line).ok_or_else(|| ExpandError::NotStandalone {
        cell: index,
        magic: magics::cell_prefix(MagicId::RunIf),
    })?;
    let (condition, code) = split(parts.args, parts.body);
    let expr = expression_from_source(&condition)
        .map_err(|errors| ExpandError::magic(index, MagicError::syntax(&condition, errors)))?;
    match evaluate_condition(&expr, tags) {
        Ok(true) => Ok(Collapsed::Keep(format!("{}{}", parts.before, code))),
        Ok(false) => Ok(Collapsed::Drop),
        Err(EvalError::Name(_)) => Ok(Collapsed::Live),
        Err(err) => Err(ExpandError::magic(index, err.into())),
    }
}

fn current_tags_source(cell: &Cell, combination: &Combination) -> String {
    let assignments: Vec<String> = combination
        .bindings()
        .iter()
        .map(|(name, value)| format!("{name} = {value}"))
        .collect();
    let magic = RunIfKind::Tags.current_magic();
    let is_cell_form = cell.source.trim_start().starts_with("%%");
    match assignments.as_slice() {
        [single] if !is_cell_form => format!("{} {single}", magics::line_prefix(magic)),
        _ => format!("{}\n{}", magics::cell_prefix(magic), assignments.join("\n")),
    }
}

/// `__notebook_name__ = "<relative path>"`.
pub fn notebook_name_source(relative: &str) -> String {
    // A JSON string literal is also a valid Python string literal.
    let quoted = serde_json::to_string(relative).unwrap_or_else(|_| format!("\"{relative}\""));
    format!("{NOTEBOOK_NAME_MARKER} = {quoted}")
}

/// The materialized file name: `<stem>[<label>].ipynb`, or the original name without a combination.
pub fn output_file_name(source: &Path, combination: Option<&Combination>) -> String {
    let stem = source.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    match combination {
        Some(combination) => format!("{stem}[{}].{NOTEBOOK_EXTENSION}", combination.label()),
        None => format!("{stem}.{NOTEBOOK_EXTENSION}"),
    }
}

/// Expand `notebook`, read from `source`, into its materialized copies.
///
/// ## Errors
/// Any setup-cell or guard problem aborts the whole notebook: no partial output is returned.
#[tracing::instrument(skip_all, fields(source = %source.display(), collapse = options.tag_collapse))]
pub fn expand(notebook: &Notebook, source: &Path, options: &ExpandOptions) -> Result<Vec<Expanded>, ExpandError> {
    let setup = scan_setup(notebook)?;
    let selected: Vec<Option<Combination>> = if setup.is_tagged() {
        combinations(&setup.tags)
            .into_iter()
            .filter(|c| options.keyword.as_ref().is_none_or(|k| *k == c.label()))
            .map(Some)
            .collect()
    } else if options.keyword.is_none() {
        vec![None]
    } else {
        Vec::new()
    };

    let source_dir = source.parent().unwrap_or(Path::new(""));
    selected
        .into_iter()
        .map(|combination| {
            let file_name = output_file_name(source, combination.as_ref());
            let relative = if options.work_dir.as_os_str().is_empty() || options.work_dir == Path::new(".") {
                file_name.clone()
            } else {
                format!("{}/{file_name}", options.work_dir.to_string_lossy().trim_end_matches('/'))
            };
            let cells = rewrite_cells(notebook, &setup, combination.as_ref(), options.tag_collapse, &relative)?;
            tracing::debug!(%relative, cells = cells.len(), "materialized combination");
            Ok(Expanded {
                combination,
                path: source_dir.join(&options.work_dir).join(&file_name),
                notebook: Notebook {
                    cells,
                    ..notebook.clone()
                },
            })
        })
        .collect()
}

fn rewrite_cells(
    notebook: &Notebook,
    setup: &Setup,
    combination: Option<&Combination>,
    tag_collapse: bool,
    relative_name: &str,
) -> Result<Vec<Cell>, ExpandError> {
    let collapsing = tag_collapse && combination.is_some();
    // Parameter magics still need the extension at run time.
    let drop_setup = collapsing && setup.parameters.is_empty();

    let mut cells = Vec::with_capacity(notebook.cells.len());
    for (index, cell) in notebook.cells.iter().enumerate() {
        match classify(cell) {
            CellRole::LoadExtension | CellRole::AllowedDeclaration(RunIfKind::Tags) => {
                if !drop_setup {
                    cells.push(cell.clone());
                }
            }
            CellRole::CurrentDeclaration(RunIfKind::Tags) => {
                if drop_setup {
                    continue;
                }
                let mut rewritten = cell.clone();
                if let Some(combination) = combination {
                    rewritten.source = current_tags_source(cell, combination);
                }
                cells.push(rewritten);
            }
            CellRole::RunIfGuard { line } if collapsing => {
                let tags = combination.map(Combination::bindings).cloned().unwrap_or_default();
                match collapse_guard(cell, line, index, &tags)? {
                    Collapsed::Keep(source) => cells.push(Cell {
                        source,
                        ..cell.clone()
                    }),
                    Collapsed::Drop => {}
                    Collapsed::Live => cells.push(cell.clone()),
                }
            }
            CellRole::NotebookName => cells.push(Cell {
                source: notebook_name_source(relative_name),
                ..cell.clone()
            }),
            _ => cells.push(cell.clone()),
        }
    }
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notebook(sources: &[&str]) -> Notebook {
        Notebook::from_cells(sources.iter().map(|s| Cell::code(*s)).collect())
    }

    fn options(collapse: bool) -> ExpandOptions {
        ExpandOptions {
            tag_collapse: collapse,
            keyword: None,
            work_dir: PathBuf::from(".ipynb_pytest/np_1/collapse_False"),
        }
    }

    fn sources(expanded: &Expanded) -> Vec<&str> {
        expanded.notebook.cells.iter().map(|c| c.source.as_str()).collect()
    }

    const TAGGED: &[&str] = &[
        "%load_ext nbvalx",
        "%register_allowed_run_if_tags backend: 'petsc', 'slepc'",
        "%register_current_run_if_tags backend = 'petsc'",
        "__notebook_name__ = \"demo.ipynb\"",
        "%%run_if backend == 'petsc'\nimport petsc4py",
        "%%run_if backend == 'slepc'\nimport slepc4py",
        "print('done')",
    ];

    #[test]
    fn test_combinations_vary_last_tag_fastest() {
        let setup = scan_setup(&notebook(&[
            "%load_ext nbvalx",
            "%%register_allowed_run_if_tags\na: 1, 2\nb: 'x', 'y', 'z'",
        ]))
        .unwrap();
        let labels: Vec<String> = combinations(&setup.tags).iter().map(Combination::label).collect();
        assert_eq!(labels, vec!["a=1,b=x", "a=1,b=y", "a=1,b=z", "a=2,b=x", "a=2,b=y", "a=2,b=z"]);
    }

    #[test]
    fn test_expand_without_collapse_keeps_guards() {
        let out = expand(&notebook(TAGGED), Path::new("dir/demo.ipynb"), &options(false)).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[1].path,
            PathBuf::from("dir/.ipynb_pytest/np_1/collapse_False/demo[backend=slepc].ipynb")
        );
        assert_eq!(
            sources(&out[1]),
            vec![
                "%load_ext nbvalx",
                "%register_allowed_run_if_tags backend: 'petsc', 'slepc'",
                "%register_current_run_if_tags backend = 'slepc'",
                "__notebook_name__ = \".ipynb_pytest/np_1/collapse_False/demo[backend=slepc].ipynb\"",
                "%%run_if backend == 'petsc'\nimport petsc4py",
                "%%run_if backend == 'slepc'\nimport slepc4py",
                "print('done')",
            ]
        );
    }

    #[test]
    fn test_expand_with_collapse_resolves_guards() {
        let out = expand(&notebook(TAGGED), Path::new("demo.ipynb"), &options(true)).unwrap();
        assert_eq!(
            sources(&out[0]),
            vec![
                "__notebook_name__ = \".ipynb_pytest/np_1/collapse_False/demo[backend=petsc].ipynb\"",
                "import petsc4py",
                "print('done')",
            ]
        );
    }

    #[test]
    fn test_collapse_keeps_leading_magics_and_continuations() {
        let nb = notebook(&[
            "%load_ext nbvalx",
            "%register_allowed_run_if_tags a: 1, 2",
            "%%time\n%%run_if a == 1 or \\\n  a == 3\nx = 1\ny = 2\n",
        ]);
        let out = expand(&nb, Path::new("n.ipynb"), &options(true)).unwrap();
        assert_eq!(sources(&out[0]), vec!["%%time\nx = 1\ny = 2\n"]);
        assert!(sources(&out[1]).is_empty());
    }

    #[test]
    fn test_parameter_guards_stay_live_under_collapse() {
        let nb = notebook(&[
            "%load_ext nbvalx",
            "%register_allowed_run_if_tags a: 1, 2",
            "%register_allowed_run_if_parameters p: 0.5, 1.0",
            "%register_current_run_if_parameters p = 0.5",
            "%%run_if a == 2 and p > 0.7\nx = 1",
            "%%run_if a == 1 and p > 0.7\ny = 1",
        ]);
        let out = expand(&nb, Path::new("n.ipynb"), &options(true)).unwrap();
        let first = sources(&out[0]);
        assert_eq!(first.len(), 5);
        assert_eq!(first[4], "%%run_if a == 1 and p > 0.7\ny = 1");
        assert_eq!(first[0], "%load_ext nbvalx");
    }

    #[test]
    fn test_untagged_notebook_is_cloned_unless_filtered() {
        let nb = notebook(&["x = 1"]);
        let out = expand(&nb, Path::new("plain.ipynb"), &options(true)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].notebook, nb);
        assert!(out[0].combination.is_none());

        let filtered = ExpandOptions {
            keyword: Some("a=1".to_string()),
            ..options(false)
        };
        assert!(expand(&nb, Path::new("plain.ipynb"), &filtered).unwrap().is_empty());
    }

    #[test]
    fn test_keyword_selects_one_combination() {
        let filtered = ExpandOptions {
            keyword: Some("backend=slepc".to_string()),
            ..options(false)
        };
        let out = expand(&notebook(TAGGED), Path::new("demo.ipynb"), &filtered).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].combination.as_ref().map(Combination::label).as_deref(), Some("backend=slepc"));

        let none = ExpandOptions {
            keyword: Some("backend=other".to_string()),
            ..options(false)
        };
        assert!(expand(&notebook(TAGGED), Path::new("demo.ipynb"), &none).unwrap().is_empty());
    }

    #[test]
    fn test_multi_line_setup_cells_fail_fast() {
        let err = scan_setup(&notebook(&["%load_ext nbvalx\nimport os"])).unwrap_err();
        assert_eq!(err.to_string(), "cell 0: Use a standalone cell for %load_ext nbvalx");

        let err = scan_setup(&notebook(&[
            "%load_ext nbvalx",
            "%register_allowed_run_if_tags a: 1\nb = 2",
        ]))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cell 1: Use a standalone cell for %register_allowed_run_if_tags"
        );

        let err = scan_setup(&notebook(&["__notebook_name__ = 'x'\ny = 1"])).unwrap_err();
        assert!(matches!(err, ExpandError::NotStandalone { cell: 0, .. }));
    }

    #[test]
    fn test_declaration_before_load() {
        let err = scan_setup(&notebook(&["%register_allowed_run_if_tags a: 1"])).unwrap_err();
        assert!(matches!(err, ExpandError::NotLoaded { cell: 0, .. }));
    }

    #[test]
    fn test_declaration_errors_carry_the_cell() {
        let err = scan_setup(&notebook(&["%load_ext nbvalx", "%register_allowed_run_if_tags a: one"])).unwrap_err();
        assert_eq!(err.cell(), 1);
        assert!(err.to_string().contains("string values must be quoted"));
        assert_eq!(err.diagnostics("cell 1").len(), 1);
    }

    #[test]
    fn test_guard_with_unknown_name() {
        let err = scan_setup(&notebook(&[
            "%load_ext nbvalx",
            "%register_allowed_run_if_tags a: 1",
            "%%run_if b == 1\nx = 1",
        ]))
        .unwrap_err();
        assert!(matches!(err, ExpandError::Undeclared { cell: 2, ref name } if name == "b"));
    }

    #[test]
    fn test_outputs_are_independent_copies() {
        let mut out = expand(&notebook(TAGGED), Path::new("demo.ipynb"), &options(false)).unwrap();
        out[0].notebook.cells[6].source.push_str("\n# edited");
        assert_eq!(out[1].notebook.cells[6].source, "print('done')");
    }

    #[test]
    fn test_multi_tag_current_cell_uses_cell_form() {
        let nb = notebook(&[
            "%load_ext nbvalx",
            "%%register_allowed_run_if_tags\na: 1, 2\nb: True, False",
            "%register_current_run_if_tags a = 1",
        ]);
        let out = expand(&nb, Path::new("n.ipynb"), &options(false)).unwrap();
        insta::assert_snapshot!(out[3].notebook.cells[2].source, @r"
        %%register_current_run_if_tags
        a = 2
        b = False
        ");
    }
}
