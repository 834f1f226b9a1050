//! Declared tag/parameter values and their current bindings.
//!
//! `register_allowed_run_if_*` blocks become an [`AllowedValues`] map; `register_current_run_if_*` blocks are
//! checked against it and become [`Bindings`]. Both keep declaration order, which fixes the order of the
//! cartesian product (and so the output file names) of the notebook expander.

use nbvalx_core::lang::magics::MagicId;
use nbvalx_syntax::ast::Literal;
use nbvalx_syntax::parser::{allowed_block_from_source, assignment_block_from_source};

use super::MagicError;
use super::evaluator::Scope;
use super::value::Value;

/// Whether a declaration is about tags or parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunIfKind {
    Tags,
    Parameters,
}

impl RunIfKind {
    pub const ALL: [RunIfKind; 2] = [RunIfKind::Tags, RunIfKind::Parameters];

    /// Singular noun used in messages.
    pub fn noun(self) -> &'static str {
        match self {
            RunIfKind::Tags => "tag",
            RunIfKind::Parameters => "parameter",
        }
    }

    pub fn allowed_magic(self) -> MagicId {
        match self {
            RunIfKind::Tags => MagicId::RegisterAllowedRunIfTags,
            RunIfKind::Parameters => MagicId::RegisterAllowedRunIfParameters,
        }
    }

    pub fn current_magic(self) -> MagicId {
        match self {
            RunIfKind::Tags => MagicId::RegisterCurrentRunIfTags,
            RunIfKind::Parameters => MagicId::RegisterCurrentRunIfParameters,
        }
    }

    /// The kind a registration magic declares, with `true` for the allowed-values form.
    pub fn of_magic(id: MagicId) -> Option<(RunIfKind, bool)> {
        match id {
            MagicId::RegisterAllowedRunIfTags => Some((RunIfKind::Tags, true)),
            MagicId::RegisterCurrentRunIfTags => Some((RunIfKind::Tags, false)),
            MagicId::RegisterAllowedRunIfParameters => Some((RunIfKind::Parameters, true)),
            MagicId::RegisterCurrentRunIfParameters => Some((RunIfKind::Parameters, false)),
            _ => None,
        }
    }
}

/// An insertion-ordered map keyed by tag/parameter name.
#[derive(Debug, Clone, PartialEq)]
pub struct NameMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for NameMap<V> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<V> NameMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite; an overwritten name keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, value: V) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<V> FromIterator<(String, V)> for NameMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut map = NameMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

/// name -> ordered allowed values.
pub type AllowedValues = NameMap<Vec<Value>>;

/// name -> current value.
pub type Bindings = NameMap<Value>;

impl Scope for Bindings {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// One validated `name = value` line.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub value: Value,
    /// The literal as written, re-emitted when the binding is forwarded as live code.
    pub literal: Literal,
}

impl Binding {
    /// The Python statement that materializes this binding as a variable.
    pub fn as_statement(&self) -> String {
        format!("{} = {}", self.name, self.literal)
    }
}

/// Parse an allowed-values block (`name: v1, v2, ...` per line).
///
/// ## Errors
/// - [`MagicError::Syntax`] for malformed lines, including unquoted strings.
/// - [`MagicError::Declaration`] for an empty block, a name declared twice, mixed value types within a name, or
///   a repeated value.
pub fn parse_allowed(kind: RunIfKind, block: &str) -> Result<AllowedValues, MagicError> {
    let decls = allowed_block_from_source(block).map_err(|errors| MagicError::syntax(block, errors))?;
    if decls.is_empty() {
        return Err(MagicError::Declaration(format!(
            "expected at least one `{}: value, ...` declaration",
            kind.noun()
        )));
    }

    let mut allowed = AllowedValues::new();
    for decl in decls {
        let name = decl.node.name.node;
        if allowed.contains(&name) {
            return Err(MagicError::Declaration(format!(
                "{} '{name}' is declared more than once",
                kind.noun()
            )));
        }
        let Some(first) = decl.node.values.first() else {
            return Err(MagicError::Declaration(format!(
                "{} '{name}' has no allowed values",
                kind.noun()
            )));
        };
        let type_name = first.node.type_name();
        let mut values: Vec<Value> = Vec::with_capacity(decl.node.values.len());
        for lit in &decl.node.values {
            if lit.node.type_name() != type_name {
                return Err(MagicError::Declaration(format!(
                    "allowed values of {} '{name}' mix '{type_name}' and '{}'",
                    kind.noun(),
                    lit.node.type_name()
                )));
            }
            let value = Value::from(&lit.node);
            if values.contains(&value) {
                return Err(MagicError::Declaration(format!(
                    "value {value} is listed twice for {} '{name}'",
                    kind.noun()
                )));
            }
            values.push(value);
        }
        allowed.insert(name, values);
    }
    Ok(allowed)
}

/// Parse a current-value block (`name = value` per line) and check it against `allowed`.
///
/// ## Errors
/// - [`MagicError::Syntax`] for malformed lines.
/// - [`MagicError::Declaration`] for an empty block.
/// - [`MagicError::Binding`] when a name was never declared or the value is not one of its allowed values.
pub fn parse_assignments(
    kind: RunIfKind,
    block: &str,
    allowed: &AllowedValues,
) -> Result<Vec<Binding>, MagicError> {
    let assignments =
        assignment_block_from_source(block).map_err(|errors| MagicError::syntax(block, errors))?;
    if assignments.is_empty() {
        return Err(MagicError::Declaration(format!(
            "expected at least one `{} = value` assignment",
            kind.noun()
        )));
    }

    assignments
        .into_iter()
        .map(|assignment| {
            let name = assignment.node.name.node;
            let literal = assignment.node.value.node;
            let value = Value::from(&literal);
            let Some(values) = allowed.get(&name) else {
                return Err(MagicError::Binding(format!(
                    "{} '{name}' has not been declared with %{}",
                    kind.noun(),
                    nbvalx_core::lang::magics::as_str(kind.allowed_magic())
                )));
            };
            if !values.contains(&value) {
                let listed = values.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
                return Err(MagicError::Binding(format!(
                    "{value} is not an allowed value for {} '{name}' (allowed: {listed})",
                    kind.noun()
                )));
            }
            Ok(Binding { name, value, literal })
        })
        .collect()
}
