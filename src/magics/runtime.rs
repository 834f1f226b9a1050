//! The extension context: declared values, current bindings, and the run-if entry point.
//!
//! One [`Extension`] corresponds to one interactive session. It is an explicit value rather than process
//! state, so tests can run several sessions side by side.

use nbvalx_core::lang::magics::{self, EXTENSION_NAME, MagicId};
use nbvalx_syntax::parser::expression_from_source;

use super::MagicError;
use super::evaluator::{Scope, evaluate_condition};
use super::registry::{AllowedValues, Bindings, RunIfKind, parse_allowed, parse_assignments};
use super::shell::{CellFailure, FailureHandler, Shell};
use super::splitter::{first_line, split};
use super::value::Value;

/// What happened to a cell submitted through the extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    /// The code ran (or the cell only registered declarations).
    Ran,
    /// A run-if condition was false; nothing was executed.
    Skipped,
    Failed(CellFailure),
}

#[derive(Debug, Default, Clone)]
struct KindState {
    allowed: AllowedValues,
    current: Bindings,
}

impl KindState {
    fn clear(&mut self) {
        self.allowed.clear();
        self.current.clear();
    }
}

/// Extension state for one session: unloaded until [`Extension::load`].
#[derive(Debug, Default, Clone)]
pub struct Extension {
    loaded: bool,
    tags: KindState,
    parameters: KindState,
}

impl Extension {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Register the extension magics into `shell`, install the failure handler and start from empty state.
    #[tracing::instrument(skip_all)]
    pub fn load(&mut self, shell: &mut dyn Shell) {
        if self.loaded {
            tracing::warn!("extension loaded twice; previous declarations are discarded");
        }
        for info in magics::extension_magics() {
            shell.register_magic(info.item.canonical, info.kind);
        }
        shell.set_failure_handler(Some(FailureHandler::SuppressAlreadyReported));
        self.tags.clear();
        self.parameters.clear();
        self.loaded = true;
    }

    /// Remove the extension magics and the failure handler, and drop all state.
    #[tracing::instrument(skip_all)]
    pub fn unload(&mut self, shell: &mut dyn Shell) {
        if !self.loaded {
            tracing::warn!("extension unloaded while not loaded");
        }
        for info in magics::extension_magics() {
            shell.unregister_magic(info.item.canonical);
        }
        shell.set_failure_handler(None);
        self.tags.clear();
        self.parameters.clear();
        self.loaded = false;
    }

    fn state(&self, kind: RunIfKind) -> &KindState {
        match kind {
            RunIfKind::Tags => &self.tags,
            RunIfKind::Parameters => &self.parameters,
        }
    }

    fn state_mut(&mut self, kind: RunIfKind) -> &mut KindState {
        match kind {
            RunIfKind::Tags => &mut self.tags,
            RunIfKind::Parameters => &mut self.parameters,
        }
    }

    pub fn allowed(&self, kind: RunIfKind) -> &AllowedValues {
        &self.state(kind).allowed
    }

    pub fn current(&self, kind: RunIfKind) -> &Bindings {
        &self.state(kind).current
    }

    fn ensure_loaded(&self) -> Result<(), MagicError> {
        if self.loaded { Ok(()) } else { Err(MagicError::NotLoaded) }
    }

    /// `%register_allowed_run_if_{tags,parameters}`: replace the declared values of `kind`.
    ///
    /// Current bindings of `kind` are dropped, since they were validated against the previous declaration.
    pub fn register_allowed(&mut self, kind: RunIfKind, block: &str) -> Result<(), MagicError> {
        self.ensure_loaded()?;
        let allowed = parse_allowed(kind, block)?;
        let other = match kind {
            RunIfKind::Tags => RunIfKind::Parameters,
            RunIfKind::Parameters => RunIfKind::Tags,
        };
        if let Some(name) = allowed.names().find(|name| self.allowed(other).contains(name)) {
            return Err(MagicError::Declaration(format!(
                "'{name}' is already declared as a {}",
                other.noun()
            )));
        }
        tracing::debug!(kind = kind.noun(), names = allowed.len(), "registered allowed values");
        let state = self.state_mut(kind);
        state.allowed = allowed;
        state.current.clear();
        Ok(())
    }

    /// `%register_current_run_if_{tags,parameters}`: bind names to declared values.
    ///
    /// Parameters are also assigned as variables in the session by running one statement per binding.
    pub fn register_current(
        &mut self,
        kind: RunIfKind,
        block: &str,
        shell: &mut dyn Shell,
    ) -> Result<(), MagicError> {
        self.ensure_loaded()?;
        let bindings = parse_assignments(kind, block, self.allowed(kind))?;
        for binding in bindings {
            if kind == RunIfKind::Parameters {
                shell
                    .run_cell(&binding.as_statement())
                    .map_err(|failure| MagicError::Execution(failure.message))?;
            }
            self.state_mut(kind).current.insert(binding.name, binding.value);
        }
        Ok(())
    }

    /// Evaluate a run-if condition against the current bindings.
    pub fn evaluate(&self, condition: &str) -> Result<bool, MagicError> {
        self.ensure_loaded()?;
        let expr = expression_from_source(condition).map_err(|errors| MagicError::syntax(condition, errors))?;
        Ok(evaluate_condition(&expr, self)?)
    }

    /// `%%run_if`: run the body when the (possibly continued) condition holds.
    ///
    /// A failure of the body is returned already reported, so the host does not print it a second time.
    #[tracing::instrument(skip_all, fields(head = head))]
    pub fn run_if(&mut self, head: &str, body: &str, shell: &mut dyn Shell) -> Result<Execution, MagicError> {
        let (condition, code) = split(head, body);
        if !self.evaluate(&condition)? {
            tracing::debug!(%condition, "condition is false, cell skipped");
            return Ok(Execution::Skipped);
        }
        match shell.run_cell(code) {
            Ok(()) => Ok(Execution::Ran),
            Err(failure) => {
                shell.print_failure(&failure.message);
                Ok(Execution::Failed(failure.reported()))
            }
        }
    }

    /// Run one cell the way the host would: dispatch nbvalx magics, pass everything else to `shell`.
    ///
    /// `%%live_log` and `%%px` wrappers are unwrapped and their body is dispatched in turn.
    pub fn run_cell_source(&mut self, source: &str, shell: &mut dyn Shell) -> Result<Execution, MagicError> {
        let (head, body) = first_line(source);
        let Some(invocation) = magics::parse_invocation(head.trim_start()) else {
            return Ok(forward(source, shell));
        };
        match invocation.id {
            MagicId::LoadExt if invocation.args == EXTENSION_NAME => {
                self.load(shell);
                Ok(forward(body, shell))
            }
            MagicId::LoadExt => Ok(forward(source, shell)),
            MagicId::LiveLog | MagicId::Px => self.run_cell_source(body, shell),
            id if !self.loaded => Err(MagicError::UnknownMagic(magics::as_str(id).to_string())),
            MagicId::RunIf => self.run_if(invocation.args, body, shell),
            id => {
                let Some((kind, is_allowed)) = RunIfKind::of_magic(id) else {
                    return Ok(forward(source, shell));
                };
                let (block, rest) = if invocation.is_cell { (body, "") } else { (invocation.args, body) };
                if is_allowed {
                    self.register_allowed(kind, block)?;
                } else {
                    self.register_current(kind, block, shell)?;
                }
                Ok(forward(rest, shell))
            }
        }
    }
}

/// Submit plain code to the host; blank code is a no-op.
fn forward(code: &str, shell: &mut dyn Shell) -> Execution {
    if code.trim().is_empty() {
        return Execution::Ran;
    }
    match shell.run_cell(code) {
        Ok(()) => Execution::Ran,
        Err(failure) => Execution::Failed(failure),
    }
}

impl Scope for Extension {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.tags.current.lookup(name).or_else(|| self.parameters.current.lookup(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::magics::shell::RecordingShell;

    fn loaded() -> (Extension, RecordingShell) {
        let mut shell = RecordingShell::new();
        let mut ext = Extension::new();
        ext.load(&mut shell);
        (ext, shell)
    }

    #[test]
    fn test_load_registers_magics_and_handler() {
        let (mut ext, mut shell) = loaded();
        assert!(shell.has_magic("run_if"));
        assert!(shell.has_magic("register_current_run_if_parameters"));
        assert!(!shell.has_magic("live_log"));
        assert_eq!(shell.handler, Some(FailureHandler::SuppressAlreadyReported));

        ext.unload(&mut shell);
        assert!(shell.magics.is_empty());
        assert_eq!(shell.handler, None);
        assert!(!ext.is_loaded());
    }

    #[test]
    fn test_registration_requires_load() {
        let mut ext = Extension::new();
        assert_eq!(ext.register_allowed(RunIfKind::Tags, "a: 1"), Err(MagicError::NotLoaded));
    }

    #[test]
    fn test_value_outside_allowed_set_is_a_binding_error() {
        let (mut ext, mut shell) = loaded();
        ext.register_allowed(RunIfKind::Tags, "tag: 1, 2").unwrap();
        let err = ext.register_current(RunIfKind::Tags, "tag = 3", &mut shell).unwrap_err();
        assert!(matches!(err, MagicError::Binding(_)));
        assert!(ext.current(RunIfKind::Tags).is_empty());
    }

    #[test]
    fn test_parameters_are_forwarded_as_code() {
        let (mut ext, mut shell) = loaded();
        ext.register_allowed(RunIfKind::Parameters, "alpha: 0.5, 1.0").unwrap();
        ext.register_current(RunIfKind::Parameters, "alpha = 1.0", &mut shell).unwrap();
        assert_eq!(shell.executed, vec!["alpha = 1.0"]);
        assert!(ext.evaluate("alpha > 0.7").unwrap());
    }

    #[test]
    fn test_tags_are_metadata_only() {
        let (mut ext, mut shell) = loaded();
        ext.register_allowed(RunIfKind::Tags, "tag: 1, 2").unwrap();
        ext.register_current(RunIfKind::Tags, "tag = 2", &mut shell).unwrap();
        assert!(shell.executed.is_empty());
        assert!(!ext.evaluate("tag**2 == 1").unwrap());
    }

    #[test]
    fn test_unbound_name_is_a_name_error() {
        let (ext, _) = loaded();
        let err = ext.evaluate("missing == 1").unwrap_err();
        assert_eq!(err.to_string(), "NameError: name 'missing' is not defined");
    }

    #[test]
    fn test_names_cannot_be_both_tag_and_parameter() {
        let (mut ext, _) = loaded();
        ext.register_allowed(RunIfKind::Tags, "x: 1").unwrap();
        assert!(matches!(
            ext.register_allowed(RunIfKind::Parameters, "x: 1.0"),
            Err(MagicError::Declaration(_))
        ));
    }

    #[test]
    fn test_redeclaration_resets_bindings() {
        let (mut ext, mut shell) = loaded();
        ext.register_allowed(RunIfKind::Tags, "tag: 1, 2").unwrap();
        ext.register_current(RunIfKind::Tags, "tag = 1", &mut shell).unwrap();
        ext.register_allowed(RunIfKind::Tags, "tag: 'a'").unwrap();
        assert!(ext.current(RunIfKind::Tags).is_empty());
    }

    #[test]
    fn test_run_if_with_continuation() {
        let (mut ext, mut shell) = loaded();
        ext.register_allowed(RunIfKind::Tags, "a: 1, 2\nb: 'x', 'y'").unwrap();
        ext.register_current(RunIfKind::Tags, "a = 1\nb = 'y'", &mut shell).unwrap();

        let outcome = ext.run_if("a == 1 and \\", "  b == 'y'\nprint(a)", &mut shell).unwrap();
        assert_eq!(outcome, Execution::Ran);
        assert_eq!(shell.executed, vec!["print(a)"]);

        let outcome = ext.run_if("a == 2", "print(a)", &mut shell).unwrap();
        assert_eq!(outcome, Execution::Skipped);
        assert_eq!(shell.executed.len(), 1);
    }

    #[test]
    fn test_run_if_failure_is_printed_once() {
        let mut shell = RecordingShell::new().failing_on("raise");
        let mut ext = Extension::new();
        ext.load(&mut shell);
        ext.register_allowed(RunIfKind::Tags, "a: 1").unwrap();
        ext.register_current(RunIfKind::Tags, "a = 1", &mut shell).unwrap();

        let outcome = ext.run_if("a == 1", "raise RuntimeError", &mut shell).unwrap();
        let Execution::Failed(failure) = outcome else {
            panic!("expected a failure, got {outcome:?}");
        };
        assert!(failure.already_reported);
        shell.report_failure(&failure);
        assert_eq!(shell.printed, vec!["raise"]);
    }

    #[test]
    fn test_run_cell_source_dispatch() {
        let mut shell = RecordingShell::new();
        let mut ext = Extension::new();
        let cells = [
            "%load_ext nbvalx",
            "%%register_allowed_run_if_tags\nbackend: 'petsc', 'slepc'",
            "%register_current_run_if_tags backend = 'slepc'",
            "%%run_if backend == 'petsc'\nimport petsc4py",
            "%%live_log\n%%run_if backend == 'slepc'\nimport slepc4py",
            "x = 1",
        ];
        let outcomes: Vec<_> = cells
            .iter()
            .map(|cell| ext.run_cell_source(cell, &mut shell).unwrap())
            .collect();
        assert_eq!(
            outcomes,
            vec![
                Execution::Ran,
                Execution::Ran,
                Execution::Ran,
                Execution::Skipped,
                Execution::Ran,
                Execution::Ran
            ]
        );
        assert_eq!(shell.executed, vec!["import slepc4py", "x = 1"]);
    }

    #[test]
    fn test_extension_magics_are_unknown_before_load() {
        let mut shell = RecordingShell::new();
        let mut ext = Extension::new();
        let err = ext.run_cell_source("%%run_if True\nx = 1", &mut shell).unwrap_err();
        assert_eq!(err, MagicError::UnknownMagic("run_if".to_string()));
    }
}
