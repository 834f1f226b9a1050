//! The interactive-shell capability the extension runs against.
//!
//! The extension never talks to a concrete kernel. It needs a host that can register magics, run a piece of
//! code, and print failures, and [`Shell`] is exactly that contract. [`RecordingShell`] is an in-memory host
//! that executes nothing and records every call.

use nbvalx_core::lang::magics::MagicKind;

/// A failed cell execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellFailure {
    /// Traceback text as the host would print it.
    pub message: String,
    /// The failure has already been surfaced to the user and must not be printed again.
    pub already_reported: bool,
}

impl CellFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            already_reported: false,
        }
    }

    /// Mark as surfaced to the user.
    pub fn reported(mut self) -> Self {
        self.already_reported = true;
        self
    }
}

/// How the host prints cell failures once the extension is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureHandler {
    /// Print every failure except the ones flagged as already reported.
    SuppressAlreadyReported,
}

impl FailureHandler {
    /// The text to print for `failure`, if any.
    pub fn render<'a>(&self, failure: &'a CellFailure) -> Option<&'a str> {
        match self {
            FailureHandler::SuppressAlreadyReported => {
                (!failure.already_reported).then_some(failure.message.as_str())
            }
        }
    }
}

/// Host capabilities used by the extension.
pub trait Shell {
    fn register_magic(&mut self, name: &'static str, kind: MagicKind);

    fn unregister_magic(&mut self, name: &'static str);

    fn set_failure_handler(&mut self, handler: Option<FailureHandler>);

    fn failure_handler(&self) -> Option<FailureHandler>;

    /// Execute `code` in the user namespace.
    fn run_cell(&mut self, code: &str) -> Result<(), CellFailure>;

    /// Print traceback text to the user.
    fn print_failure(&mut self, text: &str);

    /// Report a failed cell through the installed handler (or print it when none is installed).
    fn report_failure(&mut self, failure: &CellFailure) {
        let text = match self.failure_handler() {
            Some(handler) => handler.render(failure),
            None => Some(failure.message.as_str()),
        };
        if let Some(text) = text {
            self.print_failure(text);
        }
    }
}

/// An in-memory [`Shell`] that records registrations, executed code and printed failures.
///
/// Code whose text contains one of the configured failure triggers fails with that trigger as message.
#[derive(Debug, Default)]
pub struct RecordingShell {
    pub magics: Vec<(&'static str, MagicKind)>,
    pub handler: Option<FailureHandler>,
    pub executed: Vec<String>,
    pub printed: Vec<String>,
    fail_on: Vec<String>,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make any cell containing `trigger` fail.
    pub fn failing_on(mut self, trigger: impl Into<String>) -> Self {
        self.fail_on.push(trigger.into());
        self
    }

    pub fn has_magic(&self, name: &str) -> bool {
        self.magics.iter().any(|(n, _)| *n == name)
    }
}

impl Shell for RecordingShell {
    fn register_magic(&mut self, name: &'static str, kind: MagicKind) {
        self.magics.retain(|(n, _)| *n != name);
        self.magics.push((name, kind));
    }

    fn unregister_magic(&mut self, name: &'static str) {
        self.magics.retain(|(n, _)| *n != name);
    }

    fn set_failure_handler(&mut self, handler: Option<FailureHandler>) {
        self.handler = handler;
    }

    fn failure_handler(&self) -> Option<FailureHandler> {
        self.handler
    }

    fn run_cell(&mut self, code: &str) -> Result<(), CellFailure> {
        self.executed.push(code.to_string());
        match self.fail_on.iter().find(|trigger| code.contains(trigger.as_str())) {
            Some(trigger) => Err(CellFailure::new(trigger.clone())),
            None => Ok(()),
        }
    }

    fn print_failure(&mut self, text: &str) {
        self.printed.push(text.to_string());
    }
}
