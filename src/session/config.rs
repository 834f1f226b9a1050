//! Session configuration: the options a test session passes to the notebook pass.

use std::env;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Environment variables set by MPI launchers.
pub const MPI_LAUNCHER_VARIABLES: &[&str] = &["OMPI_COMM_WORLD_SIZE", "MPI_LOCALNRANKS"];

/// What the session does with the materialized notebooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Action {
    /// Write the notebooks for a user to run by hand.
    #[value(name = "create-notebooks")]
    CreateNotebooks,
    /// Write the notebooks and collect their cells as test items.
    #[default]
    #[value(name = "collect-notebooks")]
    CollectNotebooks,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::CreateNotebooks => write!(f, "create-notebooks"),
            Action::CollectNotebooks => write!(f, "collect-notebooks"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("number of processes must be positive")]
    ZeroProcesses,
    #[error("work directory {} must be a relative path", .0.display())]
    AbsoluteWorkDir(PathBuf),
    #[error("work directory must not be '.' unless creating notebooks with a single process")]
    WorkDirIsInputDir,
    #[error("do not run under an MPI launcher ({0} is set): request processes with --np instead")]
    MpiLauncher(&'static str),
}

/// Options of one notebook session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Number of MPI processes used to run each notebook.
    pub np: usize,
    pub action: Action,
    /// Drop code that is unreachable under each tag combination.
    pub tag_collapse: bool,
    /// Output directory relative to each notebook's directory; empty selects the default.
    pub work_dir: PathBuf,
    /// Only materialize the combination with this label.
    pub keyword: Option<String>,
    /// Disable garbage collection between the cluster bootstrap cells (parallel runs only).
    pub gc_bracket: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            np: 1,
            action: Action::default(),
            tag_collapse: false,
            work_dir: PathBuf::new(),
            keyword: None,
            gc_bracket: false,
        }
    }
}

impl SessionConfig {
    pub fn with_np(mut self, np: usize) -> Self {
        self.np = np;
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn with_tag_collapse(mut self, tag_collapse: bool) -> Self {
        self.tag_collapse = tag_collapse;
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_keyword(mut self, keyword: Option<String>) -> Self {
        self.keyword = keyword.filter(|k| !k.is_empty());
        self
    }

    pub fn with_gc_bracket(mut self, gc_bracket: bool) -> Self {
        self.gc_bracket = gc_bracket;
        self
    }

    /// `work_dir`, or `.ipynb_pytest/np_{np}/collapse_{True|False}` when unset.
    pub fn resolved_work_dir(&self) -> PathBuf {
        if self.work_dir.as_os_str().is_empty() {
            let collapse = if self.tag_collapse { "True" } else { "False" };
            PathBuf::from(format!(".ipynb_pytest/np_{}/collapse_{collapse}", self.np))
        } else {
            self.work_dir.clone()
        }
    }

    /// Notebooks are rewritten in place (no separate work directory).
    pub fn writes_in_place(&self) -> bool {
        is_current_dir(&self.resolved_work_dir())
    }

    /// Check the options and the process environment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_with(|name| env::var_os(name).is_some())
    }

    /// [`SessionConfig::validate`] with an injected environment lookup.
    pub fn validate_with(&self, is_set: impl Fn(&str) -> bool) -> Result<(), ConfigError> {
        if let Some(variable) = MPI_LAUNCHER_VARIABLES.iter().find(|v| is_set(v)) {
            return Err(ConfigError::MpiLauncher(variable));
        }
        if self.np == 0 {
            return Err(ConfigError::ZeroProcesses);
        }
        let work_dir = self.resolved_work_dir();
        if work_dir.is_absolute() {
            return Err(ConfigError::AbsoluteWorkDir(work_dir));
        }
        if is_current_dir(&work_dir) && (self.np > 1 || self.action != Action::CreateNotebooks) {
            return Err(ConfigError::WorkDirIsInputDir);
        }
        if self.gc_bracket && self.np == 1 {
            tracing::warn!("--gc-bracket has no effect with a single process");
        }
        Ok(())
    }
}

fn is_current_dir(path: &Path) -> bool {
    path.components().all(|c| c == Component::CurDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(config: &SessionConfig) -> Result<(), ConfigError> {
        config.validate_with(|_| false)
    }

    #[test]
    fn test_default_work_dir() {
        let config = SessionConfig::default();
        assert_eq!(config.resolved_work_dir(), PathBuf::from(".ipynb_pytest/np_1/collapse_False"));
        let config = config.with_np(4).with_tag_collapse(true);
        assert_eq!(config.resolved_work_dir(), PathBuf::from(".ipynb_pytest/np_4/collapse_True"));
        assert_eq!(check(&config), Ok(()));
    }

    #[test]
    fn test_work_dir_rules() {
        let absolute = SessionConfig::default().with_work_dir("/tmp/out");
        assert!(matches!(check(&absolute), Err(ConfigError::AbsoluteWorkDir(_))));

        let in_place = SessionConfig::default().with_work_dir(".");
        assert_eq!(check(&in_place), Err(ConfigError::WorkDirIsInputDir));
        let in_place = in_place.with_action(Action::CreateNotebooks);
        assert_eq!(check(&in_place), Ok(()));
        assert!(in_place.writes_in_place());
        assert_eq!(check(&in_place.with_np(2)), Err(ConfigError::WorkDirIsInputDir));
    }

    #[test]
    fn test_zero_processes() {
        assert_eq!(check(&SessionConfig::default().with_np(0)), Err(ConfigError::ZeroProcesses));
    }

    #[test]
    fn test_refuses_mpi_launcher() {
        let err = SessionConfig::default()
            .validate_with(|name| name == "MPI_LOCALNRANKS")
            .unwrap_err();
        assert_eq!(err, ConfigError::MpiLauncher("MPI_LOCALNRANKS"));
    }

    #[test]
    fn test_empty_keyword_is_no_keyword() {
        assert_eq!(SessionConfig::default().with_keyword(Some(String::new())).keyword, None);
    }
}
