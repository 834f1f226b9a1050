//! A notebook test session: the start pass that materializes notebooks, and collection of their cells.
//!
//! ## Module Structure
//!
//! - `config` - Session options and their validation
//! - `runner` - Executes collected cells and reports results
//! - `live_log` - Sections appended to the per-notebook log files
//!
//! The start pass, per input path:
//!
//! 1. discover `*.ipynb` files (hidden directories and work directories are not entered);
//! 2. delete notebooks left in `<dir>/<work_dir>` by a previous run, for every directory holding a notebook;
//! 3. expand, quote expected failures (create mode only), decorate and write every notebook.

pub mod config;
pub mod live_log;
pub mod runner;

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::notebook::decorate::{DecorateOptions, decorate, quote_expected_failures};
use crate::notebook::expand::{ExpandError, ExpandOptions, expand};
use crate::notebook::{NOTEBOOK_EXTENSION, Notebook, NotebookError, read_notebook, write_notebook};
use crate::outcome::{CellItem, collect_items};
use config::{Action, ConfigError, SessionConfig};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{} is neither a directory nor a notebook", .0.display())]
    NotANotebook(PathBuf),
    #[error("failed to scan {}: {source}", path.display())]
    Discover { path: PathBuf, source: walkdir::Error },
    #[error("failed to clean {}: {source}", path.display())]
    Clean { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Notebook(#[from] NotebookError),
    #[error("{}: {source}", path.display())]
    Expand { path: PathBuf, source: ExpandError },
}

/// One notebook produced by the start pass.
#[derive(Debug, Clone)]
pub struct Materialized {
    /// The notebook it was expanded from.
    pub source: PathBuf,
    /// Where it is written.
    pub path: PathBuf,
    /// `name=value,...` of the combination, for tagged notebooks.
    pub label: Option<String>,
    pub notebook: Notebook,
}

#[derive(Debug, Clone)]
pub struct Session {
    config: SessionConfig,
    work_dir: PathBuf,
}

impl Session {
    /// Validate `config` and resolve the work directory.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self::new_unchecked(config))
    }

    /// A session over `config` without checking it against the process environment.
    pub fn new_unchecked(config: SessionConfig) -> Self {
        let work_dir = config.resolved_work_dir();
        Self { config, work_dir }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Notebooks under `path` (or `path` itself), sorted.
    pub fn discover(&self, path: &Path) -> Result<Vec<PathBuf>, SessionError> {
        if path.is_file() {
            return if is_notebook(path) {
                Ok(vec![path.to_path_buf()])
            } else {
                Err(SessionError::NotANotebook(path.to_path_buf()))
            };
        }
        if !path.is_dir() {
            return Err(SessionError::NotANotebook(path.to_path_buf()));
        }
        let mut found = Vec::new();
        let walker = WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !entry.file_type().is_dir() || !self.is_skipped_dir(entry.path())
            });
        for entry in walker {
            let entry = entry.map_err(|source| SessionError::Discover {
                path: path.to_path_buf(),
                source,
            })?;
            if entry.file_type().is_file() && is_notebook(entry.path()) {
                found.push(entry.into_path());
            }
        }
        tracing::debug!(path = %path.display(), count = found.len(), "discovered notebooks");
        Ok(found)
    }

    fn is_skipped_dir(&self, dir: &Path) -> bool {
        let hidden = dir
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'));
        hidden || (!self.config.writes_in_place() && dir.ends_with(&self.work_dir))
    }

    /// Delete the notebooks a previous run left in `<dir>/<work_dir>`.
    pub fn clean(&self, dir: &Path) -> Result<usize, SessionError> {
        if self.config.writes_in_place() {
            return Ok(0);
        }
        let work_dir = dir.join(&self.work_dir);
        if !work_dir.is_dir() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in WalkDir::new(&work_dir) {
            let entry = entry.map_err(|source| SessionError::Discover {
                path: work_dir.clone(),
                source,
            })?;
            if entry.file_type().is_file() && is_notebook(entry.path()) {
                fs::remove_file(entry.path()).map_err(|source| SessionError::Clean {
                    path: entry.path().to_path_buf(),
                    source,
                })?;
                removed += 1;
            }
        }
        tracing::debug!(dir = %work_dir.display(), removed, "cleaned work directory");
        Ok(removed)
    }

    /// Every notebook materialized from the notebook at `source`, not yet written.
    pub fn materialize(&self, source: &Path) -> Result<Vec<Materialized>, SessionError> {
        let notebook = read_notebook(source)?;
        self.materialize_notebook(&notebook, source)
    }

    /// [`Session::materialize`] for an already parsed notebook.
    pub fn materialize_notebook(&self, notebook: &Notebook, source: &Path) -> Result<Vec<Materialized>, SessionError> {
        let options = ExpandOptions {
            tag_collapse: self.config.tag_collapse,
            keyword: self.config.keyword.clone(),
            work_dir: self.work_dir.clone(),
        };
        let expanded = expand(notebook, source, &options).map_err(|source_err| SessionError::Expand {
            path: source.to_path_buf(),
            source: source_err,
        })?;
        let decorate_options = DecorateOptions {
            action: self.config.action,
            np: self.config.np,
            gc_bracket: self.config.gc_bracket,
        };
        let quote = self.config.action == Action::CreateNotebooks && !self.config.writes_in_place();
        Ok(expanded
            .into_iter()
            .map(|mut out| {
                if quote {
                    quote_expected_failures(&mut out.notebook);
                }
                decorate(&mut out.notebook, &out.path, decorate_options);
                Materialized {
                    source: source.to_path_buf(),
                    label: out.combination.as_ref().map(|c| c.label()),
                    path: out.path,
                    notebook: out.notebook,
                }
            })
            .collect())
    }

    /// The start pass over `paths`: discover, clean, materialize and write.
    #[tracing::instrument(skip_all, fields(action = %self.config.action, np = self.config.np))]
    pub fn start(&self, paths: &[PathBuf]) -> Result<Vec<Materialized>, SessionError> {
        let mut sources = Vec::new();
        let mut dirs = BTreeSet::new();
        for path in paths {
            let found = self.discover(path)?;
            dirs.extend(found.iter().map(|source| parent_dir(source)));
            sources.extend(found);
        }
        for dir in &dirs {
            self.clean(dir)?;
        }

        let mut written = Vec::new();
        for source in &sources {
            for materialized in self.materialize(source)? {
                write_notebook(&materialized.notebook, &materialized.path)?;
                tracing::info!(path = %materialized.path.display(), "wrote notebook");
                written.push(materialized);
            }
        }
        Ok(written)
    }

    /// Test items of the written notebooks; nothing is collected when only creating notebooks.
    pub fn collect(&self, materialized: &[Materialized]) -> Vec<CellItem> {
        if self.config.action == Action::CreateNotebooks {
            return Vec::new();
        }
        materialized
            .iter()
            .flat_map(|m| collect_items(&m.path, &m.notebook))
            .collect()
    }
}

fn is_notebook(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == NOTEBOOK_EXTENSION)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
