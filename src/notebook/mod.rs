//! Jupyter notebook model and the rewrite pipeline built on it.
//!
//! ## Module Structure
//!
//! - `roles` - What a code cell means to nbvalx (setup magic, run-if guard, name marker, ...)
//! - `expand` - One notebook in, one notebook per tag combination out
//! - `decorate` - Bookkeeping cells for logging and parallel runs
//!
//! Only the parts of the nbformat document that nbvalx touches are typed; everything else is carried through
//! unchanged as JSON.

pub mod decorate;
pub mod expand;
pub mod roles;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// Notebook file extension, without the dot.
pub const NOTEBOOK_EXTENSION: &str = "ipynb";

#[derive(Debug, thiserror::Error)]
pub enum NotebookError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: std::io::Error },
    #[error("{} is not a valid notebook: {source}", path.display())]
    Format { path: PathBuf, source: serde_json::Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Code,
    Markdown,
    Raw,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub cell_type: CellType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Json>,
    #[serde(with = "multiline")]
    pub source: String,
    /// `outputs`, `execution_count`, `attachments` and anything else.
    #[serde(flatten)]
    pub extra: Map<String, Json>,
}

impl Cell {
    /// A fresh, unexecuted code cell.
    pub fn code(source: impl Into<String>) -> Self {
        let mut extra = Map::new();
        extra.insert("execution_count".to_string(), Json::Null);
        extra.insert("outputs".to_string(), Json::Array(Vec::new()));
        Self {
            cell_type: CellType::Code,
            id: None,
            metadata: Map::new(),
            source: source.into(),
            extra,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn markdown(source: impl Into<String>) -> Self {
        Self {
            cell_type: CellType::Markdown,
            id: None,
            metadata: Map::new(),
            source: source.into(),
            extra: Map::new(),
        }
    }

    pub fn is_code(&self) -> bool {
        self.cell_type == CellType::Code
    }

    /// Recorded outputs (empty for non-code cells).
    pub fn outputs(&self) -> &[Json] {
        self.extra
            .get("outputs")
            .and_then(Json::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of non-blank lines.
    pub fn statement_lines(&self) -> usize {
        self.source.lines().filter(|line| !line.trim().is_empty()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    pub cells: Vec<Cell>,
    #[serde(default)]
    pub metadata: Map<String, Json>,
    pub nbformat: u32,
    pub nbformat_minor: u32,
}

impl Default for Notebook {
    fn default() -> Self {
        Self {
            cells: Vec::new(),
            metadata: Map::new(),
            nbformat: 4,
            nbformat_minor: 5,
        }
    }
}

impl Notebook {
    pub fn from_cells(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            ..Self::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serialize the way Jupyter does: sorted keys, one-space indent, trailing newline.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        // Map keys are sorted (no `preserve_order`), so going through `Value` sorts struct fields too.
        let value = serde_json::to_value(self)?;
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        value.serialize(&mut serializer)?;
        let mut text = String::from_utf8_lossy(&buf).into_owned();
        text.push('\n');
        Ok(text)
    }

    pub fn code_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|cell| cell.is_code())
    }
}

/// Read and parse a notebook file.
pub fn read_notebook(path: &Path) -> Result<Notebook, NotebookError> {
    let text = fs::read_to_string(path).map_err(|source| NotebookError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Notebook::from_json(&text).map_err(|source| NotebookError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `notebook` to `path`, replacing any existing file and creating parent directories.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn write_notebook(notebook: &Notebook, path: &Path) -> Result<(), NotebookError> {
    let write_err = |source| NotebookError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let text = notebook.to_json().map_err(|source| NotebookError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(write_err)
}

/// nbformat stores multi-line strings either as one string or as a list of lines.
mod multiline {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(source: &str, serializer: S) -> Result<S::Ok, S::Error> {
        source.split_inclusive('\n').collect::<Vec<_>>().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Source {
            Joined(String),
            Lines(Vec<String>),
        }
        Ok(match Source::deserialize(deserializer)? {
            Source::Joined(text) => text,
            Source::Lines(lines) => lines.concat(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
 "cells": [
  {
   "cell_type": "code",
   "execution_count": 3,
   "id": "a1",
   "metadata": {},
   "outputs": [{"name": "stdout", "output_type": "stream", "text": ["hi\n"]}],
   "source": ["print('hi')\n", "x = 1"]
  },
  {"cell_type": "markdown", "metadata": {}, "source": "# Title"}
 ],
 "metadata": {"kernelspec": {"name": "python3"}},
 "nbformat": 4,
 "nbformat_minor": 5
}"##;

    #[test]
    fn test_source_accepts_lines_or_string() {
        let nb = Notebook::from_json(SAMPLE).unwrap();
        assert_eq!(nb.cells[0].source, "print('hi')\nx = 1");
        assert_eq!(nb.cells[1].source, "# Title");
        assert_eq!(nb.cells[0].outputs().len(), 1);
        assert_eq!(nb.code_cells().count(), 1);
    }

    #[test]
    fn test_round_trip_preserves_unknown_fields() {
        let nb = Notebook::from_json(SAMPLE).unwrap();
        let again = Notebook::from_json(&nb.to_json().unwrap()).unwrap();
        assert_eq!(nb, again);
        assert_eq!(again.cells[0].extra.get("execution_count"), Some(&Json::from(3)));
    }

    #[test]
    fn test_written_layout() {
        let nb = Notebook::from_cells(vec![Cell::code("a = 1\nb = 2").with_id("c0")]);
        insta::assert_snapshot!(nb.to_json().unwrap().trim_end(), @r#"
        {
         "cells": [
          {
           "cell_type": "code",
           "execution_count": null,
           "id": "c0",
           "metadata": {},
           "outputs": [],
           "source": [
            "a = 1\n",
            "b = 2"
           ]
          }
         ],
         "metadata": {},
         "nbformat": 4,
         "nbformat_minor": 5
        }
        "#);
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep/nested/out.ipynb");
        write_notebook(&Notebook::default(), &path).unwrap();
        assert_eq!(read_notebook(&path).unwrap(), Notebook::default());
    }
}
