//! Minimal read-only view of a Jupyter notebook (.ipynb).
//!
//! Only what the scheduler wrapper needs: cell types and sources. Unknown
//! fields are ignored so any nbformat 4 document can be read.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// A Jupyter notebook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Notebook {
    /// Format version.
    #[serde(default)]
    pub nbformat: Option<u32>,

    /// Notebook cells, in document order.
    #[serde(default)]
    pub cells: Vec<Cell>,
}

/// A notebook cell.
#[derive(Debug, Clone, Deserialize)]
pub struct Cell {
    /// Cell type (`code`, `markdown`, `raw`).
    pub cell_type: String,

    /// Cell source.
    #[serde(default)]
    pub source: Source,
}

/// Cell source: nbformat allows a single string or a list of lines that
/// already carry their newlines.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Source {
    Text(String),
    Lines(Vec<String>),
}

impl Default for Source {
    fn default() -> Self {
        Source::Text(String::new())
    }
}

impl Source {
    /// The source as one string.
    pub fn text(&self) -> String {
        match self {
            Source::Text(text) => text.clone(),
            Source::Lines(lines) => lines.concat(),
        }
    }
}

impl Cell {
    pub fn is_code(&self) -> bool {
        self.cell_type == "code"
    }
}

impl Notebook {
    /// Read a notebook from a file.
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::Notebook {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| Error::Notebook {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// The first cell of type `code`, if any.
    pub fn first_code_cell(&self) -> Option<&Cell> {
        self.cells.iter().find(|cell| cell.is_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_forms() {
        let nb: Notebook = serde_json::from_str(
            r##"{"cells": [
                {"cell_type": "code", "source": "a\nb"},
                {"cell_type": "code", "source": ["a\n", "b"]},
                {"cell_type": "code"}
            ]}"##,
        )
        .unwrap();
        assert_eq!(nb.cells[0].source.text(), "a\nb");
        assert_eq!(nb.cells[1].source.text(), "a\nb");
        assert_eq!(nb.cells[2].source.text(), "");
    }

    #[test]
    fn test_first_code_cell_skips_markdown() {
        let nb: Notebook = serde_json::from_str(
            r##"{"nbformat": 4, "nbformat_minor": 2, "metadata": {}, "cells": [
                {"cell_type": "markdown", "metadata": {}, "source": ["#SBATCH --mem=1G"]},
                {"cell_type": "code", "metadata": {}, "outputs": [], "execution_count": null, "source": ["x = 1"]},
                {"cell_type": "code", "metadata": {}, "outputs": [], "execution_count": null, "source": ["y = 2"]}
            ]}"##,
        )
        .unwrap();
        assert_eq!(nb.nbformat, Some(4));
        assert_eq!(nb.first_code_cell().unwrap().source.text(), "x = 1");
    }

    #[test]
    fn test_no_code_cells() {
        let nb: Notebook = serde_json::from_str(r#"{"cells": []}"#).unwrap();
        assert!(nb.first_code_cell().is_none());
    }

    #[test]
    fn test_read_errors_name_the_file() {
        let err = Notebook::read_from_file("/nonexistent/nb.ipynb").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/nb.ipynb"));

        let temp = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        std::fs::write(temp.path(), "{not json").expect("Failed to write");
        let err = Notebook::read_from_file(temp.path()).unwrap_err();
        assert!(matches!(err, Error::Notebook { .. }));
    }
}
