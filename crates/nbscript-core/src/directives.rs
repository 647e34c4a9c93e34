//! Scheduler directives embedded in a notebook.
//!
//! Lines of the first code cell that start with the marker (by default
//! `#SBATCH `) carry scheduler options, written as shell words:
//!
//! ```text
//! #SBATCH --mem=1234M
//! #SBATCH --gres=gpu:1 -c 5
//! import numpy
//! ```

use regex::Regex;

use crate::error::{Error, Result};
use crate::notebook::Notebook;

/// Extracts directive arguments from cell sources.
#[derive(Debug, Clone)]
pub struct DirectiveScanner {
    pattern: Regex,
}

impl DirectiveScanner {
    /// Scanner for lines beginning with `marker` followed by a space.
    pub fn new(marker: &str) -> Result<Self> {
        let pattern = Regex::new(&format!("(?m)^{} (.*)$", regex::escape(marker)))
            .map_err(|e| Error::Configuration(format!("invalid directive marker {marker:?}: {e}")))?;
        Ok(Self { pattern })
    }

    /// Shell-split arguments of every directive line in `source`, in order.
    pub fn scan_source(&self, source: &str) -> Result<Vec<String>> {
        let mut args = Vec::new();
        for caps in self.pattern.captures_iter(source) {
            let (Some(line), Some(body)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let body = body.as_str().trim_end_matches('\r');
            let words = shlex::split(body).ok_or_else(|| Error::Directive {
                line: source[..line.start()].matches('\n').count() + 1,
                text: line.as_str().trim_end_matches('\r').to_string(),
            })?;
            args.extend(words);
        }
        Ok(args)
    }

    /// Directive arguments from the first code cell of `notebook`. Later
    /// cells are never looked at.
    pub fn scan_notebook(&self, notebook: &Notebook) -> Result<Vec<String>> {
        match notebook.first_code_cell() {
            Some(cell) => self.scan_source(&cell.source.text()),
            None => Ok(Vec::new()),
        }
    }
}
