//! Error types for nbscript-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for nbscript-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or launching a notebook run.
///
/// Everything except [`Error::Launch`] and [`Error::Io`] is detected before
/// any subprocess is spawned.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed command line.
    #[error("usage error: {0}")]
    Usage(String),

    /// Invalid configuration or environment.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// `--to` named a format nbscript does not know.
    #[error("configuration error: unknown output format {0:?}")]
    UnknownFormat(String),

    /// No format was requested and none follows from the output file name.
    #[error("configuration error: cannot infer a format from {0:?}")]
    UnknownExtension(String),

    /// The resolved output path is the input notebook itself.
    #[error("input name is the same as the output name ({0}), refusing to convert")]
    Conflict(String),

    /// The conversion engine or scheduler binary could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The notebook file could not be read or parsed.
    #[error("cannot read notebook {path}: {message}")]
    Notebook { path: PathBuf, message: String },

    /// An embedded scheduler directive could not be tokenized.
    #[error("invalid scheduler directive on line {line}: {text}")]
    Directive { line: usize, text: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// A short recovery hint for the user, if one applies.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::Usage(_) => Some("usage: nbscript [options] NOTEBOOK [arg ...]"),
            Error::UnknownFormat(_) => Some(
                "--to takes one of: notebook, markdown, asciidoc, html, latex, pdf, rst, script, slides",
            ),
            Error::UnknownExtension(_) => Some(
                "give the output file a known extension (.ipynb, .md, .txt) or pass --to=FORMAT",
            ),
            Error::Conflict(_) => Some("choose a different --output name or use --save"),
            Error::Launch { .. } => Some("make sure the program is installed and on PATH"),
            Error::Directive { .. } => Some("check quoting in the #SBATCH lines of the first code cell"),
            _ => None,
        }
    }

    /// The error message followed by its hint.
    pub fn with_hint(&self) -> String {
        match self.hint() {
            Some(hint) => format!("{self}\n  hint: {hint}"),
            None => self.to_string(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Usage(_) => 2,
            _ => 1,
        }
    }
}
