//! Output formats understood by the conversion engine.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A `--to` target of the conversion engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Notebook,
    Markdown,
    Asciidoc,
    Html,
    Latex,
    Pdf,
    Rst,
    Script,
    Slides,
}

impl OutputFormat {
    /// Every supported format.
    pub const ALL: [OutputFormat; 9] = [
        OutputFormat::Notebook,
        OutputFormat::Markdown,
        OutputFormat::Asciidoc,
        OutputFormat::Html,
        OutputFormat::Latex,
        OutputFormat::Pdf,
        OutputFormat::Rst,
        OutputFormat::Script,
        OutputFormat::Slides,
    ];

    /// Format used when nothing is requested and output goes to stdout.
    pub const STDOUT_DEFAULT: OutputFormat = OutputFormat::Asciidoc;

    /// Format used by `--save` when no format is requested.
    pub const FILE_DEFAULT: OutputFormat = OutputFormat::Notebook;

    /// Name passed to the conversion engine's `--to`.
    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Notebook => "notebook",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Asciidoc => "asciidoc",
            OutputFormat::Html => "html",
            OutputFormat::Latex => "latex",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Rst => "rst",
            OutputFormat::Script => "script",
            OutputFormat::Slides => "slides",
        }
    }

    /// Extension (without the dot) given to files derived by `--save`.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Notebook => "ipynb",
            OutputFormat::Markdown => "md",
            OutputFormat::Asciidoc => "txt",
            OutputFormat::Html => "html",
            OutputFormat::Latex => "tex",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Rst => "rst",
            OutputFormat::Script => "py",
            OutputFormat::Slides => "slides.html",
        }
    }

    /// Infer a format from an output file extension (without the dot).
    ///
    /// Only the extensions that unambiguously name a format are accepted.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "ipynb" => Some(OutputFormat::Notebook),
            "md" => Some(OutputFormat::Markdown),
            "txt" => Some(OutputFormat::Asciidoc),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase();
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.name() == wanted)
            .ok_or_else(|| Error::UnknownFormat(s.to_string()))
    }
}
