//! Output routing: turns parsed arguments into a [`ResolvedPlan`].
//!
//! Format precedence is `--to`, then the `--output` extension, then the
//! `--save` default, then the stdout default. Nothing here touches the
//! filesystem; paths are handled as strings.

use chrono::{Local, NaiveDateTime};

use crate::args::InvocationArgs;
use crate::context::NotebookArgv;
use crate::error::{Error, Result};
use crate::format::OutputFormat;

/// `strftime` pattern inserted before the extension by `--timestamp`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Infix inserted by `--save` when the derived name would equal the input.
pub const SAVE_INFIX: &str = ".out";

/// Where converted output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(String),
}

/// Everything needed to launch one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlan {
    /// Input notebook path, as given.
    pub notebook: String,
    /// Target format.
    pub format: OutputFormat,
    /// Stdout or a file path (after timestamping).
    pub target: OutputTarget,
    /// The file path before the timestamp was inserted.
    pub output_path_pre_timestamp: Option<String>,
    /// Unrecognized options forwarded to the converter.
    pub converter_args: Vec<String>,
    /// The notebook's own argument vector.
    pub notebook_argv: NotebookArgv,
}

impl ResolvedPlan {
    /// The output file, if output is not going to stdout.
    pub fn output_path(&self) -> Option<&str> {
        match &self.target {
            OutputTarget::Stdout => None,
            OutputTarget::File(path) => Some(path),
        }
    }

    /// Converter flags selecting the destination and format.
    ///
    /// File output always carries `--output-dir=.` because the converter
    /// otherwise joins relative output paths onto the notebook's directory.
    pub fn routing_args(&self) -> Vec<String> {
        match &self.target {
            OutputTarget::Stdout => vec![
                "--stdout".to_string(),
                "--to".to_string(),
                self.format.name().to_string(),
            ],
            OutputTarget::File(path) => vec![
                "--output-dir=.".to_string(),
                "--output".to_string(),
                path.clone(),
                "--to".to_string(),
                self.format.name().to_string(),
            ],
        }
    }
}

/// Resolve using the current local time for `--timestamp`.
pub fn resolve(args: &InvocationArgs) -> Result<ResolvedPlan> {
    resolve_at(args, Local::now().naive_local())
}

/// Resolve with an explicit timestamp.
pub fn resolve_at(args: &InvocationArgs, now: NaiveDateTime) -> Result<ResolvedPlan> {
    let format = match (&args.to, &args.output) {
        (Some(to), _) => to.parse::<OutputFormat>()?,
        (None, Some(output)) => format_for_path(output)?,
        (None, None) if args.save => OutputFormat::FILE_DEFAULT,
        (None, None) => OutputFormat::STDOUT_DEFAULT,
    };

    let output = if args.save {
        Some(derive_save_path(&args.notebook, format))
    } else {
        args.output.clone()
    };

    let (target, pre_timestamp) = match output {
        None => (OutputTarget::Stdout, None),
        Some(path) => {
            let stamped = if args.timestamp {
                insert_timestamp(&path, now)
            } else {
                path.clone()
            };
            if stamped == args.notebook {
                return Err(Error::Conflict(stamped));
            }
            (OutputTarget::File(stamped), Some(path))
        }
    };

    let plan = ResolvedPlan {
        notebook: args.notebook.clone(),
        format,
        target,
        output_path_pre_timestamp: pre_timestamp,
        converter_args: args.converter_args.clone(),
        notebook_argv: NotebookArgv::new(args.notebook.clone(), args.notebook_argv.clone()),
    };
    tracing::debug!(?plan, "resolved invocation");
    Ok(plan)
}

/// Infer the format from an explicit output path.
fn format_for_path(path: &str) -> Result<OutputFormat> {
    let (_, ext) = split_extension(path);
    let ext = ext.strip_prefix('.').unwrap_or(ext);
    OutputFormat::from_extension(ext).ok_or_else(|| Error::UnknownExtension(path.to_string()))
}

/// Output name for `--save`: the notebook's path with the format's
/// extension, plus [`SAVE_INFIX`] when that would reproduce the input.
pub fn derive_save_path(notebook: &str, format: OutputFormat) -> String {
    let (base, old_ext) = split_extension(notebook);
    let ext = format.extension();
    if old_ext.strip_prefix('.') == Some(ext) {
        format!("{base}{SAVE_INFIX}.{ext}")
    } else {
        format!("{base}.{ext}")
    }
}

/// Insert a timestamp token immediately before the final extension.
pub fn insert_timestamp(path: &str, now: NaiveDateTime) -> String {
    let (base, ext) = split_extension(path);
    format!("{base}.{}{ext}", now.format(TIMESTAMP_FORMAT))
}

/// Split `path` into `(base, ext)` where `ext` includes its leading dot.
///
/// Only the final path component is considered; leading dots of a file
/// name (`.hidden`) do not start an extension.
pub fn split_extension(path: &str) -> (&str, &str) {
    let name_start = path
        .rfind(|c: char| c == '/' || c == std::path::MAIN_SEPARATOR)
        .map_or(0, |i| i + 1);
    let name = &path[name_start..];
    match name.rfind('.') {
        Some(dot) if name[..dot].chars().any(|c| c != '.') => path.split_at(name_start + dot),
        _ => (path, ""),
    }
}
