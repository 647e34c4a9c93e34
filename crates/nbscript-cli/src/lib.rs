//! Shared plumbing for the nbscript binaries.

use std::process::ExitCode;

use nbscript_core::{Error, Outcome};

/// Initialize logging on stderr.
///
/// Stdout is left alone because converted notebooks may be printed there.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Turn the result of a run into this process's exit status, reporting
/// errors (with recovery hints) on stderr.
pub fn finish(program: &str, result: Result<Outcome, Error>) -> ExitCode {
    match result {
        Ok(outcome) => ExitCode::from(clamp_exit_code(outcome.exit_code())),
        Err(err) => {
            eprintln!("{program}: {}", err.with_hint());
            ExitCode::from(err.exit_code())
        }
    }
}

/// The words after the program name, for the core parsers.
///
/// clap consumes a leading `--`, which still matters downstream (it lets a
/// notebook name start with `-`), so the raw words win when clap dropped one.
pub fn command_words(parsed: Vec<String>) -> Vec<String> {
    let raw = std::env::args_os()
        .skip(1)
        .map(|word| word.to_string_lossy().into_owned())
        .collect();
    restore_delimiter(raw, parsed)
}

fn restore_delimiter(raw: Vec<String>, parsed: Vec<String>) -> Vec<String> {
    if raw.len() > parsed.len() { raw } else { parsed }
}

/// Child exit codes outside `0..=255` are reported as 1.
fn clamp_exit_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
