//! Batch submission of notebook runs (`snotebook`).
//!
//! ```text
//! snotebook [--srun] [--raw] [-v] [scheduler opts] [--- nbscript opts] NOTEBOOK [arg ...]
//! ```
//!
//! Scheduler options come from two places, in this order: `#SBATCH` lines of
//! the notebook's first code cell, then the command line. The scheduler
//! itself settles conflicts (last one wins). The job is a tiny shell script
//! that `exec`s nbscript, fed to the scheduler on stdin.

use chrono::{Local, NaiveDateTime};

use crate::args::{InvocationArgs, OptionSpec, split_known};
use crate::config::SchedulerConfig;
use crate::context::{ChildEnv, RunContext};
use crate::directives::DirectiveScanner;
use crate::error::{Error, Result};
use crate::invoke::{Outcome, guard};
use crate::notebook::Notebook;
use crate::resolve::resolve_at;
use crate::runner::{ChildCommand, ProcessRunner};

/// Separates scheduler options from nbscript options on the command line.
pub const SEPARATOR: &str = "---";

const SRUN: usize = 0;
const RAW: usize = 1;
const VERBOSE: usize = 2;

const SCHEDULER_OPTIONS: [OptionSpec; 3] = [
    OptionSpec { long: &["srun"], short: None, takes_value: false },
    OptionSpec { long: &["raw"], short: None, takes_value: false },
    OptionSpec { long: &["verbose"], short: Some('v'), takes_value: false },
];

/// How the generated script is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Straight into a local shell, no scheduler.
    Direct,
    /// Synchronous scheduler run; blocks until the notebook finishes.
    Blocking,
    /// Asynchronous submission to the queue.
    Queued,
}

/// Parsed `snotebook` command line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchedulerArgs {
    /// `--srun`.
    pub srun: bool,
    /// `--raw`.
    pub raw: bool,
    /// `--verbose/-v`.
    pub verbose: bool,
    /// Options for the scheduler (before `---`).
    pub scheduler_opts: Vec<String>,
    /// Options for nbscript (after `---`).
    pub nbscript_opts: Vec<String>,
    /// The notebook path.
    pub notebook: String,
    /// Everything after the notebook.
    pub notebook_argv: Vec<String>,
}

impl SchedulerArgs {
    /// Split raw tokens (without the program name).
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        let tokens: Vec<String> = tokens.iter().map(|t| t.as_ref().to_string()).collect();
        let split = split_known(&tokens, &SCHEDULER_OPTIONS, Some(SEPARATOR))?;

        let (nbscript_opts, notebook, notebook_argv) = if split.stopped {
            // Parse the nbscript side properly so `-o out.md` keeps its value.
            let inner = InvocationArgs::parse(&split.rest)?;
            let consumed = split.rest.len() - inner.notebook_argv.len() - 1;
            (
                split.rest[..consumed].to_vec(),
                inner.notebook,
                inner.notebook_argv,
            )
        } else {
            (Vec::new(), split.positional.clone(), split.rest.clone())
        };

        Ok(Self {
            srun: split.has(SRUN),
            raw: split.has(RAW),
            verbose: split.has(VERBOSE),
            scheduler_opts: split.unknown,
            nbscript_opts,
            notebook,
            notebook_argv,
        })
    }

    /// Whether `tokens` ask for verbose output. Malformed input counts as no.
    pub fn wants_verbose<S: AsRef<str>>(tokens: &[S]) -> bool {
        Self::parse(tokens).map(|args| args.verbose).unwrap_or(false)
    }

    /// `--raw` beats `--srun`; queued is the default.
    pub fn mode(&self) -> RunMode {
        if self.raw {
            RunMode::Direct
        } else if self.srun {
            RunMode::Blocking
        } else {
            RunMode::Queued
        }
    }
}

/// A fully prepared submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub mode: RunMode,
    /// Scheduler options in the order they are passed.
    pub scheduler_opts: Vec<String>,
    /// The nbscript command line the job runs.
    pub nbscript_argv: Vec<String>,
    /// Scheduler log file (queued mode only).
    pub log_path: Option<String>,
    /// The command that receives the script.
    pub command: ChildCommand,
}

impl Submission {
    /// The generated job script.
    pub fn script(&self) -> &str {
        self.command.stdin.as_deref().unwrap_or_default()
    }
}

/// Build the submission for `args` without running anything.
///
/// Reads the notebook for directives and resolves the nbscript side fully,
/// so routing errors surface here rather than inside the job.
pub fn prepare(
    args: &SchedulerArgs,
    config: &SchedulerConfig,
    now: NaiveDateTime,
) -> Result<Submission> {
    let notebook = Notebook::read_from_file(&args.notebook)?;
    let scanner = DirectiveScanner::new(&config.directive_marker)?;
    let mut scheduler_opts = scanner.scan_notebook(&notebook)?;
    tracing::debug!(?scheduler_opts, "directives from notebook");
    scheduler_opts.extend(args.scheduler_opts.iter().cloned());

    let mut nbscript_opts = Vec::new();
    if args.verbose {
        nbscript_opts.push("--verbose".to_string());
    }
    nbscript_opts.extend(args.nbscript_opts.iter().cloned());

    let mode = args.mode();
    let mut plan = resolve_at(&InvocationArgs::parse(&primary_tokens(&nbscript_opts, args))?, now)?;

    let mut log_path = None;
    if mode == RunMode::Queued {
        // A queued job has no terminal; make sure results land in a file.
        if plan.output_path().is_none() {
            nbscript_opts.insert(0, "--save".to_string());
            plan = resolve_at(&InvocationArgs::parse(&primary_tokens(&nbscript_opts, args))?, now)?;
        }
        log_path = plan
            .output_path_pre_timestamp
            .as_ref()
            .map(|path| format!("{path}{}", config.log_suffix));
    }

    let nbscript_argv: Vec<String> = config
        .nbscript_command
        .iter()
        .cloned()
        .chain(primary_tokens(&nbscript_opts, args))
        .collect();
    let script = render_script(&nbscript_argv, args.verbose)?;

    let env = config
        .stripped_vars
        .iter()
        .fold(ChildEnv::new(), |env, var| env.remove(var));

    let command = match mode {
        RunMode::Direct => {
            if !scheduler_opts.is_empty() {
                tracing::debug!("direct run, ignoring scheduler options {:?}", scheduler_opts);
            }
            ChildCommand::new(&config.shell)
        }
        RunMode::Blocking => ChildCommand::new(&config.run_program)
            .args(scheduler_opts.iter().cloned())
            .arg(&config.shell),
        RunMode::Queued => ChildCommand::new(&config.submit_program)
            .args(log_path.iter().map(|path| format!("--output={path}")))
            .args(scheduler_opts.iter().cloned()),
    };

    Ok(Submission {
        mode,
        scheduler_opts,
        nbscript_argv,
        log_path,
        command: command.env(env).stdin(script),
    })
}

/// nbscript options, notebook, notebook arguments.
///
/// A notebook name that looks like an option is preceded by `--`.
fn primary_tokens(nbscript_opts: &[String], args: &SchedulerArgs) -> Vec<String> {
    let mut tokens = nbscript_opts.to_vec();
    if args.notebook.starts_with('-') && tokens.last().map(String::as_str) != Some("--") {
        tokens.push("--".to_string());
    }
    tokens.push(args.notebook.clone());
    tokens.extend(args.notebook_argv.iter().cloned());
    tokens
}

/// The job script: optional diagnostics, then `exec` of the command.
///
/// This is the only place arguments are joined into shell text.
pub fn render_script(command: &[String], diagnostics: bool) -> Result<String> {
    let line = shlex::try_join(command.iter().map(String::as_str))
        .map_err(|e| Error::Configuration(format!("cannot quote job command: {e}")))?;

    let mut script = String::from("#!/bin/bash\n");
    if diagnostics {
        script.push_str("type ml >/dev/null 2>&1 && ml list\n");
        script.push_str("env | grep '^SLURM_' | sort\n");
    }
    script.push_str("set -x\n");
    script.push_str("exec ");
    script.push_str(&line);
    script.push('\n');
    Ok(script)
}

/// The `snotebook` entry point: guard, parse, prepare, submit.
pub fn submit_notebook<S: AsRef<str>>(
    tokens: &[S],
    ctx: &RunContext,
    config: &SchedulerConfig,
    runner: &dyn ProcessRunner,
) -> Result<Outcome> {
    if let Some(outcome) = guard(ctx) {
        return Ok(outcome);
    }
    let args = SchedulerArgs::parse(tokens)?;
    tracing::debug!(?args, "parsed arguments");
    if args.raw && args.srun {
        tracing::warn!("--raw and --srun both given, running directly without the scheduler");
    }

    let submission = prepare(&args, config, Local::now().naive_local())?;
    tracing::debug!("submit command: {}", submission.command.display());
    tracing::debug!("job script:\n{}", submission.script());
    if let Some(log) = &submission.log_path {
        tracing::info!("scheduler log will be written to {}", log);
    }

    let code = runner.run(&submission.command)?;
    if code != 0 {
        tracing::warn!("{} exited with status {}", submission.command.program, code);
    }
    tracing::debug!("snotebook completed, return value {}", code);
    Ok(Outcome::Exited(code))
}
