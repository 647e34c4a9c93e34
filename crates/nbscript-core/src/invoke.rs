//! Launching the conversion engine for a resolved plan.

use crate::args::InvocationArgs;
use crate::config::ConverterConfig;
use crate::context::{ChildEnv, RunContext};
use crate::error::Result;
use crate::resolve::{ResolvedPlan, resolve};
use crate::runner::{ChildCommand, ProcessRunner};

/// How a run ended, when it did not fail before launching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Re-entrancy guard tripped; nothing was launched.
    AlreadyRunning,
    /// The child ran and exited with this code.
    Exited(i32),
}

impl Outcome {
    /// Exit code this process should report.
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::AlreadyRunning => 0,
            Outcome::Exited(code) => code,
        }
    }
}

/// Check the re-entrancy marker. Returns `Some` when the caller must stop.
pub fn guard(ctx: &RunContext) -> Option<Outcome> {
    if ctx.already_running {
        tracing::error!("detected that nbscript is already running in a parent process, not executing again");
        return Some(Outcome::AlreadyRunning);
    }
    None
}

/// The converter invocation for `plan`.
///
/// Order: configured base args, routing flags, pass-through flags, notebook.
pub fn build_command(plan: &ResolvedPlan, config: &ConverterConfig) -> Result<ChildCommand> {
    let env = ChildEnv::for_conversion(&plan.notebook_argv)?;
    Ok(ChildCommand::new(&config.program)
        .args(config.base_args.iter().cloned())
        .args(plan.routing_args())
        .args(plan.converter_args.iter().cloned())
        .arg(&plan.notebook)
        .env(env))
}

/// Launch the converter for `plan` and wait for it.
pub fn invoke(
    plan: &ResolvedPlan,
    config: &ConverterConfig,
    runner: &dyn ProcessRunner,
) -> Result<Outcome> {
    let command = build_command(plan, config)?;
    tracing::debug!("converter command: {}", command.display());
    tracing::debug!(
        "NB_ARGV: {}",
        plan.notebook_argv.to_json().unwrap_or_default()
    );
    let code = runner.run(&command)?;
    if code != 0 {
        tracing::warn!("{} exited with status {}", config.program, code);
    }
    Ok(Outcome::Exited(code))
}

/// The `nbscript` entry point: guard, parse, resolve, invoke.
///
/// All argument and routing errors surface before anything is launched.
pub fn run_notebook<S: AsRef<str>>(
    tokens: &[S],
    ctx: &RunContext,
    config: &ConverterConfig,
    runner: &dyn ProcessRunner,
) -> Result<Outcome> {
    if let Some(outcome) = guard(ctx) {
        return Ok(outcome);
    }
    let args = InvocationArgs::parse(tokens)?;
    tracing::debug!(?args, "parsed arguments");
    let plan = resolve(&args)?;
    invoke(&plan, config, runner)
}
