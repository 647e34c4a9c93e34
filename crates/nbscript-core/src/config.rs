//! Configuration for the external programs nbscript drives.
//!
//! Defaults match a stock Jupyter + Slurm installation. Each program can be
//! replaced through an environment variable, which is mostly useful on
//! clusters with wrapped scheduler commands and in tests.

/// Overrides the conversion engine program (default `jupyter`).
pub const JUPYTER_ENV: &str = "NBSCRIPT_JUPYTER";
/// Overrides the asynchronous submission program (default `sbatch`).
pub const SBATCH_ENV: &str = "NBSCRIPT_SBATCH";
/// Overrides the synchronous run program (default `srun`).
pub const SRUN_ENV: &str = "NBSCRIPT_SRUN";
/// Overrides the shell that runs generated scripts (default `bash`).
pub const SHELL_ENV: &str = "NBSCRIPT_SHELL";
/// Overrides the command submitted jobs use to re-invoke nbscript.
pub const COMMAND_ENV: &str = "NBSCRIPT_COMMAND";

/// How to call the conversion engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterConfig {
    /// Program to run.
    pub program: String,
    /// Arguments that always come first: the subcommand and the flags that
    /// execute every cell, keep going after cell errors, and disable the
    /// per-cell timeout.
    pub base_args: Vec<String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: "jupyter".to_string(),
            base_args: vec![
                "nbconvert".to_string(),
                "--execute".to_string(),
                "--allow-errors".to_string(),
                "--ExecutePreprocessor.timeout=None".to_string(),
            ],
        }
    }
}

impl ConverterConfig {
    /// Defaults with overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides from an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(program) = non_empty(lookup(JUPYTER_ENV)) {
            config.program = program;
        }
        config
    }
}

/// How to talk to the batch scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Asynchronous submission (`sbatch`).
    pub submit_program: String,
    /// Synchronous run (`srun`).
    pub run_program: String,
    /// Shell used for direct runs and as the `srun` payload.
    pub shell: String,
    /// Command a submitted script uses to run nbscript.
    pub nbscript_command: Vec<String>,
    /// Line prefix of embedded directives.
    pub directive_marker: String,
    /// Appended to the output path to name the scheduler log.
    pub log_suffix: String,
    /// Variables removed before submitting so the job is not treated as a
    /// step of the job we might be running inside.
    pub stripped_vars: Vec<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            submit_program: "sbatch".to_string(),
            run_program: "srun".to_string(),
            shell: "bash".to_string(),
            nbscript_command: vec!["nbscript".to_string()],
            directive_marker: "#SBATCH".to_string(),
            log_suffix: ".log".to_string(),
            stripped_vars: ["SLURM_JOB_ID", "SLURM_JOBID", "SLURM_STEP_ID", "SLURM_STEPID"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl SchedulerConfig {
    /// Defaults with overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides from an arbitrary lookup.
    ///
    /// `NBSCRIPT_COMMAND` is shell-split, so it may carry arguments.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(program) = non_empty(lookup(SBATCH_ENV)) {
            config.submit_program = program;
        }
        if let Some(program) = non_empty(lookup(SRUN_ENV)) {
            config.run_program = program;
        }
        if let Some(shell) = non_empty(lookup(SHELL_ENV)) {
            config.shell = shell;
        }
        if let Some(command) = non_empty(lookup(COMMAND_ENV)) {
            match shlex::split(&command) {
                Some(words) if !words.is_empty() => config.nbscript_command = words,
                _ => tracing::warn!("ignoring unparsable {}={:?}", COMMAND_ENV, command),
            }
        }
        config
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
