//! snotebook - submit a notebook run to Slurm.

use std::process::ExitCode;

use clap::Parser;
use nbscript_core::{RunContext, SchedulerArgs, SchedulerConfig, SystemRunner, submit_notebook};

const AFTER_HELP: &str = "\
Options (before NOTEBOOK):
      --srun        Run synchronously with srun instead of submitting with sbatch
      --raw         Run the job script directly with bash, no scheduler
  -v, --verbose     Debug logging, and environment diagnostics in the job

Other options before NOTEBOOK go to the scheduler and must be given in a
single word (--mem=2G, -c5). Options after `---` go to nbscript. Everything
after NOTEBOOK is passed to the notebook.

`#SBATCH` lines in the notebook's first code cell are added to the scheduler
options, before the ones given here. Submitted jobs save their output
(nbscript --save) unless an output file is requested, and log to
OUTPUT.log.";

#[derive(Parser)]
#[command(name = "snotebook")]
#[command(about = "Submit a Jupyter notebook run to the Slurm scheduler")]
#[command(override_usage = "snotebook [--srun] [--raw] [scheduler opts] [--- nbscript opts] NOTEBOOK [arg ...]")]
#[command(after_help = AFTER_HELP)]
#[command(version)]
struct Cli {
    /// Options, the notebook, and the notebook's own arguments
    #[arg(allow_hyphen_values = true, trailing_var_arg = true, value_name = "ARGS")]
    args: Vec<String>,
}

fn main() -> ExitCode {
    let args = nbscript_cli::command_words(Cli::parse().args);
    nbscript_cli::init_logging(SchedulerArgs::wants_verbose(&args));

    let result = submit_notebook(
        &args,
        &RunContext::from_env(),
        &SchedulerConfig::from_env(),
        &SystemRunner,
    );
    nbscript_cli::finish("snotebook", result)
}
