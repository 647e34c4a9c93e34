//! nbscript - run a Jupyter notebook like a script.

use std::process::ExitCode;

use clap::Parser;
use nbscript_core::{ConverterConfig, InvocationArgs, RunContext, SystemRunner, run_notebook};

const AFTER_HELP: &str = "\
Options (before NOTEBOOK):
      --to FORMAT       Output format: notebook, markdown, asciidoc, html, latex, pdf, rst, script, slides
  -o, --output PATH     Write output to PATH (format inferred from .ipynb, .md, .txt)
      --save            Save next to the notebook (one.ipynb -> one.out.ipynb)
      --timestamp, --ts Insert a timestamp before the output file's extension
  -v, --verbose         Debug logging on stderr

Any other option before NOTEBOOK is passed to `jupyter nbconvert`. Everything
after NOTEBOOK is left for the notebook to read from the NB_ARGV variable
(a JSON list, notebook path first).

Without --output or --save the executed notebook is printed as asciidoc.";

#[derive(Parser)]
#[command(name = "nbscript")]
#[command(about = "Run a Jupyter notebook like a script")]
#[command(override_usage = "nbscript [options] NOTEBOOK [arg ...]")]
#[command(after_help = AFTER_HELP)]
#[command(version)]
struct Cli {
    /// Options, the notebook, and the notebook's own arguments
    #[arg(allow_hyphen_values = true, trailing_var_arg = true, value_name = "ARGS")]
    args: Vec<String>,
}

fn main() -> ExitCode {
    let args = nbscript_cli::command_words(Cli::parse().args);
    nbscript_cli::init_logging(InvocationArgs::wants_verbose(&args));

    let result = run_notebook(
        &args,
        &RunContext::from_env(),
        &ConverterConfig::from_env(),
        &SystemRunner,
    );
    nbscript_cli::finish("nbscript", result)
}
