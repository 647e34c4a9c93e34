//! Run Jupyter notebooks like shell scripts.
//!
//! This crate decides *what* to run; the notebook is executed and rendered
//! by an external conversion engine, and batch jobs are handled by the
//! cluster scheduler.
//!
//! # Architecture
//!
//! ```text
//! tokens ──► InvocationArgs ──► resolve() ──► ResolvedPlan ──► invoke() ──► jupyter nbconvert
//!                                                 ▲
//! tokens ──► SchedulerArgs ──► prepare() ─────────┘ ──► Submission ──► sbatch / srun / bash
//!                                 ▲
//!                    #SBATCH lines of the first code cell
//! ```
//!
//! A notebook learns its own arguments through `NB_ARGV` (see
//! [`NotebookArgv::from_env`]). `NBSCRIPT_RUNNING` in a child's environment
//! stops a notebook from running nbscript on itself recursively.

pub mod args;
pub mod config;
pub mod context;
pub mod directives;
pub mod error;
pub mod format;
pub mod invoke;
pub mod notebook;
pub mod resolve;
pub mod runner;
pub mod scheduler;

pub use args::InvocationArgs;
pub use config::{ConverterConfig, SchedulerConfig};
pub use context::{ChildEnv, NotebookArgv, RunContext};
pub use directives::DirectiveScanner;
pub use error::{Error, Result};
pub use format::OutputFormat;
pub use invoke::{Outcome, build_command, invoke, run_notebook};
pub use notebook::Notebook;
pub use resolve::{OutputTarget, ResolvedPlan, resolve, resolve_at};
pub use runner::{ChildCommand, ProcessRunner, RecordingRunner, SystemRunner};
pub use scheduler::{RunMode, SchedulerArgs, Submission, prepare, submit_notebook};
