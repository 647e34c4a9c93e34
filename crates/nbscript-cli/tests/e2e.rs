//! End-to-end tests for the nbscript and snotebook binaries.
//!
//! The conversion engine and the scheduler are replaced with small shell
//! scripts through the NBSCRIPT_* override variables, so these tests only
//! need a POSIX shell.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin for tests

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// A temporary working directory holding a test notebook.
struct TestNotebook {
    temp_dir: TempDir,
}

impl TestNotebook {
    fn new(filename: &str, first_cell: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let notebook_path = temp_dir.path().join(filename);
        let notebook = serde_json::json!({
            "nbformat": 4,
            "nbformat_minor": 2,
            "metadata": {},
            "cells": [
                {"cell_type": "code", "metadata": {}, "execution_count": null, "outputs": [], "source": first_cell},
                {"cell_type": "code", "metadata": {}, "execution_count": null, "outputs": [], "source": "#SBATCH --invalid-argument\n"}
            ]
        });
        fs::write(&notebook_path, notebook.to_string()).expect("Failed to write notebook");

        Self { temp_dir }
    }

    fn slurm() -> Self {
        Self::new("slurm.ipynb", "#SBATCH --mem=1234M\n#SBATCH --gres=gpu:1 -c 5\nimport sys\n")
    }

    fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write an executable shell script into the notebook's directory.
    #[cfg(unix)]
    fn script(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.dir().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}")).expect("Failed to write script");
        let mut perms = fs::metadata(&path).expect("Failed to stat script").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("Failed to chmod script");
        path
    }
}

/// A binary of this crate, run from `dir` with a clean nbscript environment.
fn command(bin: &str, dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin(bin).expect("binary is built");
    cmd.current_dir(dir)
        .env_remove("NBSCRIPT_RUNNING")
        .env_remove("NB_ARGV")
        .env_remove("NBSCRIPT_COMMAND")
        .env_remove("NBSCRIPT_SHELL")
        .env_remove("RUST_LOG");
    cmd
}

const NOT_INSTALLED: &str = "nbscript-test-definitely-not-installed";

// =============================================================================
// nbscript
// =============================================================================

#[test]
fn test_help_lists_options() {
    let nb = TestNotebook::slurm();
    command("nbscript", nb.dir())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--timestamp"))
        .stdout(predicate::str::contains("NB_ARGV"));
}

#[test]
fn test_missing_notebook_is_usage_error() {
    let nb = TestNotebook::slurm();
    command("nbscript", nb.dir())
        .arg("--save")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("notebook"));
}

#[test]
fn test_unknown_extension_fails_before_launch() {
    let nb = TestNotebook::slurm();
    command("nbscript", nb.dir())
        .env("NBSCRIPT_JUPYTER", NOT_INSTALLED)
        .args(["-o", "out.xyz", "slurm.ipynb"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("configuration error"))
        .stderr(predicate::str::contains("hint"))
        .stderr(predicate::str::contains(NOT_INSTALLED).not());
}

#[test]
fn test_unknown_to_format_hint() {
    let nb = TestNotebook::slurm();
    command("nbscript", nb.dir())
        .env("NBSCRIPT_JUPYTER", NOT_INSTALLED)
        .args(["--to", "webpdf", "slurm.ipynb"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown output format \"webpdf\""))
        .stderr(predicate::str::contains("--to takes one of"))
        .stderr(predicate::str::contains("extension").not());
}

#[test]
fn test_output_equal_to_input_is_refused() {
    let nb = TestNotebook::slurm();
    command("nbscript", nb.dir())
        .env("NBSCRIPT_JUPYTER", NOT_INSTALLED)
        .args(["-o", "slurm.ipynb", "slurm.ipynb"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("refusing to convert"));
}

#[test]
fn test_already_running_exits_cleanly() {
    let nb = TestNotebook::slurm();
    command("nbscript", nb.dir())
        .env("NBSCRIPT_RUNNING", "True")
        .env("NBSCRIPT_JUPYTER", NOT_INSTALLED)
        .arg("slurm.ipynb")
        .assert()
        .success()
        .stderr(predicate::str::contains("already running"));
}

#[test]
fn test_missing_converter_is_launch_error() {
    let nb = TestNotebook::slurm();
    command("nbscript", nb.dir())
        .env("NBSCRIPT_JUPYTER", NOT_INSTALLED)
        .arg("slurm.ipynb")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(format!("failed to launch {NOT_INSTALLED}")));
}

#[cfg(unix)]
#[test]
fn test_converter_command_line() {
    let nb = TestNotebook::slurm();
    let fake = nb.script("fake-jupyter", "echo \"$@\"\n");
    command("nbscript", nb.dir())
        .env("NBSCRIPT_JUPYTER", &fake)
        .args(["--save", "--Foo.bar=1", "slurm.ipynb", "--alpha"])
        .assert()
        .success()
        .stdout(predicate::str::diff(
            "nbconvert --execute --allow-errors --ExecutePreprocessor.timeout=None \
             --output-dir=. --output slurm.out.ipynb --to notebook --Foo.bar=1 slurm.ipynb\n",
        ));
}

#[cfg(unix)]
#[test]
fn test_notebook_environment_and_exit_code() {
    let nb = TestNotebook::slurm();
    let fake = nb.script(
        "fake-jupyter",
        "printf '%s\\n' \"$NB_ARGV\" \"$NB_NAME\" \"$NBSCRIPT_RUNNING\"\nexit 4\n",
    );
    command("nbscript", nb.dir())
        .env("NBSCRIPT_JUPYTER", &fake)
        .args(["slurm.ipynb", "--alpha", "two words"])
        .assert()
        .code(4)
        .stdout(predicate::str::diff(
            "[\"slurm.ipynb\",\"--alpha\",\"two words\"]\nslurm.ipynb\nTrue\n",
        ));
}

#[cfg(unix)]
#[test]
fn test_double_dash_before_dash_notebook() {
    let nb = TestNotebook::new("-x.ipynb", "import sys\n");
    let fake = nb.script("fake-jupyter", "printf '%s\\n' \"$NB_NAME\" \"$NB_ARGV\"\n");
    command("nbscript", nb.dir())
        .env("NBSCRIPT_JUPYTER", &fake)
        .args(["--", "-x.ipynb", "y"])
        .assert()
        .success()
        .stdout(predicate::str::diff("-x.ipynb\n[\"-x.ipynb\",\"y\"]\n"));
}

// =============================================================================
// snotebook
// =============================================================================

#[test]
fn test_snotebook_already_running() {
    let nb = TestNotebook::slurm();
    command("snotebook", nb.dir())
        .env("NBSCRIPT_RUNNING", "True")
        .env("NBSCRIPT_SBATCH", NOT_INSTALLED)
        .arg("slurm.ipynb")
        .assert()
        .success();
}

#[test]
fn test_snotebook_missing_notebook_file() {
    let nb = TestNotebook::slurm();
    command("snotebook", nb.dir())
        .env("NBSCRIPT_SBATCH", NOT_INSTALLED)
        .arg("missing.ipynb")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing.ipynb"));
}

#[cfg(unix)]
#[test]
fn test_snotebook_queued_submission() {
    let nb = TestNotebook::slurm();
    let fake = nb.script(
        "fake-sbatch",
        "echo \"ARGS $@\"\necho \"JOB ${SLURM_JOB_ID:-unset}\"\ncat\n",
    );
    command("snotebook", nb.dir())
        .env("NBSCRIPT_SBATCH", &fake)
        .env("SLURM_JOB_ID", "12345")
        .args(["--exclusive", "---", "--timestamp", "slurm.ipynb", "A"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "ARGS --output=slurm.out.ipynb.log --mem=1234M --gres=gpu:1 -c 5 --exclusive\n",
        ))
        .stdout(predicate::str::contains("JOB unset"))
        .stdout(predicate::str::contains("#!/bin/bash\n"))
        .stdout(predicate::str::contains("exec nbscript --save --timestamp slurm.ipynb A\n"))
        .stdout(predicate::str::contains("--invalid-argument").not());
}

#[cfg(unix)]
#[test]
fn test_snotebook_raw_runs_script_locally() {
    let nb = TestNotebook::slurm();
    let fake_nbscript = nb.script("fake-nbscript", "echo \"NBSCRIPT $@\"\n");
    command("snotebook", nb.dir())
        .env("NBSCRIPT_COMMAND", &fake_nbscript)
        .env("NBSCRIPT_SHELL", "sh")
        .env("NBSCRIPT_SBATCH", NOT_INSTALLED)
        .args(["--raw", "slurm.ipynb", "x"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NBSCRIPT slurm.ipynb x\n"));
}

#[cfg(unix)]
#[test]
fn test_snotebook_srun_relays_exit_code() {
    let nb = TestNotebook::slurm();
    let fake = nb.script("fake-srun", "echo \"SRUN $@\"\nexit 9\n");
    command("snotebook", nb.dir())
        .env("NBSCRIPT_SRUN", &fake)
        .args(["--srun", "--time=10", "slurm.ipynb"])
        .assert()
        .code(9)
        .stdout(predicate::str::contains(
            "SRUN --mem=1234M --gres=gpu:1 -c 5 --time=10 bash\n",
        ));
}

#[cfg(unix)]
#[test]
fn test_snotebook_forwards_double_dash() {
    let nb = TestNotebook::new("-x.ipynb", "import sys\n");
    let fake_nbscript = nb.script("fake-nbscript", "echo \"NBSCRIPT $@\"\n");
    command("snotebook", nb.dir())
        .env("NBSCRIPT_COMMAND", &fake_nbscript)
        .env("NBSCRIPT_SHELL", "sh")
        .args(["--raw", "--", "-x.ipynb", "y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NBSCRIPT -- -x.ipynb y\n"));
}
