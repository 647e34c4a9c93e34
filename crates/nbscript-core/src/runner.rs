//! Launching external programs.
//!
//! Commands are kept as structured argument lists until the moment they are
//! handed to the OS. [`ProcessRunner`] is the seam between deciding what to
//! run and running it.

use std::io::{ErrorKind, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Mutex;

use crate::context::ChildEnv;
use crate::error::{Error, Result};

/// A fully specified child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: ChildEnv,
    /// Written to the child's stdin, which is then closed. When `None` the
    /// child inherits our stdin.
    pub stdin: Option<String>,
}

impl ChildCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: ChildEnv::default(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, env: ChildEnv) -> Self {
        self.env = env;
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Shell-quoted rendering, for logs.
    pub fn display(&self) -> String {
        let argv = self.argv();
        shlex::try_join(argv.iter().map(String::as_str)).unwrap_or_else(|_| argv.join(" "))
    }
}

/// Runs a child to completion and reports its exit code.
pub trait ProcessRunner {
    fn run(&self, command: &ChildCommand) -> Result<i32>;
}

/// Runs commands as real OS processes, blocking until they exit.
///
/// Stdout and stderr are inherited untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &ChildCommand) -> Result<i32> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        for (key, value) in &command.env.set {
            cmd.env(key, value);
        }
        for key in &command.env.remove {
            cmd.env_remove(key);
        }
        if command.stdin.is_some() {
            cmd.stdin(Stdio::piped());
        }

        tracing::debug!("running: {}", command.display());
        let mut child = cmd.spawn().map_err(|source| Error::Launch {
            program: command.program.clone(),
            source,
        })?;

        // Dropping the handle closes the pipe so the child sees EOF.
        let written = match (&command.stdin, child.stdin.take()) {
            (Some(input), Some(mut pipe)) => match pipe.write_all(input.as_bytes()) {
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    tracing::debug!("{} did not read its stdin", command.program);
                    Ok(())
                }
                result => result,
            },
            _ => Ok(()),
        };

        // Reap the child even when feeding it failed.
        let status = child.wait()?;
        written?;
        let code = exit_code(status);
        tracing::debug!("{} exited with {}", command.program, code);
        Ok(code)
    }
}

/// Exit code of a finished child; `128 + signal` if it was killed.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Records commands instead of running them, for tests.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<ChildCommand>>,
    exit_code: i32,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `code` for every recorded command.
    pub fn with_exit_code(code: i32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            exit_code: code,
        }
    }

    /// Commands recorded so far.
    pub fn calls(&self) -> Vec<ChildCommand> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl ProcessRunner for RecordingRunner {
    fn run(&self, command: &ChildCommand) -> Result<i32> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command.clone());
        }
        Ok(self.exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let cmd = ChildCommand::new("sbatch")
            .arg("--output=x.log")
            .args(["--mem=1G", "-c"])
            .arg("5")
            .stdin("#!/bin/bash\n");
        assert_eq!(cmd.argv(), vec!["sbatch", "--output=x.log", "--mem=1G", "-c", "5"]);
        assert_eq!(cmd.stdin.as_deref(), Some("#!/bin/bash\n"));
    }

    #[test]
    fn test_display_quotes() {
        let cmd = ChildCommand::new("echo").args(["a b", "c"]);
        let shown = cmd.display();
        assert_ne!(shown, "echo a b c");
        assert_eq!(shlex::split(&shown).unwrap(), cmd.argv());
    }

    #[test]
    fn test_recording_runner() {
        let runner = RecordingRunner::with_exit_code(3);
        let cmd = ChildCommand::new("jupyter");
        assert_eq!(runner.run(&cmd).unwrap(), 3);
        assert_eq!(runner.calls(), vec![cmd]);
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let cmd = ChildCommand::new("nbscript-test-definitely-not-installed");
        let err = SystemRunner.run(&cmd).unwrap_err();
        assert!(matches!(err, Error::Launch { ref program, .. } if program == &cmd.program));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_and_env() {
        let cmd = ChildCommand::new("sh")
            .args(["-c", "test \"$NB_TEST\" = yes && exit 7"])
            .env(ChildEnv::new().set("NB_TEST", "yes"));
        assert_eq!(SystemRunner.run(&cmd).unwrap(), 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_stdin_is_delivered_and_closed() {
        let cmd = ChildCommand::new("sh").stdin("exit 4\n");
        assert_eq!(SystemRunner.run(&cmd).unwrap(), 4);
    }

    #[cfg(unix)]
    #[test]
    fn test_unread_stdin_still_reports_exit_code() {
        // Larger than a pipe buffer, so the write fails once the child exits.
        let cmd = ChildCommand::new("sh")
            .args(["-c", "exit 5"])
            .stdin("x".repeat(1 << 20));
        assert_eq!(SystemRunner.run(&cmd).unwrap(), 5);
    }
}
