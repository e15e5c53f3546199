//! External command execution
//!
//! Every compiler, optimizer, build tool and benchmark binary goes through
//! [`CommandRunner`]. The working directory and environment are explicit
//! parts of each [`CommandSpec`]; nothing here touches the process-wide
//! current directory.

use crate::error::{SuiteError, SuiteResult};
use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

/// Environment handed to a child process
pub type EnvMap = BTreeMap<String, String>;

/// Snapshot of the current process environment
pub fn current_env() -> EnvMap {
    std::env::vars().collect()
}

/// A fully described external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute (name on PATH or path)
    pub program: String,
    /// Arguments, not including the program
    pub args: Vec<String>,
    /// Directory the child runs in (None = inherit)
    pub cwd: Option<PathBuf>,
    /// Complete child environment (None = inherit)
    pub env: Option<EnvMap>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: None,
        }
    }

    /// Build a spec from an argv-style list (first element is the program)
    pub fn from_argv(argv: &[String]) -> SuiteResult<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| SuiteError::config("empty command line"))?;
        Ok(Self::new(program.clone()).args(args.iter().cloned()))
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

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn envs(mut self, env: EnvMap) -> Self {
        self.env = Some(env);
        self
    }

    /// Shell-quoted rendering for logs
    pub fn display(&self) -> String {
        let words =
            std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        shlex::try_join(words).unwrap_or_else(|_| {
            let mut line = self.program.clone();
            for arg in &self.args {
                line.push(' ');
                line.push_str(arg);
            }
            line
        })
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code if the process exited normally
    pub exit_code: Option<i32>,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn a non-zero exit into [`SuiteError::CommandFailed`]
    pub fn check(self, program: &str) -> SuiteResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(SuiteError::CommandFailed {
                program: program.to_string(),
                exit_code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

/// Seam between the suite and the operating system
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    /// Run the command to completion and capture its output.
    ///
    /// A non-zero exit is not an error at this level; spawn failures are.
    fn run(&self, command: &CommandSpec) -> SuiteResult<CommandOutput>;
}

/// Runs commands as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandSpec) -> SuiteResult<CommandOutput> {
        tracing::debug!(
            cwd = ?command.cwd,
            command = %command.display(),
            "Running external command"
        );

        // stderr is spooled to disk so chatty tools cannot fill the pipe
        let mut stderr_file = tempfile::tempfile()?;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(stderr_file.try_clone()?));
        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }
        if let Some(env) = &command.env {
            cmd.env_clear().envs(env);
        }

        let start = Instant::now();
        let output = cmd.output().map_err(|source| SuiteError::CommandSpawn {
            program: command.program.clone(),
            source,
        })?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let mut stderr = String::new();
        stderr_file.seek(SeekFrom::Start(0))?;
        let mut raw = Vec::new();
        stderr_file.read_to_end(&mut raw)?;
        stderr.push_str(&String::from_utf8_lossy(&raw));

        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr,
            duration_ms,
        };

        if !result.success() {
            tracing::debug!(
                program = %command.program,
                exit_code = ?result.exit_code,
                stderr = %result.stderr,
                "External command failed"
            );
        }

        Ok(result)
    }
}
