//! Subprocess invocation and output capture.
//!
//! Every external process the orchestrator touches (configure, make, the
//! artifact probe, test suites) goes through the [`CommandExecutor`] trait,
//! so the whole run can be pointed at scripted stand-ins in tests.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::{MatrixError, MatrixResult};

/// One external command: program, arguments, working directory and
/// environment overlay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute (first word of the command line).
    pub program: String,

    /// Arguments, in order.
    pub args: Vec<String>,

    /// Working directory the child runs in.
    pub cwd: PathBuf,

    /// Environment overlay applied on top of the inherited environment.
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// Create an invocation with no arguments and no environment overlay.
    pub fn new(program: impl Into<String>, cwd: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.as_ref().to_path_buf(),
            env: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an environment variable overlay.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Prepend a wrapper command (e.g. a memory-check prefix), turning
    /// `prog a b` into `wrapper w1 w2 prog a b`.
    pub fn wrapped(self, prefix: &[String]) -> Self {
        let Some((wrapper, wrapper_args)) = prefix.split_first() else {
            return self;
        };
        let mut args: Vec<String> = wrapper_args.to_vec();
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: wrapper.clone(),
            args,
            cwd: self.cwd,
            env: self.env,
        }
    }

    /// Full command line, for logs and scripted matching.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured result of one finished subprocess.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Exit code (-1 when the child was killed by a signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,
}

impl CapturedOutput {
    /// Whether the process exited zero.
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }

    /// Successful output with empty streams.
    pub fn empty_success() -> Self {
        Self {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Trait for subprocess execution backends.
///
/// The orchestrator suspends until the child exits and both streams are
/// fully captured. No timeout is applied to any subprocess; long-running
/// memory-check passes are expected.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run the command to completion and capture its streams.
    async fn run(&self, invocation: &Invocation) -> MatrixResult<CapturedOutput>;
}

/// Executor that spawns real child processes.
#[derive(Debug, Default)]
pub struct ProcessExecutor;

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn run(&self, invocation: &Invocation) -> MatrixResult<CapturedOutput> {
        debug!(command = %invocation.command_line(), cwd = %invocation.cwd.display(), "spawning");

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| MatrixError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let output = child.wait_with_output().await?;

        Ok(CapturedOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
