//! Typed external-process invocation.
//!
//! Every external tool call is described by an [`Invocation`] (program path plus
//! an ordered argument list) and executed through the [`ProcessRunner`] seam.
//! Children are spawned directly, never through a shell, so arguments are passed
//! verbatim. Stdio is inherited so the child's own console output reaches the
//! operator unchanged.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::{Error, Result};

/// A fully specified external command: program plus ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<String>,
}

impl Invocation {
    /// Start building an invocation for `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments, preserving order.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit state of a completed child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    pub success: bool,
    pub code: Option<i32>,
}

impl ExitOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            code: Some(0),
        }
    }

    pub fn failed(code: i32) -> Self {
        Self {
            success: false,
            code: Some(code),
        }
    }
}

/// Execution seam for external tools.
///
/// `Err` is reserved for failures to start the child at all; a child that runs
/// and exits nonzero is an `Ok(ExitOutcome)` with `success == false`. Callers
/// decide per branch whether a nonzero exit is fatal.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the command to completion and report its exit state.
    async fn run(&self, invocation: &Invocation) -> Result<ExitOutcome>;
}

/// Runner backed by `tokio::process`; awaits the child before returning, so
/// callers sequence strictly one external tool at a time.
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ExitOutcome> {
        debug!(command = %invocation, "Spawning external process");

        let status = Command::new(invocation.program())
            .args(invocation.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| Error::Spawn {
                program: invocation.program().display().to_string(),
                source: e,
            })?;

        debug!(command = %invocation, code = ?status.code(), "External process exited");

        Ok(ExitOutcome {
            success: status.success(),
            code: status.code(),
        })
    }
}
