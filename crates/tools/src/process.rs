use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use std::borrow::Cow;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::instrument;

/// Captured result of a process that ran to completion (before its deadline).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}
impl Output {
    pub fn exited(code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self { code: Some(code), stdout: stdout.into(), stderr: stderr.into() }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into an [`ErrorKind::Exit`].
    pub fn into_success(self) -> Result<Self> {
        if !self.success() {
            exn::bail!(ErrorKind::Exit(self.code));
        }
        Ok(self)
    }

    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    /// Last non-empty line of stderr, which is where ffmpeg puts the reason
    /// it gave up.
    pub fn stderr_tail(&self) -> Option<String> {
        self.stderr_lossy().lines().rev().map(str::trim).find(|l| !l.is_empty()).map(str::to_string)
    }
}

/// Anything that can run an external program under a deadline.
///
/// The production implementation is [`SystemRunner`]; tests substitute a fake
/// so no real ffmpeg installation is needed.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args`, killing it if it has not exited within
    /// `timeout`. A non-zero exit is NOT an error at this level: some callers
    /// (ffmpeg in informational mode) always exit non-zero and only want the
    /// diagnostic output.
    async fn run(&self, program: &Path, args: &[OsString], timeout: Duration) -> Result<Output>;
}

pub type RunnerHandle = Arc<dyn ProcessRunner>;

/// Spawns real operating system processes via [`run_process`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, program: &Path, args: &[OsString], timeout: Duration) -> Result<Output> {
        run_process(program, args, timeout).await
    }
}

/// Spawn a process, collect its output, and kill it once `timeout` elapses.
///
/// The child is spawned with `kill_on_drop`, so abandoning the wait on
/// timeout is enough to have the runtime kill and reap it.
#[instrument(level = "debug", skip(args), fields(program = %program.display()))]
pub async fn run_process(program: &Path, args: &[OsString], timeout: Duration) -> Result<Output> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .or_raise(|| ErrorKind::Spawn(program.to_path_buf()))?;
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => {
            let output = result.or_raise(|| ErrorKind::Io)?;
            tracing::trace!(code = ?output.status.code(), "Process exited");
            Ok(Output { code: output.status.code(), stdout: output.stdout, stderr: output.stderr })
        },
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis(), "Process exceeded its deadline and was killed");
            exn::bail!(ErrorKind::Timeout(timeout));
        },
    }
}
