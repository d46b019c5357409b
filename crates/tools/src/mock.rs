//! Scriptable process runner for testing.

use crate::error::Result;
use crate::process::{Output, ProcessRunner};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A single recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Deadline the caller asked for.
    pub timeout: Duration,
}
impl Call {
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// File name of the program, e.g. `ffprobe`.
    pub fn program_name(&self) -> &str {
        self.program.file_stem().and_then(|s| s.to_str()).unwrap_or_default()
    }
}

type Handler = Box<dyn Fn(&Call) -> Result<Output> + Send + Sync>;

/// In-memory [`ProcessRunner`] that answers every invocation with a closure.
///
/// Records each call and tracks how many invocations were in flight at the
/// same time, so tests can assert on concurrency limits.
///
/// Only compiled for tests or with the `mock` feature enabled.
pub struct MockRunner {
    handler: Handler,
    delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MockRunner {
    pub fn new(handler: impl Fn(&Call) -> Result<Output> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            delay: None,
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Make every invocation take (at least) `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Highest number of invocations observed in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessRunner for MockRunner {
    async fn run(&self, program: &Path, args: &[OsString], timeout: Duration) -> Result<Output> {
        let call = Call {
            program: program.to_path_buf(),
            args: args.iter().map(|a| a.to_string_lossy().into_owned()).collect(),
            timeout,
        };
        self.calls.lock().push(call.clone());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = (self.handler)(&call);
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
