//! Common error type for the scan pipeline

use std::io;

/// Error surfaced by the pipeline driver.
///
/// Worker threads report plain `io::Error`s; the driver tags them with
/// the failing worker's name after both pools have drained. Every I/O
/// failure is fatal to the run; nothing is retried.
#[derive(Debug)]
pub enum PipelineError {
    /// Configuration rejected before any worker started.
    Config(String),
    /// I/O failure in the driver itself.
    Io(io::Error),
    /// I/O failure inside a worker thread.
    Worker { name: String, source: io::Error },
    /// A worker thread panicked.
    WorkerPanic(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Io(e) => write!(f, "IO: {e}"),
            Self::Worker { name, source } => write!(f, "{name}: {source}"),
            Self::WorkerPanic(name) => write!(f, "{name} panicked"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) | Self::Worker { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PipelineError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn worker(name: impl Into<String>, source: io::Error) -> Self {
        Self::Worker {
            name: name.into(),
            source,
        }
    }

    pub(crate) fn worker_panic(name: impl Into<String>) -> Self {
        Self::WorkerPanic(name.into())
    }
}
