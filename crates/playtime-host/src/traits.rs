//! Host traits

use thiserror::Error;

use crate::ExitStatus;

/// Errors from host operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Stop failed: {0}")]
    StopFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// A running process owned by the supervisor.
///
/// Every method is non-blocking. Signalling a process that is already gone
/// is not an error.
pub trait MonitoredProcess: Send {
    /// OS process ID, if there is one
    fn pid(&self) -> Option<u32>;

    /// Check whether the process has exited
    fn try_wait(&mut self) -> HostResult<Option<ExitStatus>>;

    /// Ask the process to exit (SIGTERM on Unix)
    fn terminate(&mut self) -> HostResult<()>;

    /// Force the process to exit (SIGKILL on Unix)
    fn kill(&mut self) -> HostResult<()>;
}

/// Starts processes on the host
pub trait ProcessHost: Send + Sync {
    /// Spawn `argv[0]` with the remaining elements as arguments
    fn spawn(&self, argv: &[String]) -> HostResult<Box<dyn MonitoredProcess>>;
}
