//! Session outcome types

use playtime_host::ExitStatus;
use playtime_util::SessionId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a supervised session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    pub session_id: SessionId,

    /// Exit status observed for the process
    pub exit: ExitStatus,

    /// Termination was requested because the daily budget ran out
    pub timed_out: bool,

    /// Time charged against the budget during this session
    pub charged: Duration,
}

impl SessionResult {
    /// The process ended on its own with a non-zero or abnormal status
    pub fn is_failure(&self) -> bool {
        !self.timed_out && !self.exit.is_success()
    }
}
