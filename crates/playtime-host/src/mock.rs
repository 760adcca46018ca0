//! Mock process host for testing

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::{ExitStatus, HostError, HostResult, MonitoredProcess, ProcessHost};

const SIGTERM: i32 = 15;
const SIGKILL: i32 = 9;

/// How a mock process behaves once spawned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Runs until terminated or killed
    RunForever,
    /// Exits with `code` on the `polls`-th liveness check
    ExitAfterPolls { polls: u32, code: i32 },
    /// Ignores SIGTERM; only SIGKILL stops it
    IgnoreTerminate,
}

/// What the mock host observed, for assertions
#[derive(Debug, Clone, Default)]
pub struct MockLog {
    /// argv of every successful spawn
    pub spawned: Vec<Vec<String>>,
    /// Completed liveness checks at the time of each terminate call
    pub terminated_after_polls: Vec<u32>,
    /// Completed liveness checks at the time of each kill call
    pub killed_after_polls: Vec<u32>,
}

/// Mock process host for unit/integration testing
pub struct MockHost {
    behavior: MockBehavior,
    fail_spawn: AtomicBool,
    fail_terminate: AtomicBool,
    log: Arc<Mutex<MockLog>>,
}

impl MockHost {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            fail_spawn: AtomicBool::new(false),
            fail_terminate: AtomicBool::new(false),
            log: Arc::new(Mutex::new(MockLog::default())),
        }
    }

    /// Configure spawn to fail
    pub fn set_fail_spawn(&self, fail: bool) {
        self.fail_spawn.store(fail, Ordering::SeqCst);
    }

    /// Make terminate fail on processes spawned from now on. Attempts are
    /// still logged.
    pub fn set_fail_terminate(&self, fail: bool) {
        self.fail_terminate.store(fail, Ordering::SeqCst);
    }

    pub fn log(&self) -> MockLog {
        self.log.lock().unwrap().clone()
    }

    pub fn spawn_count(&self) -> usize {
        self.log.lock().unwrap().spawned.len()
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new(MockBehavior::RunForever)
    }
}

impl ProcessHost for MockHost {
    fn spawn(&self, argv: &[String]) -> HostResult<Box<dyn MonitoredProcess>> {
        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(HostError::SpawnFailed("Mock spawn failure".into()));
        }

        self.log.lock().unwrap().spawned.push(argv.to_vec());

        Ok(Box::new(MockProcess {
            behavior: self.behavior,
            fail_terminate: self.fail_terminate.load(Ordering::SeqCst),
            polls: 0,
            terminated: false,
            killed: false,
            exited: None,
            log: self.log.clone(),
        }))
    }
}

/// Process handed out by [`MockHost`]
pub struct MockProcess {
    behavior: MockBehavior,
    fail_terminate: bool,
    polls: u32,
    terminated: bool,
    killed: bool,
    exited: Option<ExitStatus>,
    log: Arc<Mutex<MockLog>>,
}

impl MonitoredProcess for MockProcess {
    fn pid(&self) -> Option<u32> {
        None
    }

    fn try_wait(&mut self) -> HostResult<Option<ExitStatus>> {
        if self.exited.is_some() {
            return Ok(self.exited);
        }

        self.polls += 1;

        let status = if self.killed {
            Some(ExitStatus::signaled(SIGKILL))
        } else if self.terminated && self.behavior != MockBehavior::IgnoreTerminate {
            Some(ExitStatus::signaled(SIGTERM))
        } else {
            match self.behavior {
                MockBehavior::ExitAfterPolls { polls, code } if self.polls >= polls => {
                    Some(ExitStatus::with_code(code))
                }
                _ => None,
            }
        };

        self.exited = status;
        Ok(status)
    }

    fn terminate(&mut self) -> HostResult<()> {
        self.log
            .lock()
            .unwrap()
            .terminated_after_polls
            .push(self.polls);

        if self.fail_terminate {
            return Err(HostError::StopFailed("Mock terminate failure".into()));
        }

        self.terminated = true;
        Ok(())
    }

    fn kill(&mut self) -> HostResult<()> {
        self.log.lock().unwrap().killed_after_polls.push(self.polls);
        self.killed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv() -> Vec<String> {
        vec!["game".to_string()]
    }

    #[test]
    fn mock_spawn_and_terminate() {
        let host = MockHost::new(MockBehavior::RunForever);
        let mut proc = host.spawn(&argv()).unwrap();

        assert!(proc.try_wait().unwrap().is_none());
        proc.terminate().unwrap();
        assert_eq!(proc.try_wait().unwrap(), Some(ExitStatus::signaled(SIGTERM)));

        let log = host.log();
        assert_eq!(log.spawned, vec![argv()]);
        assert_eq!(log.terminated_after_polls, vec![1]);
    }

    #[test]
    fn mock_exit_after_polls() {
        let host = MockHost::new(MockBehavior::ExitAfterPolls { polls: 3, code: 2 });
        let mut proc = host.spawn(&argv()).unwrap();

        assert!(proc.try_wait().unwrap().is_none());
        assert!(proc.try_wait().unwrap().is_none());
        assert_eq!(proc.try_wait().unwrap(), Some(ExitStatus::with_code(2)));
        // Stays exited
        assert_eq!(proc.try_wait().unwrap(), Some(ExitStatus::with_code(2)));
    }

    #[test]
    fn mock_ignore_terminate() {
        let host = MockHost::new(MockBehavior::IgnoreTerminate);
        let mut proc = host.spawn(&argv()).unwrap();

        proc.terminate().unwrap();
        assert!(proc.try_wait().unwrap().is_none());
        proc.kill().unwrap();
        assert_eq!(proc.try_wait().unwrap(), Some(ExitStatus::signaled(SIGKILL)));
    }

    #[test]
    fn mock_terminate_failure() {
        let host = MockHost::new(MockBehavior::RunForever);
        host.set_fail_terminate(true);
        let mut proc = host.spawn(&argv()).unwrap();

        assert!(matches!(proc.terminate(), Err(HostError::StopFailed(_))));
        assert!(proc.try_wait().unwrap().is_none());
        assert_eq!(host.log().terminated_after_polls, vec![0]);
    }

    #[test]
    fn mock_spawn_failure() {
        let host = MockHost::default();
        host.set_fail_spawn(true);

        assert!(matches!(host.spawn(&argv()), Err(HostError::SpawnFailed(_))));
        assert_eq!(host.spawn_count(), 0);
    }
}
