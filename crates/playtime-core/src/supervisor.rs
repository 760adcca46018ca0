//! Process supervision loop

use playtime_config::DEFAULT_KILL_GRACE;
use playtime_host::{ExitStatus, HostResult, MonitoredProcess, ProcessHost};
use playtime_store::UsageStore;
use playtime_util::SessionId;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::SessionResult;

/// Cadence of liveness checks and time charging
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Supervisor timing
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    pub poll_interval: Duration,
    pub kill_grace: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }
}

/// Runs one game at a time to completion or forced termination, charging
/// wall-clock time against the shared usage store.
pub struct ProcessSupervisor {
    host: Arc<dyn ProcessHost>,
    config: SupervisorConfig,
}

/// Termination progress within one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Enforcement {
    WithinBudget,
    TerminateRequested { at: Instant },
    Killed,
}

impl ProcessSupervisor {
    pub fn new(host: Arc<dyn ProcessHost>) -> Self {
        Self::with_config(host, SupervisorConfig::default())
    }

    pub fn with_config(host: Arc<dyn ProcessHost>, config: SupervisorConfig) -> Self {
        Self { host, config }
    }

    /// Start the process. Failure leaves the usage store untouched.
    pub fn spawn(&self, argv: &[String]) -> HostResult<Box<dyn MonitoredProcess>> {
        self.host.spawn(argv)
    }

    /// Spawn `argv` and supervise it until it ends
    pub async fn run(
        &self,
        argv: &[String],
        store: Arc<dyn UsageStore>,
        daily_limit: Duration,
    ) -> HostResult<SessionResult> {
        let process = self.spawn(argv)?;
        Ok(self
            .supervise(process, store, daily_limit, SessionId::new())
            .await)
    }

    /// Poll `process` until it exits.
    ///
    /// Each tick charges one poll interval, requests termination once the
    /// total reaches `daily_limit`, then checks for exit. Charging comes
    /// first, so the final tick is billed even when the process was about
    /// to exit on its own.
    pub async fn supervise(
        &self,
        mut process: Box<dyn MonitoredProcess>,
        store: Arc<dyn UsageStore>,
        daily_limit: Duration,
        session_id: SessionId,
    ) -> SessionResult {
        let poll_interval = self.config.poll_interval;
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut enforcement = Enforcement::WithinBudget;
        let mut budget_reached = false;
        let mut charged = Duration::ZERO;

        info!(
            session_id = %session_id,
            pid = ?process.pid(),
            limit_secs = daily_limit.as_secs(),
            "Supervising session"
        );

        let exit = loop {
            // First tick completes immediately
            ticker.tick().await;

            let total = store.add_duration(poll_interval);
            charged += poll_interval;

            if total >= daily_limit {
                budget_reached = true;
                enforcement = self.enforce(process.as_mut(), enforcement, &session_id, total);
            }

            match process.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    // The handle is unusable, so treat the process as gone
                    warn!(session_id = %session_id, error = %e, "Failed to poll process");
                    break ExitStatus::unknown();
                }
            }
        };

        if let Err(e) = store.flush() {
            warn!(session_id = %session_id, error = %e, "Failed to flush usage after session");
        }

        info!(
            session_id = %session_id,
            status = %exit,
            timed_out = budget_reached,
            charged_secs = charged.as_secs(),
            "Session ended"
        );

        SessionResult {
            session_id,
            exit,
            timed_out: budget_reached,
            charged,
        }
    }

    /// Advance termination of an over-budget process by one tick
    fn enforce(
        &self,
        process: &mut dyn MonitoredProcess,
        enforcement: Enforcement,
        session_id: &SessionId,
        total: Duration,
    ) -> Enforcement {
        match enforcement {
            Enforcement::WithinBudget => match process.terminate() {
                Ok(()) => {
                    info!(
                        session_id = %session_id,
                        total_secs = total.as_secs(),
                        "Daily limit reached, terminating"
                    );
                    Enforcement::TerminateRequested { at: Instant::now() }
                }
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Failed to terminate, will retry");
                    Enforcement::WithinBudget
                }
            },
            Enforcement::TerminateRequested { at } if at.elapsed() >= self.config.kill_grace => {
                match process.kill() {
                    Ok(()) => {
                        info!(session_id = %session_id, "Process ignored SIGTERM, killed");
                        Enforcement::Killed
                    }
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Failed to kill, will retry");
                        enforcement
                    }
                }
            }
            Enforcement::TerminateRequested { .. } | Enforcement::Killed => {
                debug!(session_id = %session_id, "Waiting for terminated process to exit");
                enforcement
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playtime_host::{HostError, MockBehavior, MockHost};
    use playtime_store::{DurationStore, StoreError, StoreResult};
    use std::sync::Mutex;

    fn argv() -> Vec<String> {
        vec!["game".to_string()]
    }

    fn supervisor(host: Arc<MockHost>, kill_grace: Duration) -> ProcessSupervisor {
        ProcessSupervisor::with_config(
            host,
            SupervisorConfig {
                poll_interval: Duration::from_secs(1),
                kill_grace,
            },
        )
    }

    fn temp_store(dir: &tempfile::TempDir) -> Arc<DurationStore> {
        Arc::new(DurationStore::load(dir.path().join("usage.csv")).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_enforced_after_two_polls() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let host = Arc::new(MockHost::new(MockBehavior::RunForever));
        let sup = supervisor(host.clone(), DEFAULT_KILL_GRACE);

        let result = sup
            .run(&argv(), store.clone(), Duration::from_secs(2))
            .await
            .unwrap();

        assert!(result.timed_out);
        assert_eq!(result.exit, ExitStatus::signaled(15));
        assert_eq!(result.charged, Duration::from_secs(2));

        // Terminate went out on the second tick, after one liveness check
        let log = host.log();
        assert_eq!(log.terminated_after_polls, vec![1]);
        assert!(log.killed_after_polls.is_empty());

        // Flushed on the way out
        assert!(!store.is_dirty());
        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.trim_end().ends_with(",2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_natural_exit_charges_every_tick() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let host = Arc::new(MockHost::new(MockBehavior::ExitAfterPolls { polls: 3, code: 0 }));
        let sup = supervisor(host.clone(), DEFAULT_KILL_GRACE);

        let result = sup
            .run(&argv(), store.clone(), Duration::from_secs(100))
            .await
            .unwrap();

        assert!(!result.timed_out);
        assert!(result.exit.is_success());
        assert_eq!(result.charged, Duration::from_secs(3));
        assert_eq!(store.accumulated(), Duration::from_secs(3));
        assert!(host.log().terminated_after_polls.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_tick_is_charged_before_exit_check() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        store.add_duration(Duration::from_secs(1));

        // Would exit by itself on the second check, exactly when the limit trips
        let host = Arc::new(MockHost::new(MockBehavior::ExitAfterPolls { polls: 2, code: 0 }));
        let sup = supervisor(host.clone(), DEFAULT_KILL_GRACE);

        let result = sup
            .run(&argv(), store.clone(), Duration::from_secs(3))
            .await
            .unwrap();

        assert!(result.timed_out);
        assert_eq!(result.charged, Duration::from_secs(2));
        assert_eq!(store.accumulated(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sigterm_ignored_escalates_to_kill() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let host = Arc::new(MockHost::new(MockBehavior::IgnoreTerminate));
        let sup = supervisor(host.clone(), Duration::from_secs(3));

        let result = sup
            .run(&argv(), store, Duration::from_secs(1))
            .await
            .unwrap();

        assert!(result.timed_out);
        assert_eq!(result.exit, ExitStatus::signaled(9));

        let log = host.log();
        // Terminated once, on the first tick; killed three ticks later
        assert_eq!(log.terminated_after_polls, vec![0]);
        assert_eq!(log.killed_after_polls, vec![3]);
        assert_eq!(result.charged, Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_failure_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let host = Arc::new(MockHost::default());
        host.set_fail_spawn(true);
        let sup = supervisor(host, DEFAULT_KILL_GRACE);

        let result = sup.run(&argv(), store.clone(), Duration::from_secs(10)).await;

        assert!(matches!(result, Err(HostError::SpawnFailed(_))));
        assert!(!store.is_dirty());
        assert_eq!(store.accumulated(), Duration::ZERO);
        assert!(!store.path().exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_terminate_is_retried_and_still_timed_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let host = Arc::new(MockHost::new(MockBehavior::ExitAfterPolls { polls: 3, code: 1 }));
        host.set_fail_terminate(true);
        let sup = supervisor(host.clone(), DEFAULT_KILL_GRACE);

        let result = sup
            .run(&argv(), store, Duration::from_secs(1))
            .await
            .unwrap();

        // One attempt per tick until the process went away by itself
        let log = host.log();
        assert_eq!(log.terminated_after_polls, vec![0, 1, 2]);
        assert!(log.killed_after_polls.is_empty());

        assert_eq!(result.exit, ExitStatus::with_code(1));
        assert!(result.timed_out);
        assert!(!result.is_failure());
        assert_eq!(result.charged, Duration::from_secs(3));
    }

    /// Accumulates in memory but can never persist
    #[derive(Default)]
    struct UnwritableStore {
        total: Mutex<Duration>,
    }

    impl UsageStore for UnwritableStore {
        fn accumulated(&self) -> Duration {
            *self.total.lock().unwrap()
        }

        fn add_duration(&self, delta: Duration) -> Duration {
            let mut total = self.total.lock().unwrap();
            *total += delta;
            *total
        }

        fn flush(&self) -> StoreResult<bool> {
            Err(StoreError::write(
                std::path::Path::new("/unwritable"),
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            ))
        }

        fn is_dirty(&self) -> bool {
            true
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_failure_does_not_block_completion() {
        let store = Arc::new(UnwritableStore::default());
        let host = Arc::new(MockHost::new(MockBehavior::ExitAfterPolls { polls: 1, code: 0 }));
        let sup = supervisor(host, DEFAULT_KILL_GRACE);

        let result = sup
            .run(&argv(), store, Duration::from_secs(10))
            .await
            .unwrap();

        assert!(result.exit.is_success());
        assert_eq!(result.charged, Duration::from_secs(1));
    }
}
