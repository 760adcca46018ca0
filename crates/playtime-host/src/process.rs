//! Linux process management

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use tracing::{debug, info};

use crate::{ExitStatus, HostError, HostResult, MonitoredProcess, ProcessHost};

/// Managed child process with its own process group
pub struct ManagedProcess {
    pub child: Child,
    pub pid: u32,
    pub pgid: u32,
    exited: Option<ExitStatus>,
}

impl ManagedProcess {
    /// Spawn a new process in its own process group
    pub fn spawn(argv: &[String]) -> HostResult<Self> {
        let Some((program, args)) = argv.split_first() else {
            return Err(HostError::SpawnFailed("Empty argv".into()));
        };

        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        // SAFETY: setsid is async-signal-safe and touches no parent state
        unsafe {
            cmd.pre_exec(|| {
                // New session, so the child leads a fresh process group and
                // termination reaches anything it forks
                nix::unistd::setsid().map_err(std::io::Error::other)?;
                Ok(())
            });
        }

        let child = cmd.spawn().map_err(|e| {
            HostError::SpawnFailed(format!("Failed to spawn {}: {}", program, e))
        })?;

        let pid = child.id();
        let pgid = pid; // After setsid, pid == pgid

        debug!(pid = pid, pgid = pgid, program = %program, "Process spawned");

        Ok(Self {
            child,
            pid,
            pgid,
            exited: None,
        })
    }

    fn signal_group(&self, sig: Signal) -> HostResult<()> {
        if self.exited.is_some() {
            // Already reaped; the group ID may belong to someone else by now
            return Ok(());
        }

        let pgid = Pid::from_raw(-(self.pgid as i32)); // Negative for process group

        match signal::kill(pgid, sig) {
            Ok(()) => {
                debug!(pgid = self.pgid, signal = %sig, "Signaled process group");
                Ok(())
            }
            Err(nix::errno::Errno::ESRCH) => {
                // Process already gone
                Ok(())
            }
            Err(e) => Err(HostError::StopFailed(format!(
                "Failed to send {}: {}",
                sig, e
            ))),
        }
    }

    /// Wait for the process to exit (blocking)
    pub fn wait(&mut self) -> HostResult<ExitStatus> {
        if let Some(status) = self.exited {
            return Ok(status);
        }

        let status = ExitStatus::from(
            self.child
                .wait()
                .map_err(|e| HostError::Internal(format!("Wait failed: {}", e)))?,
        );
        self.exited = Some(status);
        Ok(status)
    }
}

impl MonitoredProcess for ManagedProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn try_wait(&mut self) -> HostResult<Option<ExitStatus>> {
        if let Some(status) = self.exited {
            return Ok(Some(status));
        }

        match self.child.try_wait() {
            Ok(Some(status)) => {
                let status = ExitStatus::from(status);
                self.exited = Some(status);
                Ok(Some(status))
            }
            Ok(None) => Ok(None), // Still running
            Err(e) => Err(HostError::Internal(format!("Wait failed: {}", e))),
        }
    }

    fn terminate(&mut self) -> HostResult<()> {
        self.signal_group(Signal::SIGTERM)
    }

    fn kill(&mut self) -> HostResult<()> {
        self.signal_group(Signal::SIGKILL)
    }
}

/// Linux process host
#[derive(Debug, Default)]
pub struct LinuxHost;

impl LinuxHost {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessHost for LinuxHost {
    fn spawn(&self, argv: &[String]) -> HostResult<Box<dyn MonitoredProcess>> {
        let proc = ManagedProcess::spawn(argv)?;
        info!(pid = proc.pid, pgid = proc.pgid, "Spawned process");
        Ok(Box::new(proc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn poll_exit(proc: &mut dyn MonitoredProcess, timeout: Duration) -> Option<ExitStatus> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if let Some(status) = proc.try_wait().unwrap() {
                return Some(status);
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        None
    }

    #[test]
    fn spawn_simple_process() {
        let mut proc = ManagedProcess::spawn(&argv(&["true"])).unwrap();
        let status = proc.wait().unwrap();
        assert!(status.is_success());
    }

    #[test]
    fn spawn_reports_exit_code() {
        let mut proc = ManagedProcess::spawn(&argv(&["sh", "-c", "exit 3"])).unwrap();
        let status = proc.wait().unwrap();
        assert_eq!(status.code, Some(3));
    }

    #[test]
    fn spawn_missing_program_fails() {
        let result = ManagedProcess::spawn(&argv(&["/nonexistent/definitely-not-a-game"]));
        assert!(matches!(result, Err(HostError::SpawnFailed(_))));
    }

    #[test]
    fn spawn_empty_argv_fails() {
        assert!(matches!(
            ManagedProcess::spawn(&[]),
            Err(HostError::SpawnFailed(_))
        ));
    }

    #[test]
    fn terminate_sleeping_process() {
        let host = LinuxHost::new();
        let mut proc = host.spawn(&argv(&["sleep", "60"])).unwrap();
        assert!(proc.try_wait().unwrap().is_none());

        proc.terminate().unwrap();

        let status = poll_exit(proc.as_mut(), Duration::from_secs(5)).unwrap();
        assert_eq!(status, ExitStatus::signaled(15));
    }

    #[test]
    fn kill_process_ignoring_sigterm() {
        let host = LinuxHost::new();
        let mut proc = host
            .spawn(&argv(&["sh", "-c", "trap '' TERM; sleep 60"]))
            .unwrap();
        std::thread::sleep(Duration::from_millis(100));

        proc.terminate().unwrap();
        assert!(poll_exit(proc.as_mut(), Duration::from_millis(300)).is_none());

        proc.kill().unwrap();
        let status = poll_exit(proc.as_mut(), Duration::from_secs(5)).unwrap();
        assert_eq!(status, ExitStatus::signaled(9));
    }

    #[test]
    fn signaling_exited_process_is_ok() {
        let mut proc = ManagedProcess::spawn(&argv(&["true"])).unwrap();
        proc.wait().unwrap();

        assert!(proc.terminate().is_ok());
        assert!(proc.kill().is_ok());
        assert!(proc.try_wait().unwrap().unwrap().is_success());
    }
}
