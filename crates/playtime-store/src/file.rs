//! File-backed daily usage store

use chrono::{DateTime, Local, NaiveDate};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{StoreError, StoreResult, UsageRecord, UsageStore};

/// Time used on one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyDuration {
    pub date: NaiveDate,
    pub accumulated: Duration,
}

impl DailyDuration {
    pub fn zero(date: NaiveDate) -> Self {
        Self {
            date,
            accumulated: Duration::ZERO,
        }
    }
}

#[derive(Debug)]
struct StoreState {
    current: DailyDuration,
    dirty: bool,
}

/// Daily usage accumulator persisted to an append-only log.
///
/// The log is read once, at load, and only its last line matters. Every
/// flush appends a full snapshot of the day's total; earlier lines are
/// never rewritten.
#[derive(Debug)]
pub struct DurationStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl DurationStore {
    /// Load today's usage from the log at `path`.
    ///
    /// A missing file is a fresh start. Any other read or parse failure is
    /// returned as [`StoreError::Load`].
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::load_at(path, playtime_util::now())
    }

    /// Same as [`DurationStore::load`] with an explicit clock reading
    pub fn load_at(path: impl AsRef<Path>, now: DateTime<Local>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let today = now.date_naive();

        let current = match read_last_record(&path)? {
            Some(record) if record.date == today => {
                info!(
                    path = %path.display(),
                    accumulated_secs = record.duration.as_secs(),
                    "Resuming today's usage"
                );
                DailyDuration {
                    date: today,
                    accumulated: record.duration,
                }
            }
            Some(record) => {
                debug!(
                    path = %path.display(),
                    last_date = %record.date,
                    "Last usage record is from another day, starting at zero"
                );
                DailyDuration::zero(today)
            }
            None => {
                debug!(path = %path.display(), "No usage recorded yet, starting at zero");
                DailyDuration::zero(today)
            }
        };

        Ok(Self {
            path,
            state: Mutex::new(StoreState {
                current,
                dirty: false,
            }),
        })
    }

    /// Path of the backing log
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current in-memory record, whatever date it belongs to
    pub fn snapshot(&self) -> DailyDuration {
        self.lock().current
    }

    /// Time used on the date of `now`
    pub fn accumulated_at(&self, now: DateTime<Local>) -> Duration {
        let state = self.lock();
        if state.current.date == now.date_naive() {
            state.current.accumulated
        } else {
            Duration::ZERO
        }
    }

    /// Charge `delta` against the date of `now` and return that date's total.
    ///
    /// If the date moved on since the last charge, the previous day's pending
    /// total is appended first and the new day starts from zero.
    pub fn add_duration_at(&self, delta: Duration, now: DateTime<Local>) -> Duration {
        let mut state = self.lock();
        let today = now.date_naive();

        if state.current.date != today {
            self.roll_over(&mut state, today, now);
        }

        state.current.accumulated += delta;
        state.dirty = true;
        state.current.accumulated
    }

    /// Append the current total if dirty, stamping the line with `now`
    pub fn flush_at(&self, now: DateTime<Local>) -> StoreResult<bool> {
        let mut state = self.lock();
        if !state.dirty {
            return Ok(false);
        }

        let record = UsageRecord::new(now, state.current.date, state.current.accumulated);
        self.append(&record)?;
        state.dirty = false;

        debug!(
            date = %record.date,
            accumulated_secs = record.duration.as_secs(),
            "Usage flushed"
        );
        Ok(true)
    }

    fn roll_over(&self, state: &mut StoreState, today: NaiveDate, now: DateTime<Local>) {
        if state.dirty {
            let record = UsageRecord::new(now, state.current.date, state.current.accumulated);
            if let Err(e) = self.append(&record) {
                warn!(
                    date = %record.date,
                    error = %e,
                    "Failed to persist previous day's usage during rollover"
                );
            }
        }

        info!(previous = %state.current.date, today = %today, "Date changed, usage reset");
        state.current = DailyDuration::zero(today);
        state.dirty = false;
    }

    fn append(&self, record: &UsageRecord) -> StoreResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::write(&self.path, e))?;

        file.write_all(record.to_line().as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|e| StoreError::write(&self.path, e))
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // State is a plain value; a panic elsewhere cannot leave it half-written
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UsageStore for DurationStore {
    fn accumulated(&self) -> Duration {
        self.accumulated_at(playtime_util::now())
    }

    fn add_duration(&self, delta: Duration) -> Duration {
        self.add_duration_at(delta, playtime_util::now())
    }

    fn flush(&self) -> StoreResult<bool> {
        self.flush_at(playtime_util::now())
    }

    fn is_dirty(&self) -> bool {
        self.lock().dirty
    }
}

/// Read the last non-blank line of the log, if any
fn read_last_record(path: &Path) -> StoreResult<Option<UsageRecord>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::load(path, e.to_string())),
    };

    let Some(last) = content.lines().rev().find(|l| !l.trim().is_empty()) else {
        return Ok(None);
    };

    UsageRecord::parse_line(last)
        .map(Some)
        .map_err(|reason| StoreError::load(path, reason))
}
