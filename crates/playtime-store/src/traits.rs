//! Store trait definitions

use std::time::Duration;

use crate::StoreResult;

/// Shared daily usage accumulator.
///
/// Implementations are mutated from the supervision task and read from the
/// launch coordinator, so every method must be safe under concurrent calls.
pub trait UsageStore: Send + Sync {
    /// Time used so far today
    fn accumulated(&self) -> Duration;

    /// Charge `delta` against today and return the new total
    fn add_duration(&self, delta: Duration) -> Duration;

    /// Persist the current total if it changed since the last flush.
    ///
    /// Returns `true` when a record was written.
    fn flush(&self) -> StoreResult<bool>;

    /// Whether there are charges not yet persisted
    fn is_dirty(&self) -> bool;
}
