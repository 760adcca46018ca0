//! Persistence layer for playtime
//!
//! Provides:
//! - Daily usage accounting (in memory, guarded by a mutex)
//! - Append-only usage log, one line per flush
//! - Recovery of today's total from the last logged line

mod file;
mod record;
mod traits;

pub use file::*;
pub use record::*;
pub use traits::*;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// The usage log exists but could not be read or parsed
    #[error("Failed to load usage log {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// Appending to the usage log failed
    #[error("Failed to write usage log {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn load(path: &Path, reason: impl Into<String>) -> Self {
        Self::Load {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn write(path: &Path, source: std::io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
