//! Shared utilities for playtime
//!
//! This crate provides:
//! - Session identifiers
//! - Wall-clock time with a debug-only mock override
//! - Default paths for config and data directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
