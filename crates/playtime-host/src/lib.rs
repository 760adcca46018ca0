//! Host process control for playtime
//!
//! This crate defines the interface between the supervision loop and the
//! operating system, plus:
//! - A Linux implementation with process group isolation
//! - Graceful (SIGTERM) and forceful (SIGKILL) termination
//! - Non-blocking exit observation
//! - A scriptable mock host for tests

mod mock;
mod process;
mod status;
mod traits;

pub use mock::*;
pub use process::*;
pub use status::*;
pub use traits::*;
