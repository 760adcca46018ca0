//! Launch coordination and process supervision for playtime
//!
//! This crate is the heart of playtime, containing:
//! - The launch coordinator (Idle <-> Active state machine, pre-launch budget check)
//! - The process supervisor (fixed-cadence polling, time charging, budget enforcement)
//! - Events emitted towards the presentation shell

mod coordinator;
mod events;
mod session;
mod supervisor;

pub use coordinator::*;
pub use events::*;
pub use session::*;
pub use supervisor::*;
