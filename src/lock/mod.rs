// src/lock/mod.rs
//!
//! Lock gate
//!
//! Process-wide lock flag mirrored into the session storage area, with an
//! optional auto-lock timer. Starts locked.
//!

mod auto_lock;
mod state;

pub use auto_lock::AutoLockTimer;
pub use state::LockState;

use std::time::Duration;

/// Session storage slot holding the persisted flag
pub const LOCK_STATE_KEY: &str = "lock:isLocked";

/// Fixed auto-lock duration
pub const AUTO_LOCK_DURATION: Duration = Duration::from_secs(5 * 60);
