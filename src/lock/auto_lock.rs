// src/lock/auto_lock.rs
//!
//! Single-shot auto-lock timer. At most one timer is live: arming cancels the
//! previous one inside the same critical section, with no await in between.
//!

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct TimerSlot {
    /// Bumped on every arm so a firing timer can tell whether it is still the
    /// live one.
    generation: u64,
    token: Option<CancellationToken>,
}

#[derive(Debug)]
pub struct AutoLockTimer {
    enabled: bool,
    duration: Duration,
    slot: Arc<Mutex<TimerSlot>>,
}

impl AutoLockTimer {
    pub fn new(enabled: bool, duration: Duration) -> Self {
        Self {
            enabled,
            duration,
            slot: Arc::new(Mutex::new(TimerSlot::default())),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, super::AUTO_LOCK_DURATION)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Whether a timer is currently pending
    pub fn is_armed(&self) -> bool {
        self.slot().token.is_some()
    }

    /// Number of timers armed so far
    pub fn generation(&self) -> u64 {
        self.slot().generation
    }

    #[cfg(test)]
    pub(crate) fn current_token(&self) -> Option<CancellationToken> {
        self.slot().token.clone()
    }

    /// Cancel the pending timer, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        match self.slot().token.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel any pending timer and arm a new one that runs `on_fire` after
    /// the configured duration. No-op when auto-lock is disabled.
    pub fn arm<F, Fut>(&self, on_fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if !self.enabled {
            return;
        }

        let mut slot = self.slot();
        if let Some(previous) = slot.token.take() {
            previous.cancel();
        }
        slot.generation += 1;
        let generation = slot.generation;
        let token = CancellationToken::new();
        slot.token = Some(token.clone());

        let shared = Arc::clone(&self.slot);
        let duration = self.duration;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(duration) => {
                    {
                        let mut slot = shared.lock().unwrap_or_else(PoisonError::into_inner);
                        if slot.generation != generation || token.is_cancelled() {
                            return;
                        }
                        slot.token = None;
                    }
                    tracing::info!("[AutoLock] Timer fired after {:?}", duration);
                    on_fire().await;
                }
            }
        });
    }

    fn slot(&self) -> MutexGuard<'_, TimerSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
