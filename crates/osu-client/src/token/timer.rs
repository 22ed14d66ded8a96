//! Proactive refresh timer
//!
//! At most one timer task exists per session. Re-arming always aborts the
//! previous task first, and every arm bumps a generation counter so that a
//! task which already woke up under an old generation never fires.

use chrono::{DateTime, Utc};
use std::future::Future;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
enum TimerState {
    #[default]
    Idle,
    Armed(JoinHandle<()>),
    Firing,
}

/// Cancellable timer that refreshes the token when it expires
#[derive(Debug)]
pub(crate) struct ExpiryTimer {
    enabled: bool,
    state: TimerState,
    generation: u64,
}

impl ExpiryTimer {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            state: TimerState::Idle,
            generation: 0,
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether a refresh is currently scheduled
    pub(crate) fn is_armed(&self) -> bool {
        matches!(&self.state, TimerState::Armed(handle) if !handle.is_finished())
    }

    /// Abort any scheduled refresh
    ///
    /// A refresh that is already firing is left to complete; it can no longer
    /// touch the timer once the generation moved on.
    pub(crate) fn cancel(&mut self) {
        self.generation += 1;
        if let TimerState::Armed(handle) = std::mem::take(&mut self.state) {
            handle.abort();
        }
    }

    /// Schedule `fire` for `expires`, replacing any previous schedule
    ///
    /// `fire` receives the generation of this arm and should pass it to
    /// [`begin_firing`](Self::begin_firing) before doing any work. The timer
    /// stays idle when disabled, when `expires` is not in the future, or when
    /// called outside a tokio runtime.
    pub(crate) fn arm<F, Fut>(&mut self, expires: DateTime<Utc>, fire: F)
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        if !self.enabled {
            return;
        }

        let delay = match (expires - Utc::now()).to_std() {
            Ok(delay) if !delay.is_zero() => delay,
            _ => return,
        };

        let Ok(runtime) = Handle::try_current() else {
            tracing::debug!("No tokio runtime, token expiry refresh not scheduled");
            return;
        };

        let task = fire(self.generation);
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        self.state = TimerState::Armed(handle);
    }

    /// Move from armed to firing if `generation` is still current
    pub(crate) fn begin_firing(&mut self, generation: u64) -> bool {
        if generation != self.generation || !matches!(self.state, TimerState::Armed(_)) {
            return false;
        }
        self.state = TimerState::Firing;
        true
    }

    /// Return to idle after a firing that was not superseded
    pub(crate) fn finish_firing(&mut self, generation: u64) {
        if generation == self.generation && matches!(self.state, TimerState::Firing) {
            self.state = TimerState::Idle;
        }
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        if let TimerState::Armed(handle) = &self.state {
            handle.abort();
        }
    }
}
