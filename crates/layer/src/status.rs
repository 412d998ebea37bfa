use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Where the background model load stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModelLoadState {
    /// The layer has not been added to a map yet.
    #[default]
    NotStarted,
    Pending,
    Loaded { name: String },
    Failed { reason: String },
}

impl ModelLoadState {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Loaded { .. } | Self::Failed { .. })
    }
}

/// Shared view of the load state, written by the loader thread.
#[derive(Debug, Clone, Default)]
pub struct ModelLoadStatus {
    inner: Arc<(Mutex<ModelLoadState>, Condvar)>,
}

impl ModelLoadStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> ModelLoadState {
        self.inner
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set(&self, state: ModelLoadState) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = state;
        cvar.notify_all();
    }

    /// Record `Failed` unless the load already settled.
    pub(crate) fn fail_if_pending(&self, reason: &str) {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == ModelLoadState::Pending {
            *state = ModelLoadState::Failed {
                reason: reason.to_string(),
            };
            cvar.notify_all();
        }
    }

    /// Block while the load is pending. Returns immediately if it never started.
    pub fn wait(&self) -> ModelLoadState {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        cvar.wait_while(guard, |s| *s == ModelLoadState::Pending)
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> ModelLoadState {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |s| *s == ModelLoadState::Pending)
            .unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }
}

/// Settles a still-pending load as failed when dropped, including while the
/// loader thread unwinds from a panic.
pub(crate) struct SettleOnDrop {
    status: ModelLoadStatus,
}

impl SettleOnDrop {
    pub(crate) fn new(status: ModelLoadStatus) -> Self {
        Self { status }
    }
}

impl Drop for SettleOnDrop {
    fn drop(&mut self) {
        self.status.fail_if_pending("model loader panicked");
    }
}
