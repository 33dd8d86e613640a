use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Admission control for pipeline runs.
///
/// At most one [`RunPermit`] exists at any time. Triggers arriving while a
/// permit is outstanding are dropped, not queued: only the latest input
/// state matters, and a later change re-triggers once the current run
/// completes.
#[derive(Debug, Default)]
pub struct RunGuard {
    running: AtomicBool,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a run if idle.
    ///
    /// Transitions Idle → Running exactly once per concurrent window and
    /// returns the permit; returns `None` while a previous permit is alive.
    /// Dropping the permit releases the guard, so every exit path of a run
    /// (success, failure, panic unwind) resets the state.
    pub fn try_admit(self: &Arc<Self>) -> Option<RunPermit> {
        let admitted = self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        admitted.then(|| RunPermit {
            guard: Arc::clone(self),
        })
    }

    /// Whether a run currently holds the permit.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Scoped run admission; releases the guard when dropped.
#[derive(Debug)]
pub struct RunPermit {
    guard: Arc<RunGuard>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}
