//! Write-once completion signal for an upload.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::{
    error::{Error, Result},
    types::PutObjectOutput,
};

type Outcome = Result<PutObjectOutput>;

struct Slot {
    outcome: Mutex<Option<Outcome>>,
    ready: Condvar,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, Option<Outcome>> {
        self.outcome.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `outcome` unless one is already present.
    fn set(&self, outcome: Outcome) -> bool {
        let mut guard = self.lock();
        if guard.is_some() {
            return false;
        }
        *guard = Some(outcome);
        self.ready.notify_all();
        true
    }
}

/// Creates the producing and observing halves of a gate.
pub(crate) fn gate() -> (Resolver, CompletionGate) {
    let slot = Arc::new(Slot {
        outcome: Mutex::new(None),
        ready: Condvar::new(),
    });
    (
        Resolver {
            slot: Some(Arc::clone(&slot)),
        },
        CompletionGate { slot },
    )
}

/// The only handle able to set the outcome. Resolving consumes it.
pub(crate) struct Resolver {
    slot: Option<Arc<Slot>>,
}

impl Resolver {
    pub(crate) fn resolve(mut self, outcome: Outcome) {
        if let Some(slot) = self.slot.take() {
            slot.set(outcome);
        }
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.set(Err(Error::closed_pipe(
                "upload worker exited without reporting an outcome",
            )));
        }
    }
}

#[derive(Clone)]
pub(crate) struct CompletionGate {
    slot: Arc<Slot>,
}

impl CompletionGate {
    /// Blocks until the outcome is set and returns a copy of it.
    pub(crate) fn wait(&self) -> Outcome {
        let mut guard = self.slot.lock();
        loop {
            if let Some(outcome) = guard.as_ref() {
                return outcome.clone();
            }
            guard = self
                .slot
                .ready
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub(crate) fn try_get(&self) -> Option<Outcome> {
        self.slot.lock().clone()
    }
}
