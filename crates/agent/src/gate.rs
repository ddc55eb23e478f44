//! Single-flight guard for generation requests.

use impersonator_core::GenerationError;
use std::sync::atomic::{AtomicBool, Ordering};

/// Two states, `Idle` and `Busy`. At most one request holds the gate.
#[derive(Debug, Default)]
pub struct GenerationGate {
    busy: AtomicBool,
}

impl GenerationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `Idle -> Busy`, or fail with `AlreadyInProgress`.
    ///
    /// The gate returns to `Idle` when the guard drops, on every exit path.
    pub fn try_acquire(&self) -> Result<BusyGuard<'_>, GenerationError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| BusyGuard { gate: self })
            .map_err(|_| GenerationError::AlreadyInProgress)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Holds the gate `Busy` for as long as it lives.
#[must_use = "the gate is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct BusyGuard<'a> {
    gate: &'a GenerationGate,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_busy() {
        let gate = GenerationGate::new();
        let guard = gate.try_acquire().unwrap();
        assert!(gate.is_busy());
        assert!(matches!(gate.try_acquire(), Err(GenerationError::AlreadyInProgress)));
        drop(guard);
        assert!(!gate.is_busy());
        assert!(gate.try_acquire().is_ok());
    }

    #[test]
    fn released_on_early_return() {
        fn fails(gate: &GenerationGate) -> Result<(), GenerationError> {
            let _busy = gate.try_acquire()?;
            Err(GenerationError::EmptyResponse)
        }
        let gate = GenerationGate::new();
        assert!(fails(&gate).is_err());
        assert!(!gate.is_busy());
    }
}
