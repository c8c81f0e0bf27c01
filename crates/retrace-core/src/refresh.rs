//! Serializing refresh triggers
//!
//! A change watcher may fire while a discovery pass is still running. The gate
//! never runs two passes at once and keeps at most one pass pending: requests
//! that arrive mid-pass coalesce into a single rerun by the caller already
//! inside the gate.

use std::sync::atomic::{AtomicBool, Ordering};

/// What happened to a refresh request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// This caller ran the pass, plus any reruns requested meanwhile
    Ran { passes: usize },
    /// A pass was already in flight; a rerun has been queued on it
    Coalesced,
}

#[derive(Debug, Default)]
pub struct RefreshGate {
    running: AtomicBool,
    pending: AtomicBool,
}

/// Clears `running` even if a pass panics
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run `pass` now, or queue one rerun if a pass is already running
    pub fn request<F: FnMut()>(&self, mut pass: F) -> RefreshOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.pending.store(true, Ordering::Release);
            tracing::debug!("Refresh already in flight, queued one rerun");
            return RefreshOutcome::Coalesced;
        }

        let mut passes = 0;
        loop {
            {
                let _guard = RunningGuard(&self.running);
                loop {
                    self.pending.store(false, Ordering::Release);
                    pass();
                    passes += 1;
                    if !self.pending.load(Ordering::Acquire) {
                        break;
                    }
                }
            }

            // A request may have slipped in between the last check and the release
            if self.pending.load(Ordering::Acquire)
                && self
                    .running
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
            {
                continue;
            }
            break;
        }

        RefreshOutcome::Ran { passes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_single_request_runs_once() {
        let gate = RefreshGate::new();
        let runs = Cell::new(0);
        let outcome = gate.request(|| runs.set(runs.get() + 1));

        assert_eq!(outcome, RefreshOutcome::Ran { passes: 1 });
        assert_eq!(runs.get(), 1);
        assert!(!gate.is_running());
    }

    #[test]
    fn test_requests_during_a_pass_coalesce_into_one_rerun() {
        let gate = RefreshGate::new();
        let runs = Cell::new(0);
        let nested = Cell::new(Vec::new());

        let outcome = gate.request(|| {
            runs.set(runs.get() + 1);
            if runs.get() == 1 {
                // Three triggers while the first pass is running
                let mut seen = nested.take();
                for _ in 0..3 {
                    seen.push(gate.request(|| {}));
                }
                nested.set(seen);
            }
        });

        assert_eq!(outcome, RefreshOutcome::Ran { passes: 2 });
        assert_eq!(runs.get(), 2);
        assert_eq!(nested.take(), vec![RefreshOutcome::Coalesced; 3]);
        assert!(!gate.is_running());
    }
}
