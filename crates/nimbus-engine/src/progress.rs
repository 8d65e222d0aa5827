//! Shared progress state for the current audit

use nimbus_core::{AuditSnapshot, AuditState, CheckResult};
use std::sync::{Arc, Mutex, MutexGuard};

/// Mutable state of one audit. Only reachable through [`ProgressStore`].
#[derive(Debug, Default)]
struct AuditRun {
    state: AuditState,
    total: usize,
    completed: usize,
    /// Number of populated slots; `completed` never exceeds it
    filled: usize,
    results: Vec<Option<CheckResult>>,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl AuditRun {
    fn fill(&mut self, index: usize, result: CheckResult) -> bool {
        if self.state != AuditState::Running {
            return false;
        }
        match self.results.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(result);
                self.filled += 1;
                true
            }
            _ => false,
        }
    }

    fn advance(&mut self) -> bool {
        if self.state != AuditState::Running || self.completed >= self.filled {
            return false;
        }
        self.completed += 1;
        if self.completed == self.total {
            self.finish();
        }
        true
    }

    fn finish(&mut self) {
        self.state = AuditState::Completed;
        self.completed_at = Some(chrono::Utc::now());
    }

    fn snapshot(&self) -> AuditSnapshot {
        AuditSnapshot {
            state: self.state,
            completed: self.completed,
            total: self.total,
            results: self.results.clone(),
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

/// Concurrency-safe holder of the current audit.
///
/// Cloning yields another handle to the same audit. Every operation takes
/// the lock once, so readers only ever see whole updates: a snapshot never
/// counts a check whose slot is not yet visible.
#[derive(Debug, Clone, Default)]
pub struct ProgressStore {
    inner: Arc<Mutex<AuditRun>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave AuditRun half-written
    // (every mutation is a few field stores), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, AuditRun> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Consistent point-in-time copy of the audit
    pub fn snapshot(&self) -> AuditSnapshot {
        self.lock().snapshot()
    }

    pub fn state(&self) -> AuditState {
        self.lock().state
    }

    /// Replace the audit with a fresh running one of `total` empty slots.
    ///
    /// Returns `false`, leaving the current audit untouched, when one is
    /// already running. An empty run completes immediately.
    pub fn begin_run(&self, total: usize) -> bool {
        let mut run = self.lock();
        if run.state == AuditState::Running {
            return false;
        }

        *run = AuditRun {
            state: AuditState::Running,
            total,
            results: vec![None; total],
            started_at: Some(chrono::Utc::now()),
            ..Default::default()
        };
        if total == 0 {
            run.finish();
        }
        true
    }

    /// Write the result of check `index`.
    ///
    /// Fails when no audit is running, the index is out of range, or the
    /// slot was already written.
    pub fn set_slot(&self, index: usize, result: CheckResult) -> bool {
        self.lock().fill(index, result)
    }

    /// Count one more finished check, completing the audit on the last one.
    ///
    /// Refuses to move the counter past the number of written slots.
    pub fn advance(&self) -> bool {
        self.lock().advance()
    }

    /// Write a slot and advance the counter in one step.
    ///
    /// Returns the new completed count, or `None` if the slot was rejected.
    pub fn record(&self, index: usize, result: CheckResult) -> Option<usize> {
        let mut run = self.lock();
        if !run.fill(index, result) {
            return None;
        }
        run.advance();
        Some(run.completed)
    }

    /// Populated slots of the current or last audit, in registration order
    pub fn filled_results(&self) -> Vec<CheckResult> {
        self.lock().results.iter().flatten().cloned().collect()
    }
}
