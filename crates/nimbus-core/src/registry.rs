//! Ordered catalogue of checks

use crate::traits::Check;
use std::sync::Arc;

/// Ordered collection of checks.
///
/// A check's index is its position at registration time; results are
/// reported in this order no matter when each check finishes. The
/// registry is built once and then shared behind an `Arc`, after which it
/// cannot change.
#[derive(Clone, Default)]
pub struct CheckRegistry {
    checks: Vec<Arc<dyn Check>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Append a check and return the index it was assigned
    pub fn register(&mut self, check: Arc<dyn Check>) -> usize {
        self.checks.push(check);
        self.checks.len() - 1
    }

    pub fn checks(&self) -> &[Arc<dyn Check>] {
        &self.checks
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn Check>> {
        self.checks.get(index)
    }

    /// Copy of the registry without the given check IDs, order preserved
    pub fn without(&self, skip: &[String]) -> Self {
        Self {
            checks: self
                .checks
                .iter()
                .filter(|c| !skip.iter().any(|id| id == c.id()))
                .cloned()
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl std::fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.checks.iter().map(|c| c.id()))
            .finish()
    }
}
