//! Audit orchestrator that runs the check catalogue

use crate::progress::ProgressStore;
use nimbus_core::{
    AuditSnapshot, Check, CheckRegistry, CheckResult, EngineConfig, NimbusError,
    NullProgressReporter, ProgressReporter, ResourceProvider,
};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Runs one audit at a time over a fixed check registry.
///
/// Every check's outcome lands in the slot matching its registration
/// index, so the final results are in registry order whatever order the
/// checks finish in. A check that panics or exceeds the timeout fills its
/// slot with a degraded result; the audit always reaches `Completed`.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<CheckRegistry>,
    provider: Arc<dyn ResourceProvider>,
    store: ProgressStore,
    config: EngineConfig,
    check_timeout: Option<Duration>,
    progress: Arc<dyn ProgressReporter>,
}

impl Orchestrator {
    /// Create an orchestrator with its own progress store
    pub fn new(registry: Arc<CheckRegistry>, provider: Arc<dyn ResourceProvider>) -> Self {
        let config = EngineConfig::default();
        Self {
            registry,
            provider,
            store: ProgressStore::new(),
            check_timeout: config.check_timeout(),
            config,
            progress: Arc::new(NullProgressReporter),
        }
    }

    /// Set the engine configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.check_timeout = config.check_timeout();
        self.config = config;
        self
    }

    /// Override the per-check timeout, `None` to disable
    pub fn with_check_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.check_timeout = timeout;
        self
    }

    /// Share an existing progress store
    pub fn with_store(mut self, store: ProgressStore) -> Self {
        self.store = store;
        self
    }

    /// Set the progress reporter
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Store that readers poll for snapshots
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    /// Current progress
    pub fn snapshot(&self) -> AuditSnapshot {
        self.store.snapshot()
    }

    /// Start an audit on a background thread.
    ///
    /// Returns `None` without doing any work if an audit is already
    /// running. The returned handle signals completion and yields the
    /// final snapshot.
    pub fn start_audit(&self) -> Option<AuditHandle> {
        if !self.admit() {
            return None;
        }

        let orchestrator = self.clone();
        let spawned = thread::Builder::new()
            .name("nimbus-audit".to_string())
            .spawn(move || orchestrator.execute());

        match spawned {
            Ok(handle) => Some(AuditHandle {
                inner: HandleInner::Running(handle),
                store: self.store.clone(),
            }),
            Err(e) => {
                // The run is already admitted, so it has to finish here
                warn!("Could not spawn audit thread ({}), running inline", e);
                Some(AuditHandle {
                    inner: HandleInner::Finished(self.execute()),
                    store: self.store.clone(),
                })
            }
        }
    }

    /// Run an audit on the calling thread and return its final snapshot.
    ///
    /// Returns `None` if an audit is already running.
    pub fn run_audit(&self) -> Option<AuditSnapshot> {
        if !self.admit() {
            return None;
        }
        Some(self.execute())
    }

    fn admit(&self) -> bool {
        let total = self.registry.len();
        if self.store.begin_run(total) {
            true
        } else {
            info!("Audit already running, start request ignored");
            false
        }
    }

    fn execute(&self) -> AuditSnapshot {
        let checks = self.registry.checks();

        info!(
            "Starting audit of project '{}' with {} checks",
            self.provider.project_id(),
            checks.len()
        );
        self.notify("run_started", |progress| progress.run_started(checks.len()));

        if self.config.parallel && checks.len() > 1 {
            self.run_checks_parallel(checks);
        } else {
            self.run_checks_sequential(checks);
        }

        let snapshot = self.store.snapshot();
        info!(
            "Audit completed: {} checks, {} resources, {} degraded",
            snapshot.total,
            snapshot.resource_count(),
            snapshot.degraded_count()
        );
        self.notify("run_completed", |progress| progress.run_completed(&snapshot));

        snapshot
    }

    fn run_checks_sequential(&self, checks: &[Arc<dyn Check>]) {
        for (index, check) in checks.iter().enumerate() {
            self.run_slot(index, check);
        }
    }

    fn run_checks_parallel(&self, checks: &[Arc<dyn Check>]) {
        let workers = self.config.max_workers.clamp(1, checks.len());

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("nimbus-check-{}", i))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                warn!("Could not build worker pool ({}), running sequentially", e);
                return self.run_checks_sequential(checks);
            }
        };

        debug!("Running {} checks on {} workers", checks.len(), workers);
        pool.install(|| {
            // One task per check: each one blocks on the provider
            checks
                .par_iter()
                .with_max_len(1)
                .enumerate()
                .for_each(|(index, check)| self.run_slot(index, check));
        });
    }

    fn run_slot(&self, index: usize, check: &Arc<dyn Check>) {
        debug!("Running check {} ({})", index, check.id());
        let result = self.execute_check(check);

        if result.is_degraded() {
            debug!("Check {} degraded: {}", check.id(), result.notes);
        }

        match self.store.record(index, result.clone()) {
            Some(completed) => self.notify("check_finished", |progress| {
                progress.check_finished(index, &result, completed, self.registry.len())
            }),
            None => error!("Result for check {} ({}) was rejected", index, check.id()),
        }
    }

    /// Call the progress reporter; a panicking reporter must not stall the run
    fn notify(&self, event: &str, f: impl FnOnce(&dyn ProgressReporter)) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| f(self.progress.as_ref()))) {
            warn!(
                "Progress reporter panicked in {}: {}",
                event,
                panic_message(payload.as_ref())
            );
        }
    }

    /// Run one check, bounded by the configured timeout
    fn execute_check(&self, check: &Arc<dyn Check>) -> CheckResult {
        let timeout = match self.check_timeout {
            Some(timeout) => timeout,
            None => return run_contained(check.as_ref(), self.provider.as_ref()),
        };

        let (tx, rx) = mpsc::channel();
        let worker_check = Arc::clone(check);
        let provider = Arc::clone(&self.provider);
        let spawned = thread::Builder::new()
            .name(format!("check-{}", check.id()))
            .spawn(move || {
                // The receiver is gone if the check already timed out
                let _ = tx.send(run_contained(worker_check.as_ref(), provider.as_ref()));
            });

        if let Err(e) = spawned {
            warn!("Could not spawn thread for {} ({}), running without timeout", check.id(), e);
            return run_contained(check.as_ref(), self.provider.as_ref());
        }

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                // The stalled call cannot be interrupted; its thread is abandoned
                warn!("Check {} timed out after {:?}", check.id(), timeout);
                CheckResult::degraded(
                    check.category(),
                    check.name(),
                    NimbusError::Timeout(timeout).to_string(),
                )
            }
            Err(RecvTimeoutError::Disconnected) => {
                CheckResult::engine_error(check.name(), "check worker exited without a result")
            }
        }
    }
}

/// Run a check, turning a panic into an `Error` result
fn run_contained(check: &dyn Check, provider: &dyn ResourceProvider) -> CheckResult {
    match catch_unwind(AssertUnwindSafe(|| check.run(provider))) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("Check {} panicked: {}", check.id(), message);
            CheckResult::engine_error(check.name(), format!("check panicked: {}", message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

enum HandleInner {
    Running(JoinHandle<AuditSnapshot>),
    Finished(AuditSnapshot),
}

/// Handle to an audit started with [`Orchestrator::start_audit`]
pub struct AuditHandle {
    inner: HandleInner,
    store: ProgressStore,
}

impl AuditHandle {
    /// Whether the audit has finished
    pub fn is_finished(&self) -> bool {
        match &self.inner {
            HandleInner::Running(handle) => handle.is_finished(),
            HandleInner::Finished(_) => true,
        }
    }

    /// Progress of the audit this handle belongs to
    pub fn snapshot(&self) -> AuditSnapshot {
        self.store.snapshot()
    }

    /// Block until the audit completes and return its final snapshot
    pub fn wait(self) -> AuditSnapshot {
        match self.inner {
            HandleInner::Running(handle) => handle.join().unwrap_or_else(|_| {
                error!("Audit thread panicked");
                self.store.snapshot()
            }),
            HandleInner::Finished(snapshot) => snapshot,
        }
    }
}

/// Builder for creating configured orchestrators
pub struct OrchestratorBuilder {
    registry: CheckRegistry,
    config: EngineConfig,
    check_timeout: Option<Option<Duration>>,
    store: Option<ProgressStore>,
    progress: Option<Arc<dyn ProgressReporter>>,
    skip: Vec<String>,
}

impl OrchestratorBuilder {
    /// Create a new builder over a registry
    pub fn new(registry: CheckRegistry) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
            check_timeout: None,
            store: None,
            progress: None,
            skip: Vec::new(),
        }
    }

    /// Set the engine configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set parallel execution
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Set the per-check timeout, `None` to disable
    pub fn check_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.check_timeout = Some(timeout);
        self
    }

    /// Share an existing progress store
    pub fn store(mut self, store: ProgressStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Set progress reporter
    pub fn progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Leave checks out of the registry
    pub fn skip(mut self, ids: Vec<String>) -> Self {
        self.skip = ids;
        self
    }

    /// Build the orchestrator for a provider
    pub fn build(self, provider: Arc<dyn ResourceProvider>) -> Orchestrator {
        let registry = if self.skip.is_empty() {
            self.registry
        } else {
            self.registry.without(&self.skip)
        };

        let mut orchestrator =
            Orchestrator::new(Arc::new(registry), provider).with_config(self.config);
        if let Some(timeout) = self.check_timeout {
            orchestrator = orchestrator.with_check_timeout(timeout);
        }
        if let Some(store) = self.store {
            orchestrator = orchestrator.with_store(store);
        }
        if let Some(progress) = self.progress {
            orchestrator = orchestrator.with_progress(progress);
        }
        orchestrator
    }
}
