//! Scripted checks shared by the engine integration tests

#![allow(dead_code)]

use nimbus_checks::InventoryProvider;
use nimbus_core::{
    Check, CheckRegistry, CheckResult, OwnerMemberRecord, ResourceProvider, ResourceRecord,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// What a scripted check does when run
#[derive(Clone)]
pub enum Behavior {
    /// Report this many resources
    Resources(usize),
    /// Report a note and nothing else
    Note(&'static str),
    /// Break the contract by panicking
    Panic(&'static str),
    /// Block until the gate opens
    Gated(Arc<Gate>),
}

/// One-shot latch used to hold checks while the test inspects the run
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.cond.notify_all();
    }

    pub fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.cond.wait(open).unwrap();
        }
    }
}

pub struct ScriptedCheck {
    pub name: String,
    pub category: String,
    pub delay: Duration,
    pub behavior: Behavior,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedCheck {
    pub fn new(name: impl Into<String>, behavior: Behavior) -> Self {
        Self {
            name: name.into(),
            category: "Test".to_string(),
            delay: Duration::ZERO,
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_counter(mut self, calls: Arc<AtomicUsize>) -> Self {
        self.calls = calls;
        self
    }
}

impl Check for ScriptedCheck {
    fn id(&self) -> &str {
        &self.name
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn description(&self) -> &str {
        "scripted test check"
    }

    fn run(&self, _provider: &dyn ResourceProvider) -> CheckResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);

        match &self.behavior {
            Behavior::Resources(count) => CheckResult::new(
                &self.category,
                &self.name,
                (0..*count)
                    .map(|i| {
                        ResourceRecord::OwnerMember(OwnerMemberRecord {
                            member: format!("user:{}-{}@example.com", self.name, i),
                        })
                    })
                    .collect(),
            ),
            Behavior::Note(note) => CheckResult::degraded(&self.category, &self.name, *note),
            Behavior::Panic(message) => panic!("{}", message),
            Behavior::Gated(gate) => {
                gate.wait();
                CheckResult::new(&self.category, &self.name, Vec::new())
            }
        }
    }
}

pub fn registry(checks: Vec<ScriptedCheck>) -> CheckRegistry {
    let mut registry = CheckRegistry::new();
    for check in checks {
        registry.register(Arc::new(check));
    }
    registry
}

pub fn provider() -> Arc<dyn ResourceProvider> {
    Arc::new(InventoryProvider::new("test-project"))
}
