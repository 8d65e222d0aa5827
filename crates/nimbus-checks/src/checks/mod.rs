//! Check definitions and the shared run wrapper

pub mod gcp;

use nimbus_core::{Check, CheckRegistry, CheckResult, ResourceProvider, ResourceRecord, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Service API a check depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredApi {
    /// Service name probed on the provider, e.g. "sqladmin"
    pub service: String,
    /// Name used in the "not enabled" note, e.g. "Cloud SQL"
    pub label: String,
}

/// Static description of a check
#[derive(Debug, Clone)]
pub struct CheckDefinition {
    /// Unique check ID
    pub id: String,
    /// Name reported in results
    pub name: String,
    /// Resource domain reported in results
    pub category: String,
    /// Detailed description
    pub description: String,
    /// API that must be enabled before the check calls the provider
    pub required_api: Option<RequiredApi>,
}

impl CheckDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            description: description.into(),
            required_api: None,
        }
    }

    pub fn requires_api(mut self, service: impl Into<String>, label: impl Into<String>) -> Self {
        self.required_api = Some(RequiredApi {
            service: service.into(),
            label: label.into(),
        });
        self
    }
}

/// What a collector gathered. `notes` explains data that could not be
/// gathered; the check still reports whatever was collected.
#[derive(Debug, Default)]
pub struct Collected {
    pub resources: Vec<ResourceRecord>,
    pub notes: Vec<String>,
}

impl Collected {
    pub fn complete(resources: Vec<ResourceRecord>) -> Self {
        Self {
            resources,
            notes: Vec::new(),
        }
    }
}

/// Function that queries the provider for one check
pub type Collector = fn(&dyn ResourceProvider) -> Result<Collected>;

/// A check built from a definition and a collector.
///
/// The wrapper owns the containment contract: a disabled API or a
/// provider error comes back as a degraded result and never escapes.
pub struct CloudCheck {
    definition: CheckDefinition,
    collector: Collector,
}

impl CloudCheck {
    pub fn new(definition: CheckDefinition, collector: Collector) -> Self {
        Self {
            definition,
            collector,
        }
    }

    pub fn definition(&self) -> &CheckDefinition {
        &self.definition
    }

    fn degraded(&self, notes: impl Into<String>) -> CheckResult {
        CheckResult::degraded(&self.definition.category, &self.definition.name, notes)
    }
}

impl Check for CloudCheck {
    fn id(&self) -> &str {
        &self.definition.id
    }

    fn name(&self) -> &str {
        &self.definition.name
    }

    fn category(&self) -> &str {
        &self.definition.category
    }

    fn description(&self) -> &str {
        &self.definition.description
    }

    fn run(&self, provider: &dyn ResourceProvider) -> CheckResult {
        if let Some(api) = &self.definition.required_api {
            if !provider.is_api_enabled(&api.service) {
                debug!("Skipping {}: {} API not enabled", self.definition.id, api.label);
                return self.degraded(format!("{} API not enabled", api.label));
            }
        }

        match (self.collector)(provider) {
            Ok(collected) => {
                let result = CheckResult::new(
                    &self.definition.category,
                    &self.definition.name,
                    collected.resources,
                );
                if collected.notes.is_empty() {
                    result
                } else {
                    warn!(
                        "Check {} returned partial data: {}",
                        self.definition.id,
                        collected.notes.join("; ")
                    );
                    result.with_notes(collected.notes.join("; "))
                }
            }
            Err(e) => {
                warn!("Check {} failed: {}", self.definition.id, e);
                self.degraded(e.to_string())
            }
        }
    }
}

/// Build the default catalogue, in reporting order
pub fn default_registry() -> CheckRegistry {
    let mut registry = CheckRegistry::new();
    for check in gcp::checks() {
        registry.register(Arc::new(check));
    }
    registry
}
