//! Core traits that define the check abstraction layer.
//!
//! Every check in the catalogue implements [`Check`] so the engine can
//! run them uniformly.

use crate::provider::ResourceProvider;
use crate::report::{AuditSnapshot, CheckResult};

/// A posture check run against a cloud account.
///
/// `run` is infallible: provider faults and disabled APIs must come back
/// as a degraded [`CheckResult`]. The engine still survives a check that
/// panics, but reports it under the `Error` category.
pub trait Check: Send + Sync {
    /// Unique identifier for this check
    fn id(&self) -> &str;

    /// Human-readable name, reported as the result's check name
    fn name(&self) -> &str;

    /// Resource domain (e.g. "Cloud SQL", "IAM")
    fn category(&self) -> &str;

    /// What this check looks for
    fn description(&self) -> &str;

    /// Execute the check
    fn run(&self, provider: &dyn ResourceProvider) -> CheckResult;
}

/// Progress reporting abstraction for UI/CLI
pub trait ProgressReporter: Send + Sync {
    /// Called once the run has been admitted
    fn run_started(&self, total: usize);

    /// Called after a check's slot has been filled
    fn check_finished(&self, index: usize, result: &CheckResult, completed: usize, total: usize);

    /// Called when the last slot is filled
    fn run_completed(&self, snapshot: &AuditSnapshot);
}

/// No-op progress reporter for silent operation
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {
    fn run_started(&self, _total: usize) {}
    fn check_finished(
        &self,
        _index: usize,
        _result: &CheckResult,
        _completed: usize,
        _total: usize,
    ) {
    }
    fn run_completed(&self, _snapshot: &AuditSnapshot) {}
}

/// Output format for audit results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// Comma-separated rows for spreadsheets
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}
