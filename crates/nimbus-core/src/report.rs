//! Report types for check results and audit progress

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category used for results synthesized by the engine when a check
/// breaks its contract (panics or never returns)
pub const ERROR_CATEGORY: &str = "Error";

/// IP address attached to a Cloud SQL instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IpAddressRecord {
    pub ip_address: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Cloud SQL instance and its addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SqlInstanceRecord {
    pub instance: String,
    pub region: String,
    pub ip_addresses: Vec<IpAddressRecord>,
}

/// GKE cluster endpoint exposure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClusterRecord {
    pub cluster: String,
    pub endpoint: Option<String>,
    pub private_cluster_config: bool,
}

/// Storage bucket readable by the public
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PublicBucketRecord {
    pub bucket: String,
    pub role: String,
    pub members: Vec<String>,
}

/// Principal holding roles/owner on the project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OwnerMemberRecord {
    pub member: String,
}

/// Compute Engine VM instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VmInstanceRecord {
    pub name: String,
    pub zone: String,
    pub status: String,
    pub machine_type: String,
}

/// One resource reported by a check.
///
/// Known shapes get their own variant; anything else travels as an
/// ordered key/value map so new checks need no model change. The enum is
/// untagged so that a serialized record is just its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceRecord {
    SqlInstance(SqlInstanceRecord),
    Cluster(ClusterRecord),
    PublicBucket(PublicBucketRecord),
    OwnerMember(OwnerMemberRecord),
    VmInstance(VmInstanceRecord),
    Generic(BTreeMap<String, serde_json::Value>),
}

impl ResourceRecord {
    /// Build a generic record from field/value pairs
    pub fn generic<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, serde_json::Value)>,
    {
        ResourceRecord::Generic(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Render the record as a single compact JSON cell.
    ///
    /// Keys are emitted in sorted order at every nesting level, so equal
    /// records always render to identical strings.
    pub fn to_cell(&self) -> crate::error::Result<String> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_string(&sort_keys(value))?)
    }
}

fn sort_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let sorted: BTreeMap<String, serde_json::Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            serde_json::Value::Object(sorted.into_iter().collect())
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sort_keys).collect())
        }
        other => other,
    }
}

/// Outcome of one check.
///
/// A non-empty `notes` marks the result as degraded: the check was
/// skipped, failed, or only partially succeeded. Partial data may still
/// be present in `resources`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Resource domain (e.g. "Cloud Storage", "IAM")
    pub category: String,

    /// Name of the check that produced this result
    #[serde(rename = "check")]
    pub check_name: String,

    /// Resources found, empty when nothing was found or the check degraded
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,

    /// Explanation when the result is degraded, empty otherwise
    #[serde(default)]
    pub notes: String,
}

impl CheckResult {
    /// Create a clean result with findings
    pub fn new(
        category: impl Into<String>,
        check_name: impl Into<String>,
        resources: Vec<ResourceRecord>,
    ) -> Self {
        Self {
            category: category.into(),
            check_name: check_name.into(),
            resources,
            notes: String::new(),
        }
    }

    /// Create a note-only result (capability disabled, provider fault)
    pub fn degraded(
        category: impl Into<String>,
        check_name: impl Into<String>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            check_name: check_name.into(),
            resources: Vec::new(),
            notes: notes.into(),
        }
    }

    /// Result synthesized for a check that panicked or stalled
    pub fn engine_error(check_name: impl Into<String>, notes: impl Into<String>) -> Self {
        Self::degraded(ERROR_CATEGORY, check_name, notes)
    }

    /// Attach a note to a result that may still carry partial data
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Whether the result should be treated as incomplete
    pub fn is_degraded(&self) -> bool {
        !self.notes.is_empty()
    }

    /// Whether the result was synthesized by the engine
    pub fn is_engine_error(&self) -> bool {
        self.category == ERROR_CATEGORY
    }
}

/// Lifecycle state of the current audit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditState {
    /// No audit has been started yet
    #[default]
    Idle,
    /// An audit is executing
    Running,
    /// The last audit finished; its results stay readable
    Completed,
}

impl std::fmt::Display for AuditState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditState::Idle => write!(f, "idle"),
            AuditState::Running => write!(f, "running"),
            AuditState::Completed => write!(f, "completed"),
        }
    }
}

/// Point-in-time copy of an audit's progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditSnapshot {
    /// Audit state
    pub state: AuditState,

    /// Number of checks that have finished
    pub completed: usize,

    /// Number of checks in the run
    pub total: usize,

    /// One slot per registered check, in registration order
    pub results: Vec<Option<CheckResult>>,

    /// When the run started
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,

    /// When the last slot was filled
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl AuditSnapshot {
    /// Whether the snapshot describes a finished run
    pub fn is_complete(&self) -> bool {
        self.state == AuditState::Completed
    }

    /// Populated slots in registration order
    pub fn filled_results(&self) -> Vec<CheckResult> {
        self.results.iter().flatten().cloned().collect()
    }

    /// Percentage of checks finished, 100 for an empty run
    pub fn percent_complete(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed * 100) / self.total) as u8
    }

    /// Number of populated results carrying a note
    pub fn degraded_count(&self) -> usize {
        self.results.iter().flatten().filter(|r| r.is_degraded()).count()
    }

    /// Total number of resources reported so far
    pub fn resource_count(&self) -> usize {
        self.results.iter().flatten().map(|r| r.resources.len()).sum()
    }

    /// Wall-clock duration of a finished run
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}
