//! Provider abstraction consumed by checks.
//!
//! The engine never talks to a cloud API itself. Each check receives a
//! [`ResourceProvider`] and uses its listing operations and capability
//! probe; transport, authentication and pagination belong to the
//! implementation.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Members that make a binding public
pub const PUBLIC_MEMBERS: [&str; 2] = ["allUsers", "allAuthenticatedUsers"];

/// Address assigned to a Cloud SQL instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAddress {
    pub ip_address: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Cloud SQL instance as returned by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlInstance {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub ip_addresses: Vec<IpAddress>,
}

/// Private cluster settings of a GKE cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateClusterConfig {
    #[serde(default)]
    pub enable_private_nodes: bool,
    #[serde(default)]
    pub enable_private_endpoint: bool,
}

/// GKE cluster as returned by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub name: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub private_cluster_config: Option<PrivateClusterConfig>,
}

/// Storage bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
}

/// Role granted to a set of members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IamBinding {
    pub role: String,
    #[serde(default)]
    pub members: Vec<String>,
}

impl IamBinding {
    /// Whether any member grants access to the public
    pub fn is_public(&self) -> bool {
        self.members
            .iter()
            .any(|m| PUBLIC_MEMBERS.contains(&m.as_str()))
    }
}

/// IAM policy attached to a project or bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IamPolicy {
    #[serde(default)]
    pub bindings: Vec<IamBinding>,
}

impl IamPolicy {
    /// Members of every binding for `role`, in binding order
    pub fn members_with_role(&self, role: &str) -> Vec<String> {
        self.bindings
            .iter()
            .filter(|b| b.role == role)
            .flat_map(|b| b.members.iter().cloned())
            .collect()
    }

    /// First binding that grants access to the public
    pub fn first_public_binding(&self) -> Option<&IamBinding> {
        self.bindings.iter().find(|b| b.is_public())
    }
}

/// Compute Engine VM instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmInstance {
    pub name: String,
    #[serde(default)]
    pub status: String,
    /// Full machine type URL, e.g. `zones/us-central1-a/machineTypes/e2-small`
    #[serde(default)]
    pub machine_type: String,
}

impl VmInstance {
    /// Last path segment of the machine type URL
    pub fn machine_type_name(&self) -> &str {
        self.machine_type
            .rsplit('/')
            .next()
            .unwrap_or(&self.machine_type)
    }
}

/// Access to a cloud account's resource inventory
pub trait ResourceProvider: Send + Sync {
    /// Project being audited
    fn project_id(&self) -> &str;

    /// Whether the named service API (e.g. "sqladmin") is enabled.
    /// A failed probe reports the API as disabled.
    fn is_api_enabled(&self, api: &str) -> bool;

    /// List Cloud SQL instances
    fn list_sql_instances(&self) -> Result<Vec<SqlInstance>>;

    /// List GKE clusters across all locations
    fn list_clusters(&self) -> Result<Vec<Cluster>>;

    /// List storage buckets
    fn list_buckets(&self) -> Result<Vec<Bucket>>;

    /// IAM policy of one bucket
    fn bucket_iam_policy(&self, bucket: &str) -> Result<IamPolicy>;

    /// IAM policy of the project
    fn project_iam_policy(&self) -> Result<IamPolicy>;

    /// Compute zones available to the project
    fn list_zones(&self) -> Result<Vec<String>>;

    /// VM instances in one zone
    fn list_instances(&self, zone: &str) -> Result<Vec<VmInstance>>;
}
