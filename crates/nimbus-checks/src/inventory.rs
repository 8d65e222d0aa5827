//! File-backed resource provider.
//!
//! Reads a snapshot of a project's inventory from YAML or JSON and serves
//! it through [`ResourceProvider`]. APIs can be marked disabled and
//! individual operations can be made to fail, which exercises the same
//! degraded paths a live account would.

use nimbus_core::{
    Bucket, Cluster, IamPolicy, NimbusError, ResourceProvider, Result, SqlInstance, VmInstance,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Bucket entry together with its IAM policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryBucket {
    pub name: String,
    #[serde(default)]
    pub iam_policy: IamPolicy,
}

/// Inventory snapshot served by [`InventoryProvider`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub project_id: String,

    /// Service APIs reported as disabled
    #[serde(default)]
    pub disabled_apis: BTreeSet<String>,

    /// Operation name (optionally `operation:target`) mapped to the error
    /// message that call returns
    #[serde(default)]
    pub faults: BTreeMap<String, String>,

    #[serde(default)]
    pub sql_instances: Vec<SqlInstance>,

    #[serde(default)]
    pub clusters: Vec<Cluster>,

    #[serde(default)]
    pub buckets: Vec<InventoryBucket>,

    #[serde(default)]
    pub project_iam_policy: IamPolicy,

    /// Zone name mapped to the instances running there
    #[serde(default)]
    pub zones: BTreeMap<String, Vec<VmInstance>>,
}

/// Resource provider backed by an [`Inventory`] snapshot
#[derive(Debug, Clone, Default)]
pub struct InventoryProvider {
    inventory: Inventory,
}

impl InventoryProvider {
    /// Empty inventory for a project
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            inventory: Inventory {
                project_id: project_id.into(),
                ..Default::default()
            },
        }
    }

    pub fn from_inventory(inventory: Inventory) -> Self {
        Self { inventory }
    }

    /// Load an inventory file (JSON by extension, YAML otherwise)
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let parse_err = |message: String| NimbusError::Parse {
            context: path.display().to_string(),
            message,
        };

        let inventory: Inventory = if path.extension().map(|e| e == "json").unwrap_or(false) {
            serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?
        } else {
            serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))?
        };

        Ok(Self { inventory })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let inventory: Inventory = serde_yaml::from_str(content).map_err(|e| NimbusError::Parse {
            context: "inventory".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { inventory })
    }

    /// Override the project ID
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.inventory.project_id = project_id.into();
        self
    }

    /// Report a service API as disabled
    pub fn with_disabled_api(mut self, api: impl Into<String>) -> Self {
        self.inventory.disabled_apis.insert(api.into());
        self
    }

    /// Make an operation fail with `message`
    pub fn with_fault(mut self, operation: impl Into<String>, message: impl Into<String>) -> Self {
        self.inventory.faults.insert(operation.into(), message.into());
        self
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    fn fault(&self, api: &str, operation: &str, target: Option<&str>) -> Result<()> {
        let targeted = target.map(|t| format!("{}:{}", operation, t));
        let message = targeted
            .as_deref()
            .and_then(|key| self.inventory.faults.get(key))
            .or_else(|| self.inventory.faults.get(operation));

        match message {
            Some(message) => Err(NimbusError::provider(api, message.clone())),
            None => Ok(()),
        }
    }
}

impl ResourceProvider for InventoryProvider {
    fn project_id(&self) -> &str {
        &self.inventory.project_id
    }

    fn is_api_enabled(&self, api: &str) -> bool {
        !self.inventory.disabled_apis.contains(api)
    }

    fn list_sql_instances(&self) -> Result<Vec<SqlInstance>> {
        self.fault("sqladmin", "list_sql_instances", None)?;
        Ok(self.inventory.sql_instances.clone())
    }

    fn list_clusters(&self) -> Result<Vec<Cluster>> {
        self.fault("container", "list_clusters", None)?;
        Ok(self.inventory.clusters.clone())
    }

    fn list_buckets(&self) -> Result<Vec<Bucket>> {
        self.fault("storage", "list_buckets", None)?;
        Ok(self
            .inventory
            .buckets
            .iter()
            .map(|b| Bucket {
                name: b.name.clone(),
            })
            .collect())
    }

    fn bucket_iam_policy(&self, bucket: &str) -> Result<IamPolicy> {
        self.fault("storage", "bucket_iam_policy", Some(bucket))?;
        self.inventory
            .buckets
            .iter()
            .find(|b| b.name == bucket)
            .map(|b| b.iam_policy.clone())
            .ok_or_else(|| NimbusError::NotFound(format!("bucket {}", bucket)))
    }

    fn project_iam_policy(&self) -> Result<IamPolicy> {
        self.fault("cloudresourcemanager", "project_iam_policy", None)?;
        Ok(self.inventory.project_iam_policy.clone())
    }

    fn list_zones(&self) -> Result<Vec<String>> {
        self.fault("compute", "list_zones", None)?;
        Ok(self.inventory.zones.keys().cloned().collect())
    }

    fn list_instances(&self, zone: &str) -> Result<Vec<VmInstance>> {
        self.fault("compute", "list_instances", Some(zone))?;
        Ok(self.inventory.zones.get(zone).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apis_enabled_by_default() {
        let provider = InventoryProvider::new("demo").with_disabled_api("container");
        assert!(provider.is_api_enabled("sqladmin"));
        assert!(!provider.is_api_enabled("container"));
        assert_eq!(provider.project_id(), "demo");
    }

    #[test]
    fn test_targeted_fault() {
        let provider = InventoryProvider::new("demo")
            .with_fault("list_instances:zone-a", "backend unavailable");
        assert!(provider.list_instances("zone-a").is_err());
        assert!(provider.list_instances("zone-b").unwrap().is_empty());
    }

    #[test]
    fn test_operation_fault_applies_to_every_target() {
        let provider = InventoryProvider::new("demo").with_fault("list_instances", "quota");
        let err = provider.list_instances("zone-b").unwrap_err();
        assert_eq!(err.to_string(), "compute request failed: quota");
    }

    #[test]
    fn test_unknown_bucket() {
        let provider = InventoryProvider::new("demo");
        assert!(matches!(
            provider.bucket_iam_policy("missing"),
            Err(NimbusError::NotFound(_))
        ));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(
            &path,
            r#"{
                "project_id": "json-project",
                "disabled_apis": ["storage"],
                "zones": {"europe-west1-b": [{"name": "vm", "status": "RUNNING", "machineType": "e2-micro"}]}
            }"#,
        )
        .unwrap();

        let provider = InventoryProvider::from_file(&path).unwrap();
        assert_eq!(provider.project_id(), "json-project");
        assert!(!provider.is_api_enabled("storage"));
        assert_eq!(provider.list_zones().unwrap(), vec!["europe-west1-b".to_string()]);
    }

    #[test]
    fn test_bad_yaml_reports_parse_error() {
        let err = InventoryProvider::from_yaml_str("zones: [unclosed").unwrap_err();
        assert!(matches!(err, NimbusError::Parse { .. }));
    }
}
