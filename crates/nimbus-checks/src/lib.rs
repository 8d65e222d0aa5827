//! Cloud Posture Checks for Nimbus
//!
//! Provides the check catalogue audited by the engine and a file-backed
//! resource provider.
//!
//! # Checks
//!
//! - Cloud SQL instances and their exposed addresses
//! - GKE clusters with public endpoints
//! - Storage buckets readable by `allUsers` / `allAuthenticatedUsers`
//! - Principals holding `roles/owner` on the project
//! - Compute Engine VM inventory
//!
//! # Example
//!
//! ```no_run
//! use nimbus_checks::{default_registry, InventoryProvider};
//! use std::path::Path;
//!
//! let registry = default_registry();
//! let provider = InventoryProvider::from_file(Path::new("inventory.yaml")).unwrap();
//!
//! for check in registry.checks() {
//!     let result = check.run(&provider);
//!     println!("{}: {} resources", result.check_name, result.resources.len());
//! }
//! ```

pub mod checks;
pub mod inventory;

pub use checks::{default_registry, CheckDefinition, CloudCheck, Collected, Collector, RequiredApi};
pub use inventory::{Inventory, InventoryBucket, InventoryProvider};
