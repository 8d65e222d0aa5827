//! Nimbus Core
//!
//! Core types, traits, and error handling for the Nimbus cloud posture auditor.

pub mod config;
pub mod error;
pub mod provider;
pub mod registry;
pub mod report;
pub mod traits;

pub use config::*;
pub use error::{NimbusError, Result};
pub use provider::*;
pub use registry::CheckRegistry;
pub use report::*;
pub use traits::*;
