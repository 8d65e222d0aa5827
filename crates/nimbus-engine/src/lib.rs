//! Orchestration engine for Nimbus audits
//!
//! Runs the check catalogue, tracks progress for concurrent readers and
//! turns the ordered results into exportable tables.

mod export;
mod output;
mod progress;
mod runner;

pub use export::*;
pub use output::*;
pub use progress::*;
pub use runner::*;
