//! Telemetry enrichment pipeline and its process wiring.

pub mod config;
pub mod pipeline;
pub mod session;

pub use pipeline::{Outcome, Pipeline};
pub use session::{run_source, spawn_worker, WorkerStats};
