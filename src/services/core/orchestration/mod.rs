// src/services/core/orchestration/mod.rs

pub mod orchestrator;
pub mod reporting;

pub use orchestrator::{Orchestrator, OrchestratorConfig, SubJobResult, FULL_SCAN_SEQUENCE};
pub use reporting::RunReport;
