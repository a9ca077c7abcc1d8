// Revenue-opportunity detection and self-calibrating estimation engine.
//
// Detectors scan windowed traffic/revenue aggregates for monetization
// opportunities, the learning engine recalibrates their dollar estimates
// from past prediction accuracy, and the orchestrator sequences the
// batch pipeline with per-stage failure isolation and an audit trail.
// Metric collection, action execution, and notification delivery are
// external collaborators behind the traits in
// `services::core::infrastructure`.

pub mod services;
pub mod types;
pub mod utils;

pub use services::core::infrastructure::service_container::{
    EngineCollaborators, EngineConfig, EngineContainer,
};
pub use types::{JobOutcome, JobType};
pub use utils::{EngineError, EngineResult};
