// src/services/core/infrastructure/measurements.rs

use crate::types::ActionType;
use crate::utils::EngineResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Flat record of one closed measurement window, as consumed by the
/// learning engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedMeasurement {
    pub action_type: ActionType,
    pub estimated_impact: f64,
    pub measured_impact: f64,
    pub prediction_accuracy: f64,
    pub completed_at: u64,
}

/// Read interface over completed impact measurements. How measurements
/// are created and closed is an external concern.
#[async_trait]
pub trait MeasurementReader: Send + Sync {
    /// Completed measurements, optionally filtered by action category
    async fn completed_measurements(
        &self,
        action_type: Option<ActionType>,
    ) -> EngineResult<Vec<CompletedMeasurement>>;
}
