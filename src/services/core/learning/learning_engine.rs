// src/services/core/learning/learning_engine.rs

use crate::services::core::infrastructure::measurements::{
    CompletedMeasurement, MeasurementReader,
};
use crate::types::{ActionType, LearningMetric, TrendDirection};
use crate::utils::logger::{LogLevel, Logger};
use crate::utils::time::{current_timestamp_ms, days_to_ms};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Configuration for the self-calibrating estimation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningEngineConfig {
    /// Below this many completed measurements the engine never adjusts
    pub min_sample_size: usize,
    /// Learning is applied only at or above this confidence
    pub min_confidence_to_apply: f64,
    pub rolling_window_days: u32,
    /// Both window halves need this many samples before a trend is called
    pub trend_min_half_samples: usize,
    pub trend_delta_threshold: f64,
    /// Snapshot refresh period; at most one persisted update per period
    pub snapshot_period_days: u32,
    // Insight thresholds
    pub success_accuracy_threshold: f64,
    pub warning_accuracy_threshold: f64,
    pub calibration_drift_threshold: f64,
    pub insight_min_confidence: f64,
}

impl Default for LearningEngineConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 5,
            min_confidence_to_apply: 0.6,
            rolling_window_days: 30,
            trend_min_half_samples: 3,
            trend_delta_threshold: 0.05,
            snapshot_period_days: 30,
            success_accuracy_threshold: 0.85,
            warning_accuracy_threshold: 0.5,
            calibration_drift_threshold: 0.2,
            insight_min_confidence: 0.7,
        }
    }
}

/// Result of passing a base estimate through the learning engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateAdjustment {
    pub action_type: ActionType,
    pub base_estimate: f64,
    pub adjusted_estimate: f64,
    pub adjustment_factor: f64,
    pub confidence: f64,
    pub sample_size: usize,
    pub learning_applied: bool,
}

/// Translates historical prediction-vs-outcome data into adjustment
/// multipliers for the detectors. Degrades to a no-op on missing or
/// unreadable data; it never blocks a detection pass.
pub struct LearningEngine {
    config: LearningEngineConfig,
    measurements: Arc<dyn MeasurementReader>,
    snapshots: RwLock<HashMap<ActionType, LearningMetric>>,
    logger: Logger,
}

impl LearningEngine {
    pub fn new(config: LearningEngineConfig, measurements: Arc<dyn MeasurementReader>) -> Self {
        Self {
            config,
            measurements,
            snapshots: RwLock::new(HashMap::new()),
            logger: Logger::new(LogLevel::Info),
        }
    }

    pub fn config(&self) -> &LearningEngineConfig {
        &self.config
    }

    /// Step function of sample size; monotone non-decreasing
    pub fn confidence_for_sample_size(sample_size: usize) -> f64 {
        match sample_size {
            0 => 0.0,
            1..=2 => 0.3,
            3..=4 => 0.5,
            5..=9 => 0.7,
            10..=19 => 0.85,
            _ => 0.95,
        }
    }

    /// Adjust a detector's base estimate for an action category.
    ///
    /// The estimate passes through unchanged unless the category has at
    /// least `min_sample_size` completed measurements and the derived
    /// confidence clears `min_confidence_to_apply`.
    pub async fn adjust_estimate(
        &self,
        action_type: ActionType,
        base_estimate: f64,
    ) -> EstimateAdjustment {
        let metric = self.compute_metric(action_type).await;
        self.maybe_refresh_snapshot(&metric);

        let learning_applied = metric.sample_size >= self.config.min_sample_size
            && metric.confidence_level >= self.config.min_confidence_to_apply;
        let adjusted_estimate = if learning_applied {
            base_estimate * metric.adjustment_factor
        } else {
            base_estimate
        };

        EstimateAdjustment {
            action_type,
            base_estimate,
            adjusted_estimate,
            adjustment_factor: metric.adjustment_factor,
            confidence: metric.confidence_level,
            sample_size: metric.sample_size,
            learning_applied,
        }
    }

    /// Rolling-window calibration state for one action category,
    /// recomputed on demand
    pub async fn learning_metric(&self, action_type: ActionType) -> LearningMetric {
        let metric = self.compute_metric(action_type).await;
        self.maybe_refresh_snapshot(&metric);
        metric
    }

    /// Last persisted snapshot per category
    pub fn snapshots(&self) -> Vec<LearningMetric> {
        self.snapshots
            .read()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default()
    }

    async fn compute_metric(&self, action_type: ActionType) -> LearningMetric {
        let rows = match self
            .measurements
            .completed_measurements(Some(action_type))
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                // Degrade to no adjustment rather than blocking detection
                self.logger.warn_with_meta(
                    "measurement query failed, using unadjusted estimates",
                    Some(&serde_json::json!({
                        "action_type": action_type.as_str(),
                        "error": err.to_string(),
                    })),
                );
                return LearningMetric::unadjusted(action_type);
            }
        };

        // Only measurements with a positive estimate yield a usable ratio
        let usable: Vec<&CompletedMeasurement> =
            rows.iter().filter(|m| m.estimated_impact > 0.0).collect();
        let sample_size = usable.len();
        if sample_size == 0 {
            return LearningMetric::unadjusted(action_type);
        }

        let avg_accuracy =
            usable.iter().map(|m| m.prediction_accuracy).sum::<f64>() / sample_size as f64;
        let adjustment_factor = if sample_size < self.config.min_sample_size {
            1.0
        } else {
            usable
                .iter()
                .map(|m| m.measured_impact / m.estimated_impact)
                .sum::<f64>()
                / sample_size as f64
        };

        LearningMetric {
            action_type,
            sample_size,
            avg_accuracy,
            adjustment_factor,
            confidence_level: Self::confidence_for_sample_size(sample_size),
            trend: self.classify_trend(&usable),
            computed_at: current_timestamp_ms(),
        }
    }

    /// Compare mean accuracy in the recent half of the rolling window
    /// against the older half. Fewer than `trend_min_half_samples` points
    /// in either half is insufficient evidence and reads as stable.
    fn classify_trend(&self, rows: &[&CompletedMeasurement]) -> TrendDirection {
        let now = current_timestamp_ms();
        let window_start = now.saturating_sub(days_to_ms(self.config.rolling_window_days));
        let midpoint = now.saturating_sub(days_to_ms(self.config.rolling_window_days) / 2);

        let mut recent = Vec::new();
        let mut historical = Vec::new();
        for row in rows {
            if row.completed_at < window_start || row.completed_at > now {
                continue;
            }
            if row.completed_at >= midpoint {
                recent.push(row.prediction_accuracy);
            } else {
                historical.push(row.prediction_accuracy);
            }
        }

        if recent.len() < self.config.trend_min_half_samples
            || historical.len() < self.config.trend_min_half_samples
        {
            return TrendDirection::Stable;
        }

        let recent_mean = recent.iter().sum::<f64>() / recent.len() as f64;
        let historical_mean = historical.iter().sum::<f64>() / historical.len() as f64;
        let delta = recent_mean - historical_mean;
        if delta > self.config.trend_delta_threshold {
            TrendDirection::Improving
        } else if delta < -self.config.trend_delta_threshold {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        }
    }

    /// Persist the freshly-computed metric at most once per rolling
    /// period
    fn maybe_refresh_snapshot(&self, metric: &LearningMetric) {
        let period_ms = days_to_ms(self.config.snapshot_period_days);
        if let Ok(mut snapshots) = self.snapshots.write() {
            let stale = snapshots
                .get(&metric.action_type)
                .map(|existing| metric.computed_at.saturating_sub(existing.computed_at) >= period_ms)
                .unwrap_or(true);
            if stale {
                log::debug!(
                    "refreshed learning snapshot for {}",
                    metric.action_type.as_str()
                );
                snapshots.insert(metric.action_type, metric.clone());
            }
        }
    }
}
