// src/services/core/learning/insights.rs

use crate::services::core::learning::learning_engine::LearningEngine;
use crate::types::{ActionType, LearningMetric, TrendDirection};
use crate::utils::formatter::format_percentage;
use crate::utils::time::current_timestamp_ms;
use serde::{Deserialize, Serialize};

/// Classes of human-readable calibration findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Success,
    Warning,
    Trend,
    Calibration,
    InsufficientData,
}

/// One reporting-surface note about estimation quality. Informational
/// only; decisions go through the adjustment factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningInsight {
    pub kind: InsightKind,
    pub action_type: Option<ActionType>,
    pub message: String,
    pub generated_at: u64,
}

impl LearningInsight {
    fn new(kind: InsightKind, action_type: Option<ActionType>, message: String) -> Self {
        Self {
            kind,
            action_type,
            message,
            generated_at: current_timestamp_ms(),
        }
    }
}

/// Calibration overview across all action categories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningReport {
    /// Sample-weighted mean accuracy across every category,
    /// unconditionally
    pub overall_accuracy: f64,
    pub total_samples: usize,
    pub metrics: Vec<LearningMetric>,
    pub insights: Vec<LearningInsight>,
    pub generated_at: u64,
}

impl LearningEngine {
    /// Assemble per-category metrics and reporting notes. Read-only.
    pub async fn generate_report(&self) -> LearningReport {
        let config = self.config().clone();
        let mut metrics = Vec::with_capacity(ActionType::ALL.len());
        for action_type in ActionType::ALL {
            metrics.push(self.learning_metric(action_type).await);
        }

        let mut insights = Vec::new();
        let mut starved: Vec<&'static str> = Vec::new();

        for metric in &metrics {
            if metric.sample_size < config.min_sample_size {
                starved.push(metric.action_type.as_str());
                continue;
            }

            if metric.avg_accuracy >= config.success_accuracy_threshold {
                insights.push(LearningInsight::new(
                    InsightKind::Success,
                    Some(metric.action_type),
                    format!(
                        "{} estimates are reliable: mean accuracy {} over {} measurements",
                        metric.action_type.display_name(),
                        format_percentage(metric.avg_accuracy),
                        metric.sample_size,
                    ),
                ));
            } else if metric.avg_accuracy < config.warning_accuracy_threshold {
                insights.push(LearningInsight::new(
                    InsightKind::Warning,
                    Some(metric.action_type),
                    format!(
                        "{} estimates are unreliable: mean accuracy {} over {} measurements",
                        metric.action_type.display_name(),
                        format_percentage(metric.avg_accuracy),
                        metric.sample_size,
                    ),
                ));
            }

            if metric.trend != TrendDirection::Stable {
                insights.push(LearningInsight::new(
                    InsightKind::Trend,
                    Some(metric.action_type),
                    format!(
                        "{} prediction accuracy is {}",
                        metric.action_type.display_name(),
                        metric.trend.as_str(),
                    ),
                ));
            }

            if (metric.adjustment_factor - 1.0).abs() > config.calibration_drift_threshold
                && metric.confidence_level >= config.insight_min_confidence
            {
                let direction = if metric.adjustment_factor > 1.0 {
                    "under-estimating"
                } else {
                    "over-estimating"
                };
                insights.push(LearningInsight::new(
                    InsightKind::Calibration,
                    Some(metric.action_type),
                    format!(
                        "Detectors are {} {} impact; estimates now scaled by {:.2}",
                        direction,
                        metric.action_type.display_name(),
                        metric.adjustment_factor,
                    ),
                ));
            }
        }

        if !starved.is_empty() {
            insights.push(LearningInsight::new(
                InsightKind::InsufficientData,
                None,
                format!(
                    "Insufficient measurement data for: {}. Estimates pass through unadjusted.",
                    starved.join(", "),
                ),
            ));
        }

        let total_samples: usize = metrics.iter().map(|m| m.sample_size).sum();
        let overall_accuracy = if total_samples == 0 {
            0.0
        } else {
            metrics
                .iter()
                .map(|m| m.avg_accuracy * m.sample_size as f64)
                .sum::<f64>()
                / total_samples as f64
        };

        LearningReport {
            overall_accuracy,
            total_samples,
            metrics,
            insights,
            generated_at: current_timestamp_ms(),
        }
    }
}
