// tests/unit/core/learning/learning_engine_test.rs
// Self-calibrating estimation: sample-size gates, confidence steps,
// trend classification, and graceful degradation.

use async_trait::async_trait;
use revenue_edge::services::core::infrastructure::measurements::{
    CompletedMeasurement, MeasurementReader,
};
use revenue_edge::services::core::infrastructure::memory::InMemoryMeasurementStore;
use revenue_edge::services::core::learning::insights::InsightKind;
use revenue_edge::services::core::learning::learning_engine::{
    LearningEngine, LearningEngineConfig,
};
use revenue_edge::types::{ActionType, ImpactMeasurement, TrendDirection};
use revenue_edge::utils::time::{current_timestamp_ms, days_to_ms};
use revenue_edge::utils::{EngineError, EngineResult};
use std::sync::Arc;

fn completed(action_type: ActionType, estimated: f64, measured: f64, days_ago: u32) -> ImpactMeasurement {
    let completed_at = current_timestamp_ms() - days_to_ms(days_ago);
    ImpactMeasurement::new("action", action_type, estimated).complete(measured, completed_at)
}

async fn engine_with(measurements: Vec<ImpactMeasurement>) -> LearningEngine {
    let store = InMemoryMeasurementStore::new();
    store.record_all(measurements).await;
    LearningEngine::new(LearningEngineConfig::default(), Arc::new(store))
}

struct FailingReader;

#[async_trait]
impl MeasurementReader for FailingReader {
    async fn completed_measurements(
        &self,
        _action_type: Option<ActionType>,
    ) -> EngineResult<Vec<CompletedMeasurement>> {
        Err(EngineError::database_error("measurement query failed"))
    }
}

#[tokio::test]
async fn test_below_min_sample_passes_estimate_through() {
    for n in 0..5usize {
        let rows = (0..n)
            .map(|_| completed(ActionType::AddAffiliateLink, 10.0, 13.0, 1))
            .collect();
        let engine = engine_with(rows).await;
        let adjustment = engine
            .adjust_estimate(ActionType::AddAffiliateLink, 42.0)
            .await;
        assert_eq!(adjustment.base_estimate, 42.0, "n={}", n);
        assert_eq!(adjustment.adjusted_estimate, 42.0, "n={}", n);
        assert!(!adjustment.learning_applied, "n={}", n);
        assert_eq!(adjustment.sample_size, n);
    }
}

#[tokio::test]
async fn test_adjustment_is_exact_multiplication_when_applied() {
    // 10 completed measurements, each measured at 1.3x the estimate
    let rows = (0..10)
        .map(|_| completed(ActionType::UpdateAdPlacement, 10.0, 13.0, 2))
        .collect();
    let engine = engine_with(rows).await;

    let adjustment = engine
        .adjust_estimate(ActionType::UpdateAdPlacement, 200.0)
        .await;
    assert!(adjustment.learning_applied);
    assert!((adjustment.adjustment_factor - 1.3).abs() < 1e-9);
    assert!((adjustment.confidence - 0.85).abs() < 1e-9);
    assert!((adjustment.adjusted_estimate - 200.0 * adjustment.adjustment_factor).abs() < 1e-9);
}

#[tokio::test]
async fn test_confidence_follows_sample_size_steps() {
    let expectations = [
        (0usize, 0.0),
        (1, 0.3),
        (2, 0.3),
        (3, 0.5),
        (4, 0.5),
        (5, 0.7),
        (9, 0.7),
        (10, 0.85),
        (19, 0.85),
        (20, 0.95),
        (35, 0.95),
    ];
    for (n, expected) in expectations {
        let rows = (0..n)
            .map(|_| completed(ActionType::ExpandContent, 10.0, 12.0, 1))
            .collect();
        let engine = engine_with(rows).await;
        let metric = engine.learning_metric(ActionType::ExpandContent).await;
        assert_eq!(metric.sample_size, n);
        assert!(
            (metric.confidence_level - expected).abs() < 1e-9,
            "n={} expected {} got {}",
            n,
            expected,
            metric.confidence_level
        );
    }
}

#[tokio::test]
async fn test_zero_estimate_measurements_are_excluded() {
    let mut rows: Vec<ImpactMeasurement> = (0..6)
        .map(|_| completed(ActionType::CreateCollection, 10.0, 13.0, 1))
        .collect();
    rows.push(completed(ActionType::CreateCollection, 0.0, 50.0, 1));
    let engine = engine_with(rows).await;
    let metric = engine.learning_metric(ActionType::CreateCollection).await;
    // The zero-estimate row yields no usable ratio
    assert_eq!(metric.sample_size, 6);
    assert!((metric.adjustment_factor - 1.3).abs() < 1e-9);
}

#[tokio::test]
async fn test_trend_improving_declining_and_stable() {
    // Accurate recent half, inaccurate older half: improving
    let mut rows = Vec::new();
    for days_ago in [2, 3, 4] {
        rows.push(completed(ActionType::AddAffiliateLink, 10.0, 10.0, days_ago));
    }
    for days_ago in [16, 18, 20] {
        rows.push(completed(ActionType::AddAffiliateLink, 10.0, 5.0, days_ago));
    }
    let engine = engine_with(rows).await;
    let metric = engine.learning_metric(ActionType::AddAffiliateLink).await;
    assert_eq!(metric.trend, TrendDirection::Improving);

    // Swap the halves: declining
    let mut rows = Vec::new();
    for days_ago in [2, 3, 4] {
        rows.push(completed(ActionType::AddAffiliateLink, 10.0, 5.0, days_ago));
    }
    for days_ago in [16, 18, 20] {
        rows.push(completed(ActionType::AddAffiliateLink, 10.0, 10.0, days_ago));
    }
    let engine = engine_with(rows).await;
    let metric = engine.learning_metric(ActionType::AddAffiliateLink).await;
    assert_eq!(metric.trend, TrendDirection::Declining);

    // Same accuracy in both halves: stable
    let mut rows = Vec::new();
    for days_ago in [2, 3, 4, 16, 18, 20] {
        rows.push(completed(ActionType::AddAffiliateLink, 10.0, 9.0, days_ago));
    }
    let engine = engine_with(rows).await;
    let metric = engine.learning_metric(ActionType::AddAffiliateLink).await;
    assert_eq!(metric.trend, TrendDirection::Stable);
}

#[tokio::test]
async fn test_trend_needs_three_samples_in_both_halves() {
    // Five recent, two historical: insufficient evidence, never guess
    let mut rows = Vec::new();
    for days_ago in [1, 2, 3, 4, 5] {
        rows.push(completed(ActionType::RunAbTest, 10.0, 10.0, days_ago));
    }
    for days_ago in [16, 20] {
        rows.push(completed(ActionType::RunAbTest, 10.0, 2.0, days_ago));
    }
    let engine = engine_with(rows).await;
    let metric = engine.learning_metric(ActionType::RunAbTest).await;
    assert_eq!(metric.trend, TrendDirection::Stable);
}

#[tokio::test]
async fn test_empty_history_degrades_to_no_adjustment() {
    let engine = engine_with(Vec::new()).await;
    let adjustment = engine.adjust_estimate(ActionType::OptimizeSeo, 15.0).await;
    assert_eq!(adjustment.adjusted_estimate, 15.0);
    assert_eq!(adjustment.adjustment_factor, 1.0);
    assert_eq!(adjustment.confidence, 0.0);
    assert!(!adjustment.learning_applied);
}

#[tokio::test]
async fn test_failing_reader_never_blocks_detection() {
    let engine = LearningEngine::new(LearningEngineConfig::default(), Arc::new(FailingReader));
    let adjustment = engine
        .adjust_estimate(ActionType::AddAffiliateLink, 99.0)
        .await;
    assert_eq!(adjustment.adjusted_estimate, 99.0);
    assert_eq!(adjustment.confidence, 0.0);
    assert!(!adjustment.learning_applied);
}

#[tokio::test]
async fn test_report_flags_calibration_drift_and_starved_categories() {
    // Detectors under-estimate ad placement impact by 30%
    let rows = (0..10)
        .map(|_| completed(ActionType::UpdateAdPlacement, 10.0, 13.0, 2))
        .collect();
    let engine = engine_with(rows).await;
    let report = engine.generate_report().await;

    assert!(report.overall_accuracy > 0.0);
    assert_eq!(report.total_samples, 10);
    assert!(report
        .insights
        .iter()
        .any(|i| i.kind == InsightKind::Calibration
            && i.action_type == Some(ActionType::UpdateAdPlacement)));
    // Every other category is starved of data
    assert!(report
        .insights
        .iter()
        .any(|i| i.kind == InsightKind::InsufficientData));
}

#[tokio::test]
async fn test_report_notes_reliable_categories() {
    // Measurements within 5% of the estimate: mean accuracy above 0.85
    let rows = (0..8)
        .map(|_| completed(ActionType::ExpandContent, 10.0, 10.2, 2))
        .collect();
    let engine = engine_with(rows).await;
    let report = engine.generate_report().await;
    assert!(report
        .insights
        .iter()
        .any(|i| i.kind == InsightKind::Success
            && i.action_type == Some(ActionType::ExpandContent)));
}
