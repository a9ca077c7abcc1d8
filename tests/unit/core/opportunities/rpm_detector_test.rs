// tests/unit/core/opportunities/rpm_detector_test.rs
// Ad-efficiency detection: RPM gap ranking, impact-first dedup, and
// sitewide channel-skew analysis.

use revenue_edge::services::core::infrastructure::memory::{
    InMemoryMeasurementStore, InMemoryOpportunityStore, StaticMetricsAggregator,
};
use revenue_edge::services::core::infrastructure::metrics_aggregator::{
    PageMetrics, PageType, TrafficSource,
};
use revenue_edge::services::core::infrastructure::opportunity_store::OpportunityStore;
use revenue_edge::services::core::learning::learning_engine::{
    LearningEngine, LearningEngineConfig,
};
use revenue_edge::services::core::opportunities::opportunity_core::SITEWIDE_PAGE_URL;
use revenue_edge::services::core::opportunities::rpm_detector::{RpmDetector, RpmDetectorConfig};
use revenue_edge::types::{ActionParameters, ActionType, OpportunityStatus, OpportunityType};
use std::collections::HashMap;
use std::sync::Arc;

fn page(url: &str, pageviews: u64, ad_revenue: f64) -> PageMetrics {
    PageMetrics {
        page_url: url.to_string(),
        content_id: None,
        page_type: PageType::Content,
        title: "Weeknight recipes".to_string(),
        description: String::new(),
        pageviews,
        ad_revenue,
        affiliate_clicks: 50,
        bounce_rate: 0.3,
        avg_time_on_page_secs: 120.0,
        traffic_by_source: HashMap::new(),
    }
}

struct Fixture {
    detector: RpmDetector,
    store: Arc<InMemoryOpportunityStore>,
}

async fn fixture(pages: Vec<PageMetrics>) -> Fixture {
    let store = Arc::new(InMemoryOpportunityStore::new());
    let learning = Arc::new(LearningEngine::new(
        LearningEngineConfig::default(),
        Arc::new(InMemoryMeasurementStore::new()),
    ));
    let detector = RpmDetector::new(
        RpmDetectorConfig::default(),
        Arc::new(StaticMetricsAggregator::new(pages)),
        learning,
        Arc::clone(&store) as Arc<dyn OpportunityStore>,
    );
    Fixture { detector, store }
}

#[tokio::test]
async fn test_underperforming_rpm_reference_scenario() {
    // Target page: 1000 pageviews at $5 RPM. Sibling page brings the
    // site average to $10: (5 + 15) / 2000 * 1000 = 10.
    let fx = fixture(vec![
        page("https://example.com/slow", 1000, 5.0),
        page("https://example.com/fast", 1000, 15.0),
    ])
    .await;

    let outcome = fx.detector.run_scan().await.unwrap();
    assert_eq!(outcome.items_processed, 2);
    assert_eq!(outcome.opportunities_found, 1);

    let stored = fx
        .store
        .get(OpportunityType::AdLayoutOptimization, "https://example.com/slow")
        .await
        .expect("underperforming page flagged");
    // base estimate = 1000 * (10 - 5) / 1000 = 5.0, no learning data
    assert!((stored.estimated_monthly_impact - 5.0).abs() < 1e-9);
    match &stored.suggested_actions[0].parameters {
        ActionParameters::UpdateAdPlacement {
            current_rpm,
            target_rpm,
        } => {
            assert!((current_rpm - 5.0).abs() < 1e-9);
            assert!((target_rpm - 10.0).abs() < 1e-9);
        }
        other => panic!("unexpected action parameters: {:?}", other),
    }
    // The healthy page is not flagged
    assert!(fx
        .store
        .get(OpportunityType::AdLayoutOptimization, "https://example.com/fast")
        .await
        .is_none());
}

#[tokio::test]
async fn test_rpm_ranking_is_bounded_to_top_twenty() {
    let mut pages = vec![page("https://example.com/anchor", 10_000, 200.0)];
    for i in 0..25 {
        pages.push(page(&format!("https://example.com/low-{}", i), 200, 0.0));
    }
    let fx = fixture(pages).await;

    let outcome = fx.detector.run_scan().await.unwrap();
    assert_eq!(outcome.opportunities_found, 20);
    assert_eq!(
        fx.store
            .list_by_status(OpportunityStatus::Pending)
            .await
            .unwrap()
            .len(),
        20
    );
}

#[tokio::test]
async fn test_dedup_keeps_highest_impact_even_at_lower_confidence() {
    // One content page qualifies as both high-bounce (0.2 x revenue,
    // confidence 0.6) and thin-content (0.3 x revenue, confidence 0.55).
    // The thin-content candidate carries the larger estimate and wins
    // despite its LOWER confidence: impact decides, not confidence.
    let mut p = page("https://example.com/shallow", 100, 50.0);
    p.bounce_rate = 0.8;
    p.avg_time_on_page_secs = 20.0;

    let fx = fixture(vec![p]).await;
    let outcome = fx.detector.run_scan().await.unwrap();
    assert_eq!(outcome.opportunities_found, 1);

    let stored = fx
        .store
        .get(OpportunityType::ContentExpansion, "https://example.com/shallow")
        .await
        .expect("content-expansion candidate persisted");
    assert!((stored.estimated_monthly_impact - 15.0).abs() < 1e-9);
    assert!((stored.confidence - 0.55).abs() < 1e-9);
}

#[tokio::test]
async fn test_high_bounce_pages_are_flagged() {
    let mut p = page("https://example.com/bouncy", 500, 30.0);
    p.bounce_rate = 0.85;

    let fx = fixture(vec![p]).await;
    fx.detector.run_scan().await.unwrap();

    let stored = fx
        .store
        .get(OpportunityType::ContentExpansion, "https://example.com/bouncy")
        .await
        .expect("high-bounce candidate persisted");
    // 0.2 x $30 recoverable
    assert!((stored.estimated_monthly_impact - 6.0).abs() < 1e-9);
    assert!((stored.confidence - 0.6).abs() < 1e-9);
    assert_eq!(
        stored.suggested_actions[0].action_type,
        ActionType::ExpandContent
    );
}

#[tokio::test]
async fn test_visual_channel_skew_emits_sitewide_opportunity() {
    let mut p = page("https://example.com/gallery", 1000, 10.0);
    p.traffic_by_source.insert(TrafficSource::Pinterest, 400);
    p.traffic_by_source.insert(TrafficSource::Search, 300);
    p.traffic_by_source.insert(TrafficSource::Direct, 300);

    let fx = fixture(vec![p]).await;
    fx.detector.run_scan().await.unwrap();

    let stored = fx
        .store
        .get(OpportunityType::TrafficSourceOptimization, SITEWIDE_PAGE_URL)
        .await
        .expect("sitewide skew opportunity persisted");
    // 5% of sitewide ad revenue
    assert!((stored.estimated_monthly_impact - 0.5).abs() < 1e-9);
    assert_eq!(
        stored.suggested_actions[0].action_type,
        ActionType::RunAbTest
    );
}

#[tokio::test]
async fn test_search_dominated_mix_emits_seo_opportunity() {
    let mut p = page("https://example.com/evergreen", 1000, 10.0);
    p.traffic_by_source.insert(TrafficSource::Search, 700);
    p.traffic_by_source.insert(TrafficSource::Direct, 300);

    let fx = fixture(vec![p]).await;
    fx.detector.run_scan().await.unwrap();

    let stored = fx
        .store
        .get(OpportunityType::TrafficSourceOptimization, SITEWIDE_PAGE_URL)
        .await
        .expect("search-skew opportunity persisted");
    assert_eq!(
        stored.suggested_actions[0].action_type,
        ActionType::OptimizeSeo
    );
}

#[tokio::test]
async fn test_estimates_are_never_negative() {
    let mut bouncy = page("https://example.com/bouncy", 150, 0.0);
    bouncy.bounce_rate = 0.9;
    let mut thin = page("https://example.com/thin", 60, 0.0);
    thin.avg_time_on_page_secs = 10.0;
    let fx = fixture(vec![
        page("https://example.com/anchor", 5000, 100.0),
        bouncy,
        thin,
    ])
    .await;

    fx.detector.run_scan().await.unwrap();
    let stored = fx
        .store
        .list_by_status(OpportunityStatus::Pending)
        .await
        .unwrap();
    assert!(!stored.is_empty());
    for opportunity in stored {
        assert!(opportunity.estimated_monthly_impact >= 0.0);
        assert!((0.0..=1.0).contains(&opportunity.confidence));
        assert!((1..=10).contains(&opportunity.priority));
    }
}

#[tokio::test]
async fn test_empty_site_produces_no_opportunities() {
    let fx = fixture(Vec::new()).await;
    let outcome = fx.detector.run_scan().await.unwrap();
    assert_eq!(outcome.opportunities_found, 0);
    assert!(fx.store.is_empty().await);
}
