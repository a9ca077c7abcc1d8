// tests/unit/core/orchestration/orchestrator_test.rs
// Pipeline sequencing: failure isolation, soft-skips, cleanup
// retention, reporting, and the run state machine.

use revenue_edge::services::core::infrastructure::agent_runs::AgentRunStore;
use revenue_edge::services::core::infrastructure::measurements::MeasurementReader;
use revenue_edge::services::core::infrastructure::memory::{
    InMemoryAgentRunStore, InMemoryMeasurementStore, InMemoryOpportunityStore,
    RecordingNotificationClient, StaticMetricsAggregator,
};
use revenue_edge::services::core::infrastructure::metrics_aggregator::{
    MetricsAggregator, PageMetrics, PageType,
};
use revenue_edge::services::core::infrastructure::notifications::NotificationClient;
use revenue_edge::services::core::infrastructure::opportunity_store::OpportunityStore;
use revenue_edge::types::{
    JobType, Opportunity, OpportunityStatus, OpportunityType, RunStatus,
};
use revenue_edge::utils::time::{current_timestamp_ms, days_to_ms};
use revenue_edge::{EngineCollaborators, EngineConfig, EngineContainer};
use std::collections::HashMap;
use std::sync::Arc;

fn affiliate_page() -> PageMetrics {
    PageMetrics {
        page_url: "https://example.com/nooks".to_string(),
        content_id: None,
        page_type: PageType::Content,
        title: "Cozy reading nooks".to_string(),
        description: "Ideas for small spaces".to_string(),
        pageviews: 500,
        ad_revenue: 1.0,
        affiliate_clicks: 2,
        bounce_rate: 0.3,
        avg_time_on_page_secs: 120.0,
        traffic_by_source: HashMap::new(),
    }
}

struct Fixture {
    container: EngineContainer,
    store: Arc<InMemoryOpportunityStore>,
    runs: Arc<InMemoryAgentRunStore>,
    notifications: Arc<RecordingNotificationClient>,
}

fn fixture(aggregator: StaticMetricsAggregator) -> Fixture {
    let store = Arc::new(InMemoryOpportunityStore::new());
    let runs = Arc::new(InMemoryAgentRunStore::new());
    let notifications = Arc::new(RecordingNotificationClient::new());
    let container = EngineContainer::new(
        EngineConfig::default(),
        EngineCollaborators {
            metrics: Arc::new(aggregator) as Arc<dyn MetricsAggregator>,
            opportunity_store: Arc::clone(&store) as Arc<dyn OpportunityStore>,
            measurements: Arc::new(InMemoryMeasurementStore::new()) as Arc<dyn MeasurementReader>,
            agent_runs: Arc::clone(&runs) as Arc<dyn AgentRunStore>,
            notifications: Some(Arc::clone(&notifications) as Arc<dyn NotificationClient>),
            metrics_sync: None,
            action_executor: None,
        },
    );
    Fixture {
        container,
        store,
        runs,
        notifications,
    }
}

fn aged_opportunity(status: OpportunityStatus, age_days: u32) -> Opportunity {
    let created_at = current_timestamp_ms() - days_to_ms(age_days);
    Opportunity {
        id: uuid_like(age_days, status),
        opportunity_type: OpportunityType::AffiliatePlacement,
        page_url: format!("https://example.com/aged-{}-{:?}", age_days, status),
        content_id: None,
        title: "Aged opportunity".to_string(),
        description: String::new(),
        confidence: 0.6,
        estimated_monthly_impact: 5.0,
        priority: 4,
        status,
        suggested_actions: Vec::new(),
        created_at,
        updated_at: created_at,
        expires_at: None,
    }
}

fn uuid_like(age_days: u32, status: OpportunityStatus) -> String {
    format!("aged-{}-{:?}", age_days, status)
}

#[tokio::test]
async fn test_full_scan_succeeds_and_soft_skips_optional_stages() {
    // No metrics-sync or action-executor collaborators configured; the
    // pipeline must complete anyway.
    let fx = fixture(StaticMetricsAggregator::new(vec![affiliate_page()]));
    let outcome = fx.container.orchestrator().run_job(JobType::Full).await;

    assert!(outcome.success);
    assert!(outcome.error.is_none());
    // The affiliate page was detected despite the skipped stages
    assert_eq!(outcome.opportunities_found, 1);

    let runs = fx.runs.all_runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Completed);
    assert!(runs[0].completed_at.is_some());
}

#[tokio::test]
async fn test_failed_sub_job_fails_run_but_keeps_partial_totals() {
    // The sitewide aggregate query fails, taking down the RPM detector;
    // the affiliate detector still runs and its totals survive.
    let fx = fixture(
        StaticMetricsAggregator::new(vec![affiliate_page()]).with_sitewide_failure(),
    );
    let outcome = fx.container.orchestrator().run_job(JobType::Full).await;

    assert!(!outcome.success);
    let error = outcome.error.expect("error summary recorded");
    assert!(error.contains("rpm_analysis"));
    // Partial totals from the successful sub-jobs, not zero
    assert_eq!(outcome.items_processed, 1);
    assert_eq!(outcome.opportunities_found, 1);

    let runs = fx.runs.all_runs().await;
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert_eq!(runs[0].items_processed, 1);
    assert_eq!(runs[0].opportunities_found, 1);
    assert_eq!(runs[0].error_count, 1);
}

#[tokio::test]
async fn test_cleanup_expires_only_stale_pending_opportunities() {
    let fx = fixture(StaticMetricsAggregator::new(Vec::new()));
    fx.store
        .seed_opportunity(aged_opportunity(OpportunityStatus::Pending, 31))
        .await;
    fx.store
        .seed_opportunity(aged_opportunity(OpportunityStatus::Pending, 29))
        .await;
    fx.store
        .seed_opportunity(aged_opportunity(OpportunityStatus::Implemented, 40))
        .await;

    let outcome = fx.container.orchestrator().run_job(JobType::Cleanup).await;
    assert!(outcome.success);
    assert_eq!(outcome.items_processed, 1);

    let pending = fx
        .store
        .list_by_status(OpportunityStatus::Pending)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].page_url.contains("aged-29"));

    let expired = fx
        .store
        .list_by_status(OpportunityStatus::Expired)
        .await
        .unwrap();
    assert_eq!(expired.len(), 1);
    assert!(expired[0].page_url.contains("aged-31"));
    assert!(expired[0].expires_at.is_some());

    // Implemented opportunities never age out
    let implemented = fx
        .store
        .list_by_status(OpportunityStatus::Implemented)
        .await
        .unwrap();
    assert_eq!(implemented.len(), 1);

    // Cleanup is idempotent
    let again = fx.container.orchestrator().run_job(JobType::Cleanup).await;
    assert_eq!(again.items_processed, 0);
}

#[tokio::test]
async fn test_report_collects_queue_stats_and_run_history() {
    let fx = fixture(StaticMetricsAggregator::new(vec![affiliate_page()]));
    let orchestrator = fx.container.orchestrator();

    let scan = orchestrator.run_job(JobType::AffiliateScan).await;
    assert!(scan.success);

    let report = orchestrator.build_report().await.unwrap();
    assert_eq!(report.queue_stats.pending, 1);
    assert!(report.queue_stats.total_estimated_impact > 0.0);
    assert!(report
        .last_successful_runs
        .get(&JobType::AffiliateScan)
        .copied()
        .flatten()
        .is_some());
    assert!(report
        .last_successful_runs
        .get(&JobType::RpmAnalysis)
        .copied()
        .flatten()
        .is_none());
    assert!(!report.recent_runs.is_empty());

    // The report job itself is audited and mutates nothing
    let outcome = orchestrator.run_job(JobType::Report).await;
    assert!(outcome.success);
    let stats_after = fx.store.queue_stats().await.unwrap();
    assert_eq!(stats_after.pending, 1);
}

#[tokio::test]
async fn test_run_complete_notifications_are_delivered() {
    let fx = fixture(StaticMetricsAggregator::new(vec![affiliate_page()]));
    fx.container.orchestrator().run_job(JobType::Full).await;

    let delivered = fx.notifications.delivered().await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].run_type, JobType::Full);
    assert_eq!(delivered[0].status, RunStatus::Completed);
    assert_eq!(delivered[0].opportunities_found, 1);
}

#[tokio::test]
async fn test_standalone_detector_jobs_are_audited() {
    let fx = fixture(StaticMetricsAggregator::new(vec![affiliate_page()]));
    let outcome = fx
        .container
        .orchestrator()
        .run_job(JobType::AffiliateScan)
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.items_processed, 1);
    assert_eq!(outcome.opportunities_found, 1);

    let runs = fx.runs.all_runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_type, JobType::AffiliateScan);
    assert!(runs[0].status.is_terminal());
    assert!(runs[0].duration_ms.is_some());
}

#[tokio::test]
async fn test_overlapping_scans_converge_to_one_row_per_page() {
    // At-least-once semantics: a second full scan over identical metrics
    // leaves the store exactly as the first did.
    let fx = fixture(StaticMetricsAggregator::new(vec![affiliate_page()]));
    fx.container.orchestrator().run_job(JobType::Full).await;
    let len_after_first = fx.store.len().await;
    fx.container.orchestrator().run_job(JobType::Full).await;
    assert_eq!(fx.store.len().await, len_after_first);
}
