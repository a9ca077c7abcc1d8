// src/services/core/infrastructure/memory.rs
//
// In-memory reference implementations of the collaborator contracts.
// They honor the full contracts (upsert invariant, pending-only expiry,
// queue stats) and back the unit tests and local wiring.

use crate::services::core::infrastructure::agent_runs::AgentRunStore;
use crate::services::core::infrastructure::measurements::{
    CompletedMeasurement, MeasurementReader,
};
use crate::services::core::infrastructure::metrics_aggregator::{
    MetricsAggregator, MetricsWindow, PageMetrics, SiteMetrics, TrafficSource,
};
use crate::services::core::infrastructure::notifications::{NotificationClient, RunSummary};
use crate::services::core::infrastructure::opportunity_store::{OpportunityStore, QueueStats};
use crate::types::{
    ActionType, AgentRun, ImpactMeasurement, JobType, MeasurementStatus, Opportunity,
    OpportunityCandidate, OpportunityStatus, OpportunityType, RunStatus, SuggestedAction,
};
use crate::utils::time::current_timestamp_ms;
use crate::utils::{EngineError, EngineResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

// ============= OPPORTUNITY STORE =============

#[derive(Default)]
pub struct InMemoryOpportunityStore {
    rows: RwLock<HashMap<(OpportunityType, String), Opportunity>>,
}

impl InMemoryOpportunityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fully-formed opportunity, bypassing the upsert contract.
    /// Intended for tests and replays that need aged or non-pending rows.
    pub async fn seed_opportunity(&self, opportunity: Opportunity) {
        let key = (opportunity.opportunity_type, opportunity.page_url.clone());
        self.rows.write().await.insert(key, opportunity);
    }

    pub async fn get(
        &self,
        opportunity_type: OpportunityType,
        page_url: &str,
    ) -> Option<Opportunity> {
        self.rows
            .read()
            .await
            .get(&(opportunity_type, page_url.to_string()))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl OpportunityStore for InMemoryOpportunityStore {
    async fn upsert_opportunity(&self, candidate: OpportunityCandidate) -> EngineResult<String> {
        let candidate = candidate.validated().map_err(EngineError::from)?;
        let now = current_timestamp_ms();
        let key = candidate.store_key();
        let mut rows = self.rows.write().await;

        if let Some(existing) = rows.get_mut(&key) {
            if existing.status.is_live() {
                // Live row survives unless the newcomer is strictly more
                // confident
                if candidate.confidence <= existing.confidence {
                    return Ok(existing.id.clone());
                }
                existing.title = candidate.title;
                existing.description = candidate.description;
                existing.content_id = candidate.content_id;
                existing.confidence = candidate.confidence;
                existing.estimated_monthly_impact = candidate.estimated_monthly_impact;
                existing.priority = candidate.priority;
                existing.suggested_actions = vec![SuggestedAction::new(
                    candidate.suggested_action,
                    candidate.estimated_monthly_impact,
                )];
                existing.updated_at = now;
                return Ok(existing.id.clone());
            }
        }

        let action =
            SuggestedAction::new(candidate.suggested_action, candidate.estimated_monthly_impact);
        let opportunity = Opportunity {
            id: uuid::Uuid::new_v4().to_string(),
            opportunity_type: candidate.opportunity_type,
            page_url: candidate.page_url,
            content_id: candidate.content_id,
            title: candidate.title,
            description: candidate.description,
            confidence: candidate.confidence,
            estimated_monthly_impact: candidate.estimated_monthly_impact,
            priority: candidate.priority,
            status: OpportunityStatus::Pending,
            suggested_actions: vec![action],
            created_at: now,
            updated_at: now,
            expires_at: None,
        };
        let id = opportunity.id.clone();
        rows.insert(key, opportunity);
        Ok(id)
    }

    async fn list_by_status(
        &self,
        status: OpportunityStatus,
    ) -> EngineResult<Vec<Opportunity>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|o| o.status == status)
            .cloned()
            .collect())
    }

    async fn expire_older_than(&self, days: u32) -> EngineResult<u64> {
        let now = current_timestamp_ms();
        let mut expired = 0u64;
        for row in self.rows.write().await.values_mut() {
            if row.status == OpportunityStatus::Pending && row.age_days(now) > days {
                row.status = OpportunityStatus::Expired;
                row.expires_at = Some(now);
                row.updated_at = now;
                expired += 1;
            }
        }
        if expired > 0 {
            crate::log_info!(
                "expired stale pending opportunities",
                serde_json::json!({ "count": expired, "retention_days": days })
            );
        }
        Ok(expired)
    }

    async fn queue_stats(&self) -> EngineResult<QueueStats> {
        let mut stats = QueueStats::default();
        for row in self.rows.read().await.values() {
            match row.status {
                OpportunityStatus::Pending => {
                    stats.pending += 1;
                    stats.total_estimated_impact += row.estimated_monthly_impact;
                }
                OpportunityStatus::Approved => {
                    stats.approved += 1;
                    stats.total_estimated_impact += row.estimated_monthly_impact;
                }
                OpportunityStatus::Rejected => stats.rejected += 1,
                OpportunityStatus::Implemented => stats.implemented += 1,
                OpportunityStatus::Expired => {}
            }
        }
        Ok(stats)
    }
}

// ============= AGENT RUN STORE =============

#[derive(Default)]
pub struct InMemoryAgentRunStore {
    runs: RwLock<Vec<AgentRun>>,
}

impl InMemoryAgentRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all_runs(&self) -> Vec<AgentRun> {
        self.runs.read().await.clone()
    }
}

#[async_trait]
impl AgentRunStore for InMemoryAgentRunStore {
    async fn save_run(&self, run: &AgentRun) -> EngineResult<()> {
        let mut runs = self.runs.write().await;
        if let Some(existing) = runs.iter_mut().find(|r| r.id == run.id) {
            *existing = run.clone();
        } else {
            runs.push(run.clone());
        }
        Ok(())
    }

    async fn recent_runs(&self, limit: usize) -> EngineResult<Vec<AgentRun>> {
        let mut runs = self.runs.read().await.clone();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs.truncate(limit);
        Ok(runs)
    }

    async fn last_completed_at(&self, job_type: JobType) -> EngineResult<Option<u64>> {
        Ok(self
            .runs
            .read()
            .await
            .iter()
            .filter(|r| r.run_type == job_type && r.status == RunStatus::Completed)
            .filter_map(|r| r.completed_at)
            .max())
    }
}

// ============= MEASUREMENT STORE =============

#[derive(Default)]
pub struct InMemoryMeasurementStore {
    measurements: RwLock<Vec<ImpactMeasurement>>,
}

impl InMemoryMeasurementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, measurement: ImpactMeasurement) {
        self.measurements.write().await.push(measurement);
    }

    pub async fn record_all(&self, measurements: Vec<ImpactMeasurement>) {
        self.measurements.write().await.extend(measurements);
    }
}

#[async_trait]
impl MeasurementReader for InMemoryMeasurementStore {
    async fn completed_measurements(
        &self,
        action_type: Option<ActionType>,
    ) -> EngineResult<Vec<CompletedMeasurement>> {
        Ok(self
            .measurements
            .read()
            .await
            .iter()
            .filter(|m| m.status == MeasurementStatus::Complete)
            .filter(|m| action_type.map(|t| m.action_type == t).unwrap_or(true))
            .filter_map(|m| {
                let measured = m.measured_impact?;
                let completed_at = m.completed_at?;
                Some(CompletedMeasurement {
                    action_type: m.action_type,
                    estimated_impact: m.estimated_impact,
                    measured_impact: measured,
                    prediction_accuracy: m.prediction_accuracy().unwrap_or(0.0),
                    completed_at,
                })
            })
            .collect())
    }
}

// ============= METRICS AGGREGATOR =============

/// Fixed-dataset aggregator for tests and offline replays. Sitewide
/// aggregates are derived from the page rows unless overridden, and
/// either query can be forced to fail to exercise failure isolation.
#[derive(Default)]
pub struct StaticMetricsAggregator {
    pages: Vec<PageMetrics>,
    site_override: Option<SiteMetrics>,
    fail_by_page: bool,
    fail_sitewide: bool,
}

impl StaticMetricsAggregator {
    pub fn new(pages: Vec<PageMetrics>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    pub fn with_site_metrics(mut self, site: SiteMetrics) -> Self {
        self.site_override = Some(site);
        self
    }

    pub fn with_by_page_failure(mut self) -> Self {
        self.fail_by_page = true;
        self
    }

    pub fn with_sitewide_failure(mut self) -> Self {
        self.fail_sitewide = true;
        self
    }

    fn derive_site_metrics(&self) -> SiteMetrics {
        let mut traffic: HashMap<TrafficSource, u64> = HashMap::new();
        let mut site = SiteMetrics {
            pageviews: 0,
            ad_revenue: 0.0,
            affiliate_clicks: 0,
            traffic_by_source: HashMap::new(),
        };
        for page in &self.pages {
            site.pageviews += page.pageviews;
            site.ad_revenue += page.ad_revenue;
            site.affiliate_clicks += page.affiliate_clicks;
            for (source, views) in &page.traffic_by_source {
                *traffic.entry(*source).or_insert(0) += views;
            }
        }
        site.traffic_by_source = traffic;
        site
    }
}

#[async_trait]
impl MetricsAggregator for StaticMetricsAggregator {
    async fn aggregate_by_page(&self, _window: MetricsWindow) -> EngineResult<Vec<PageMetrics>> {
        if self.fail_by_page {
            return Err(EngineError::external_service_error(
                "metric_aggregator",
                "per-page aggregate query failed",
            ));
        }
        Ok(self.pages.clone())
    }

    async fn aggregate_sitewide(&self, _window: MetricsWindow) -> EngineResult<SiteMetrics> {
        if self.fail_sitewide {
            return Err(EngineError::external_service_error(
                "metric_aggregator",
                "sitewide aggregate query failed",
            ));
        }
        Ok(self
            .site_override
            .clone()
            .unwrap_or_else(|| self.derive_site_metrics()))
    }
}

// ============= NOTIFICATIONS =============

/// Records run summaries instead of delivering them
#[derive(Default)]
pub struct RecordingNotificationClient {
    summaries: RwLock<Vec<RunSummary>>,
}

impl RecordingNotificationClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn delivered(&self) -> Vec<RunSummary> {
        self.summaries.read().await.clone()
    }
}

#[async_trait]
impl NotificationClient for RecordingNotificationClient {
    async fn notify_run_complete(&self, summary: &RunSummary) -> EngineResult<()> {
        self.summaries.write().await.push(summary.clone());
        Ok(())
    }
}
