// src/services/core/orchestration/orchestrator.rs

use crate::services::core::infrastructure::agent_runs::AgentRunStore;
use crate::services::core::infrastructure::notifications::{
    ActionExecutor, MetricsSyncClient, NotificationClient, RunSummary,
};
use crate::services::core::infrastructure::opportunity_store::OpportunityStore;
use crate::services::core::opportunities::affiliate_detector::AffiliateDetector;
use crate::services::core::opportunities::rpm_detector::RpmDetector;
use crate::types::{AgentRun, JobOutcome, JobType};
use crate::utils::logger::{LogLevel, Logger};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Fixed sub-job order for a full scan. Later stages assume the
/// opportunity store reflects the latest detector output, so the
/// sequence is sequential by design.
pub const FULL_SCAN_SEQUENCE: [JobType; 5] = [
    JobType::MetricsSync,
    JobType::AffiliateScan,
    JobType::RpmAnalysis,
    JobType::ApplyActions,
    JobType::Cleanup,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Pending opportunities older than this are expired by cleanup
    pub retention_days: u32,
    /// Run records included in a report
    pub report_recent_runs: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retention_days: 30,
            report_recent_runs: 20,
        }
    }
}

/// One sub-job's outcome inside a larger run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubJobResult {
    pub job_type: JobType,
    pub success: bool,
    pub items_processed: u64,
    pub opportunities_found: u64,
    pub note: Option<String>,
    pub error: Option<String>,
}

impl SubJobResult {
    fn ok(job_type: JobType, items_processed: u64, opportunities_found: u64) -> Self {
        Self {
            job_type,
            success: true,
            items_processed,
            opportunities_found,
            note: None,
            error: None,
        }
    }

    /// Optional collaborator absent: success with zero work done
    fn soft_skip(job_type: JobType, note: &str) -> Self {
        Self {
            job_type,
            success: true,
            items_processed: 0,
            opportunities_found: 0,
            note: Some(note.to_string()),
            error: None,
        }
    }

    fn failed(job_type: JobType, error: String) -> Self {
        Self {
            job_type,
            success: false,
            items_processed: 0,
            opportunities_found: 0,
            note: None,
            error: Some(error),
        }
    }
}

/// Sequences the batch pipeline, isolates failures per stage, and
/// records a full audit trail of runs.
pub struct Orchestrator {
    config: OrchestratorConfig,
    affiliate_detector: Arc<AffiliateDetector>,
    rpm_detector: Arc<RpmDetector>,
    store: Arc<dyn OpportunityStore>,
    runs: Arc<dyn AgentRunStore>,
    notifications: Option<Arc<dyn NotificationClient>>,
    metrics_sync: Option<Arc<dyn MetricsSyncClient>>,
    action_executor: Option<Arc<dyn ActionExecutor>>,
    logger: Logger,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: OrchestratorConfig,
        affiliate_detector: Arc<AffiliateDetector>,
        rpm_detector: Arc<RpmDetector>,
        store: Arc<dyn OpportunityStore>,
        runs: Arc<dyn AgentRunStore>,
        notifications: Option<Arc<dyn NotificationClient>>,
        metrics_sync: Option<Arc<dyn MetricsSyncClient>>,
        action_executor: Option<Arc<dyn ActionExecutor>>,
    ) -> Self {
        Self {
            config,
            affiliate_detector,
            rpm_detector,
            store,
            runs,
            notifications,
            metrics_sync,
            action_executor,
            logger: Logger::new(LogLevel::Info),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Job trigger surface. Creates the audit record, dispatches, and
    /// returns the finalized outcome.
    pub async fn run_job(&self, job_type: JobType) -> JobOutcome {
        let mut run = AgentRun::new(job_type);
        self.persist_run(&run).await;
        run.start();
        self.persist_run(&run).await;

        self.logger.info_with_meta(
            "job started",
            Some(&serde_json::json!({
                "run_id": run.id,
                "job_type": job_type.as_str(),
            })),
        );

        match job_type {
            JobType::Full => self.run_full_scan(&mut run).await,
            other => {
                let result = self.execute_sub_job(other).await;
                let error_count = u32::from(!result.success);
                run.finalize(
                    result.items_processed,
                    result.opportunities_found,
                    error_count,
                    result.error.clone(),
                );
            }
        }

        self.persist_run(&run).await;
        self.notify(&run).await;

        JobOutcome {
            job_type,
            success: run.error_count == 0,
            duration_ms: run.duration_ms.unwrap_or(0),
            items_processed: run.items_processed,
            opportunities_found: run.opportunities_found,
            error: run.error_summary.clone(),
        }
    }

    /// Execute the fixed sub-job sequence, isolating each failure. The
    /// run is marked failed iff at least one sub-job failed, while the
    /// successful sub-jobs' totals are still reported.
    async fn run_full_scan(&self, run: &mut AgentRun) {
        let mut items_processed = 0u64;
        let mut opportunities_found = 0u64;
        let mut errors: Vec<String> = Vec::new();

        for job_type in FULL_SCAN_SEQUENCE {
            let result = self.execute_sub_job(job_type).await;
            if result.success {
                items_processed += result.items_processed;
                opportunities_found += result.opportunities_found;
            } else if let Some(error) = &result.error {
                errors.push(format!("{}: {}", job_type.as_str(), error));
            }

            self.logger.info_with_meta(
                "full-scan stage finished",
                Some(&serde_json::json!({
                    "run_id": run.id,
                    "stage": job_type.as_str(),
                    "success": result.success,
                    "items_processed": result.items_processed,
                    "opportunities_found": result.opportunities_found,
                    "note": result.note,
                    "error": result.error,
                })),
            );
        }

        let error_count = errors.len() as u32;
        let summary = if errors.is_empty() {
            None
        } else {
            Some(serde_json::json!(errors).to_string())
        };
        run.finalize(items_processed, opportunities_found, error_count, summary);
    }

    /// Run one stage, converting every failure into a recorded result.
    /// Optional collaborators that are not configured soft-skip instead
    /// of failing, so absent integrations never block the pipeline.
    async fn execute_sub_job(&self, job_type: JobType) -> SubJobResult {
        match job_type {
            JobType::MetricsSync => match &self.metrics_sync {
                None => SubJobResult::soft_skip(
                    job_type,
                    "metrics sync collaborator not configured, skipping",
                ),
                Some(client) => match client.sync_metrics().await {
                    Ok(synced) => SubJobResult::ok(job_type, synced, 0),
                    Err(err) => SubJobResult::failed(job_type, err.to_string()),
                },
            },
            JobType::AffiliateScan => match self.affiliate_detector.run_scan().await {
                Ok(outcome) => SubJobResult::ok(
                    job_type,
                    outcome.items_processed,
                    outcome.opportunities_found,
                ),
                Err(err) => SubJobResult::failed(job_type, err.to_string()),
            },
            JobType::RpmAnalysis => match self.rpm_detector.run_scan().await {
                Ok(outcome) => SubJobResult::ok(
                    job_type,
                    outcome.items_processed,
                    outcome.opportunities_found,
                ),
                Err(err) => SubJobResult::failed(job_type, err.to_string()),
            },
            JobType::ApplyActions => match &self.action_executor {
                None => SubJobResult::soft_skip(
                    job_type,
                    "action executor not configured, skipping",
                ),
                Some(executor) => match executor.execute_approved_actions().await {
                    Ok(executed) => SubJobResult::ok(job_type, executed, 0),
                    Err(err) => SubJobResult::failed(job_type, err.to_string()),
                },
            },
            JobType::Cleanup => match self
                .store
                .expire_older_than(self.config.retention_days)
                .await
            {
                Ok(expired) => SubJobResult::ok(job_type, expired, 0),
                Err(err) => SubJobResult::failed(job_type, err.to_string()),
            },
            JobType::Report => match self.build_report().await {
                Ok(report) => {
                    SubJobResult::ok(job_type, report.recent_runs.len() as u64, 0)
                }
                Err(err) => SubJobResult::failed(job_type, err.to_string()),
            },
            // A full scan never nests inside another run
            JobType::Full => {
                SubJobResult::failed(job_type, "full scan cannot run as a sub-job".to_string())
            }
        }
    }

    async fn persist_run(&self, run: &AgentRun) {
        // The audit store failing must not take the pipeline down
        if let Err(err) = self.runs.save_run(run).await {
            self.logger.warn_with_meta(
                "failed to persist agent run",
                Some(&serde_json::json!({
                    "run_id": run.id,
                    "error": err.to_string(),
                })),
            );
        }
    }

    /// Fire-and-forget run-completion notification
    async fn notify(&self, run: &AgentRun) {
        let Some(client) = &self.notifications else {
            return;
        };
        let summary = RunSummary {
            run_id: run.id.clone(),
            run_type: run.run_type,
            status: run.status,
            duration_ms: run.duration_ms.unwrap_or(0),
            items_processed: run.items_processed,
            opportunities_found: run.opportunities_found,
            error_count: run.error_count,
        };
        if let Err(err) = client.notify_run_complete(&summary).await {
            self.logger.warn_with_meta(
                "run-complete notification failed",
                Some(&serde_json::json!({
                    "run_id": run.id,
                    "error": err.to_string(),
                })),
            );
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn OpportunityStore> {
        &self.store
    }

    pub(crate) fn run_store(&self) -> &Arc<dyn AgentRunStore> {
        &self.runs
    }
}
