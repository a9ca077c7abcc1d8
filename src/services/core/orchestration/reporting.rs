// src/services/core/orchestration/reporting.rs

use crate::services::core::orchestration::orchestrator::{Orchestrator, FULL_SCAN_SEQUENCE};
use crate::services::core::infrastructure::opportunity_store::QueueStats;
use crate::types::{AgentRun, JobType};
use crate::utils::time::current_timestamp_ms;
use crate::utils::EngineResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Observability snapshot of the pipeline: queue composition, last
/// success per sub-job, and the most recent run records. Performs no
/// mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub queue_stats: QueueStats,
    pub last_successful_runs: HashMap<JobType, Option<u64>>,
    pub recent_runs: Vec<AgentRun>,
    pub generated_at: u64,
}

impl Orchestrator {
    /// Assemble the reporting job's payload
    pub async fn build_report(&self) -> EngineResult<RunReport> {
        let queue_stats = self.store().queue_stats().await?;

        let mut last_successful_runs = HashMap::new();
        for job_type in FULL_SCAN_SEQUENCE.into_iter().chain([JobType::Full]) {
            let completed_at = self.run_store().last_completed_at(job_type).await?;
            last_successful_runs.insert(job_type, completed_at);
        }

        let recent_runs = self
            .run_store()
            .recent_runs(self.config().report_recent_runs)
            .await?;

        Ok(RunReport {
            queue_stats,
            last_successful_runs,
            recent_runs,
            generated_at: current_timestamp_ms(),
        })
    }
}
