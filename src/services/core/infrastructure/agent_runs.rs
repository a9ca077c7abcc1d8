// src/services/core/infrastructure/agent_runs.rs

use crate::types::{AgentRun, JobType};
use crate::utils::EngineResult;
use async_trait::async_trait;

/// Audit trail of orchestrated runs. Write-mostly; read only by the
/// reporting job.
#[async_trait]
pub trait AgentRunStore: Send + Sync {
    /// Insert or replace a run record by id
    async fn save_run(&self, run: &AgentRun) -> EngineResult<()>;

    /// Most recent runs, newest first
    async fn recent_runs(&self, limit: usize) -> EngineResult<Vec<AgentRun>>;

    /// Completion time of the most recent successful run of the given
    /// job type
    async fn last_completed_at(&self, job_type: JobType) -> EngineResult<Option<u64>>;
}
