// src/services/core/infrastructure/notifications.rs

use crate::types::{JobType, RunStatus};
use crate::utils::EngineResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Condensed run outcome handed to the notification collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub run_type: JobType,
    pub status: RunStatus,
    pub duration_ms: u64,
    pub items_processed: u64,
    pub opportunities_found: u64,
    pub error_count: u32,
}

/// Fire-and-forget notification delivery. Delivery transports are out of
/// scope; the orchestrator logs and swallows failures.
#[async_trait]
pub trait NotificationClient: Send + Sync {
    async fn notify_run_complete(&self, summary: &RunSummary) -> EngineResult<()>;
}

/// Optional upstream metric synchronisation. When the collaborator is
/// not configured the orchestrator soft-skips the sync stage.
#[async_trait]
pub trait MetricsSyncClient: Send + Sync {
    /// Pull fresh facts into the metric store; returns items synced
    async fn sync_metrics(&self) -> EngineResult<u64>;
}

/// Optional execution of previously-approved actions. Absent
/// configuration soft-skips the stage; the execution mechanics live
/// outside this crate.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Execute approved actions; returns the number executed
    async fn execute_approved_actions(&self) -> EngineResult<u64>;
}
