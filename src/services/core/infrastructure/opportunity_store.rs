// src/services/core/infrastructure/opportunity_store.rs

use crate::types::{Opportunity, OpportunityCandidate, OpportunityStatus};
use crate::utils::EngineResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Queue counts by status plus the total estimated impact of the open
/// queue (pending + approved)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub implemented: u64,
    pub total_estimated_impact: f64,
}

/// Durable queue of detected opportunities.
///
/// Upsert contract: for a given (type, page_url) pair at most one live
/// (non-expired, non-rejected) opportunity exists; an upsert replaces a
/// live row only when the incoming confidence is strictly higher. The
/// contract is idempotent and commutative on write order, so overlapping
/// runs tolerate at-least-once semantics.
#[async_trait]
pub trait OpportunityStore: Send + Sync {
    /// Upsert a candidate; returns the id of the stored opportunity
    /// (existing or new)
    async fn upsert_opportunity(&self, candidate: OpportunityCandidate) -> EngineResult<String>;

    async fn list_by_status(&self, status: OpportunityStatus)
        -> EngineResult<Vec<Opportunity>>;

    /// Expire pending opportunities older than the given age. Returns the
    /// number expired. Idempotent.
    async fn expire_older_than(&self, days: u32) -> EngineResult<u64>;

    async fn queue_stats(&self) -> EngineResult<QueueStats>;
}
