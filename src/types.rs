// src/types.rs

use crate::utils::{time::current_timestamp_ms, EngineError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============= OPPORTUNITIES =============

/// Categories of monetization opportunities surfaced by the detectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityType {
    AffiliatePlacement,
    AdLayoutOptimization,
    ContentExpansion,
    TrafficSourceOptimization,
}

impl OpportunityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityType::AffiliatePlacement => "affiliate_placement",
            OpportunityType::AdLayoutOptimization => "ad_layout_optimization",
            OpportunityType::ContentExpansion => "content_expansion",
            OpportunityType::TrafficSourceOptimization => "traffic_source_optimization",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OpportunityType::AffiliatePlacement => "Affiliate Placement",
            OpportunityType::AdLayoutOptimization => "Ad Layout Optimization",
            OpportunityType::ContentExpansion => "Content Expansion",
            OpportunityType::TrafficSourceOptimization => "Traffic Source Optimization",
        }
    }
}

/// Lifecycle states of a persisted opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    Pending,
    Approved,
    Rejected,
    Implemented,
    Expired,
}

impl OpportunityStatus {
    /// Live opportunities block a same-key upsert unless the newcomer has
    /// strictly higher confidence.
    pub fn is_live(&self) -> bool {
        !matches!(self, OpportunityStatus::Rejected | OpportunityStatus::Expired)
    }
}

/// A detected monetization opportunity, page-scoped or sitewide
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub opportunity_type: OpportunityType,
    pub page_url: String,
    pub content_id: Option<String>,
    pub title: String,
    pub description: String,
    pub confidence: f64,
    pub estimated_monthly_impact: f64,
    pub priority: u8,
    pub status: OpportunityStatus,
    pub suggested_actions: Vec<SuggestedAction>,
    pub created_at: u64,
    pub updated_at: u64,
    pub expires_at: Option<u64>,
}

impl Opportunity {
    pub fn age_days(&self, now_ms: u64) -> u32 {
        (now_ms.saturating_sub(self.created_at) / crate::utils::time::MS_PER_DAY) as u32
    }
}

/// Validation failures when turning raw detector output into a candidate
#[derive(Debug, Error)]
pub enum CandidateValidationError {
    #[error("invalid page url `{0}`")]
    InvalidPageUrl(String),
    #[error("empty title for candidate on `{0}`")]
    EmptyTitle(String),
}

impl From<CandidateValidationError> for EngineError {
    fn from(err: CandidateValidationError) -> Self {
        EngineError::validation_error(err.to_string())
    }
}

/// Detector output prior to persistence. Carries exactly one suggested
/// action; the store assigns identity and lifecycle fields on upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityCandidate {
    pub opportunity_type: OpportunityType,
    pub page_url: String,
    pub content_id: Option<String>,
    pub title: String,
    pub description: String,
    pub confidence: f64,
    pub estimated_monthly_impact: f64,
    pub priority: u8,
    pub suggested_action: ActionParameters,
}

impl OpportunityCandidate {
    /// Clamp numeric fields into their contract ranges and reject
    /// candidates whose page URL does not parse (the sitewide sentinel
    /// `site://overall` parses as a URL).
    pub fn validated(mut self) -> Result<Self, CandidateValidationError> {
        if url::Url::parse(&self.page_url).is_err() {
            return Err(CandidateValidationError::InvalidPageUrl(self.page_url));
        }
        if self.title.trim().is_empty() {
            return Err(CandidateValidationError::EmptyTitle(self.page_url));
        }
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self.estimated_monthly_impact = self.estimated_monthly_impact.max(0.0);
        self.priority = self.priority.clamp(1, 10);
        Ok(self)
    }

    pub fn action_type(&self) -> ActionType {
        self.suggested_action.action_type()
    }

    /// Dedup key: one live opportunity per (type, page_url)
    pub fn store_key(&self) -> (OpportunityType, String) {
        (self.opportunity_type, self.page_url.clone())
    }
}

// ============= SUGGESTED ACTIONS =============

/// Remediation categories attached to opportunities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    AddAffiliateLink,
    UpdateAdPlacement,
    ExpandContent,
    OptimizeSeo,
    CreateCollection,
    RunAbTest,
}

impl ActionType {
    pub const ALL: [ActionType; 6] = [
        ActionType::AddAffiliateLink,
        ActionType::UpdateAdPlacement,
        ActionType::ExpandContent,
        ActionType::OptimizeSeo,
        ActionType::CreateCollection,
        ActionType::RunAbTest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::AddAffiliateLink => "add_affiliate_link",
            ActionType::UpdateAdPlacement => "update_ad_placement",
            ActionType::ExpandContent => "expand_content",
            ActionType::OptimizeSeo => "optimize_seo",
            ActionType::CreateCollection => "create_collection",
            ActionType::RunAbTest => "run_ab_test",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ActionType::AddAffiliateLink => "Add Affiliate Link",
            ActionType::UpdateAdPlacement => "Update Ad Placement",
            ActionType::ExpandContent => "Expand Content",
            ActionType::OptimizeSeo => "Optimize SEO",
            ActionType::CreateCollection => "Create Collection",
            ActionType::RunAbTest => "Run A/B Test",
        }
    }
}

/// Where an affiliate unit is placed on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementType {
    Inline,
    Sidebar,
    Footer,
    ProductGrid,
}

/// Per-action-type payload describing what to change. A closed tagged
/// union so each action's shape is statically checkable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionParameters {
    AddAffiliateLink {
        target_programs: Vec<String>,
        placement_type: PlacementType,
    },
    UpdateAdPlacement {
        current_rpm: f64,
        target_rpm: f64,
    },
    ExpandContent {
        current_avg_time_on_page_secs: f64,
        target_word_count: u32,
    },
    OptimizeSeo {
        focus_keywords: Vec<String>,
    },
    CreateCollection {
        source_page_type: String,
        min_items: u32,
    },
    RunAbTest {
        hypothesis: String,
        dominant_source: String,
        traffic_share: f64,
    },
}

impl ActionParameters {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionParameters::AddAffiliateLink { .. } => ActionType::AddAffiliateLink,
            ActionParameters::UpdateAdPlacement { .. } => ActionType::UpdateAdPlacement,
            ActionParameters::ExpandContent { .. } => ActionType::ExpandContent,
            ActionParameters::OptimizeSeo { .. } => ActionType::OptimizeSeo,
            ActionParameters::CreateCollection { .. } => ActionType::CreateCollection,
            ActionParameters::RunAbTest { .. } => ActionType::RunAbTest,
        }
    }
}

/// Concrete remediation owned by an opportunity. Immutable once the
/// parent opportunity is approved and executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub id: String,
    pub action_type: ActionType,
    pub parameters: ActionParameters,
    /// Copied from the parent opportunity at creation time
    pub estimated_impact: f64,
    pub created_at: u64,
}

impl SuggestedAction {
    pub fn new(parameters: ActionParameters, estimated_impact: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            action_type: parameters.action_type(),
            parameters,
            estimated_impact,
            created_at: current_timestamp_ms(),
        }
    }
}

// ============= IMPACT MEASUREMENTS =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementStatus {
    Pending,
    Complete,
}

/// Outcome of one executed suggested action: estimated vs. observed
/// revenue delta. Read-only once complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactMeasurement {
    pub id: String,
    pub action_id: String,
    pub action_type: ActionType,
    pub estimated_impact: f64,
    pub measured_impact: Option<f64>,
    pub status: MeasurementStatus,
    pub created_at: u64,
    pub completed_at: Option<u64>,
}

impl ImpactMeasurement {
    pub fn new(action_id: &str, action_type: ActionType, estimated_impact: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            action_id: action_id.to_string(),
            action_type,
            estimated_impact,
            measured_impact: None,
            status: MeasurementStatus::Pending,
            created_at: current_timestamp_ms(),
            completed_at: None,
        }
    }

    /// Close the measurement window with the observed revenue delta
    pub fn complete(mut self, measured_impact: f64, completed_at: u64) -> Self {
        self.measured_impact = Some(measured_impact);
        self.status = MeasurementStatus::Complete;
        self.completed_at = Some(completed_at);
        self
    }

    /// `1 - |estimate - actual| / max(estimate, actual)`, clamped to [0, 1].
    /// A zero prediction that came true counts as perfect.
    pub fn prediction_accuracy(&self) -> Option<f64> {
        let measured = self.measured_impact?;
        Some(prediction_accuracy(self.estimated_impact, measured))
    }

    /// Signed relative error `(actual - estimate) / estimate`
    pub fn prediction_error(&self) -> Option<f64> {
        let measured = self.measured_impact?;
        if self.estimated_impact == 0.0 {
            return Some(0.0);
        }
        Some((measured - self.estimated_impact) / self.estimated_impact)
    }
}

/// Shared accuracy formula for estimated-vs-measured comparisons
pub fn prediction_accuracy(estimated: f64, measured: f64) -> f64 {
    let denom = estimated.max(measured);
    if denom <= 0.0 {
        return 1.0;
    }
    (1.0 - (estimated - measured).abs() / denom).clamp(0.0, 1.0)
}

// ============= LEARNING METRICS =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Stable => "stable",
            TrendDirection::Declining => "declining",
        }
    }
}

/// Rolling-window calibration state for one action category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningMetric {
    pub action_type: ActionType,
    pub sample_size: usize,
    pub avg_accuracy: f64,
    /// Mean of measured/estimated across completed measurements; 1.0 below
    /// the minimum sample threshold
    pub adjustment_factor: f64,
    pub confidence_level: f64,
    pub trend: TrendDirection,
    pub computed_at: u64,
}

impl LearningMetric {
    /// Conservative default when there is no usable evidence
    pub fn unadjusted(action_type: ActionType) -> Self {
        Self {
            action_type,
            sample_size: 0,
            avg_accuracy: 0.0,
            adjustment_factor: 1.0,
            confidence_level: 0.0,
            trend: TrendDirection::Stable,
            computed_at: current_timestamp_ms(),
        }
    }
}

// ============= AGENT RUNS =============

/// Batch jobs the orchestrator knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Full,
    MetricsSync,
    AffiliateScan,
    RpmAnalysis,
    ApplyActions,
    Cleanup,
    Report,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Full => "full",
            JobType::MetricsSync => "metrics_sync",
            JobType::AffiliateScan => "affiliate_scan",
            JobType::RpmAnalysis => "rpm_analysis",
            JobType::ApplyActions => "apply_actions",
            JobType::Cleanup => "cleanup",
            JobType::Report => "report",
        }
    }
}

/// Agent run state machine: pending -> running -> {completed | failed},
/// terminal once completed_at is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

/// Audit record of one orchestrated job. Observability only; never read
/// by detection logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRun {
    pub id: String,
    pub run_type: JobType,
    pub status: RunStatus,
    pub started_at: u64,
    pub completed_at: Option<u64>,
    pub duration_ms: Option<u64>,
    pub items_processed: u64,
    pub opportunities_found: u64,
    pub error_count: u32,
    pub error_summary: Option<String>,
}

impl AgentRun {
    pub fn new(run_type: JobType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            run_type,
            status: RunStatus::Pending,
            started_at: current_timestamp_ms(),
            completed_at: None,
            duration_ms: None,
            items_processed: 0,
            opportunities_found: 0,
            error_count: 0,
            error_summary: None,
        }
    }

    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = current_timestamp_ms();
    }

    /// Finalize the run; immutable afterwards
    pub fn finalize(
        &mut self,
        items_processed: u64,
        opportunities_found: u64,
        error_count: u32,
        error_summary: Option<String>,
    ) {
        let now = current_timestamp_ms();
        self.items_processed = items_processed;
        self.opportunities_found = opportunities_found;
        self.error_count = error_count;
        self.error_summary = error_summary;
        self.status = if error_count > 0 {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        self.completed_at = Some(now);
        self.duration_ms = Some(now.saturating_sub(self.started_at));
    }
}

/// What the job trigger surface hands back to the external caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_type: JobType,
    pub success: bool,
    pub duration_ms: u64,
    pub items_processed: u64,
    pub opportunities_found: u64,
    pub error: Option<String>,
}
