// src/services/core/infrastructure/service_container.rs

use crate::services::core::infrastructure::agent_runs::AgentRunStore;
use crate::services::core::infrastructure::measurements::MeasurementReader;
use crate::services::core::infrastructure::metrics_aggregator::MetricsAggregator;
use crate::services::core::infrastructure::notifications::{
    ActionExecutor, MetricsSyncClient, NotificationClient,
};
use crate::services::core::infrastructure::opportunity_store::OpportunityStore;
use crate::services::core::learning::learning_engine::{LearningEngine, LearningEngineConfig};
use crate::services::core::opportunities::affiliate_detector::{
    AffiliateDetector, AffiliateDetectorConfig,
};
use crate::services::core::opportunities::rpm_detector::{RpmDetector, RpmDetectorConfig};
use crate::services::core::orchestration::orchestrator::{Orchestrator, OrchestratorConfig};
use std::sync::Arc;

/// Aggregate configuration for the whole engine
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub affiliate: AffiliateDetectorConfig,
    pub rpm: RpmDetectorConfig,
    pub learning: LearningEngineConfig,
    pub orchestrator: OrchestratorConfig,
}

/// Collaborator handles supplied by the embedding application. The
/// optional ones soft-skip their pipeline stage when absent.
pub struct EngineCollaborators {
    pub metrics: Arc<dyn MetricsAggregator>,
    pub opportunity_store: Arc<dyn OpportunityStore>,
    pub measurements: Arc<dyn MeasurementReader>,
    pub agent_runs: Arc<dyn AgentRunStore>,
    pub notifications: Option<Arc<dyn NotificationClient>>,
    pub metrics_sync: Option<Arc<dyn MetricsSyncClient>>,
    pub action_executor: Option<Arc<dyn ActionExecutor>>,
}

/// Wires the engine together with explicit dependency injection:
/// every component receives its collaborator handles at construction,
/// so tests can substitute fakes for any of them.
pub struct EngineContainer {
    learning_engine: Arc<LearningEngine>,
    affiliate_detector: Arc<AffiliateDetector>,
    rpm_detector: Arc<RpmDetector>,
    orchestrator: Arc<Orchestrator>,
}

impl EngineContainer {
    pub fn new(config: EngineConfig, collaborators: EngineCollaborators) -> Self {
        let learning_engine = Arc::new(LearningEngine::new(
            config.learning,
            Arc::clone(&collaborators.measurements),
        ));

        let affiliate_detector = Arc::new(AffiliateDetector::new(
            config.affiliate,
            Arc::clone(&collaborators.metrics),
            Arc::clone(&learning_engine),
            Arc::clone(&collaborators.opportunity_store),
        ));

        let rpm_detector = Arc::new(RpmDetector::new(
            config.rpm,
            Arc::clone(&collaborators.metrics),
            Arc::clone(&learning_engine),
            Arc::clone(&collaborators.opportunity_store),
        ));

        let orchestrator = Arc::new(Orchestrator::new(
            config.orchestrator,
            Arc::clone(&affiliate_detector),
            Arc::clone(&rpm_detector),
            Arc::clone(&collaborators.opportunity_store),
            Arc::clone(&collaborators.agent_runs),
            collaborators.notifications.clone(),
            collaborators.metrics_sync.clone(),
            collaborators.action_executor.clone(),
        ));

        Self {
            learning_engine,
            affiliate_detector,
            rpm_detector,
            orchestrator,
        }
    }

    pub fn learning_engine(&self) -> &Arc<LearningEngine> {
        &self.learning_engine
    }

    pub fn affiliate_detector(&self) -> &Arc<AffiliateDetector> {
        &self.affiliate_detector
    }

    pub fn rpm_detector(&self) -> &Arc<RpmDetector> {
        &self.rpm_detector
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }
}
