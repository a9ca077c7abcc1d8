// src/services/core/infrastructure/mod.rs

pub mod agent_runs;
pub mod measurements;
pub mod memory;
pub mod metrics_aggregator;
pub mod notifications;
pub mod opportunity_store;
pub mod service_container;

pub use agent_runs::AgentRunStore;
pub use measurements::{CompletedMeasurement, MeasurementReader};
pub use metrics_aggregator::{
    MetricsAggregator, MetricsWindow, PageMetrics, PageType, SiteMetrics, TrafficSource,
};
pub use notifications::{ActionExecutor, MetricsSyncClient, NotificationClient, RunSummary};
pub use opportunity_store::{OpportunityStore, QueueStats};
pub use service_container::{EngineCollaborators, EngineConfig, EngineContainer};
