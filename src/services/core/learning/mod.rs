// src/services/core/learning/mod.rs

pub mod insights;
pub mod learning_engine;

pub use insights::{InsightKind, LearningInsight, LearningReport};
pub use learning_engine::{EstimateAdjustment, LearningEngine, LearningEngineConfig};
