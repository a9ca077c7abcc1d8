// src/services/core/mod.rs

pub mod infrastructure;
pub mod learning;
pub mod opportunities;
pub mod orchestration;
