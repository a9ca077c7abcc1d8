// src/services/core/opportunities/mod.rs

pub mod affiliate_detector;
pub mod opportunity_core;
pub mod rpm_detector;

pub use affiliate_detector::{AffiliateDetector, AffiliateDetectorConfig};
pub use opportunity_core::{DetectorOutcome, FunnelModel, SITEWIDE_PAGE_URL};
pub use rpm_detector::{RpmDetector, RpmDetectorConfig};
