// src/services/core/infrastructure/metrics_aggregator.rs

use crate::utils::time::{current_timestamp_ms, days_to_ms};
use crate::utils::EngineResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inbound traffic channels tracked per page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficSource {
    Search,
    Pinterest,
    Instagram,
    Social,
    Direct,
    Referral,
    Email,
    Other,
}

impl TrafficSource {
    /// Visually-driven channels warrant image-forward layout treatment
    pub fn is_visual(&self) -> bool {
        matches!(self, TrafficSource::Pinterest | TrafficSource::Instagram)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficSource::Search => "search",
            TrafficSource::Pinterest => "pinterest",
            TrafficSource::Instagram => "instagram",
            TrafficSource::Social => "social",
            TrafficSource::Direct => "direct",
            TrafficSource::Referral => "referral",
            TrafficSource::Email => "email",
            TrafficSource::Other => "other",
        }
    }
}

/// Broad page classes as reported by the metric store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Content,
    Category,
    Search,
}

/// Time window for aggregate queries, in epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsWindow {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl MetricsWindow {
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        Self { start_ms, end_ms }
    }

    /// Trailing window ending now
    pub fn trailing_days(days: u32) -> Self {
        let end_ms = current_timestamp_ms();
        Self {
            start_ms: end_ms.saturating_sub(days_to_ms(days)),
            end_ms,
        }
    }

    pub fn midpoint_ms(&self) -> u64 {
        self.start_ms + (self.end_ms - self.start_ms) / 2
    }
}

/// Windowed traffic/revenue aggregates for one page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMetrics {
    pub page_url: String,
    pub content_id: Option<String>,
    pub page_type: PageType,
    pub title: String,
    pub description: String,
    pub pageviews: u64,
    pub ad_revenue: f64,
    pub affiliate_clicks: u64,
    pub bounce_rate: f64,
    pub avg_time_on_page_secs: f64,
    pub traffic_by_source: HashMap<TrafficSource, u64>,
}

impl PageMetrics {
    /// Affiliate clicks per pageview, 0.0 on an empty window
    pub fn affiliate_click_rate(&self) -> f64 {
        if self.pageviews == 0 {
            return 0.0;
        }
        self.affiliate_clicks as f64 / self.pageviews as f64
    }

    /// Revenue per thousand pageviews
    pub fn rpm(&self) -> f64 {
        if self.pageviews == 0 {
            return 0.0;
        }
        self.ad_revenue / self.pageviews as f64 * 1000.0
    }

    /// The channel with the largest share of this page's tracked
    /// pageviews, and that share
    pub fn dominant_source(&self) -> Option<(TrafficSource, f64)> {
        let total: u64 = self.traffic_by_source.values().sum();
        if total == 0 {
            return None;
        }
        self.traffic_by_source
            .iter()
            .max_by_key(|(_, v)| **v)
            .map(|(source, views)| (*source, *views as f64 / total as f64))
    }
}

/// Sitewide aggregates over the same window, without page grouping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteMetrics {
    pub pageviews: u64,
    pub ad_revenue: f64,
    pub affiliate_clicks: u64,
    pub traffic_by_source: HashMap<TrafficSource, u64>,
}

impl SiteMetrics {
    pub fn site_rpm(&self) -> f64 {
        if self.pageviews == 0 {
            return 0.0;
        }
        self.ad_revenue / self.pageviews as f64 * 1000.0
    }

    /// Channel shares sorted descending
    pub fn source_shares(&self) -> Vec<(TrafficSource, f64)> {
        let total: u64 = self.traffic_by_source.values().sum();
        if total == 0 {
            return Vec::new();
        }
        let mut shares: Vec<(TrafficSource, f64)> = self
            .traffic_by_source
            .iter()
            .map(|(source, views)| (*source, *views as f64 / total as f64))
            .collect();
        shares.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        shares
    }
}

/// Read-only query interface over the persistent metric store. The
/// store's schema and ingestion pipeline are external collaborators.
#[async_trait]
pub trait MetricsAggregator: Send + Sync {
    /// Per-page aggregates over the window
    async fn aggregate_by_page(&self, window: MetricsWindow) -> EngineResult<Vec<PageMetrics>>;

    /// Sitewide aggregates over the window
    async fn aggregate_sitewide(&self, window: MetricsWindow) -> EngineResult<SiteMetrics>;
}
