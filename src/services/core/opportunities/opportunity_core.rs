// src/services/core/opportunities/opportunity_core.rs

use crate::services::core::infrastructure::opportunity_store::OpportunityStore;
use crate::types::OpportunityCandidate;
use crate::utils::EngineResult;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::OnceLock;

/// Sentinel page URL for sitewide opportunities. Parses as a URL and
/// cannot collide with a real page.
pub const SITEWIDE_PAGE_URL: &str = "site://overall";

/// Fixed conversion-funnel model used to turn pageviews into a monthly
/// affiliate revenue estimate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelModel {
    pub click_through_rate: f64,
    pub conversion_rate: f64,
    pub average_order_value: f64,
    pub commission_rate: f64,
}

impl Default for FunnelModel {
    fn default() -> Self {
        Self {
            click_through_rate: 0.03,
            conversion_rate: 0.05,
            average_order_value: 20.0,
            commission_rate: 0.07,
        }
    }
}

impl FunnelModel {
    /// `pageviews x ctr x conversion x order value x commission`
    pub fn monthly_revenue(&self, pageviews: u64) -> f64 {
        pageviews as f64
            * self.click_through_rate
            * self.conversion_rate
            * self.average_order_value
            * self.commission_rate
    }
}

/// Fixed buyer-intent keyword set matched against page title/description
pub const BUYER_INTENT_KEYWORDS: &[&str] = &[
    "premium",
    "exclusive",
    "patreon",
    "collection",
    "membership",
    "unlock",
    "bundle",
    "tier",
    "merch",
    "shop",
];

fn intent_matchers() -> &'static Vec<Regex> {
    static MATCHERS: OnceLock<Vec<Regex>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        BUYER_INTENT_KEYWORDS
            .iter()
            .filter_map(|keyword| Regex::new(&format!(r"(?i)\b{}\b", keyword)).ok())
            .collect()
    })
}

/// Number of distinct buyer-intent keywords present in the text
pub fn buyer_intent_score(text: &str) -> usize {
    intent_matchers()
        .iter()
        .filter(|matcher| matcher.is_match(text))
        .count()
}

/// Map an estimated monthly impact onto the 1..=10 priority scale, for
/// sub-analyses whose priority is not derived from traffic directly
pub fn priority_from_impact(impact: f64) -> u8 {
    match impact {
        i if i >= 500.0 => 10,
        i if i >= 250.0 => 9,
        i if i >= 100.0 => 8,
        i if i >= 50.0 => 7,
        i if i >= 25.0 => 6,
        i if i >= 10.0 => 5,
        i if i >= 5.0 => 4,
        i if i >= 1.0 => 3,
        _ => 2,
    }
}

/// One sub-analysis's output: the pages it examined and the candidates
/// it emitted
#[derive(Debug, Clone, Default)]
pub struct SubAnalysisResult {
    pub pages_examined: u64,
    pub candidates: Vec<OpportunityCandidate>,
}

impl SubAnalysisResult {
    pub fn new(pages_examined: u64, candidates: Vec<OpportunityCandidate>) -> Self {
        Self {
            pages_examined,
            candidates,
        }
    }
}

/// What a detector pass hands back to the orchestrator
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DetectorOutcome {
    pub items_processed: u64,
    pub opportunities_found: u64,
}

/// Keep one candidate per page URL, preferring the higher confidence.
/// Earlier entries win ties, so the merge is deterministic.
pub fn dedup_by_confidence(candidates: Vec<OpportunityCandidate>) -> Vec<OpportunityCandidate> {
    dedup_by_key(candidates, |a, b| a.confidence > b.confidence)
}

/// Keep one candidate per page URL, preferring the higher estimated
/// impact. RPM remediations compete for the same ad real-estate, so the
/// larger opportunity wins.
pub fn dedup_by_impact(candidates: Vec<OpportunityCandidate>) -> Vec<OpportunityCandidate> {
    dedup_by_key(candidates, |a, b| {
        a.estimated_monthly_impact > b.estimated_monthly_impact
    })
}

fn dedup_by_key<F>(candidates: Vec<OpportunityCandidate>, replaces: F) -> Vec<OpportunityCandidate>
where
    F: Fn(&OpportunityCandidate, &OpportunityCandidate) -> bool,
{
    let mut order: Vec<String> = Vec::new();
    let mut by_url: HashMap<String, OpportunityCandidate> = HashMap::new();
    for candidate in candidates {
        let keep = match by_url.get(&candidate.page_url) {
            Some(existing) => replaces(&candidate, existing),
            None => {
                order.push(candidate.page_url.clone());
                true
            }
        };
        if keep {
            by_url.insert(candidate.page_url.clone(), candidate);
        }
    }
    order
        .into_iter()
        .filter_map(|url| by_url.remove(&url))
        .collect()
}

/// Upsert a merged candidate list; returns the number written
pub async fn persist_candidates(
    store: &Arc<dyn OpportunityStore>,
    candidates: Vec<OpportunityCandidate>,
) -> EngineResult<u64> {
    let mut written = 0u64;
    for candidate in candidates {
        store.upsert_opportunity(candidate).await?;
        written += 1;
    }
    log::debug!("persisted {} opportunity candidates", written);
    Ok(written)
}
