// src/services/core/opportunities/affiliate_detector.rs

use crate::services::core::infrastructure::metrics_aggregator::{
    MetricsAggregator, MetricsWindow, PageMetrics, PageType,
};
use crate::services::core::infrastructure::opportunity_store::OpportunityStore;
use crate::services::core::learning::learning_engine::LearningEngine;
use crate::services::core::opportunities::opportunity_core::{
    buyer_intent_score, dedup_by_confidence, persist_candidates, priority_from_impact,
    DetectorOutcome, FunnelModel, SubAnalysisResult,
};
use crate::types::{ActionParameters, ActionType, OpportunityCandidate, OpportunityType, PlacementType};
use crate::utils::logger::{LogLevel, Logger};
use crate::utils::{EngineError, EngineResult};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Thresholds for the affiliate monetization analyses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateDetectorConfig {
    pub analysis_window_days: u32,
    /// Sub-analysis 1: high traffic, low affiliate engagement
    pub high_traffic_min_pageviews: u64,
    pub high_traffic_max_clicks: u64,
    /// Sub-analysis 2: buyer-intent content
    pub min_intent_keywords: usize,
    pub intent_max_click_rate: f64,
    /// Sub-analysis 3: traffic-source mismatch
    pub mismatch_share_threshold: f64,
    pub mismatch_confidence: f64,
    /// Sub-analysis 4: unmonetized listing pages
    pub listing_min_pageviews: u64,
    pub listing_max_click_rate: f64,
    pub listing_confidence: f64,
    pub funnel: FunnelModel,
    /// Programs suggested in add-affiliate-link payloads
    pub target_programs: Vec<String>,
}

impl Default for AffiliateDetectorConfig {
    fn default() -> Self {
        Self {
            analysis_window_days: 30,
            high_traffic_min_pageviews: 100,
            high_traffic_max_clicks: 5,
            min_intent_keywords: 2,
            intent_max_click_rate: 0.05,
            mismatch_share_threshold: 0.4,
            mismatch_confidence: 0.7,
            listing_min_pageviews: 200,
            listing_max_click_rate: 0.02,
            listing_confidence: 0.65,
            funnel: FunnelModel::default(),
            target_programs: vec!["amazon".to_string(), "shareasale".to_string()],
        }
    }
}

type AnalysisFuture<'a> =
    Pin<Box<dyn Future<Output = (&'static str, EngineResult<SubAnalysisResult>)> + Send + 'a>>;

/// Surfaces pages that are good candidates for adding or improving
/// affiliate monetization. Stateless between scans; all state lives in
/// the collaborators.
pub struct AffiliateDetector {
    config: AffiliateDetectorConfig,
    metrics: Arc<dyn MetricsAggregator>,
    learning: Arc<LearningEngine>,
    store: Arc<dyn OpportunityStore>,
    logger: Logger,
}

impl AffiliateDetector {
    pub fn new(
        config: AffiliateDetectorConfig,
        metrics: Arc<dyn MetricsAggregator>,
        learning: Arc<LearningEngine>,
        store: Arc<dyn OpportunityStore>,
    ) -> Self {
        Self {
            config,
            metrics,
            learning,
            store,
            logger: Logger::new(LogLevel::Info),
        }
    }

    pub fn config(&self) -> &AffiliateDetectorConfig {
        &self.config
    }

    /// One full detection pass: run the four sub-analyses in parallel,
    /// merge, dedup by highest confidence, and upsert once per page.
    pub async fn run_scan(&self) -> EngineResult<DetectorOutcome> {
        let window = MetricsWindow::trailing_days(self.config.analysis_window_days);

        let analyses: Vec<AnalysisFuture<'_>> = vec![
            Box::pin(async move {
                (
                    "high_traffic_low_affiliate",
                    self.find_high_traffic_low_affiliate(window).await,
                )
            }),
            Box::pin(async move {
                ("buyer_intent", self.find_buyer_intent_pages(window).await)
            }),
            Box::pin(async move {
                (
                    "traffic_source_mismatch",
                    self.find_traffic_source_mismatch(window).await,
                )
            }),
            Box::pin(async move {
                (
                    "unmonetized_listings",
                    self.find_unmonetized_listing_pages(window).await,
                )
            }),
        ];

        let mut merged = Vec::new();
        let mut pages_examined = 0u64;
        for (name, result) in join_all(analyses).await {
            let sub = result.map_err(|err| {
                EngineError::processing_error(format!(
                    "affiliate sub-analysis {} failed: {}",
                    name, err
                ))
            })?;
            self.logger.debug_with_meta(
                "affiliate sub-analysis finished",
                Some(&serde_json::json!({
                    "analysis": name,
                    "pages_examined": sub.pages_examined,
                    "candidates": sub.candidates.len(),
                })),
            );
            pages_examined = pages_examined.max(sub.pages_examined);
            merged.extend(sub.candidates);
        }

        // Additive remediations: the most confident signal per page wins
        let deduped = dedup_by_confidence(merged);
        let opportunities_found = persist_candidates(&self.store, deduped).await?;

        self.logger.info_with_meta(
            "affiliate scan complete",
            Some(&serde_json::json!({
                "pages_examined": pages_examined,
                "opportunities_found": opportunities_found,
            })),
        );
        Ok(DetectorOutcome {
            items_processed: pages_examined,
            opportunities_found,
        })
    }

    /// Pages with substantial traffic and almost no affiliate engagement
    async fn find_high_traffic_low_affiliate(
        &self,
        window: MetricsWindow,
    ) -> EngineResult<SubAnalysisResult> {
        let pages = self.metrics.aggregate_by_page(window).await?;
        let examined = pages.len() as u64;
        let mut candidates = Vec::new();

        for page in pages {
            if page.pageviews < self.config.high_traffic_min_pageviews
                || page.affiliate_clicks >= self.config.high_traffic_max_clicks
            {
                continue;
            }

            let confidence = (0.5 + 0.1 * page.pageviews as f64 / 1000.0).min(0.9);
            let priority = ((page.pageviews + 99) / 100).min(10) as u8;
            let estimate = self
                .adjusted_funnel_estimate(ActionType::AddAffiliateLink, page.pageviews)
                .await;

            candidates.push(OpportunityCandidate {
                opportunity_type: OpportunityType::AffiliatePlacement,
                page_url: page.page_url.clone(),
                content_id: page.content_id.clone(),
                title: format!("Add affiliate links to \"{}\"", page.title),
                description: format!(
                    "{} pageviews but only {} affiliate clicks in the last {} days",
                    page.pageviews, page.affiliate_clicks, self.config.analysis_window_days
                ),
                confidence,
                estimated_monthly_impact: estimate,
                priority,
                suggested_action: self.add_affiliate_link_action(),
            });
        }
        Ok(SubAnalysisResult::new(examined, candidates))
    }

    /// Content with buyer-intent language and a weak affiliate
    /// click-through rate
    async fn find_buyer_intent_pages(
        &self,
        window: MetricsWindow,
    ) -> EngineResult<SubAnalysisResult> {
        let pages = self.metrics.aggregate_by_page(window).await?;
        let examined = pages.len() as u64;
        let mut candidates = Vec::new();

        for page in pages {
            let text = format!("{} {}", page.title, page.description);
            let intent_score = buyer_intent_score(&text);
            if intent_score < self.config.min_intent_keywords
                || page.affiliate_click_rate() >= self.config.intent_max_click_rate
            {
                continue;
            }

            let confidence = (0.4 + 0.1 * intent_score as f64).min(0.85);
            let priority = (3 + intent_score).min(8) as u8;
            let estimate = self
                .adjusted_funnel_estimate(ActionType::AddAffiliateLink, page.pageviews)
                .await;

            candidates.push(OpportunityCandidate {
                opportunity_type: OpportunityType::AffiliatePlacement,
                page_url: page.page_url.clone(),
                content_id: page.content_id.clone(),
                title: format!("Monetize buyer-intent content \"{}\"", page.title),
                description: format!(
                    "{} buyer-intent keywords with an affiliate click rate of {:.1}%",
                    intent_score,
                    page.affiliate_click_rate() * 100.0
                ),
                confidence,
                estimated_monthly_impact: estimate,
                priority,
                suggested_action: self.add_affiliate_link_action(),
            });
        }
        Ok(SubAnalysisResult::new(examined, candidates))
    }

    /// Pages dominated by a single visually-driven inbound channel
    async fn find_traffic_source_mismatch(
        &self,
        window: MetricsWindow,
    ) -> EngineResult<SubAnalysisResult> {
        let pages = self.metrics.aggregate_by_page(window).await?;
        let examined = pages.len() as u64;
        let mut candidates = Vec::new();

        for page in pages {
            let Some((source, share)) = page.dominant_source() else {
                continue;
            };
            if !source.is_visual() || share <= self.config.mismatch_share_threshold {
                continue;
            }

            let estimate = self
                .adjusted_funnel_estimate(ActionType::RunAbTest, page.pageviews)
                .await;

            candidates.push(OpportunityCandidate {
                opportunity_type: OpportunityType::TrafficSourceOptimization,
                page_url: page.page_url.clone(),
                content_id: page.content_id.clone(),
                title: format!("Tune \"{}\" for {} traffic", page.title, source.as_str()),
                description: format!(
                    "{} delivers {:.0}% of pageviews; layout is not channel-specific",
                    source.as_str(),
                    share * 100.0
                ),
                confidence: self.config.mismatch_confidence,
                estimated_monthly_impact: estimate,
                priority: priority_from_impact(estimate),
                suggested_action: ActionParameters::RunAbTest {
                    hypothesis: format!(
                        "A visual-first layout converts {} referrals better",
                        source.as_str()
                    ),
                    dominant_source: source.as_str().to_string(),
                    traffic_share: share,
                },
            });
        }
        Ok(SubAnalysisResult::new(examined, candidates))
    }

    /// Category/search listing pages with traffic and no affiliate
    /// monetization
    async fn find_unmonetized_listing_pages(
        &self,
        window: MetricsWindow,
    ) -> EngineResult<SubAnalysisResult> {
        let pages = self.metrics.aggregate_by_page(window).await?;
        let examined = pages.len() as u64;
        let mut candidates = Vec::new();

        for page in pages {
            if !matches!(page.page_type, PageType::Category | PageType::Search)
                || page.pageviews < self.config.listing_min_pageviews
                || page.affiliate_click_rate() >= self.config.listing_max_click_rate
            {
                continue;
            }

            let estimate = self
                .adjusted_funnel_estimate(ActionType::CreateCollection, page.pageviews)
                .await;

            candidates.push(OpportunityCandidate {
                opportunity_type: OpportunityType::AffiliatePlacement,
                page_url: page.page_url.clone(),
                content_id: page.content_id.clone(),
                title: format!("Curate a shoppable collection for \"{}\"", page.title),
                description: format!(
                    "Listing page with {} pageviews and {:.1}% affiliate click rate",
                    page.pageviews,
                    page.affiliate_click_rate() * 100.0
                ),
                confidence: self.config.listing_confidence,
                estimated_monthly_impact: estimate,
                priority: priority_from_impact(estimate),
                suggested_action: ActionParameters::CreateCollection {
                    source_page_type: page_type_name(&page).to_string(),
                    min_items: 10,
                },
            });
        }
        Ok(SubAnalysisResult::new(examined, candidates))
    }

    /// Funnel-model base estimate adjusted by the learning engine for the
    /// given action category
    async fn adjusted_funnel_estimate(&self, action_type: ActionType, pageviews: u64) -> f64 {
        let base = self.config.funnel.monthly_revenue(pageviews);
        self.learning
            .adjust_estimate(action_type, base)
            .await
            .adjusted_estimate
    }

    fn add_affiliate_link_action(&self) -> ActionParameters {
        ActionParameters::AddAffiliateLink {
            target_programs: self.config.target_programs.clone(),
            placement_type: PlacementType::Inline,
        }
    }
}

fn page_type_name(page: &PageMetrics) -> &'static str {
    match page.page_type {
        PageType::Content => "content",
        PageType::Category => "category",
        PageType::Search => "search",
    }
}
