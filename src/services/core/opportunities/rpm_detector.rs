// src/services/core/opportunities/rpm_detector.rs

use crate::services::core::infrastructure::metrics_aggregator::{
    MetricsAggregator, MetricsWindow, PageType, TrafficSource,
};
use crate::services::core::infrastructure::opportunity_store::OpportunityStore;
use crate::services::core::learning::learning_engine::LearningEngine;
use crate::services::core::opportunities::opportunity_core::{
    dedup_by_impact, persist_candidates, priority_from_impact, DetectorOutcome, SubAnalysisResult,
    SITEWIDE_PAGE_URL,
};
use crate::types::{ActionParameters, ActionType, OpportunityCandidate, OpportunityType};
use crate::utils::formatter::format_currency;
use crate::utils::logger::{LogLevel, Logger};
use crate::utils::{EngineError, EngineResult};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Thresholds for the ad-efficiency analyses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpmDetectorConfig {
    pub analysis_window_days: u32,
    /// Sub-analysis 1: pages below a fraction of the site average RPM
    pub rpm_min_pageviews: u64,
    pub rpm_ratio_threshold: f64,
    pub rpm_max_flagged_pages: usize,
    pub rpm_max_confidence: f64,
    /// Sub-analysis 2: high-bounce pages
    pub bounce_min_pageviews: u64,
    pub bounce_rate_threshold: f64,
    pub bounce_recoverable_fraction: f64,
    pub bounce_confidence: f64,
    /// Sub-analysis 3: thin content
    pub thin_min_pageviews: u64,
    pub thin_max_time_on_page_secs: f64,
    pub thin_recoverable_fraction: f64,
    pub thin_confidence: f64,
    /// Sub-analysis 4: sitewide channel skew
    pub visual_share_threshold: f64,
    pub search_share_threshold: f64,
    pub skew_estimate_fraction: f64,
    pub skew_confidence: f64,
    pub expand_target_word_count: u32,
}

impl Default for RpmDetectorConfig {
    fn default() -> Self {
        Self {
            analysis_window_days: 30,
            rpm_min_pageviews: 100,
            rpm_ratio_threshold: 0.7,
            rpm_max_flagged_pages: 20,
            rpm_max_confidence: 0.85,
            bounce_min_pageviews: 100,
            bounce_rate_threshold: 0.7,
            bounce_recoverable_fraction: 0.2,
            bounce_confidence: 0.6,
            thin_min_pageviews: 50,
            thin_max_time_on_page_secs: 30.0,
            thin_recoverable_fraction: 0.3,
            thin_confidence: 0.55,
            visual_share_threshold: 0.3,
            search_share_threshold: 0.5,
            skew_estimate_fraction: 0.05,
            skew_confidence: 0.6,
            expand_target_word_count: 1500,
        }
    }
}

type AnalysisFuture<'a> =
    Pin<Box<dyn Future<Output = (&'static str, EngineResult<SubAnalysisResult>)> + Send + 'a>>;

/// Surfaces pages whose ad-revenue efficiency is abnormally low
/// relative to the rest of the site, independent of affiliate concerns.
pub struct RpmDetector {
    config: RpmDetectorConfig,
    metrics: Arc<dyn MetricsAggregator>,
    learning: Arc<LearningEngine>,
    store: Arc<dyn OpportunityStore>,
    logger: Logger,
}

impl RpmDetector {
    pub fn new(
        config: RpmDetectorConfig,
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

    pub fn config(&self) -> &RpmDetectorConfig {
        &self.config
    }

    /// One full detection pass. RPM remediations are exclusive paths
    /// competing for the same ad real-estate, so the merge keeps the
    /// highest estimated impact per page, not the highest confidence.
    pub async fn run_scan(&self) -> EngineResult<DetectorOutcome> {
        let window = MetricsWindow::trailing_days(self.config.analysis_window_days);

        let analyses: Vec<AnalysisFuture<'_>> = vec![
            Box::pin(async move {
                (
                    "underperforming_rpm",
                    self.find_underperforming_rpm(window).await,
                )
            }),
            Box::pin(async move { ("high_bounce", self.find_high_bounce_pages(window).await) }),
            Box::pin(async move { ("thin_content", self.find_thin_content_pages(window).await) }),
            Box::pin(async move {
                (
                    "traffic_source_skew",
                    self.find_traffic_source_skew(window).await,
                )
            }),
        ];

        let mut merged = Vec::new();
        let mut pages_examined = 0u64;
        for (name, result) in join_all(analyses).await {
            let sub = result.map_err(|err| {
                EngineError::processing_error(format!("rpm sub-analysis {} failed: {}", name, err))
            })?;
            self.logger.debug_with_meta(
                "rpm sub-analysis finished",
                Some(&serde_json::json!({
                    "analysis": name,
                    "pages_examined": sub.pages_examined,
                    "candidates": sub.candidates.len(),
                })),
            );
            pages_examined = pages_examined.max(sub.pages_examined);
            merged.extend(sub.candidates);
        }

        let deduped = dedup_by_impact(merged);
        let opportunities_found = persist_candidates(&self.store, deduped).await?;

        self.logger.info_with_meta(
            "rpm analysis complete",
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

    /// Pages whose RPM sits below `rpm_ratio_threshold` of the site
    /// average, ranked by recoverable revenue, top N
    async fn find_underperforming_rpm(
        &self,
        window: MetricsWindow,
    ) -> EngineResult<SubAnalysisResult> {
        let site = self.metrics.aggregate_sitewide(window).await?;
        let pages = self.metrics.aggregate_by_page(window).await?;
        let examined = pages.len() as u64;

        let site_rpm = site.site_rpm();
        if site_rpm <= 0.0 {
            return Ok(SubAnalysisResult::new(examined, Vec::new()));
        }

        let mut flagged: Vec<_> = pages
            .into_iter()
            .filter(|page| {
                page.pageviews >= self.config.rpm_min_pageviews
                    && page.rpm() < site_rpm * self.config.rpm_ratio_threshold
            })
            .collect();
        flagged.sort_by(|a, b| {
            let weight_a = a.pageviews as f64 * (site_rpm - a.rpm());
            let weight_b = b.pageviews as f64 * (site_rpm - b.rpm());
            weight_b
                .partial_cmp(&weight_a)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        flagged.truncate(self.config.rpm_max_flagged_pages);

        let mut candidates = Vec::new();
        for page in flagged {
            let page_rpm = page.rpm();
            let gap = (site_rpm - page_rpm).max(0.0);
            let base = page.pageviews as f64 * gap / 1000.0;
            let adjustment = self
                .learning
                .adjust_estimate(ActionType::UpdateAdPlacement, base)
                .await;
            // Confidence scales with how far below the site average the
            // page sits
            let confidence = (0.5 + 0.3 * gap / site_rpm).min(self.config.rpm_max_confidence);

            candidates.push(OpportunityCandidate {
                opportunity_type: OpportunityType::AdLayoutOptimization,
                page_url: page.page_url.clone(),
                content_id: page.content_id.clone(),
                title: format!("Fix ad layout on \"{}\"", page.title),
                description: format!(
                    "Page RPM {} vs site average {} over {} pageviews",
                    format_currency(page_rpm),
                    format_currency(site_rpm),
                    page.pageviews
                ),
                confidence,
                estimated_monthly_impact: adjustment.adjusted_estimate,
                priority: priority_from_impact(adjustment.adjusted_estimate),
                suggested_action: ActionParameters::UpdateAdPlacement {
                    current_rpm: page_rpm,
                    target_rpm: site_rpm,
                },
            });
        }
        Ok(SubAnalysisResult::new(examined, candidates))
    }

    /// Pages losing most visitors immediately; a fraction of their
    /// revenue is assumed recoverable
    async fn find_high_bounce_pages(
        &self,
        window: MetricsWindow,
    ) -> EngineResult<SubAnalysisResult> {
        let pages = self.metrics.aggregate_by_page(window).await?;
        let examined = pages.len() as u64;
        let mut candidates = Vec::new();

        for page in pages {
            if page.pageviews < self.config.bounce_min_pageviews
                || page.bounce_rate <= self.config.bounce_rate_threshold
            {
                continue;
            }

            let base = self.config.bounce_recoverable_fraction * page.ad_revenue;
            let adjustment = self
                .learning
                .adjust_estimate(ActionType::ExpandContent, base)
                .await;

            candidates.push(OpportunityCandidate {
                opportunity_type: OpportunityType::ContentExpansion,
                page_url: page.page_url.clone(),
                content_id: page.content_id.clone(),
                title: format!("Reduce bounce rate on \"{}\"", page.title),
                description: format!(
                    "{:.0}% bounce rate across {} pageviews",
                    page.bounce_rate * 100.0,
                    page.pageviews
                ),
                confidence: self.config.bounce_confidence,
                estimated_monthly_impact: adjustment.adjusted_estimate,
                priority: priority_from_impact(adjustment.adjusted_estimate),
                suggested_action: ActionParameters::ExpandContent {
                    current_avg_time_on_page_secs: page.avg_time_on_page_secs,
                    target_word_count: self.config.expand_target_word_count,
                },
            });
        }
        Ok(SubAnalysisResult::new(examined, candidates))
    }

    /// Content pages visitors abandon within seconds
    async fn find_thin_content_pages(
        &self,
        window: MetricsWindow,
    ) -> EngineResult<SubAnalysisResult> {
        let pages = self.metrics.aggregate_by_page(window).await?;
        let examined = pages.len() as u64;
        let mut candidates = Vec::new();

        for page in pages {
            if page.page_type != PageType::Content
                || page.pageviews < self.config.thin_min_pageviews
                || page.avg_time_on_page_secs >= self.config.thin_max_time_on_page_secs
            {
                continue;
            }

            let base = self.config.thin_recoverable_fraction * page.ad_revenue;
            let adjustment = self
                .learning
                .adjust_estimate(ActionType::ExpandContent, base)
                .await;

            candidates.push(OpportunityCandidate {
                opportunity_type: OpportunityType::ContentExpansion,
                page_url: page.page_url.clone(),
                content_id: page.content_id.clone(),
                title: format!("Deepen thin content \"{}\"", page.title),
                description: format!(
                    "Average time on page {:.0}s across {} pageviews",
                    page.avg_time_on_page_secs, page.pageviews
                ),
                confidence: self.config.thin_confidence,
                estimated_monthly_impact: adjustment.adjusted_estimate,
                priority: priority_from_impact(adjustment.adjusted_estimate),
                suggested_action: ActionParameters::ExpandContent {
                    current_avg_time_on_page_secs: page.avg_time_on_page_secs,
                    target_word_count: self.config.expand_target_word_count,
                },
            });
        }
        Ok(SubAnalysisResult::new(examined, candidates))
    }

    /// Sitewide channel-mix analysis: one sentinel-keyed opportunity when
    /// a visual channel dominates, or when search overwhelms the mix
    async fn find_traffic_source_skew(
        &self,
        window: MetricsWindow,
    ) -> EngineResult<SubAnalysisResult> {
        let site = self.metrics.aggregate_sitewide(window).await?;
        let shares = site.source_shares();
        let Some(&(top_source, top_share)) = shares.first() else {
            return Ok(SubAnalysisResult::new(1, Vec::new()));
        };

        let mut candidates = Vec::new();
        let base = self.config.skew_estimate_fraction * site.ad_revenue;

        if top_source.is_visual() && top_share > self.config.visual_share_threshold {
            let adjustment = self
                .learning
                .adjust_estimate(ActionType::RunAbTest, base)
                .await;
            candidates.push(self.sitewide_candidate(
                format!("Optimize sitewide layout for {} traffic", top_source.as_str()),
                format!(
                    "{} drives {:.0}% of all pageviews and dominates every other channel",
                    top_source.as_str(),
                    top_share * 100.0
                ),
                adjustment.adjusted_estimate,
                ActionParameters::RunAbTest {
                    hypothesis: "Visual-first templates lift sitewide RPM".to_string(),
                    dominant_source: top_source.as_str().to_string(),
                    traffic_share: top_share,
                },
            ));
        } else {
            let search_share = shares
                .iter()
                .find(|(source, _)| *source == TrafficSource::Search)
                .map(|(_, share)| *share)
                .unwrap_or(0.0);
            if search_share > self.config.search_share_threshold {
                let adjustment = self
                    .learning
                    .adjust_estimate(ActionType::OptimizeSeo, base)
                    .await;
                candidates.push(self.sitewide_candidate(
                    "Diversify beyond search-dominated traffic".to_string(),
                    format!(
                        "Search drives {:.0}% of all pageviews; rankings risk is concentrated",
                        search_share * 100.0
                    ),
                    adjustment.adjusted_estimate,
                    ActionParameters::OptimizeSeo {
                        focus_keywords: Vec::new(),
                    },
                ));
            }
        }

        Ok(SubAnalysisResult::new(1, candidates))
    }

    fn sitewide_candidate(
        &self,
        title: String,
        description: String,
        estimate: f64,
        action: ActionParameters,
    ) -> OpportunityCandidate {
        OpportunityCandidate {
            opportunity_type: OpportunityType::TrafficSourceOptimization,
            page_url: SITEWIDE_PAGE_URL.to_string(),
            content_id: None,
            title,
            description,
            confidence: self.config.skew_confidence,
            estimated_monthly_impact: estimate,
            priority: priority_from_impact(estimate),
            suggested_action: action,
        }
    }
}
