//! Pipeline runs: fetch-and-rank one category, all categories, and the
//! overall board.
//!
//! Every dependency (adapters, collaborator, store) is injected through
//! [`PipelineBuilder`]; the pipeline holds no mutable state between runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use metrics::gauge;
use tokio::time::Instant;
use serde::Serialize;
use serde_json::Value;

use crate::analyze::ai_adapter::DynTextGenerator;
use crate::analyze::meta::FALLBACK_META;
use crate::analyze::{MergeEngine, RankingAggregator, Summarizer, TopicExtractor};
use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::ingest::{collect_candidates, types::DynSourceAdapter};
use crate::model::{Board, Category, TrendItem};
use crate::store::TrendStore;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub category_limit: usize,
    pub candidate_cap: usize,
    pub adapter_timeout: Duration,
    pub llm_timeout: Duration,
    pub run_budget: Duration,
    pub top_n: usize,
    pub overall_read_depth: usize,
    pub enrich_summaries: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            category_limit: 10,
            candidate_cap: 50,
            adapter_timeout: Duration::from_secs(15),
            llm_timeout: Duration::from_secs(20),
            run_budget: Duration::from_secs(60),
            top_n: 5,
            overall_read_depth: 10,
            enrich_summaries: true,
        }
    }
}

impl From<&AppConfig> for PipelineSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            category_limit: cfg.pipeline.category_limit,
            candidate_cap: cfg.pipeline.candidate_cap,
            adapter_timeout: cfg.adapter_timeout(),
            llm_timeout: cfg.llm_timeout(),
            run_budget: cfg.run_budget(),
            top_n: cfg.pipeline.top_n,
            overall_read_depth: cfg.pipeline.overall_read_depth,
            enrich_summaries: cfg.pipeline.enrich_summaries,
        }
    }
}

/// Result of one category run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReport {
    pub category: Category,
    pub candidates: usize,
    pub items: Vec<TrendItem>,
}

/// Result of one overall-ranking pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallReport {
    pub items: Vec<TrendItem>,
    /// Merged score per item, aligned with `items`.
    pub scores: Vec<f64>,
    pub meta_analysis: String,
    /// Items pooled from the category boards before merging.
    pub pooled: usize,
    pub persisted: bool,
}

pub struct PipelineBuilder {
    llm: DynTextGenerator,
    store: Arc<dyn TrendStore>,
    settings: PipelineSettings,
    adapters: HashMap<Category, Vec<DynSourceAdapter>>,
    news_reference: Option<DynSourceAdapter>,
}

impl PipelineBuilder {
    pub fn new(llm: DynTextGenerator, store: Arc<dyn TrendStore>) -> Self {
        Self {
            llm,
            store,
            settings: PipelineSettings::default(),
            adapters: HashMap::new(),
            news_reference: None,
        }
    }

    pub fn settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn adapter(mut self, category: Category, adapter: DynSourceAdapter) -> Self {
        self.adapters.entry(category).or_default().push(adapter);
        self
    }

    /// Headlines source used for the rising board's `isNewToNews` flag.
    pub fn news_reference(mut self, adapter: DynSourceAdapter) -> Self {
        self.news_reference = Some(adapter);
        self
    }

    pub fn build(self) -> Pipeline {
        let s = &self.settings;
        let extractor = TopicExtractor::new(self.llm.clone(), s.llm_timeout)
            .with_candidate_cap(s.candidate_cap);
        let ranking = RankingAggregator::new(
            MergeEngine::new(self.llm.clone(), s.llm_timeout),
            s.top_n,
        );
        let summarizer = Summarizer::new(self.llm.clone(), s.llm_timeout);
        Pipeline {
            adapters: self.adapters,
            news_reference: self.news_reference,
            extractor,
            ranking,
            summarizer,
            store: self.store,
            settings: self.settings,
        }
    }
}

pub struct Pipeline {
    adapters: HashMap<Category, Vec<DynSourceAdapter>>,
    news_reference: Option<DynSourceAdapter>,
    extractor: TopicExtractor,
    ranking: RankingAggregator,
    summarizer: Summarizer,
    store: Arc<dyn TrendStore>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn store(&self) -> Arc<dyn TrendStore> {
        self.store.clone()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    pub fn adapter_count(&self, category: Category) -> usize {
        self.adapters.get(&category).map_or(0, Vec::len)
    }

    /// Collect, extract and enrich one category without persisting.
    ///
    /// Zero candidates from every adapter is reported as
    /// [`PipelineError::NoData`], never replaced by placeholder items.
    /// Collection and extraction must finish within the run budget; enrichment
    /// gets whatever is left of it and is abandoned, not failed, when it runs out.
    pub async fn fetch_category(&self, category: Category) -> Result<CategoryReport, PipelineError> {
        let deadline = Instant::now() + self.settings.run_budget;
        let mut report = match tokio::time::timeout_at(deadline, self.collect_and_extract(category)).await {
            Ok(res) => res?,
            Err(_) => {
                tracing::warn!(target: "pipeline", category = %category, budget_ms = self.settings.run_budget.as_millis() as u64, "run budget exceeded");
                return Err(PipelineError::BudgetExceeded(category));
            }
        };

        if self.settings.enrich_summaries
            && tokio::time::timeout_at(deadline, self.enrich(category, &mut report.items))
                .await
                .is_err()
        {
            tracing::warn!(target: "pipeline", category = %category, "summary enrichment cut off by run budget, keeping items as extracted");
        }
        Ok(report)
    }

    async fn collect_and_extract(&self, category: Category) -> Result<CategoryReport, PipelineError> {
        let adapters = self
            .adapters
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let candidates = collect_candidates(
            category,
            adapters,
            self.settings.candidate_cap,
            self.settings.adapter_timeout,
            self.settings.candidate_cap,
        )
        .await;
        if candidates.is_empty() {
            tracing::warn!(target: "pipeline", category = %category, "no candidates from any adapter");
            return Err(PipelineError::NoData(category));
        }

        let news_titles = if category == Category::Rising {
            self.news_titles().await
        } else {
            Vec::new()
        };

        let items = self
            .extractor
            .extract(category, &candidates, self.settings.category_limit, &news_titles)
            .await;
        if items.is_empty() {
            return Err(PipelineError::NoData(category));
        }

        Ok(CategoryReport {
            category,
            candidates: candidates.len(),
            items,
        })
    }

    /// Fetch-and-rank one category, then replace its board.
    pub async fn run_category(&self, category: Category) -> Result<CategoryReport, PipelineError> {
        let report = self.fetch_category(category).await?;

        let board = Board::Category(category);
        self.store
            .replace(board, &report.items)
            .await
            .map_err(|source| PipelineError::Persistence { board, source })?;

        gauge!("trends_pipeline_last_run_ts", "board" => board.as_str())
            .set(chrono::Utc::now().timestamp() as f64);
        tracing::info!(
            target: "pipeline",
            category = %category,
            candidates = report.candidates,
            items = report.items.len(),
            "category board replaced"
        );
        Ok(report)
    }

    /// Run every category concurrently; one category's failure never affects another.
    pub async fn run_all(&self) -> Vec<(Category, Result<CategoryReport, PipelineError>)> {
        let runs = Category::ALL.iter().map(|&c| async move { (c, self.run_category(c).await) });
        join_all(runs).await
    }

    /// Pool the stored category boards, merge, rank and summarize.
    pub async fn compute_overall(&self) -> OverallReport {
        let mut boards = Vec::with_capacity(Category::ALL.len());
        for c in Category::ALL {
            match self
                .store
                .read_top(Board::Category(c), self.settings.overall_read_depth)
                .await
            {
                Ok(items) => boards.push(items),
                Err(e) => {
                    tracing::warn!(target: "pipeline", category = %c, error = %e, "board read failed, treated as empty");
                    boards.push(Vec::new());
                }
            }
        }
        let pooled = boards.iter().map(Vec::len).sum();

        let ranked = self.ranking.rank(&boards).await;
        let scores: Vec<f64> = ranked.iter().map(|w| w.score).collect();
        let mut items: Vec<TrendItem> = ranked.into_iter().map(|w| w.item).collect();

        let meta_analysis = if items.is_empty() {
            FALLBACK_META.to_string()
        } else {
            self.summarizer.meta_analysis(&items).await
        };
        if let Some(first) = items.first_mut() {
            first
                .metadata
                .insert("metaAnalysis".to_string(), Value::String(meta_analysis.clone()));
        }

        OverallReport {
            items,
            scores,
            meta_analysis,
            pooled,
            persisted: false,
        }
    }

    /// Compute the overall board and replace it. Nothing to rank → nothing written.
    pub async fn run_overall(&self) -> Result<OverallReport, PipelineError> {
        let mut report = self.compute_overall().await;
        if report.items.is_empty() {
            tracing::info!(target: "pipeline", "nothing to rank, overall board left untouched");
            return Ok(report);
        }
        self.store
            .replace(Board::Overall, &report.items)
            .await
            .map_err(|source| PipelineError::Persistence {
                board: Board::Overall,
                source,
            })?;
        report.persisted = true;

        gauge!("trends_pipeline_last_run_ts", "board" => Board::Overall.as_str())
            .set(chrono::Utc::now().timestamp() as f64);
        tracing::info!(target: "pipeline", pooled = report.pooled, items = report.items.len(), "overall board replaced");
        Ok(report)
    }

    async fn news_titles(&self) -> Vec<String> {
        let Some(adapter) = &self.news_reference else {
            return Vec::new();
        };
        match tokio::time::timeout(self.settings.adapter_timeout, adapter.fetch(self.settings.candidate_cap)).await {
            Ok(Ok(v)) => v.into_iter().map(|c| c.title).collect(),
            Ok(Err(e)) => {
                tracing::warn!(target: "pipeline", adapter = %adapter.name(), error = ?e, "news reference failed");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(target: "pipeline", adapter = %adapter.name(), "news reference timed out");
                Vec::new()
            }
        }
    }

    async fn enrich(&self, category: Category, items: &mut [TrendItem]) {
        match category {
            Category::Keyword => {
                self.summarizer
                    .enrich_summaries(items, true, |it| it.source_name.clone())
                    .await
            }
            Category::Social => {
                self.summarizer
                    .enrich_summaries(items, false, |it| {
                        it.metadata
                            .get("description")
                            .and_then(Value::as_str)
                            .filter(|s| !s.is_empty())
                            .unwrap_or(&it.source_name)
                            .to_string()
                    })
                    .await
            }
            Category::Content => {
                self.summarizer
                    .enrich_summaries(items, false, |it| {
                        let channel = it
                            .metadata
                            .get("channelTitle")
                            .and_then(Value::as_str)
                            .unwrap_or("");
                        format!("YouTube: {channel}")
                    })
                    .await
            }
            Category::Shopping | Category::Rising => {}
        }
    }
}
