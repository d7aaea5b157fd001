//! Ranking Aggregator: weight → merge → sort → top-N.

use crate::analyze::merge::MergeEngine;
use crate::model::{Category, TrendItem, WeightedTrend};

/// One more than the deepest rank expected within a category board.
pub const BASE_RANK_SPAN: f64 = 6.0;
pub const DEFAULT_TOP_N: usize = 5;

// Direct search intent weighs most, passive consumption least.
pub const WEIGHT_KEYWORD: f64 = 1.0;
pub const WEIGHT_SOCIAL: f64 = 0.9;
pub const WEIGHT_RISING: f64 = 0.8;
pub const WEIGHT_CONTENT: f64 = 0.7;
pub const WEIGHT_SHOPPING: f64 = 0.6;

pub fn category_weight(category: Category) -> f64 {
    match category {
        Category::Keyword => WEIGHT_KEYWORD,
        Category::Social => WEIGHT_SOCIAL,
        Category::Content => WEIGHT_CONTENT,
        Category::Shopping => WEIGHT_SHOPPING,
        Category::Rising => WEIGHT_RISING,
    }
}

/// `(BASE_RANK_SPAN - rank) * weight`. Ranks beyond the span go negative.
pub fn weighted_score(item: &TrendItem) -> f64 {
    (BASE_RANK_SPAN - item.rank as f64) * category_weight(item.category)
}

/// Pool every board's items in the given order.
pub fn pool_items(boards: &[Vec<TrendItem>]) -> Vec<WeightedTrend> {
    boards
        .iter()
        .flatten()
        .map(|it| WeightedTrend::new(it.clone(), weighted_score(it)))
        .collect()
}

/// Stable descending sort by score, cut to `top_n`, ranks reassigned 1..N.
pub fn finalize(mut merged: Vec<WeightedTrend>, top_n: usize) -> Vec<WeightedTrend> {
    merged.sort_by(|a, b| b.score.total_cmp(&a.score));
    merged.truncate(top_n);
    for (i, wt) in merged.iter_mut().enumerate() {
        wt.item.rank = (i + 1) as u32;
    }
    merged
}

pub struct RankingAggregator {
    merge: MergeEngine,
    top_n: usize,
}

impl RankingAggregator {
    pub fn new(merge: MergeEngine, top_n: usize) -> Self {
        Self {
            merge,
            top_n: top_n.max(1),
        }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Overall top-N. An empty pool yields an empty result.
    pub async fn rank(&self, boards: &[Vec<TrendItem>]) -> Vec<WeightedTrend> {
        let pool = pool_items(boards);
        if pool.is_empty() {
            return Vec::new();
        }
        let pooled = pool.len();
        let merged = self.merge.merge(pool).await;
        tracing::debug!(target: "ranking", pooled, merged = merged.len(), "pool merged");
        finalize(merged, self.top_n)
    }
}
