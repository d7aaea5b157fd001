//! Dedup/Merge Engine.
//!
//! Collapses a cross-category pool of [`WeightedTrend`]s into one entry per
//! real-world topic and sums the scores of each group.
//!
//! Two paths:
//! * collaborator-assisted grouping for pools larger than [`SMALL_POOL`];
//! * a deterministic fallback keyed by [`topic_key`].
//!
//! Score mass is conserved by the fallback. The assisted path conserves it too,
//! except for groups dropped because their representative index is invalid or
//! already claimed: those groups and their members are discarded.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;

use metrics::counter;
use serde_json::Value;

use crate::analyze::ai_adapter::{ask, cache_key, DynTextGenerator};
use crate::analyze::response::{
    checked_index, extract_json_array, field_i64, field_indices, field_str,
};
use crate::error::{ParseError, StepError};
use crate::model::{MergeGroup, TrendItem, WeightedTrend};
use crate::normalize::topic_key;

/// Pools of this size or smaller skip the collaborator.
pub const SMALL_POOL: usize = 5;

pub struct MergeEngine {
    llm: DynTextGenerator,
    timeout: Duration,
}

impl MergeEngine {
    pub fn new(llm: DynTextGenerator, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    pub async fn merge(&self, pool: Vec<WeightedTrend>) -> Vec<WeightedTrend> {
        if pool.len() <= SMALL_POOL || !self.llm.is_available() {
            return merge_fallback(pool);
        }
        match self.merge_with_llm(&pool).await {
            Ok(merged) => merged,
            Err(e) => {
                tracing::warn!(target: "merge", error = %e, pool = pool.len(), "assisted merge failed, using key merge");
                counter!("trends_llm_fallback_total", "step" => "merge").increment(1);
                merge_fallback(pool)
            }
        }
    }

    async fn merge_with_llm(&self, pool: &[WeightedTrend]) -> Result<Vec<WeightedTrend>, StepError> {
        let raw = ask(self.llm.as_ref(), &merge_prompt(pool), self.timeout).await?;
        tracing::debug!(target: "merge", len = raw.len(), hash = %cache_key(&raw), "collaborator response");

        let entries = extract_json_array(&raw)?;
        let plan = plan_groups(&entries, pool.len());
        if plan.groups.is_empty() {
            return Err(ParseError::Empty.into());
        }
        if plan.dropped > 0 {
            tracing::warn!(target: "merge", dropped = plan.dropped, "merge groups dropped (invalid representative)");
            counter!("trends_merge_dropped_groups_total").increment(plan.dropped as u64);
        }
        Ok(apply_groups(pool, &plan))
    }
}

fn merge_prompt(pool: &[WeightedTrend]) -> String {
    let mut list = String::new();
    for (i, t) in pool.iter().enumerate() {
        let _ = writeln!(
            list,
            "{i}. [{}] {} (score: {:.1})",
            t.original_category, t.item.title, t.score
        );
    }
    format!(
        "Group the trend entries below that refer to the same topic \
         (same person, event or phenomenon). Keep different topics in separate groups.\n\
         For each group give the member numbers, the number of the most representative \
         entry, and optionally a merged title.\n\n{list}\n\
         Respond with a JSON array only:\n\
         [{{\"indices\": [0, 3], \"representativeIndex\": 0, \"mergedTitle\": \"...\"}}, \
         {{\"indices\": [1], \"representativeIndex\": 1, \"mergedTitle\": null}}]"
    )
}

/// Accepted groups plus which pool entries they (or dropped groups) consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupPlan {
    pub groups: Vec<MergeGroup>,
    pub consumed: Vec<bool>,
    pub dropped: usize,
}

/// Read collaborator groups against a pool of `len` entries.
///
/// First claim wins: an index already taken by an earlier group is ignored as
/// a member, and a group whose representative is invalid or already taken is
/// dropped together with its remaining members.
pub fn plan_groups(entries: &[Value], len: usize) -> GroupPlan {
    let mut consumed = vec![false; len];
    let mut groups = Vec::new();
    let mut dropped = 0usize;

    for e in entries {
        let listed: Vec<usize> = field_indices(e, "indices")
            .into_iter()
            .filter_map(|i| checked_index(Some(i), len))
            .collect();

        let rep = match checked_index(field_i64(e, "representativeIndex"), len) {
            Some(r) if !consumed[r] => r,
            _ => {
                dropped += 1;
                for m in listed {
                    consumed[m] = true;
                }
                continue;
            }
        };

        consumed[rep] = true;
        let mut members = vec![rep];
        for m in listed {
            if !consumed[m] {
                consumed[m] = true;
                members.push(m);
            }
        }
        groups.push(MergeGroup {
            members,
            representative: rep,
            title_override: field_str(e, "mergedTitle"),
        });
    }

    GroupPlan {
        groups,
        consumed,
        dropped,
    }
}

/// Materialize a plan: one entry per group (representative's fields, summed
/// score, optional title override), then every unclaimed entry in pool order.
pub fn apply_groups(pool: &[WeightedTrend], plan: &GroupPlan) -> Vec<WeightedTrend> {
    let mut out = Vec::with_capacity(pool.len());
    for g in &plan.groups {
        let mut merged = pool[g.representative].clone();
        merged.score = g.members.iter().map(|&m| pool[m].score).sum();
        if let Some(title) = &g.title_override {
            merged.item.title = title.clone();
        }
        out.push(merged);
    }
    for (i, t) in pool.iter().enumerate() {
        if !plan.consumed.get(i).copied().unwrap_or(false) {
            out.push(t.clone());
        }
    }
    out
}

/// Deterministic merge by normalized title prefix.
///
/// Scores always accumulate. Provenance (title, summary, url, source, metadata,
/// category) comes from the entry with the strictly lowest `rank`; on equal
/// rank the first-seen entry keeps it. The thumbnail falls back to the
/// previous holder's when the winner has none. Output keeps first-seen key order.
pub fn merge_fallback(pool: Vec<WeightedTrend>) -> Vec<WeightedTrend> {
    let mut out: Vec<WeightedTrend> = Vec::with_capacity(pool.len());
    let mut slot: HashMap<String, usize> = HashMap::new();

    for wt in pool {
        let key = topic_key(&wt.item.title);
        match slot.get(&key) {
            Some(&i) => {
                let existing = &mut out[i];
                let score = existing.score + wt.score;
                if wt.item.rank < existing.item.rank {
                    let thumbnail = wt
                        .item
                        .thumbnail
                        .clone()
                        .or_else(|| existing.item.thumbnail.take());
                    *existing = WeightedTrend {
                        item: TrendItem {
                            thumbnail,
                            ..wt.item
                        },
                        score,
                        original_category: wt.original_category,
                    };
                } else {
                    existing.score = score;
                }
            }
            None => {
                slot.insert(key, out.len());
                out.push(wt);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use serde_json::json;

    fn wt(title: &str, cat: Category, rank: u32, score: f64) -> WeightedTrend {
        WeightedTrend::new(TrendItem::new(cat, rank, title, cat.label()), score)
    }

    #[test]
    fn fallback_prefers_lower_rank_provenance() {
        let mut later = wt("Snow Storm", Category::Social, 1, 4.5);
        later.item.source_url = Some("https://social/1".into());
        let pool = vec![
            wt("snow storm!", Category::Keyword, 3, 3.0),
            later,
        ];
        let out = merge_fallback(pool);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].score, 7.5);
        assert_eq!(out[0].item.title, "Snow Storm");
        assert_eq!(out[0].original_category, Category::Social);
        assert_eq!(out[0].item.source_url.as_deref(), Some("https://social/1"));
    }

    #[test]
    fn fallback_keeps_thumbnail_when_winner_has_none() {
        let mut first = wt("Topic", Category::Content, 2, 2.8);
        first.item.thumbnail = Some("thumb.jpg".into());
        let out = merge_fallback(vec![first, wt("topic", Category::Keyword, 1, 5.0)]);
        assert_eq!(out[0].item.category, Category::Keyword);
        assert_eq!(out[0].item.thumbnail.as_deref(), Some("thumb.jpg"));
    }

    #[test]
    fn plan_ignores_reclaimed_members_and_drops_bad_groups() {
        let entries = vec![
            json!({"indices": [0, 2], "representativeIndex": 0, "mergedTitle": "Merged"}),
            json!({"indices": [2, 3], "representativeIndex": 3}),
            json!({"indices": [4], "representativeIndex": 9}),
            json!({"indices": [1], "representativeIndex": 0}),
        ];
        let plan = plan_groups(&entries, 6);
        assert_eq!(plan.groups.len(), 2);
        assert_eq!(plan.groups[0].members, vec![0, 2]);
        assert_eq!(plan.groups[0].title_override.as_deref(), Some("Merged"));
        assert_eq!(plan.groups[1].members, vec![3]);
        assert_eq!(plan.dropped, 2);
        // 4 and 1 were members of dropped groups; 5 was never mentioned.
        assert_eq!(plan.consumed, vec![true, true, true, true, true, false]);
    }

    #[test]
    fn representative_counts_even_if_not_listed() {
        let pool: Vec<_> = (0..3)
            .map(|i| wt(&format!("t{i}"), Category::Keyword, i + 1, 1.0))
            .collect();
        let plan = plan_groups(&[json!({"indices": [1], "representativeIndex": 0})], 3);
        let out = apply_groups(&pool, &plan);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].score, 2.0);
        assert_eq!(out[1].item.title, "t2");
    }
}
