//! Topic Extractor / Classifier.
//!
//! Turns one category's raw candidates into a ranked list of [`TrendItem`]s.
//! The collaborator picks and labels topics by candidate index; every item
//! keeps the link, thumbnail and metadata of the candidate it points at, so
//! provenance is never invented. When the collaborator is unavailable or its
//! answer is unusable, the heuristics in [`super::heuristics`] take over.

use std::fmt::Write as _;
use std::time::Duration;

use metrics::counter;
use serde_json::{json, Value};

use crate::analyze::ai_adapter::{ask, cache_key, DynTextGenerator};
use crate::analyze::heuristics::{
    extract_core_topic, extract_product_name, interleave_by_source, marker_hits, marker_score,
    select_top, Scored, RISING_MARKERS, SHOPPING_MARKERS,
};
use crate::analyze::response::{
    extract_json_array, field_f64, field_i64, field_str, resolve_index_or_first,
};
use crate::error::{ParseError, StepError};
use crate::model::{rerank, Category, RawCandidate, TrendItem};
use crate::normalize::{clean_snippet, truncate_chars};

/// Upper bound of candidates shown to the collaborator in one prompt.
pub const DEFAULT_CANDIDATE_CAP: usize = 50;
/// Viral score assigned by the heuristic path before marker bonuses.
pub const FALLBACK_VIRAL_BASE: f64 = 50.0;
const NEWS_PREFIX_CHARS: usize = 10;

pub struct TopicExtractor {
    llm: DynTextGenerator,
    timeout: Duration,
    candidate_cap: usize,
}

impl TopicExtractor {
    pub fn new(llm: DynTextGenerator, timeout: Duration) -> Self {
        Self {
            llm,
            timeout,
            candidate_cap: DEFAULT_CANDIDATE_CAP,
        }
    }

    pub fn with_candidate_cap(mut self, cap: usize) -> Self {
        self.candidate_cap = cap.max(1);
        self
    }

    /// Extract at most `limit` items, ranked 1..N.
    ///
    /// `news_titles` is only consulted for [`Category::Rising`] (`isNewToNews`).
    /// The output is non-empty whenever `candidates` holds at least one titled
    /// item and `limit > 0`.
    pub async fn extract(
        &self,
        category: Category,
        candidates: &[RawCandidate],
        limit: usize,
        news_titles: &[String],
    ) -> Vec<TrendItem> {
        let pool = &candidates[..candidates.len().min(self.candidate_cap)];
        if pool.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut items = if category == Category::Content {
            passthrough(pool, limit)
        } else {
            match self.extract_with_llm(category, pool, limit, news_titles).await {
                Ok(items) => items,
                Err(e) => {
                    if e.is_unavailable() {
                        tracing::debug!(target: "extract", category = %category, "collaborator unavailable, heuristic path");
                    } else {
                        tracing::warn!(target: "extract", category = %category, error = %e, "extraction failed, heuristic path");
                    }
                    counter!("trends_llm_fallback_total", "step" => "extract").increment(1);
                    heuristic_extract(category, pool, limit, news_titles)
                }
            }
        };

        items.truncate(limit);
        rerank(&mut items);
        items
    }

    async fn extract_with_llm(
        &self,
        category: Category,
        pool: &[RawCandidate],
        limit: usize,
        news_titles: &[String],
    ) -> Result<Vec<TrendItem>, StepError> {
        let prompt = build_prompt(category, pool, limit);
        let raw = ask(self.llm.as_ref(), &prompt, self.timeout).await?;
        tracing::debug!(
            target: "extract",
            category = %category,
            len = raw.len(),
            hash = %cache_key(&raw),
            "collaborator response"
        );

        let entries = extract_json_array(&raw)?;
        let items = items_from_entries(category, pool, &entries, news_titles);
        if items.is_empty() {
            return Err(ParseError::Empty.into());
        }
        Ok(items)
    }
}

// ------------------------------------------------------------
// Prompts
// ------------------------------------------------------------

fn numbered(pool: &[RawCandidate]) -> String {
    let mut out = String::new();
    for (i, c) in pool.iter().enumerate() {
        let _ = writeln!(out, "{i}. [{}] {}", c.source_label, c.title);
    }
    out
}

fn build_prompt(category: Category, pool: &[RawCandidate], limit: usize) -> String {
    let list = numbered(pool);
    match category {
        Category::Keyword => format!(
            "Below are current news headlines, numbered.\n\
             Pick the {limit} most significant distinct topics. For each, give a short topic \
             label (2-6 words) and the number of the headline it comes from.\n\
             Respond with a JSON array only:\n\
             [{{\"topic\": \"...\", \"headlineIndex\": 0}}]\n\n{list}"
        ),
        Category::Social => format!(
            "Below are posts trending on social platforms, numbered, with the platform in brackets.\n\
             Pick the {limit} topics people are talking about most, spread across platforms.\n\
             Respond with a JSON array only:\n\
             [{{\"topic\": \"...\", \"itemIndex\": 0, \"platform\": \"...\"}}]\n\n{list}"
        ),
        Category::Shopping => format!(
            "Below are best-selling product listings, numbered, with the store in brackets.\n\
             Pick the {limit} most popular distinct products. Give a concise product name, \
             the listing number, the price if visible (else null) and the store.\n\
             Respond with a JSON array only:\n\
             [{{\"product\": \"...\", \"itemIndex\": 0, \"price\": null, \"store\": \"...\"}}]\n\n{list}"
        ),
        Category::Rising => format!(
            "Below are community posts, numbered.\n\
             Pick the {limit} posts most likely to go viral next. Give each a viral score from \
             0 to 100 and a sentiment type (one of: controversy, touching, funny, shock, interest).\n\
             Respond with a JSON array only:\n\
             [{{\"index\": 0, \"viralScore\": 80, \"sentimentType\": \"interest\"}}]\n\n{list}"
        ),
        // Never prompted: content arrives ranked.
        Category::Content => list,
    }
}

// ------------------------------------------------------------
// Collaborator entries → items
// ------------------------------------------------------------

fn base_item(category: Category, c: &RawCandidate, title: String, source_name: String) -> TrendItem {
    let mut item = TrendItem::new(category, 0, title, source_name)
        .with_source_url(c.link.clone())
        .with_thumbnail(c.thumbnail.clone());
    item.metadata = c.metadata.clone();
    item
}

fn snippet_or_none(c: &RawCandidate, max: usize) -> Option<String> {
    let s = clean_snippet(&c.snippet, max);
    (!s.is_empty()).then_some(s)
}

fn items_from_entries(
    category: Category,
    pool: &[RawCandidate],
    entries: &[Value],
    news_titles: &[String],
) -> Vec<TrendItem> {
    let mut out = Vec::with_capacity(entries.len());
    for e in entries {
        let item = match category {
            Category::Keyword => {
                let c = &pool[resolve_index_or_first(field_i64(e, "headlineIndex"), pool.len())];
                let title = field_str(e, "topic").unwrap_or_else(|| extract_core_topic(&c.title));
                let mut it = base_item(category, c, title, c.source_label.clone())
                    .with_meta("traffic", "trending")
                    .with_meta("relatedQueries", json!([]));
                it.summary = snippet_or_none(c, 100);
                it
            }
            Category::Social => {
                let c = &pool[resolve_index_or_first(field_i64(e, "itemIndex"), pool.len())];
                let title = field_str(e, "topic").unwrap_or_else(|| truncate_chars(&c.title, 50));
                let source = field_str(e, "platform").unwrap_or_else(|| c.source_label.clone());
                let mut it = base_item(category, c, title, source)
                    .with_meta("description", c.snippet.clone());
                it.summary = snippet_or_none(c, 100);
                it
            }
            Category::Shopping => {
                let c = &pool[resolve_index_or_first(field_i64(e, "itemIndex"), pool.len())];
                let title =
                    field_str(e, "product").unwrap_or_else(|| extract_product_name(&c.title));
                let source = field_str(e, "store").unwrap_or_else(|| c.source_label.clone());
                let price = match e.get("price") {
                    Some(Value::String(s)) if !s.trim().is_empty() => json!(s.trim()),
                    Some(Value::Number(n)) => json!(n),
                    _ => Value::Null,
                };
                let mut it = base_item(category, c, title, source).with_meta("price", price);
                it.summary = snippet_or_none(c, 80);
                it
            }
            Category::Rising => {
                let c = &pool[resolve_index_or_first(field_i64(e, "index"), pool.len())];
                let viral = field_f64(e, "viralScore")
                    .unwrap_or(FALLBACK_VIRAL_BASE)
                    .clamp(0.0, 100.0);
                let sentiment =
                    field_str(e, "sentimentType").unwrap_or_else(|| "interest".to_string());
                rising_item(c, viral, sentiment, news_titles)
            }
            Category::Content => continue,
        };
        if !item.title.trim().is_empty() {
            out.push(item);
        }
    }

    if category == Category::Rising {
        sort_by_viral(&mut out);
    }
    out
}

fn rising_item(c: &RawCandidate, viral: f64, sentiment: String, news_titles: &[String]) -> TrendItem {
    let fresh = is_new_to_news(&c.title, news_titles);
    let mut it = base_item(Category::Rising, c, c.title.clone(), c.source_label.clone())
        .with_change_rate(viral)
        .with_meta("viralScore", viral)
        .with_meta("sentimentType", sentiment)
        .with_meta("isNewToNews", fresh);
    it.summary = snippet_or_none(c, 80).or_else(|| Some(truncate_chars(&c.title, 50)));
    it
}

fn sort_by_viral(items: &mut [TrendItem]) {
    items.sort_by(|a, b| {
        b.change_rate
            .unwrap_or(0.0)
            .total_cmp(&a.change_rate.unwrap_or(0.0))
    });
}

/// True when the topic has not surfaced in the news headlines yet.
///
/// Compares 10-char lowercase prefixes in both directions.
pub fn is_new_to_news(title: &str, news_titles: &[String]) -> bool {
    let lower = title.to_lowercase();
    let prefix: String = lower.chars().take(NEWS_PREFIX_CHARS).collect();
    if prefix.trim().is_empty() {
        return true;
    }
    !news_titles.iter().any(|headline| {
        let h = headline.to_lowercase();
        let h_prefix: String = h.chars().take(NEWS_PREFIX_CHARS).collect();
        h.contains(&prefix) || (!h_prefix.trim().is_empty() && lower.contains(&h_prefix))
    })
}

// ------------------------------------------------------------
// Heuristic path
// ------------------------------------------------------------

fn passthrough(pool: &[RawCandidate], limit: usize) -> Vec<TrendItem> {
    pool.iter()
        .filter(|c| !c.title.trim().is_empty())
        .take(limit)
        .map(|c| base_item(Category::Content, c, c.title.clone(), c.source_label.clone()))
        .collect()
}

/// Deterministic extraction used when the collaborator path fails.
pub fn heuristic_extract(
    category: Category,
    pool: &[RawCandidate],
    limit: usize,
    news_titles: &[String],
) -> Vec<TrendItem> {
    let scored = |i: usize, c: &RawCandidate| -> Scored {
        let (score, title) = match category {
            Category::Keyword => (0, extract_core_topic(&c.title)),
            Category::Social => (0, truncate_chars(c.title.trim(), 50)),
            Category::Shopping => (
                marker_score(&c.title, SHOPPING_MARKERS),
                extract_product_name(&c.title),
            ),
            Category::Rising => (marker_score(&c.title, RISING_MARKERS), c.title.clone()),
            Category::Content => (0, c.title.clone()),
        };
        Scored {
            index: i,
            score,
            title,
        }
    };

    if category == Category::Content {
        return passthrough(pool, limit);
    }

    let entries: Vec<Scored> = if category == Category::Social {
        interleave_by_source(pool)
            .into_iter()
            .map(|i| scored(i, &pool[i]))
            .collect()
    } else {
        pool.iter().enumerate().map(|(i, c)| scored(i, c)).collect()
    };

    let picked = select_top(entries, limit);
    let mut out: Vec<TrendItem> = picked
        .into_iter()
        .map(|s| {
            let c = &pool[s.index];
            match category {
                Category::Keyword => {
                    let mut it = base_item(category, c, s.title, c.source_label.clone())
                        .with_meta("traffic", "news");
                    it.summary = snippet_or_none(c, 100);
                    it
                }
                Category::Social => {
                    let mut it = base_item(category, c, s.title, c.source_label.clone())
                        .with_meta("description", c.snippet.clone());
                    it.summary = snippet_or_none(c, 100);
                    it
                }
                Category::Shopping => {
                    let mut it = base_item(category, c, s.title, c.source_label.clone())
                        .with_meta("price", Value::Null);
                    it.summary = snippet_or_none(c, 80);
                    it
                }
                Category::Rising => {
                    let hits = marker_hits(&c.title, RISING_MARKERS) as f64;
                    let viral = (FALLBACK_VIRAL_BASE + 10.0 * hits).min(100.0);
                    rising_item(c, viral, "interest".to_string(), news_titles)
                }
                Category::Content => base_item(category, c, s.title, c.source_label.clone()),
            }
        })
        .collect();

    if category == Category::Rising {
        sort_by_viral(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_to_news_checks_both_directions() {
        let news = vec!["Heavy snow hits Seoul tonight".to_string()];
        assert!(!is_new_to_news("heavy snow hits the capital", &news));
        assert!(!is_new_to_news("Breaking: heavy snow hits Seoul", &news));
        assert!(is_new_to_news("Idol dance challenge", &news));
        assert!(is_new_to_news("anything", &[]));
    }

    #[test]
    fn heuristic_rising_scores_markers() {
        let pool = vec![
            RawCandidate::new("Quiet afternoon post", "Community"),
            RawCandidate::new("논란 반응 폭발 clip", "Community").with_link("https://c/1"),
        ];
        let out = heuristic_extract(Category::Rising, &pool, 5, &[]);
        assert_eq!(out[0].title, "논란 반응 폭발 clip");
        assert_eq!(out[0].change_rate, Some(70.0));
        assert_eq!(out[0].source_url.as_deref(), Some("https://c/1"));
        assert_eq!(out[1].change_rate, Some(50.0));
        assert_eq!(out[1].metadata["sentimentType"], json!("interest"));
    }

    #[test]
    fn prompt_enumerates_candidates_by_index() {
        let pool = vec![RawCandidate::new("First", "A"), RawCandidate::new("Second", "B")];
        let p = build_prompt(Category::Keyword, &pool, 3);
        assert!(p.contains("0. [A] First"));
        assert!(p.contains("1. [B] Second"));
        assert!(p.contains("headlineIndex"));
    }
}
