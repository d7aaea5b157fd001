//! Deterministic scoring used whenever the text-generation collaborator is
//! unavailable or returns nothing usable.

use std::collections::{HashMap, HashSet};

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::model::RawCandidate;
use crate::normalize::{topic_key, truncate_chars};

/// Shopping terms (Korean storefront vocabulary plus English equivalents).
pub const SHOPPING_MARKERS: &[&str] = &[
    "쿠팡", "네이버", "베스트", "인기", "품절", "핫딜", "할인", "세일", "최저가", "best", "deal",
    "sale", "sold out", "discount",
];

/// Controversy / reaction terms that tend to precede a viral spread.
pub const RISING_MARKERS: &[&str] = &[
    "논란", "충격", "감동", "화제", "반응", "viral", "controversy", "shock", "reaction",
];

/// Points per marker present in a title.
pub const MARKER_POINTS: u32 = 2;

fn re_quoted() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"["']([^"']{2,40})["']"#).unwrap())
}

fn re_clause() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"[,.…·|]").unwrap())
}

fn re_brackets() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)").unwrap())
}

/// How many distinct markers occur in `title` (case-insensitive).
pub fn marker_hits(title: &str, markers: &[&str]) -> u32 {
    let lower = title.to_lowercase();
    markers.iter().filter(|m| lower.contains(*m)).count() as u32
}

pub fn marker_score(title: &str, markers: &[&str]) -> u32 {
    marker_hits(title, markers) * MARKER_POINTS
}

fn quoted_phrase(title: &str) -> Option<String> {
    re_quoted()
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Short topic label for a news headline.
///
/// Quoted phrase, else the text before an ellipsis (if longer than 5 chars),
/// else the first clause (3..30 chars), else the first 25 chars.
pub fn extract_core_topic(title: &str) -> String {
    let title = title.trim();
    if let Some(q) = quoted_phrase(title) {
        return q;
    }
    for ellipsis in ["...", "…"] {
        if let Some((head, _)) = title.split_once(ellipsis) {
            let head = head.trim();
            if head.chars().count() > 5 {
                return head.to_string();
            }
        }
    }
    if let Some(first) = re_clause().split(title).next() {
        let first = first.trim();
        let n = first.chars().count();
        if n > 3 && n < 30 {
            return first.to_string();
        }
    }
    truncate_chars(title, 25).trim().to_string()
}

/// Product label for a storefront listing: quoted phrase, else first clause
/// without bracketed tags, capped at 30 chars.
pub fn extract_product_name(title: &str) -> String {
    if let Some(q) = quoted_phrase(title) {
        return truncate_chars(&q, 30);
    }
    let no_brackets = re_brackets().replace_all(title, " ");
    let first = re_clause()
        .split(&no_brackets)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("");
    let first = first.split_whitespace().collect::<Vec<_>>().join(" ");
    let out = truncate_chars(&first, 30).trim().to_string();
    if out.is_empty() {
        truncate_chars(title.trim(), 30)
    } else {
        out
    }
}

/// Candidate indices interleaved round-robin across `source_label`s,
/// labels taken in order of first appearance.
pub fn interleave_by_source(candidates: &[RawCandidate]) -> Vec<usize> {
    let mut order: Vec<&str> = Vec::new();
    let mut buckets: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, c) in candidates.iter().enumerate() {
        let label = c.source_label.as_str();
        if !buckets.contains_key(label) {
            order.push(label);
        }
        buckets.entry(label).or_default().push(i);
    }

    let mut out = Vec::with_capacity(candidates.len());
    let mut round = 0usize;
    while out.len() < candidates.len() {
        for label in &order {
            if let Some(&i) = buckets.get(label).and_then(|b| b.get(round)) {
                out.push(i);
            }
        }
        round += 1;
    }
    out
}

/// A fallback selection entry: which candidate, its marker score, the derived title.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub index: usize,
    pub score: u32,
    pub title: String,
}

/// Stable sort by score (desc), dedup by the topic key of the derived title,
/// keep at most `limit`.
pub fn select_top(mut entries: Vec<Scored>, limit: usize) -> Vec<Scored> {
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(limit.min(entries.len()));
    for e in entries {
        if out.len() >= limit {
            break;
        }
        if e.title.is_empty() {
            continue;
        }
        let key = topic_key(&e.title);
        let key = if key.is_empty() { e.title.clone() } else { key };
        if seen.insert(key) {
            out.push(e);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_topic_prefers_quoted_phrase() {
        assert_eq!(extract_core_topic("Minister calls it 'a new era' for trade"), "a new era");
    }

    #[test]
    fn core_topic_uses_text_before_ellipsis() {
        assert_eq!(extract_core_topic("Rate cut looms... markets wait"), "Rate cut looms");
    }

    #[test]
    fn core_topic_uses_first_clause_then_prefix() {
        assert_eq!(extract_core_topic("Heavy snow, roads closed"), "Heavy snow");
        let long = "A very long headline without any punctuation that keeps going";
        assert_eq!(extract_core_topic(long), "A very long headline with");
    }

    #[test]
    fn product_name_drops_brackets_and_caps_length() {
        assert_eq!(extract_product_name("[핫딜] 무선 이어폰, 최저가"), "무선 이어폰");
        let long = "Ultra lightweight carbon trekking pole set for hikers";
        assert!(extract_product_name(long).chars().count() <= 30);
    }

    #[test]
    fn marker_score_counts_distinct_markers() {
        assert_eq!(marker_score("핫딜 할인 이벤트", SHOPPING_MARKERS), 4);
        assert_eq!(marker_score("plain title", SHOPPING_MARKERS), 0);
        assert_eq!(marker_hits("VIRAL clip", RISING_MARKERS), 1);
    }

    #[test]
    fn round_robin_across_labels() {
        let c = vec![
            RawCandidate::new("a1", "A"),
            RawCandidate::new("a2", "A"),
            RawCandidate::new("b1", "B"),
            RawCandidate::new("a3", "A"),
            RawCandidate::new("c1", "C"),
        ];
        assert_eq!(interleave_by_source(&c), vec![0, 2, 4, 1, 3]);
    }

    #[test]
    fn select_top_is_stable_and_dedups() {
        let e = |index, score, title: &str| Scored {
            index,
            score,
            title: title.to_string(),
        };
        let out = select_top(
            vec![e(0, 0, "Alpha"), e(1, 2, "Beta"), e(2, 2, "beta!"), e(3, 0, "Gamma")],
            3,
        );
        let idx: Vec<usize> = out.iter().map(|s| s.index).collect();
        assert_eq!(idx, vec![1, 0, 3]);
    }
}
