//! Meta-Analysis Summarizer and per-item "why is this trending" lines.
//!
//! Everything here is advisory: failures return the fixed fallback sentence
//! or leave summaries untouched, never an error.

use std::fmt::Write as _;
use std::time::Duration;

use futures::future::join_all;
use metrics::counter;

use crate::analyze::ai_adapter::{ask, DynTextGenerator};
use crate::analyze::response::strip_enclosing_quotes;
use crate::model::TrendItem;
use crate::normalize::truncate_chars;

pub const FALLBACK_META: &str = "Several different issues are drawing attention at the same time.";
/// Per-item summary calls in flight at once.
pub const SUMMARY_CONCURRENCY: usize = 5;
const MAX_SUMMARY_CHARS: usize = 150;

pub struct Summarizer {
    llm: DynTextGenerator,
    timeout: Duration,
}

impl Summarizer {
    pub fn new(llm: DynTextGenerator, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// One sentence characterizing the ranked titles.
    pub async fn meta_analysis(&self, top: &[TrendItem]) -> String {
        if top.is_empty() {
            return FALLBACK_META.to_string();
        }
        let mut titles = String::new();
        for it in top {
            let _ = writeln!(titles, "#{}: {}", it.rank, it.title);
        }
        let prompt = format!(
            "These are the current top trends across news, social media, video, shopping \
             and community boards:\n{titles}\n\
             In one sentence of at most 25 words, name the theme or phenomenon that ties \
             them together today. Reply with the sentence only."
        );

        match ask(self.llm.as_ref(), &prompt, self.timeout).await {
            Ok(raw) => {
                let sentence = strip_enclosing_quotes(&raw);
                if sentence.is_empty() {
                    FALLBACK_META.to_string()
                } else {
                    sentence
                }
            }
            Err(e) => {
                if self.llm.is_available() {
                    tracing::warn!(target: "meta", error = %e, "meta analysis failed, using fallback sentence");
                }
                counter!("trends_llm_fallback_total", "step" => "meta").increment(1);
                FALLBACK_META.to_string()
            }
        }
    }

    /// A one-line reason for `title` trending, or `None` when unavailable.
    pub async fn summarize_item(&self, title: &str, context: &str) -> Option<String> {
        let prompt = format!(
            "Trend: {title}\nContext: {context}\n\
             In one short sentence, explain why this is trending right now. \
             Reply with the sentence only."
        );
        match ask(self.llm.as_ref(), &prompt, self.timeout).await {
            Ok(raw) => {
                let s = strip_enclosing_quotes(&raw);
                (!s.is_empty()).then(|| truncate_chars(&s, MAX_SUMMARY_CHARS))
            }
            Err(e) => {
                tracing::debug!(target: "meta", error = %e, "item summary skipped");
                None
            }
        }
    }

    /// Fill `summary` in place, at most [`SUMMARY_CONCURRENCY`] calls at a time.
    ///
    /// With `only_missing`, items that already carry a summary are skipped.
    /// Failed calls keep the existing summary.
    pub async fn enrich_summaries<F>(&self, items: &mut [TrendItem], only_missing: bool, context: F)
    where
        F: Fn(&TrendItem) -> String,
    {
        if !self.llm.is_available() {
            return;
        }
        let targets: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, it)| !only_missing || it.summary.is_none())
            .map(|(i, _)| i)
            .collect();

        for batch in targets.chunks(SUMMARY_CONCURRENCY) {
            let requests: Vec<(String, String)> = batch
                .iter()
                .map(|&i| (items[i].title.clone(), context(&items[i])))
                .collect();
            let results = join_all(
                requests
                    .iter()
                    .map(|(title, ctx)| self.summarize_item(title, ctx)),
            )
            .await;
            for (&i, summary) in batch.iter().zip(results) {
                if let Some(s) = summary {
                    items[i].summary = Some(s);
                }
            }
        }
    }
}
