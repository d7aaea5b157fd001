// src/ingest/mod.rs
pub mod providers;
pub mod scheduler;
pub mod types;

use std::collections::HashSet;
use std::time::{Duration, Instant};

use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::OnceCell;

use crate::ingest::types::DynSourceAdapter;
use crate::model::{Category, RawCandidate};
use crate::normalize::{clean_snippet, clean_title};

/// Snippets longer than this are cut before reaching the extractor.
pub const MAX_SNIPPET_CHARS: usize = 300;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "trends_candidates_total",
            "Raw candidates kept after normalization, per category."
        );
        describe_counter!(
            "trends_source_errors_total",
            "Source adapter errors and timeouts."
        );
        describe_counter!(
            "trends_llm_fallback_total",
            "Steps that fell back to the deterministic path."
        );
        describe_counter!(
            "trends_merge_dropped_groups_total",
            "Assisted merge groups dropped for an invalid representative."
        );
        describe_counter!(
            "trends_scheduler_runs_total",
            "Scheduled refresh cycles completed."
        );
        describe_counter!(
            "trends_live_refresh_total",
            "Region live-board refreshes, per region."
        );
        describe_histogram!("trends_fetch_ms", "Candidate collection time in milliseconds.");
        describe_gauge!(
            "trends_pipeline_last_run_ts",
            "Unix ts when a category pipeline last completed."
        );
    });
}

/// Clean titles and snippets, drop untitled and repeated entries, keep at most `cap`.
pub fn normalize_candidates(raw: Vec<RawCandidate>, cap: usize) -> Vec<RawCandidate> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(raw.len().min(cap));
    for mut c in raw {
        if out.len() >= cap {
            break;
        }
        c.title = clean_title(&c.title);
        if c.title.is_empty() {
            continue;
        }
        if !seen.insert(c.title.to_lowercase()) {
            continue;
        }
        c.snippet = clean_snippet(&c.snippet, MAX_SNIPPET_CHARS);
        out.push(c);
    }
    out
}

/// Fetch every adapter of a category concurrently, each under `timeout`.
///
/// A failing or slow adapter contributes zero candidates; siblings are unaffected.
pub async fn collect_candidates(
    category: Category,
    adapters: &[DynSourceAdapter],
    limit: usize,
    timeout: Duration,
    cap: usize,
) -> Vec<RawCandidate> {
    ensure_metrics_described();
    let t0 = Instant::now();

    let fetches = adapters.iter().map(|a| async move {
        let res = tokio::time::timeout(timeout, a.fetch(limit)).await;
        (a.name().to_string(), res)
    });

    let mut raw = Vec::new();
    for (adapter, res) in join_all(fetches).await {
        match res {
            Ok(Ok(mut v)) => {
                tracing::debug!(target: "ingest", category = %category, adapter = %adapter, n = v.len(), "adapter fetched");
                raw.append(&mut v);
            }
            Ok(Err(e)) => {
                tracing::warn!(target: "ingest", category = %category, adapter = %adapter, error = ?e, "adapter error");
                counter!("trends_source_errors_total", "category" => category.as_str()).increment(1);
            }
            Err(_) => {
                tracing::warn!(target: "ingest", category = %category, adapter = %adapter, timeout_ms = timeout.as_millis() as u64, "adapter timed out");
                counter!("trends_source_errors_total", "category" => category.as_str()).increment(1);
            }
        }
    }

    let kept = normalize_candidates(raw, cap);
    counter!("trends_candidates_total", "category" => category.as_str())
        .increment(kept.len() as u64);
    histogram!("trends_fetch_ms", "category" => category.as_str())
        .record(t0.elapsed().as_secs_f64() * 1_000.0);
    kept
}
