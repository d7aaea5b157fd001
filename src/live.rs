//! Region live boards: all five categories fetched on demand for one region
//! and served from a short-lived in-memory snapshot. Nothing is persisted.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::counter;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::model::{Category, TrendItem};
use crate::pipeline::Pipeline;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBoard {
    pub category: Category,
    pub items: Vec<TrendItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSnapshot {
    pub region: String,
    pub fetched_at: DateTime<Utc>,
    /// One entry per category, in [`Category::ALL`] order. Failed categories are empty.
    pub boards: Vec<LiveBoard>,
}

impl LiveSnapshot {
    pub fn board(&self, category: Category) -> Option<&LiveBoard> {
        self.boards.iter().find(|b| b.category == category)
    }
}

struct Cached {
    at: Instant,
    snapshot: Arc<LiveSnapshot>,
}

/// Read-through cache over a region pipeline.
///
/// The lock is held while a refresh runs, so concurrent readers of a stale
/// snapshot wait for one fetch instead of starting their own.
pub struct LiveBoards {
    region: String,
    pipeline: Arc<Pipeline>,
    ttl: Duration,
    cache: Mutex<Option<Cached>>,
}

impl LiveBoards {
    pub fn new(region: impl Into<String>, pipeline: Arc<Pipeline>, ttl: Duration) -> Self {
        Self {
            region: region.into().to_ascii_lowercase(),
            pipeline,
            ttl,
            cache: Mutex::new(None),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Cached snapshot while it is younger than the TTL, otherwise a fresh fetch.
    /// `refresh` skips the cache.
    pub async fn snapshot(&self, refresh: bool) -> Arc<LiveSnapshot> {
        let mut cache = self.cache.lock().await;
        if !refresh {
            if let Some(c) = cache.as_ref().filter(|c| c.at.elapsed() < self.ttl) {
                tracing::debug!(target: "live", region = %self.region, "serving cached snapshot");
                return c.snapshot.clone();
            }
        }

        let snapshot = Arc::new(self.fetch().await);
        *cache = Some(Cached {
            at: Instant::now(),
            snapshot: snapshot.clone(),
        });
        snapshot
    }

    async fn fetch(&self) -> LiveSnapshot {
        let runs = Category::ALL
            .iter()
            .map(|&c| async move { (c, self.pipeline.fetch_category(c).await) });
        let boards: Vec<LiveBoard> = join_all(runs)
            .await
            .into_iter()
            .map(|(category, res)| {
                let items = match res {
                    Ok(report) => report.items,
                    Err(e) => {
                        tracing::warn!(target: "live", region = %self.region, category = %category, error = %e, "live category empty");
                        Vec::new()
                    }
                };
                LiveBoard { category, items }
            })
            .collect();

        counter!("trends_live_refresh_total", "region" => self.region.clone()).increment(1);
        tracing::info!(
            target: "live",
            region = %self.region,
            items = boards.iter().map(|b| b.items.len()).sum::<usize>(),
            "live boards refreshed"
        );
        LiveSnapshot {
            region: self.region.clone(),
            fetched_at: Utc::now(),
            boards,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_adapter::DisabledClient;
    use crate::ingest::types::SourceAdapter;
    use crate::model::RawCandidate;
    use crate::pipeline::PipelineBuilder;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAdapter {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SourceAdapter for CountingAdapter {
        async fn fetch(&self, _limit: usize) -> anyhow::Result<Vec<RawCandidate>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(vec![RawCandidate::new(format!("Headline batch {n}"), "wire")])
        }
        fn name(&self) -> &str {
            "counting"
        }
    }

    fn live(calls: Arc<AtomicUsize>) -> LiveBoards {
        let pipeline = PipelineBuilder::new(Arc::new(DisabledClient), Arc::new(MemoryStore::new()))
            .adapter(Category::Keyword, Arc::new(CountingAdapter { calls }))
            .build();
        LiveBoards::new("US", Arc::new(pipeline), Duration::from_secs(300))
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_is_reused_until_ttl_expires() {
        let calls = Arc::new(AtomicUsize::new(0));
        let boards = live(calls.clone());
        assert_eq!(boards.region(), "us");

        let first = boards.snapshot(false).await;
        assert_eq!(first.boards.len(), Category::ALL.len());
        assert_eq!(first.board(Category::Keyword).unwrap().items.len(), 1);
        assert!(first.board(Category::Social).unwrap().items.is_empty());

        tokio::time::advance(Duration::from_secs(299)).await;
        let again = boards.snapshot(false).await;
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        let fresh = boards.snapshot(false).await;
        assert!(!Arc::ptr_eq(&first, &fresh));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn refresh_bypasses_a_fresh_snapshot() {
        let calls = Arc::new(AtomicUsize::new(0));
        let boards = live(calls.clone());
        boards.snapshot(false).await;
        let forced = boards.snapshot(true).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            forced.board(Category::Keyword).unwrap().items[0].title,
            "Headline batch 2"
        );
    }
}
