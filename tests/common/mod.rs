// tests/common/mod.rs
//
// Shared test doubles: scripted text generator, static/failing/slow adapters,
// and a store that rejects writes.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use trend_aggregator::ai_adapter::{LlmFuture, TextGenerator};
use trend_aggregator::error::{LlmError, StoreError};
use trend_aggregator::ingest::types::SourceAdapter;
use trend_aggregator::model::{Board, Category, RawCandidate, TrendItem};
use trend_aggregator::store::TrendStore;

// ---------------------------------------------------------------------------
// Text generation
// ---------------------------------------------------------------------------

/// Generator whose answer is computed from the prompt by a closure.
pub struct ScriptedGenerator<F> {
    respond: F,
    calls: AtomicUsize,
}

impl<F> ScriptedGenerator<F>
where
    F: Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static,
{
    pub fn new(respond: F) -> Arc<Self> {
        Arc::new(Self {
            respond,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<F> TextGenerator for ScriptedGenerator<F>
where
    F: Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static,
{
    fn complete<'a>(&'a self, prompt: &'a str) -> LlmFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let out = (self.respond)(prompt);
        Box::pin(async move { out })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Always answers with the same text.
pub fn fixed(text: &str) -> Arc<ScriptedGenerator<impl Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static>> {
    let text = text.to_string();
    ScriptedGenerator::new(move |_| Ok(text.clone()))
}

/// Always fails with an HTTP status error.
pub fn failing() -> Arc<ScriptedGenerator<impl Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static>> {
    ScriptedGenerator::new(|_| Err(LlmError::Status(500)))
}

/// Accepts every prompt and never answers; pair with a paused tokio clock.
pub struct HangingGenerator;

impl TextGenerator for HangingGenerator {
    fn complete<'a>(&'a self, _prompt: &'a str) -> LlmFuture<'a> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        })
    }

    fn provider_name(&self) -> &'static str {
        "hanging"
    }
}

// ---------------------------------------------------------------------------
// Source adapters
// ---------------------------------------------------------------------------

pub struct StaticAdapter {
    pub name: String,
    pub items: Vec<RawCandidate>,
}

impl StaticAdapter {
    pub fn new(name: &str, titles: &[&str]) -> Arc<Self> {
        let items = titles
            .iter()
            .enumerate()
            .map(|(i, t)| {
                RawCandidate::new(*t, name)
                    .with_link(format!("https://{}.test/{i}", name.to_lowercase()))
                    .with_snippet(format!("About {t}"))
            })
            .collect();
        Arc::new(Self {
            name: name.to_string(),
            items,
        })
    }
}

#[async_trait]
impl SourceAdapter for StaticAdapter {
    async fn fetch(&self, limit: usize) -> Result<Vec<RawCandidate>> {
        Ok(self.items.iter().take(limit).cloned().collect())
    }
    fn name(&self) -> &str {
        &self.name
    }
}

pub struct FailingAdapter;

#[async_trait]
impl SourceAdapter for FailingAdapter {
    async fn fetch(&self, _limit: usize) -> Result<Vec<RawCandidate>> {
        Err(anyhow!("upstream exploded"))
    }
    fn name(&self) -> &str {
        "failing"
    }
}

/// Sleeps before answering; pair with a paused tokio clock.
pub struct SlowAdapter {
    pub delay: Duration,
}

#[async_trait]
impl SourceAdapter for SlowAdapter {
    async fn fetch(&self, _limit: usize) -> Result<Vec<RawCandidate>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![RawCandidate::new("Too late to matter", "slow")])
    }
    fn name(&self) -> &str {
        "slow"
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Reads are empty, writes are rejected.
pub struct RejectingStore;

#[async_trait]
impl TrendStore for RejectingStore {
    async fn replace(&self, board: Board, _items: &[TrendItem]) -> Result<(), StoreError> {
        Err(StoreError::Rejected(format!("{board} is read-only")))
    }
    async fn read_top(&self, _board: Board, _n: usize) -> Result<Vec<TrendItem>, StoreError> {
        Ok(Vec::new())
    }
    async fn last_updated(&self, _board: Board) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Board of `titles` ranked 1..N in the given order.
pub fn board(category: Category, titles: &[&str]) -> Vec<TrendItem> {
    titles
        .iter()
        .enumerate()
        .map(|(i, t)| TrendItem::new(category, (i + 1) as u32, *t, category.label()))
        .collect()
}
