// src/lib.rs
// Public library surface for the binary and the integration tests.

pub mod error;
pub mod model;
pub mod normalize;

// Aggregation core (extraction, merge, ranking, summaries)
pub mod analyze;

// Sources, storage and orchestration
pub mod ingest;
pub mod live;
pub mod pipeline;
pub mod store;

pub mod ai_bootstrap;
pub mod api;
pub mod config;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use analyze::ai_adapter;
pub use error::PipelineError;
pub use model::{Board, Category, RawCandidate, TrendItem};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineSettings};

use std::sync::Arc;

use tracing::info;

use crate::config::sources::{feeds_for, feeds_for_region, regions, FeedConfig};
use crate::config::{AppConfig, StoreBackend};
use crate::ingest::providers::{RssFeedAdapter, VideoApiAdapter};
use crate::ingest::types::DynSourceAdapter;
use crate::live::LiveBoards;
use crate::store::{FileStore, MemoryStore, TrendStore};

/// Everything the binary needs, assembled from one [`AppConfig`].
pub struct Service {
    pub pipeline: Arc<Pipeline>,
    pub llm: ai_bootstrap::LlmRuntime,
    /// One entry per region tag found in `[[feeds]]`.
    pub regions: Vec<LiveBoards>,
}

/// Build store, adapters and collaborator from config.
///
/// Categories without any configured source simply report "no data" when run.
pub async fn build_service(cfg: &AppConfig) -> anyhow::Result<Service> {
    let store: Arc<dyn TrendStore> = match cfg.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File => Arc::new(FileStore::open(&cfg.store.dir).await?),
    };

    let llm = ai_bootstrap::LlmRuntime::from_config(&cfg.llm);
    let mut builder = PipelineBuilder::new(llm.client.clone(), store)
        .settings(PipelineSettings::from(cfg));

    for category in Category::ALL {
        let Some(adapter) = feed_adapter(
            format!("{category}-feeds"),
            &feeds_for(&cfg.feeds, category),
            cfg.pipeline.per_feed_limit,
        ) else {
            continue;
        };
        if category == Category::Keyword {
            builder = builder.news_reference(adapter.clone());
        }
        builder = builder.adapter(category, adapter);
    }

    if cfg.youtube.enabled {
        builder = builder.adapter(
            Category::Content,
            Arc::new(VideoApiAdapter::new(&cfg.youtube.api_key, &cfg.youtube.region)),
        );
    }

    let pipeline = Arc::new(builder.build());

    let regions: Vec<LiveBoards> = regions(&cfg.feeds)
        .into_iter()
        .map(|region| region_boards(cfg, &llm, region))
        .collect();

    info!(
        store = ?cfg.store.backend,
        llm_available = llm.client.is_available(),
        regions = regions.len(),
        "service assembled"
    );
    Ok(Service {
        pipeline,
        llm,
        regions,
    })
}

fn feed_adapter(name: String, feeds: &[&FeedConfig], per_feed_limit: usize) -> Option<DynSourceAdapter> {
    if feeds.is_empty() {
        return None;
    }
    let mut adapter = RssFeedAdapter::new(name).with_per_feed_limit(per_feed_limit);
    for f in feeds {
        adapter = adapter.with_url(&f.name, &f.url);
    }
    Some(Arc::new(adapter))
}

/// Live boards for one region tag, backed by a throwaway in-memory store.
fn region_boards(cfg: &AppConfig, llm: &ai_bootstrap::LlmRuntime, region: String) -> LiveBoards {
    let settings = PipelineSettings {
        category_limit: cfg.live.limit,
        ..PipelineSettings::from(cfg)
    };
    let mut builder = PipelineBuilder::new(llm.client.clone(), Arc::new(MemoryStore::new()))
        .settings(settings);
    for category in Category::ALL {
        let Some(adapter) = feed_adapter(
            format!("{region}-{category}-feeds"),
            &feeds_for_region(&cfg.feeds, &region, category),
            cfg.pipeline.per_feed_limit,
        ) else {
            continue;
        };
        if category == Category::Keyword {
            builder = builder.news_reference(adapter.clone());
        }
        builder = builder.adapter(category, adapter);
    }
    LiveBoards::new(region, Arc::new(builder.build()), cfg.live_cache_ttl())
}
