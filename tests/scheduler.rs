// tests/scheduler.rs
//
// Scheduled refresh: one cycle refreshes every category board and then the
// overall board; the spawned loop runs its first cycle immediately.

mod common;

use std::sync::Arc;
use std::time::Duration;

use trend_aggregator::ai_adapter::DisabledClient;
use trend_aggregator::ingest::scheduler::{run_cycle, spawn_scheduler, SchedulerCfg};
use trend_aggregator::model::{Board, Category};
use trend_aggregator::pipeline::{Pipeline, PipelineBuilder};
use trend_aggregator::store::{MemoryStore, TrendStore};

use common::{FailingAdapter, StaticAdapter};

fn pipeline(store: Arc<MemoryStore>) -> Pipeline {
    PipelineBuilder::new(Arc::new(DisabledClient), store)
        .adapter(Category::Keyword, StaticAdapter::new("Wire", &["Snow storm", "Rate cut"]))
        .adapter(Category::Shopping, StaticAdapter::new("Store", &["Air fryer"]))
        .adapter(Category::Social, Arc::new(FailingAdapter))
        .build()
}

#[tokio::test]
async fn one_cycle_refreshes_categories_then_overall() {
    let store = Arc::new(MemoryStore::new());
    let ok = run_cycle(&pipeline(store.clone())).await;
    assert_eq!(ok, 2);

    assert_eq!(store.read_top(Board::Category(Category::Keyword), 10).await.unwrap().len(), 2);
    assert!(store.read_top(Board::Category(Category::Social), 10).await.unwrap().is_empty());
    let overall = store.read_top(Board::Overall, 10).await.unwrap();
    assert_eq!(overall.len(), 3);
    assert_eq!(overall[0].title, "Snow storm");
}

#[tokio::test(start_paused = true)]
async fn spawned_scheduler_runs_first_cycle_immediately() {
    let store = Arc::new(MemoryStore::new());
    let handle = spawn_scheduler(
        SchedulerCfg { interval_secs: 3600 },
        Arc::new(pipeline(store.clone())),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(store.last_updated(Board::Overall).await.unwrap().is_some());

    handle.abort();
}
