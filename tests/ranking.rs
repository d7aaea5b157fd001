// tests/ranking.rs
//
// Overall ranking: the weighted A / A! / B scenario, top-N truncation,
// determinism on repeated runs, and the empty pool.

mod common;

use std::sync::Arc;
use std::time::Duration;

use trend_aggregator::ai_adapter::DisabledClient;
use trend_aggregator::analyze::merge::MergeEngine;
use trend_aggregator::analyze::ranking::{finalize, pool_items, RankingAggregator};
use trend_aggregator::model::{ranks_contiguous, Category, TrendItem};

use common::board;

fn aggregator(top_n: usize) -> RankingAggregator {
    RankingAggregator::new(
        MergeEngine::new(Arc::new(DisabledClient), Duration::from_secs(1)),
        top_n,
    )
}

#[tokio::test]
async fn weighted_merge_scenario() {
    let keyword = board(Category::Keyword, &["A"]);
    let social = board(Category::Social, &["A!"]);
    let mut shopping = board(Category::Shopping, &["filler", "B"]);
    shopping.remove(0); // keep "B" at rank 2

    let out = aggregator(5).rank(&[keyword, social, shopping]).await;

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].item.title, "A");
    assert_eq!(out[0].item.rank, 1);
    assert!((out[0].score - 9.5).abs() < 1e-9);
    assert_eq!(out[1].item.title, "B");
    assert_eq!(out[1].item.rank, 2);
    assert!((out[1].score - 2.4).abs() < 1e-9);
}

#[tokio::test]
async fn never_more_than_top_n_and_ranks_contiguous() {
    let boards = vec![
        board(Category::Keyword, &["k1", "k2", "k3", "k4", "k5"]),
        board(Category::Social, &["s1", "s2", "s3", "s4", "s5"]),
        board(Category::Rising, &["r1", "r2", "r3"]),
    ];
    let out = aggregator(5).rank(&boards).await;
    assert_eq!(out.len(), 5);
    let items: Vec<TrendItem> = out.iter().map(|w| w.item.clone()).collect();
    assert!(ranks_contiguous(&items));
    assert!(out.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn repeated_runs_order_ties_identically() {
    // Same rank and weight in two categories → equal scores.
    let boards = vec![
        board(Category::Keyword, &["alpha", "beta", "gamma"]),
        board(Category::Social, &["delta", "epsilon"]),
        board(Category::Content, &["zeta", "eta"]),
    ];
    let first: Vec<String> = aggregator(4)
        .rank(&boards)
        .await
        .into_iter()
        .map(|w| w.item.title)
        .collect();
    for _ in 0..20 {
        let again: Vec<String> = aggregator(4)
            .rank(&boards)
            .await
            .into_iter()
            .map(|w| w.item.title)
            .collect();
        assert_eq!(again, first);
    }
}

#[tokio::test]
async fn empty_pool_ranks_nothing() {
    let out = aggregator(5).rank(&[Vec::new(), Vec::new()]).await;
    assert!(out.is_empty());
}

#[test]
fn stable_sort_keeps_pool_order_for_equal_scores() {
    // keyword rank 2 → 4.0, rising rank 1 → 4.0
    let pool = pool_items(&[
        board(Category::Keyword, &["first", "second"]),
        board(Category::Rising, &["third"]),
    ]);
    let out = finalize(pool, 3);
    let titles: Vec<_> = out.iter().map(|w| w.item.title.as_str()).collect();
    assert_eq!(titles, vec!["first", "second", "third"]);
}
