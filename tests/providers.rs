// tests/providers.rs
//
// Source adapters driven by offline fixtures, then run through candidate
// collection the same way a pipeline run does.

mod common;

use std::sync::Arc;
use std::time::Duration;

use trend_aggregator::ingest::collect_candidates;
use trend_aggregator::ingest::providers::{RssFeedAdapter, VideoApiAdapter};
use trend_aggregator::ingest::types::{DynSourceAdapter, SourceAdapter};
use trend_aggregator::model::Category;

use common::FailingAdapter;

const NEWS_RSS: &str = include_str!("fixtures/news_rss.xml");

const VIDEO_JSON: &str = r#"{
  "items": [
    {"id": "v1", "snippet": {"title": "Live: snow storm update", "channelTitle": "News 24",
      "thumbnails": {"medium": {"url": "https://img.test/v1.jpg"}}},
     "statistics": {"viewCount": "2345678"}},
    {"id": "v2", "snippet": {"title": "Cat compilation", "channelTitle": "Pets"},
     "statistics": {"viewCount": "999"}},
    {"id": "v3", "snippet": {"title": "", "channelTitle": "Nobody"}}
  ]
}"#;

#[test]
fn rss_fixture_parses_titles_dates_and_links() {
    let v = RssFeedAdapter::parse_feed(NEWS_RSS, "Top stories", 10).expect("parse fixture");

    // blank title skipped, exact repeats are left for normalization
    assert_eq!(v.len(), 4);
    assert_eq!(v[0].title, "Heavy snow closes mountain roads");
    assert_eq!(v[0].link.as_deref(), Some("https://news.example.test/articles/1"));
    assert_eq!(v[0].source_label, "Top stories");
    assert_eq!(v[0].metadata["publishedAt"], "2026-10-14T21:30:00+00:00");

    assert!(v[1].title.contains("gradual"));
    assert!(!v[1].title.contains("&quot;"));
    assert!(!v[1].title.ends_with("Wire"));

    assert_eq!(v[2].title, "Idol group announces world tour");
    assert!(v[2].metadata.get("publishedAt").is_none());
}

#[tokio::test]
async fn per_feed_limit_applies_to_each_feed() {
    let a = RssFeedAdapter::new("keyword-feeds")
        .with_per_feed_limit(2)
        .with_fixture("A", NEWS_RSS)
        .with_fixture("B", NEWS_RSS);
    assert_eq!(a.feed_count(), 2);
    let v = a.fetch(50).await.expect("fetch");
    assert_eq!(v.len(), 4);
    assert_eq!(v.iter().filter(|c| c.source_label == "A").count(), 2);
    assert_eq!(a.name(), "keyword-feeds");
}

#[tokio::test]
async fn collection_normalizes_and_dedups_across_adapters() {
    let rss: DynSourceAdapter = Arc::new(RssFeedAdapter::new("news").with_fixture("Top stories", NEWS_RSS));
    let adapters = vec![rss, Arc::new(FailingAdapter) as DynSourceAdapter];

    let v = collect_candidates(Category::Keyword, &adapters, 50, Duration::from_secs(5), 50).await;

    let titles: Vec<_> = v.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles.len(), 3, "{titles:?}");
    assert_eq!(titles[0], "Heavy snow closes mountain roads");
    assert_eq!(v[0].snippet, "Snow kept falling overnight.");
}

#[tokio::test]
async fn collection_respects_candidate_cap() {
    let rss: DynSourceAdapter = Arc::new(RssFeedAdapter::new("news").with_fixture("Top stories", NEWS_RSS));
    let v = collect_candidates(Category::Keyword, &[rss], 50, Duration::from_secs(5), 2).await;
    assert_eq!(v.len(), 2);
}

#[tokio::test]
async fn video_fixture_maps_statistics_and_channel() {
    let a = VideoApiAdapter::from_fixture(VIDEO_JSON);
    let v = a.fetch(10).await.expect("fetch");

    // untitled entries are left for normalization to drop
    assert_eq!(v.len(), 3);
    assert_eq!(v[0].title, "Live: snow storm update");
    assert_eq!(v[0].thumbnail.as_deref(), Some("https://img.test/v1.jpg"));
    assert_eq!(v[0].metadata["viewCount"], "2.3M views");
    assert_eq!(v[0].metadata["channelTitle"], "News 24");
    assert_eq!(v[0].metadata["videoId"], "v1");
    assert_eq!(v[1].metadata["viewCount"], "999 views");
    assert_eq!(v[2].metadata["viewCount"], "");
}

#[tokio::test]
async fn video_adapter_without_key_fails_and_is_isolated() {
    let missing: DynSourceAdapter = Arc::new(VideoApiAdapter::new("", "KR"));
    assert!(missing.fetch(5).await.is_err());

    let fixture: DynSourceAdapter = Arc::new(VideoApiAdapter::from_fixture(VIDEO_JSON));
    let v = collect_candidates(Category::Content, &[missing, fixture], 10, Duration::from_secs(5), 50).await;
    assert_eq!(v.len(), 2);
}
