// src/config/sources.rs
use serde::{Deserialize, Serialize};

use crate::model::Category;

/// One `[[feeds]]` entry: an RSS feed assigned to a category.
///
/// Feeds without a `region` feed the stored boards. Feeds tagged with a
/// region (`region = "us"`) only feed that region's live boards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub category: Category,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// `[live]`: cache settings for the region live boards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub cache_ttl_secs: u64,
    /// Items per live category board.
    pub limit: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// "ENV" means: read from YOUTUBE_API_KEY
    #[serde(default = "default_env")]
    pub api_key: String,
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_true() -> bool {
    true
}
fn default_env() -> String {
    "ENV".to_string()
}
fn default_region() -> String {
    "KR".to_string()
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: default_env(),
            region: default_region(),
        }
    }
}

impl VideoConfig {
    pub fn resolve(&mut self) {
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = std::env::var("YOUTUBE_API_KEY")
                .map(|k| k.trim().to_string())
                .unwrap_or_default();
        }
    }
}

/// Untagged feeds of one category, in declaration order.
pub fn feeds_for(feeds: &[FeedConfig], category: Category) -> Vec<&FeedConfig> {
    feeds
        .iter()
        .filter(|f| f.category == category && f.region.is_none())
        .collect()
}

/// Feeds of one category tagged with `region` (case-insensitive).
pub fn feeds_for_region<'a>(
    feeds: &'a [FeedConfig],
    region: &str,
    category: Category,
) -> Vec<&'a FeedConfig> {
    feeds
        .iter()
        .filter(|f| {
            f.category == category
                && f.region
                    .as_deref()
                    .is_some_and(|r| r.eq_ignore_ascii_case(region))
        })
        .collect()
}

/// Distinct region tags, lowercased and sorted.
pub fn regions(feeds: &[FeedConfig]) -> Vec<String> {
    let mut out: Vec<String> = feeds
        .iter()
        .filter_map(|f| f.region.as_deref())
        .map(|r| r.trim().to_ascii_lowercase())
        .filter(|r| !r.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Feeds used when the config file declares none.
pub fn default_feeds() -> Vec<FeedConfig> {
    let f = |category, name: &str, url: &str| FeedConfig {
        category,
        name: name.to_string(),
        url: url.to_string(),
        region: None,
    };
    let us = |category, name: &str, query: &str| FeedConfig {
        category,
        name: name.to_string(),
        url: format!("https://news.google.com/rss/search?q={query}&hl=en-US&gl=US&ceid=US:en"),
        region: Some("us".to_string()),
    };
    vec![
        f(
            Category::Keyword,
            "Google News",
            "https://news.google.com/rss?hl=ko&gl=KR&ceid=KR:ko",
        ),
        f(
            Category::Keyword,
            "Google Trends",
            "https://trends.google.com/trending/rss?geo=KR",
        ),
        f(
            Category::Social,
            "Reddit",
            "https://www.reddit.com/r/popular/.rss",
        ),
        f(
            Category::Shopping,
            "Google Shopping News",
            "https://news.google.com/rss/search?q=%ED%95%AB%EB%94%9C&hl=ko&gl=KR&ceid=KR:ko",
        ),
        f(
            Category::Rising,
            "Community",
            "https://news.google.com/rss/search?q=%ED%99%94%EC%A0%9C&hl=ko&gl=KR&ceid=KR:ko",
        ),
        us(Category::Keyword, "Trending", "trending+viral+today"),
        us(Category::Keyword, "Top Stories", "top+stories"),
        us(Category::Social, "TikTok", "TikTok+viral+OR+trending"),
        us(Category::Social, "Reddit", "Reddit+viral+OR+front+page"),
        us(Category::Shopping, "Amazon", "Amazon+best+seller+OR+deal+OR+sale"),
        us(Category::Shopping, "Electronics", "iPhone+OR+MacBook+OR+AirPods+deal"),
        us(Category::Content, "YouTube", "YouTube+viral+OR+trending+video"),
        us(Category::Content, "Streaming", "Netflix+OR+streaming+trending"),
        us(Category::Rising, "Viral", "viral+meme+OR+going+viral"),
        us(Category::Rising, "Breaking", "breaking+news+OR+just+announced"),
    ]
}
