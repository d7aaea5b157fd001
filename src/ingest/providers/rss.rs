use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use metrics::counter;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::types::SourceAdapter;
use crate::model::RawCandidate;
use crate::normalize::clean_title;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// RFC 2822 feed date → RFC 3339, `None` when unparsable.
fn normalize_pub_date(ts: &str) -> Option<String> {
    chrono::DateTime::parse_from_rfc2822(ts.trim())
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc).to_rfc3339())
}

enum FeedSource {
    Fixture(String),
    Http(String),
}

struct Feed {
    name: String,
    source: FeedSource,
}

/// A named list of RSS feeds feeding one category.
///
/// Feeds are fetched concurrently; a feed that fails to download or parse is
/// logged and skipped, so `fetch` itself never fails.
pub struct RssFeedAdapter {
    name: String,
    feeds: Vec<Feed>,
    per_feed_limit: usize,
    client: reqwest::Client,
}

impl RssFeedAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("trend-aggregator/0.1")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            name: name.into(),
            feeds: Vec::new(),
            per_feed_limit: 10,
            client,
        }
    }

    /// Serve a feed from an in-memory document (tests, offline runs).
    pub fn with_fixture(mut self, feed_name: impl Into<String>, xml: impl Into<String>) -> Self {
        self.feeds.push(Feed {
            name: feed_name.into(),
            source: FeedSource::Fixture(xml.into()),
        });
        self
    }

    pub fn with_url(mut self, feed_name: impl Into<String>, url: impl Into<String>) -> Self {
        self.feeds.push(Feed {
            name: feed_name.into(),
            source: FeedSource::Http(url.into()),
        });
        self
    }

    pub fn with_per_feed_limit(mut self, n: usize) -> Self {
        self.per_feed_limit = n.max(1);
        self
    }

    pub fn feed_count(&self) -> usize {
        self.feeds.len()
    }

    /// Parse one RSS document into candidates labelled `feed_name`.
    pub fn parse_feed(xml: &str, feed_name: &str, limit: usize) -> Result<Vec<RawCandidate>> {
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

        let mut out = Vec::with_capacity(rss.channel.item.len().min(limit));
        for it in rss.channel.item {
            if out.len() >= limit {
                break;
            }
            let title = clean_title(it.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                continue;
            }
            let mut c = RawCandidate::new(title, feed_name)
                .with_link(it.link.unwrap_or_default().trim())
                .with_snippet(it.description.unwrap_or_default());
            if let Some(ts) = it.pub_date.as_deref().and_then(normalize_pub_date) {
                c = c.with_meta("publishedAt", ts);
            }
            out.push(c);
        }
        Ok(out)
    }

    async fn fetch_feed(&self, feed: &Feed) -> Result<Vec<RawCandidate>> {
        match &feed.source {
            FeedSource::Fixture(xml) => Self::parse_feed(xml, &feed.name, self.per_feed_limit),
            FeedSource::Http(url) => {
                let resp = self
                    .client
                    .get(url.as_str())
                    .send()
                    .await
                    .with_context(|| format!("rss http get {url}"))?
                    .error_for_status()
                    .with_context(|| format!("rss http status {url}"))?;
                let body = resp.text().await.context("rss http .text()")?;
                Self::parse_feed(&body, &feed.name, self.per_feed_limit)
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for RssFeedAdapter {
    async fn fetch(&self, limit: usize) -> Result<Vec<RawCandidate>> {
        let results = join_all(self.feeds.iter().map(|f| self.fetch_feed(f))).await;

        let mut out = Vec::new();
        for (feed, res) in self.feeds.iter().zip(results) {
            match res {
                Ok(mut v) => out.append(&mut v),
                Err(e) => {
                    tracing::warn!(target: "ingest", adapter = %self.name, feed = %feed.name, error = ?e, "feed failed");
                    counter!("trends_source_errors_total", "category" => "feed").increment(1);
                }
            }
        }
        out.truncate(limit);
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Named HTML entities are not valid XML; map the common ones before parsing.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&middot;", "·")
        .replace("&hellip;", "…")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
