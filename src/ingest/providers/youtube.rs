use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::ingest::types::SourceAdapter;
use crate::model::RawCandidate;

const API_URL: &str = "https://www.googleapis.com/youtube/v3/videos";

#[derive(Debug, Deserialize)]
struct VideoList {
    #[serde(default)]
    items: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    id: String,
    snippet: Snippet,
    #[serde(default)]
    statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    medium: Option<Thumb>,
    default: Option<Thumb>,
}

#[derive(Debug, Deserialize)]
struct Thumb {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
}

/// Compact view count: `1234` → `1.2K views`, `3400000` → `3.4M views`.
pub fn format_view_count(raw: Option<&str>) -> String {
    let Some(n) = raw.and_then(|s| s.trim().parse::<u64>().ok()) else {
        return String::new();
    };
    let f = n as f64;
    if n >= 1_000_000_000 {
        format!("{:.1}B views", f / 1e9)
    } else if n >= 1_000_000 {
        format!("{:.1}M views", f / 1e6)
    } else if n >= 1_000 {
        format!("{:.1}K views", f / 1e3)
    } else {
        format!("{n} views")
    }
}

enum Mode {
    Fixture(String),
    Http {
        api_key: String,
        region: String,
        client: reqwest::Client,
    },
}

/// Most-popular chart of the video API; results arrive already ranked.
pub struct VideoApiAdapter {
    mode: Mode,
}

impl VideoApiAdapter {
    /// An empty key is accepted here; `fetch` then fails and the category
    /// simply gets zero candidates from this adapter.
    pub fn new(api_key: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            mode: Mode::Http {
                api_key: api_key.into(),
                region: region.into(),
                client: reqwest::Client::new(),
            },
        }
    }

    /// Serve a recorded API response body.
    pub fn from_fixture(json: impl Into<String>) -> Self {
        Self {
            mode: Mode::Fixture(json.into()),
        }
    }

    pub fn parse_response(body: &str, limit: usize) -> Result<Vec<RawCandidate>> {
        let list: VideoList = serde_json::from_str(body).context("parsing video api json")?;
        Ok(list
            .items
            .into_iter()
            .take(limit)
            .map(|v| {
                let thumb = v
                    .snippet
                    .thumbnails
                    .medium
                    .or(v.snippet.thumbnails.default)
                    .map(|t| t.url);
                let views = format_view_count(
                    v.statistics
                        .as_ref()
                        .and_then(|s| s.view_count.as_deref()),
                );
                let mut c = RawCandidate::new(v.snippet.title, "YouTube")
                    .with_link(format!("https://www.youtube.com/watch?v={}", v.id))
                    .with_snippet(v.snippet.description)
                    .with_meta("videoId", v.id)
                    .with_meta("viewCount", views)
                    .with_meta("channelTitle", v.snippet.channel_title);
                if let Some(t) = thumb {
                    c = c.with_thumbnail(t);
                }
                c
            })
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for VideoApiAdapter {
    async fn fetch(&self, limit: usize) -> Result<Vec<RawCandidate>> {
        match &self.mode {
            Mode::Fixture(body) => Self::parse_response(body, limit),
            Mode::Http {
                api_key,
                region,
                client,
            } => {
                if api_key.trim().is_empty() {
                    return Err(anyhow!("video api key is not configured"));
                }
                let max = limit.clamp(1, 50).to_string();
                let body = client
                    .get(API_URL)
                    .query(&[
                        ("part", "snippet,statistics"),
                        ("chart", "mostPopular"),
                        ("regionCode", region.as_str()),
                        ("maxResults", max.as_str()),
                        ("key", api_key.as_str()),
                    ])
                    .send()
                    .await
                    .context("video api get()")?
                    .error_for_status()
                    .context("video api status")?
                    .text()
                    .await
                    .context("video api .text()")?;
                Self::parse_response(&body, limit)
            }
        }
    }

    fn name(&self) -> &str {
        "YouTube"
    }
}
