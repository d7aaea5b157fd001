//! model.rs: shared shapes flowing through the aggregation core.
//!
//! `RawCandidate` is what a source adapter hands over, `TrendItem` is the
//! normalized unit every component works on, and `WeightedTrend` / `MergeGroup`
//! only live for the duration of one overall-ranking pass.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The five fixed trend domains. "overall" is a derived view, see [`Board`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Keyword,
    Social,
    Content,
    Shopping,
    Rising,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Keyword,
        Category::Social,
        Category::Content,
        Category::Shopping,
        Category::Rising,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Keyword => "keyword",
            Category::Social => "social",
            Category::Content => "content",
            Category::Shopping => "shopping",
            Category::Rising => "rising",
        }
    }

    /// Human-facing label used by the JSON surface.
    pub fn label(self) -> &'static str {
        match self {
            Category::Keyword => "News",
            Category::Social => "Social",
            Category::Content => "YouTube",
            Category::Shopping => "Shopping",
            Category::Rising => "Rising",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownBoard;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyword" => Ok(Category::Keyword),
            "social" => Ok(Category::Social),
            "content" => Ok(Category::Content),
            "shopping" => Ok(Category::Shopping),
            "rising" => Ok(Category::Rising),
            _ => Err(UnknownBoard(s.to_string())),
        }
    }
}

/// Storage key: one board per category plus the derived overall ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Board {
    Category(Category),
    Overall,
}

impl Board {
    pub fn as_str(self) -> &'static str {
        match self {
            Board::Category(c) => c.as_str(),
            Board::Overall => "overall",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Board::Category(c) => c.label(),
            Board::Overall => "Overall",
        }
    }
}

impl From<Category> for Board {
    fn from(c: Category) -> Self {
        Board::Category(c)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Board {
    type Err = UnknownBoard;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("overall") {
            return Ok(Board::Overall);
        }
        s.parse::<Category>().map(Board::Category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category or board: {0:?}")]
pub struct UnknownBoard(pub String);

/// One raw item produced by a source adapter for a single fetch cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub title: String,
    pub link: Option<String>,
    /// Which feed/platform produced the item, e.g. "Google News", "Instagram".
    pub source_label: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Adapter-specific extras carried straight into `TrendItem::metadata`.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl RawCandidate {
    pub fn new(title: impl Into<String>, source_label: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: None,
            source_label: source_label.into(),
            snippet: String::new(),
            thumbnail: None,
            metadata: Map::new(),
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        let link = link.into();
        self.link = if link.trim().is_empty() { None } else { Some(link) };
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Normalized unit flowing through the core.
///
/// `rank` is a position, not an identity: it is reassigned whenever a list is
/// resorted. `metadata` is always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendItem {
    pub rank: u32,
    pub title: String,
    pub summary: Option<String>,
    pub source_url: Option<String>,
    pub source_name: String,
    pub change_rate: Option<f64>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub category: Category,
}

impl TrendItem {
    pub fn new(
        category: Category,
        rank: u32,
        title: impl Into<String>,
        source_name: impl Into<String>,
    ) -> Self {
        Self {
            rank,
            title: title.into(),
            summary: None,
            source_url: None,
            source_name: source_name.into(),
            change_rate: None,
            thumbnail: None,
            metadata: Map::new(),
            category,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        let s = summary.into();
        self.summary = if s.trim().is_empty() { None } else { Some(s) };
        self
    }

    pub fn with_source_url(mut self, url: Option<String>) -> Self {
        self.source_url = url;
        self
    }

    pub fn with_change_rate(mut self, rate: f64) -> Self {
        self.change_rate = Some(rate);
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: Option<String>) -> Self {
        self.thumbnail = thumbnail;
        self
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Reassign `rank = 1..N` in the current order.
pub fn rerank(items: &mut [TrendItem]) {
    for (i, it) in items.iter_mut().enumerate() {
        it.rank = (i + 1) as u32;
    }
}

/// True when the ranks form the contiguous sequence 1..N (any order).
pub fn ranks_contiguous(items: &[TrendItem]) -> bool {
    let mut ranks: Vec<u32> = items.iter().map(|i| i.rank).collect();
    ranks.sort_unstable();
    ranks.iter().enumerate().all(|(i, &r)| r == (i + 1) as u32)
}

/// A `TrendItem` pooled for the overall ranking, carrying its weighted score.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedTrend {
    pub item: TrendItem,
    pub score: f64,
    pub original_category: Category,
}

impl WeightedTrend {
    pub fn new(item: TrendItem, score: f64) -> Self {
        let original_category = item.category;
        Self {
            item,
            score,
            original_category,
        }
    }
}

/// Pool indices the merge step considers one real-world topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeGroup {
    pub members: Vec<usize>,
    pub representative: usize,
    pub title_override: Option<String>,
}
