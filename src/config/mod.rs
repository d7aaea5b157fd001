// src/config/mod.rs
//! Service configuration (`config/trends.toml`).
//!
//! Lookup order:
//! 1) $TRENDS_CONFIG_PATH (must exist)
//! 2) config/trends.toml
//! 3) built-in defaults

pub mod llm;
pub mod sources;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use self::llm::LlmConfig;
use self::sources::{default_feeds, FeedConfig, LiveConfig, VideoConfig};

pub const ENV_CONFIG_PATH: &str = "TRENDS_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/trends.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Items kept per category board.
    pub category_limit: usize,
    /// Candidates handed to the extractor per run.
    pub candidate_cap: usize,
    pub per_feed_limit: usize,
    pub adapter_timeout_secs: u64,
    /// Wall-clock budget for one category run.
    pub run_budget_secs: u64,
    pub top_n: usize,
    /// Items read back per category when computing the overall board.
    pub overall_read_depth: usize,
    pub enrich_summaries: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            category_limit: 10,
            candidate_cap: 50,
            per_feed_limit: 10,
            adapter_timeout_secs: 15,
            run_budget_secs: 60,
            top_n: 5,
            overall_read_depth: 10,
            enrich_summaries: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            dir: PathBuf::from("data/trends"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub youtube: VideoConfig,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            llm: LlmConfig::default(),
            store: StoreConfig::default(),
            schedule: ScheduleConfig::default(),
            youtube: VideoConfig::default(),
            live: LiveConfig::default(),
            feeds: default_feeds(),
        }
    }
}

impl AppConfig {
    /// Parse TOML text and resolve env-backed fields.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing trends config toml")?;
        cfg.resolve();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallbacks (see module docs).
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        let mut cfg = AppConfig::default();
        cfg.resolve();
        Ok(cfg)
    }

    fn resolve(&mut self) {
        self.llm.resolve();
        self.youtube.resolve();
        let p = &mut self.pipeline;
        p.category_limit = p.category_limit.max(1);
        p.candidate_cap = p.candidate_cap.max(1);
        p.per_feed_limit = p.per_feed_limit.max(1);
        p.top_n = p.top_n.max(1);
        p.overall_read_depth = p.overall_read_depth.max(1);
        if p.adapter_timeout_secs == 0 {
            p.adapter_timeout_secs = PipelineConfig::default().adapter_timeout_secs;
        }
        if p.run_budget_secs == 0 {
            p.run_budget_secs = PipelineConfig::default().run_budget_secs;
        }
        self.live.limit = self.live.limit.max(1);
        if self.schedule.interval_secs == 0 {
            self.schedule.interval_secs = ScheduleConfig::default().interval_secs;
        }
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline.adapter_timeout_secs)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }

    pub fn run_budget(&self) -> Duration {
        Duration::from_secs(self.pipeline.run_budget_secs)
    }

    pub fn live_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.live.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.pipeline.top_n, 5);
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert!(!cfg.feeds.is_empty());
    }

    #[test]
    fn sections_override_and_sanitize() {
        let s = r#"
            [pipeline]
            top_n = 0
            category_limit = 7

            [store]
            backend = "file"
            dir = "/tmp/x"

            [[feeds]]
            category = "social"
            name = "Board"
            url = "https://example.org/rss"
        "#;
        let mut cfg: AppConfig = toml::from_str(s).unwrap();
        cfg.resolve();
        assert_eq!(cfg.pipeline.top_n, 1);
        assert_eq!(cfg.pipeline.category_limit, 7);
        assert_eq!(cfg.pipeline.candidate_cap, 50);
        assert_eq!(cfg.store.backend, StoreBackend::File);
        assert_eq!(cfg.feeds.len(), 1);
        assert_eq!(cfg.feeds[0].category, Category::Social);
    }
}
