// src/analyze/mod.rs
//! Aggregation core: extraction, merging, ranking and narrative summaries.

pub mod ai_adapter;
pub mod extract;
pub mod heuristics;
pub mod merge;
pub mod meta;
pub mod ranking;
pub mod response;

pub use ai_adapter::{build_client_from_config, DynTextGenerator, TextGenerator};
pub use extract::TopicExtractor;
pub use merge::MergeEngine;
pub use meta::Summarizer;
pub use ranking::RankingAggregator;
