// src/ingest/types.rs
use anyhow::Result;

use crate::model::RawCandidate;

/// One upstream source for a category (a feed list, a chart API, ...).
///
/// A fetch is finite and not restartable; an adapter that iterates several
/// sources internally catches per-source failures itself.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, limit: usize) -> Result<Vec<RawCandidate>>;
    fn name(&self) -> &str;
}

pub type DynSourceAdapter = std::sync::Arc<dyn SourceAdapter>;
