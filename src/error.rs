//! Error taxonomy.
//!
//! Collaborator and parse errors never leave their component: the caller routes
//! them to a deterministic fallback. Only [`PipelineError`] reaches the top level.

use std::time::Duration;

use crate::model::{Board, Category};

/// Failure of one text-generation call.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("text generation is not configured")]
    Unavailable,
    #[error("text generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("daily call limit of {0} reached")]
    DailyLimit(u32),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("provider returned an empty response")]
    EmptyResponse,
}

/// The collaborator answered, but not with the structure we asked for.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no structured data found in response")]
    NoStructuredData,
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response contained no usable entries")]
    Empty,
}

/// Why a collaborator-backed step fell back to its deterministic path.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl StepError {
    /// Missing credential is an expected state, not a failure worth a warning.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StepError::Llm(LlmError::Unavailable))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("store rejected write: {0}")]
    Rejected(String),
}

/// What a pipeline run reports to its caller.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Every adapter of the category returned zero candidates.
    #[error("no data for category {0}")]
    NoData(Category),
    #[error("persisting {board} failed: {source}")]
    Persistence {
        board: Board,
        #[source]
        source: StoreError,
    },
    #[error("category {0} did not finish within the run budget")]
    BudgetExceeded(Category),
}

impl PipelineError {
    /// "No data" and budget overruns are expected outcomes, not hard failures.
    pub fn is_hard_failure(&self) -> bool {
        matches!(self, PipelineError::Persistence { .. })
    }
}
