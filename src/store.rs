//! Persistence Store: one board of ranked items per category plus "overall".
//!
//! `replace` is an overwrite of the whole board. Readers see either the old
//! board or the new one, never a mix.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{Board, TrendItem};

#[async_trait]
pub trait TrendStore: Send + Sync {
    async fn replace(&self, board: Board, items: &[TrendItem]) -> Result<(), StoreError>;
    /// At most `n` items in rank order; an unknown board reads as empty.
    async fn read_top(&self, board: Board, n: usize) -> Result<Vec<TrendItem>, StoreError>;
    async fn last_updated(&self, board: Board) -> Result<Option<DateTime<Utc>>, StoreError>;
}

/// On-disk / in-memory representation of one board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBoard {
    pub updated_at: DateTime<Utc>,
    pub items: Vec<TrendItem>,
}

impl StoredBoard {
    fn new(items: &[TrendItem]) -> Self {
        let mut items = items.to_vec();
        items.sort_by_key(|it| it.rank);
        Self {
            updated_at: Utc::now(),
            items,
        }
    }

    fn top(&self, n: usize) -> Vec<TrendItem> {
        self.items.iter().take(n).cloned().collect()
    }
}

// ------------------------------------------------------------
// In-memory
// ------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    boards: RwLock<HashMap<Board, StoredBoard>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrendStore for MemoryStore {
    async fn replace(&self, board: Board, items: &[TrendItem]) -> Result<(), StoreError> {
        let stored = StoredBoard::new(items);
        let mut g = self.boards.write().map_err(|_| StoreError::Poisoned)?;
        g.insert(board, stored);
        Ok(())
    }

    async fn read_top(&self, board: Board, n: usize) -> Result<Vec<TrendItem>, StoreError> {
        let g = self.boards.read().map_err(|_| StoreError::Poisoned)?;
        Ok(g.get(&board).map(|b| b.top(n)).unwrap_or_default())
    }

    async fn last_updated(&self, board: Board) -> Result<Option<DateTime<Utc>>, StoreError> {
        let g = self.boards.read().map_err(|_| StoreError::Poisoned)?;
        Ok(g.get(&board).map(|b| b.updated_at))
    }
}

// ------------------------------------------------------------
// File-backed: <dir>/<board>.json, written to a temp file + rename
// ------------------------------------------------------------

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, board: Board) -> PathBuf {
        self.dir.join(format!("{}.json", board.as_str()))
    }

    async fn load(&self, board: Board) -> Result<Option<StoredBoard>, StoreError> {
        match tokio::fs::read(self.path(board)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl TrendStore for FileStore {
    async fn replace(&self, board: Board, items: &[TrendItem]) -> Result<(), StoreError> {
        let path = self.path(board);
        let dir = self.dir.clone();
        let json = serde_json::to_vec_pretty(&StoredBoard::new(items))?;
        // Each write gets its own temp file, so concurrent replaces of one
        // board never rename each other's file away.
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&json)?;
            tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))??;
        tracing::debug!(target: "store", board = %board, n = items.len(), "board replaced");
        Ok(())
    }

    async fn read_top(&self, board: Board, n: usize) -> Result<Vec<TrendItem>, StoreError> {
        Ok(self.load(board).await?.map(|b| b.top(n)).unwrap_or_default())
    }

    async fn last_updated(&self, board: Board) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.load(board).await?.map(|b| b.updated_at))
    }
}
