//! Append-only result storage behind the relay's save endpoint.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::session::ResultsSummary;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not encode result record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A saved result with its generated identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResult {
    pub id: String,
    pub saved_at: DateTime<Utc>,
    pub results: ResultsSummary,
}

impl StoredResult {
    fn new(results: ResultsSummary) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            saved_at: Utc::now(),
            results,
        }
    }
}

/// Append-only collection writer.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn append(&self, results: ResultsSummary) -> Result<StoredResult, StoreError>;
}

/// In-process store, mostly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<StoredResult>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<StoredResult> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn append(&self, results: ResultsSummary) -> Result<StoredResult, StoreError> {
        let record = StoredResult::new(results);
        self.records.lock().await.push(record.clone());
        Ok(record)
    }
}

/// One JSON record per line; lines are only ever appended.
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records in write order. A missing file is an empty store.
    pub async fn load(&self) -> Result<Vec<StoredResult>, StoreError> {
        read_records(&self.path).await
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl ResultStore for JsonlStore {
    async fn append(&self, results: ResultsSummary) -> Result<StoredResult, StoreError> {
        let record = StoredResult::new(results);
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_err(e))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_err(e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.io_err(e))?;
        file.flush().await.map_err(|e| self.io_err(e))?;
        info!(id = %record.id, path = %self.path.display(), "result saved");
        Ok(record)
    }
}

/// Read a JSON-lines store file. Blank lines are skipped, and so are lines that
/// do not parse (a torn final write, hand edits), each with a warning.
pub async fn read_records(path: &Path) -> Result<Vec<StoredResult>, StoreError> {
    let txt = match tokio::fs::read_to_string(path).await {
        Ok(txt) => txt,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let mut records = Vec::new();
    for (idx, line) in txt.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<StoredResult>(line) {
            Ok(record) => records.push(record),
            Err(err) => {
                warn!(path = %path.display(), line = idx + 1, %err, "skipping unreadable store line");
            }
        }
    }
    Ok(records)
}
