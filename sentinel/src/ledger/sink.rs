//! Append-only ledger sinks.
//!
//! The trait is the external ledger collaborator's contract. Two in-process
//! implementations ship with the engine:
//! - [`MemoryLedger`]: a `Vec` behind a mutex, for tests and embedding
//! - [`JsonlLedger`]: one JSON object per line, appended to a file

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::entry::LedgerEntry;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode ledger entry: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("ledger rejected entry {id}: {reason}")]
    Rejected { id: String, reason: String },
}

/// Append-only audit sink. Implementations must never rewrite or drop
/// an accepted entry; duplicate ids are theirs to reconcile.
#[async_trait]
pub trait LedgerSink: Send + Sync {
    async fn add_entry(&self, entry: LedgerEntry) -> Result<(), LedgerError>;
}

/// In-memory ledger. Cloning shares the same underlying log.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    entries: Arc<Mutex<Vec<LedgerEntry>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry appended so far, in order.
    pub async fn snapshot(&self) -> Vec<LedgerEntry> {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Entries whose `type` equals `event_type`.
    pub async fn entries_of_type(&self, event_type: &str) -> Vec<LedgerEntry> {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|e| e.event_type() == event_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LedgerSink for MemoryLedger {
    async fn add_entry(&self, entry: LedgerEntry) -> Result<(), LedgerError> {
        self.entries.lock().await.push(entry);
        Ok(())
    }
}

/// JSON-lines file ledger. Opens in append mode on every write so external
/// rotation is safe; writes are serialized through an internal lock.
#[derive(Debug)]
pub struct JsonlLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every entry in the file (skips lines that fail to parse).
    pub async fn read_all(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(LedgerError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| match serde_json::from_str(l) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), "Skipping malformed ledger line: {}", e);
                    None
                }
            })
            .collect())
    }

    fn io_error(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl LedgerSink for JsonlLedger {
    async fn add_entry(&self, entry: LedgerEntry) -> Result<(), LedgerError> {
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))?;
        Ok(())
    }
}
