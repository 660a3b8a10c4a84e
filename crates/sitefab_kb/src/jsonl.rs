//! File-backed knowledge store.
//!
//! Entries are stored one JSON object per line:
//!
//! ```text
//! .sitefab/kb/incidents.jsonl
//! {"signature":"ModuleNotFound:3fa2...","root_cause":"...","fix":{...},...}
//! {"signature":"TypeError:91cc...","root_cause":"...","fix":{...},...}
//! ```
//!
//! The file is only ever appended to. It is read once on first use and kept in
//! an in-process cache afterwards.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::entry::{KbStats, KnowledgeEntry, ScoredEntry};
use crate::error::KbResult;
use crate::fingerprint::Signature;
use crate::store::{compute_stats, latest_for, rank_similar, KnowledgeStore};

/// Default location of the knowledge base file, relative to the working directory.
pub const DEFAULT_KB_PATH: &str = ".sitefab/kb/incidents.jsonl";

/// Knowledge store backed by a JSON-lines file.
pub struct JsonlKnowledgeStore {
    path: PathBuf,
    cache: RwLock<Option<Vec<KnowledgeEntry>>>,
    append_lock: Mutex<()>,
}

impl JsonlKnowledgeStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cache: RwLock::new(None),
            append_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the file into the cache if it has not been loaded yet.
    async fn ensure_loaded(&self) -> KbResult<()> {
        let loaded = self.cache.read().is_some();
        if loaded {
            return Ok(());
        }

        let entries = self.read_file().await?;
        let mut cache = self.cache.write();
        if cache.is_none() {
            debug!(path = ?self.path, entries = entries.len(), "Loaded knowledge base");
            *cache = Some(entries);
        }
        Ok(())
    }

    async fn read_file(&self) -> KbResult<Vec<KnowledgeEntry>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<KnowledgeEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    path = ?self.path,
                    line = index + 1,
                    error = %e,
                    "Skipping corrupt knowledge base line"
                ),
            }
        }
        Ok(entries)
    }

    fn with_entries<R>(&self, f: impl FnOnce(&[KnowledgeEntry]) -> R) -> R {
        let cache = self.cache.read();
        f(cache.as_deref().unwrap_or(&[]))
    }
}

#[async_trait]
impl KnowledgeStore for JsonlKnowledgeStore {
    async fn lookup_exact(&self, signature: &Signature) -> KbResult<Option<KnowledgeEntry>> {
        self.ensure_loaded().await?;
        Ok(self.with_entries(|entries| latest_for(entries, signature).cloned()))
    }

    async fn lookup_similar(&self, error_text: &str, k: usize) -> KbResult<Vec<ScoredEntry>> {
        self.ensure_loaded().await?;
        Ok(self.with_entries(|entries| rank_similar(entries, error_text, k)))
    }

    async fn record(&self, entry: KnowledgeEntry) -> KbResult<()> {
        entry.validate()?;
        let line = serde_json::to_string(&entry)?;

        let _guard = self.append_lock.lock().await;
        self.ensure_loaded().await?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", line).as_bytes()).await?;
        file.flush().await?;

        info!(signature = %entry.signature, "Recorded verified fix");
        if let Some(entries) = self.cache.write().as_mut() {
            entries.push(entry);
        }
        Ok(())
    }

    async fn occurrences(&self, signature: &Signature) -> KbResult<usize> {
        self.ensure_loaded().await?;
        Ok(self.with_entries(|entries| {
            entries.iter().filter(|e| &e.signature == signature).count()
        }))
    }

    async fn stats(&self) -> KbResult<KbStats> {
        self.ensure_loaded().await?;
        Ok(self.with_entries(compute_stats))
    }
}
