//! In-process knowledge store.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::entry::{KbStats, KnowledgeEntry, ScoredEntry};
use crate::error::KbResult;
use crate::fingerprint::Signature;
use crate::store::{compute_stats, latest_for, rank_similar, KnowledgeStore};

/// Knowledge store held in memory. Used in tests and runs without persistence.
#[derive(Default)]
pub struct MemoryKnowledgeStore {
    entries: RwLock<Vec<KnowledgeEntry>>,
}

impl MemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with entries.
    pub fn with_entries(entries: Vec<KnowledgeEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Snapshot of all recorded entries.
    pub fn entries(&self) -> Vec<KnowledgeEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KnowledgeStore for MemoryKnowledgeStore {
    async fn lookup_exact(&self, signature: &Signature) -> KbResult<Option<KnowledgeEntry>> {
        Ok(latest_for(&self.entries.read(), signature).cloned())
    }

    async fn lookup_similar(&self, error_text: &str, k: usize) -> KbResult<Vec<ScoredEntry>> {
        Ok(rank_similar(&self.entries.read(), error_text, k))
    }

    async fn record(&self, entry: KnowledgeEntry) -> KbResult<()> {
        entry.validate()?;
        self.entries.write().push(entry);
        Ok(())
    }

    async fn occurrences(&self, signature: &Signature) -> KbResult<usize> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|e| &e.signature == signature)
            .count())
    }

    async fn stats(&self) -> KbResult<KbStats> {
        Ok(compute_stats(&self.entries.read()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::FixPayload;
    use crate::fingerprint::fingerprint;

    fn fix() -> FixPayload {
        FixPayload {
            file: "package.json".to_string(),
            content: "{}".to_string(),
        }
    }

    #[tokio::test]
    async fn test_record_is_append_only() {
        let store = MemoryKnowledgeStore::new();
        let log = "Error: Cannot find module 'react'";
        let sig = fingerprint(log);

        store
            .record(KnowledgeEntry::new(sig.clone(), log, fix()).with_root_cause("first"))
            .await
            .unwrap();
        store
            .record(KnowledgeEntry::new(sig.clone(), log, fix()).with_root_cause("second"))
            .await
            .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.occurrences(&sig).await.unwrap(), 2);
        let latest = store.lookup_exact(&sig).await.unwrap().unwrap();
        assert_eq!(latest.root_cause, "second");
    }

    #[tokio::test]
    async fn test_invalid_entry_is_rejected() {
        let store = MemoryKnowledgeStore::new();
        let entry = KnowledgeEntry::new(fingerprint("x"), "x", fix()).at_attempt(0);
        assert!(store.record(entry).await.is_err());
        assert!(store.is_empty());
    }
}
