//! Knowledge store trait and shared lookup logic.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;

use crate::entry::{KbStats, KnowledgeEntry, ScoredEntry};
use crate::error::KbResult;
use crate::fingerprint::{Fingerprint, Signature};

/// Weight of token overlap in the similarity score.
const TOKEN_WEIGHT: f64 = 0.8;

/// Bonus for entries whose signature shares the query's error category.
const CATEGORY_BONUS: f64 = 0.2;

/// Append-only store of verified fixes.
///
/// Results are advisory. Callers must never apply a stored fix directly.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Most recent entry recorded for a signature.
    async fn lookup_exact(&self, signature: &Signature) -> KbResult<Option<KnowledgeEntry>>;

    /// Up to `k` entries ranked by similarity to an error log.
    async fn lookup_similar(&self, error_text: &str, k: usize) -> KbResult<Vec<ScoredEntry>>;

    /// Append an entry.
    async fn record(&self, entry: KnowledgeEntry) -> KbResult<()>;

    /// Number of entries recorded for a signature.
    async fn occurrences(&self, signature: &Signature) -> KbResult<usize>;

    /// Aggregate counts.
    async fn stats(&self) -> KbResult<KbStats>;
}

/// Last entry with the given signature.
pub fn latest_for<'a>(
    entries: &'a [KnowledgeEntry],
    signature: &Signature,
) -> Option<&'a KnowledgeEntry> {
    entries
        .iter()
        .filter(|e| &e.signature == signature)
        .max_by(|a, b| a.timestamp.cmp(&b.timestamp))
}

/// Rank entries by similarity to `error_text`, keeping the top `k` non-zero scores.
///
/// The score is a weighted token-set Jaccard index between normalised logs,
/// plus a bonus when the error categories match. Entries with no token
/// overlap are omitted.
pub fn rank_similar(entries: &[KnowledgeEntry], error_text: &str, k: usize) -> Vec<ScoredEntry> {
    if k == 0 {
        return Vec::new();
    }

    let query_tokens = Fingerprint::tokens(error_text);
    let query_category = Fingerprint::category(error_text);

    let mut scored: Vec<ScoredEntry> = entries
        .iter()
        .filter_map(|entry| {
            let overlap = jaccard(&query_tokens, &Fingerprint::tokens(&entry.raw_log));
            if overlap <= 0.0 {
                return None;
            }
            let bonus = if entry.signature.category() == query_category {
                CATEGORY_BONUS
            } else {
                0.0
            };
            Some(ScoredEntry {
                score: overlap * TOKEN_WEIGHT + bonus,
                entry: entry.clone(),
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.entry.timestamp.cmp(&a.entry.timestamp))
    });
    scored.truncate(k);
    scored
}

/// Compute counts over a set of entries.
pub fn compute_stats(entries: &[KnowledgeEntry]) -> KbStats {
    let distinct: HashSet<&Signature> = entries.iter().map(|e| &e.signature).collect();
    let mut by_category = BTreeMap::new();
    for entry in entries {
        *by_category
            .entry(entry.signature.category().to_string())
            .or_insert(0) += 1;
    }
    KbStats {
        entries: entries.len(),
        distinct_signatures: distinct.len(),
        by_category,
    }
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}
