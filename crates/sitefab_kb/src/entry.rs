//! Knowledge base records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{KbError, KbResult};
use crate::fingerprint::Signature;

/// The file content that fixed an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixPayload {
    /// Workspace-relative path of the rewritten file
    pub file: String,
    /// Full file content after the fix
    pub content: String,
}

/// A verified fix for an error signature.
///
/// Entries are written only after the fix passed re-validation and are never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub signature: Signature,
    pub root_cause: String,
    /// Narrative of how the fix was reached
    pub reasoning: String,
    pub fix: FixPayload,
    /// Agent that produced the diagnosis
    pub agent: String,
    /// Recovery attempt at which the fix succeeded
    pub attempt: u32,
    pub raw_log: String,
    pub timestamp: DateTime<Utc>,
}

impl KnowledgeEntry {
    pub fn new(signature: Signature, raw_log: impl Into<String>, fix: FixPayload) -> Self {
        Self {
            signature,
            root_cause: String::new(),
            reasoning: String::new(),
            fix,
            agent: String::new(),
            attempt: 1,
            raw_log: raw_log.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_root_cause(mut self, root_cause: impl Into<String>) -> Self {
        self.root_cause = root_cause.into();
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn by_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = agent.into();
        self
    }

    pub fn at_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Reject entries that cannot be useful to a later diagnosis.
    pub fn validate(&self) -> KbResult<()> {
        if self.signature.as_str().is_empty() {
            return Err(KbError::InvalidEntry("empty signature".to_string()));
        }
        if self.fix.file.trim().is_empty() {
            return Err(KbError::InvalidEntry("fix has no target file".to_string()));
        }
        if self.attempt == 0 {
            return Err(KbError::InvalidEntry("attempt numbers start at 1".to_string()));
        }
        Ok(())
    }
}

/// An entry returned by a similarity lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEntry {
    /// Similarity in `(0, 1]`
    pub score: f64,
    pub entry: KnowledgeEntry,
}

/// Aggregate counts over the knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbStats {
    pub entries: usize,
    pub distinct_signatures: usize,
    pub by_category: BTreeMap<String, usize>,
}
