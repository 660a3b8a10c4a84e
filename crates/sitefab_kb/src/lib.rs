//! # sitefab_kb
//!
//! Error fingerprinting and the knowledge base of verified fixes.
//!
//! The knowledge base is append-only and advisory: lookups provide reference
//! material for a diagnosis, they are never applied to generated code.
//!
//! - [`fingerprint`]: normalise a validator log into a stable [`Signature`]
//! - [`KnowledgeStore`]: exact and similarity lookup, append-only recording
//! - [`JsonlKnowledgeStore`]: JSON-lines file implementation
//! - [`MemoryKnowledgeStore`]: in-process implementation

pub mod entry;
pub mod error;
pub mod fingerprint;
pub mod jsonl;
pub mod memory;
pub mod store;

pub use entry::{FixPayload, KbStats, KnowledgeEntry, ScoredEntry};
pub use error::{KbError, KbResult};
pub use fingerprint::{fingerprint, Fingerprint, Signature};
pub use jsonl::{JsonlKnowledgeStore, DEFAULT_KB_PATH};
pub use memory::MemoryKnowledgeStore;
pub use store::KnowledgeStore;
