//! # sitefab_agents
//!
//! Typed agent invocation for the siteFab pipeline.
//!
//! Every agent role takes a structured request and returns a structured
//! response or an error. The pipeline never sees raw model text:
//!
//! - [`AgentInvoker`]: the single invocation boundary
//! - [`Agents`]: typed helpers per role over any invoker
//! - [`LlmAgentInvoker`]: prompts a completion model and parses its JSON reply
//! - [`RetryingInvoker`]: transport retries with linear back-off and timeouts
//! - [`ScriptedInvoker`]: canned responses for tests

pub mod error;
pub mod extract;
pub mod invoker;
pub mod llm;
pub mod llm_invoker;
pub mod mock;
pub mod prompts;
pub mod request;
pub mod retry;
pub mod roles;

pub use error::{AgentError, AgentResult};
pub use extract::{extract_json, parse_response};
pub use invoker::{AgentInvoker, Agents};
pub use llm::{CompletionClient, LlmAdapter, LlmProvider};
pub use llm_invoker::LlmAgentInvoker;
pub use mock::ScriptedInvoker;
pub use prompts::PromptSet;
pub use request::{
    AdvisoryContext, AgentRequest, AgentResponse, AttemptSummary, CodeRequest, CopyDeck,
    CopyRequest, DesignRequest, DesignSpec, Diagnosis, DiagnosisRequest, E2eRequest,
    FileAnalysis, FileAnalysisRequest, FixRequest, GeneratedFile, PlanRequest, SourceFile,
    TestRequest, REFERENCE_ONLY_NOTE,
};
pub use retry::{RetryPolicy, RetryingInvoker};
pub use roles::AgentRole;
