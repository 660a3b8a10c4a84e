//! Error types for agent invocation.

use thiserror::Error;

use crate::roles::AgentRole;

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur while invoking an agent.
///
/// Every variant is an invocation failure from the caller's point of view.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("Agent {role} invocation failed: {message}")]
    Invocation { role: AgentRole, message: String },

    #[error("Agent {role} returned unparseable output: {message}")]
    Parse { role: AgentRole, message: String },

    #[error("Agent {role} timed out after {seconds}s")]
    Timeout { role: AgentRole, seconds: u64 },

    #[error("Expected a {expected} response, got {actual}")]
    UnexpectedResponse {
        expected: AgentRole,
        actual: AgentRole,
    },

    #[error("LLM not configured: {0}")]
    NotConfigured(String),
}

impl AgentError {
    /// Create an invocation error.
    pub fn invocation(role: AgentRole, message: impl Into<String>) -> Self {
        Self::Invocation {
            role,
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(role: AgentRole, message: impl Into<String>) -> Self {
        Self::Parse {
            role,
            message: message.into(),
        }
    }

    /// Role the failed call was addressed to, if known.
    pub fn role(&self) -> Option<AgentRole> {
        match self {
            AgentError::Invocation { role, .. }
            | AgentError::Parse { role, .. }
            | AgentError::Timeout { role, .. } => Some(*role),
            AgentError::UnexpectedResponse { expected, .. } => Some(*expected),
            AgentError::NotConfigured(_) => None,
        }
    }
}
