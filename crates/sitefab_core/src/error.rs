//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while running the generation pipeline.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid checklist: {0}")]
    InvalidChecklist(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Path escapes the output directory: {0}")]
    PathOutsideWorkspace(String),

    #[error("Planning failed: {0}")]
    Planning(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Spec error: {0}")]
    Spec(#[from] sitefab_spec::SpecError),

    #[error("Knowledge base error: {0}")]
    Kb(#[from] sitefab_kb::KbError),

    #[error("Agent error: {0}")]
    Agent(#[from] sitefab_agents::AgentError),

    #[error("Runner error: {0}")]
    Runner(#[from] sitefab_runner::RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<fs_extra::error::Error> for CoreError {
    fn from(e: fs_extra::error::Error) -> Self {
        CoreError::Workspace(e.to_string())
    }
}
