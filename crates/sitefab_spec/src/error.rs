//! Error types for the spec module.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for spec operations.
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors that can occur while reading or validating checklists and plans.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Checklist not found at path: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported checklist format for file {0} (expected .json, .yaml or .yml)")]
    UnsupportedFormat(PathBuf),

    #[error("Checklist validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid project plan: {0}")]
    InvalidPlan(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}
