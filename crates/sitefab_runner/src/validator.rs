//! Validator trait and types.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RunnerResult;

/// Kind of validation tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    UnitTest,
    Build,
    EndToEnd,
    PerformanceAccessibility,
}

impl ValidatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidatorKind::UnitTest => "unit_test",
            ValidatorKind::Build => "build",
            ValidatorKind::EndToEnd => "end_to_end",
            ValidatorKind::PerformanceAccessibility => "performance_accessibility",
        }
    }

    /// Kinds run during final validation, in order.
    pub fn final_sequence() -> Vec<ValidatorKind> {
        vec![
            ValidatorKind::Build,
            ValidatorKind::EndToEnd,
            ValidatorKind::PerformanceAccessibility,
        ]
    }
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What to validate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationTarget {
    /// Root of the generated project
    pub root: PathBuf,
    /// Unit under test, `None` for project-wide validation
    pub unit: Option<String>,
    /// Test file for unit validation, relative to `root`
    pub test_file: Option<String>,
}

impl ValidationTarget {
    pub fn project(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            unit: None,
            test_file: None,
        }
    }

    pub fn unit(root: impl AsRef<Path>, unit: impl Into<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            unit: Some(unit.into()),
            test_file: None,
        }
    }

    pub fn with_test_file(mut self, test_file: impl Into<String>) -> Self {
        self.test_file = Some(test_file.into());
        self
    }
}

/// Outcome of one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    /// Tool output, the input to fingerprinting when the run failed
    pub log: String,
}

impl Verdict {
    pub fn pass(log: impl Into<String>) -> Self {
        Self {
            passed: true,
            log: log.into(),
        }
    }

    pub fn fail(log: impl Into<String>) -> Self {
        Self {
            passed: false,
            log: log.into(),
        }
    }

    /// Verdict for a kind that has no tool configured.
    pub fn skipped(kind: ValidatorKind) -> Self {
        Self::pass(format!("{} validation skipped: no command configured", kind))
    }
}

/// Result of running a command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Command line that was run
    pub command: String,
    /// Exit code, `-1` when the process was terminated by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Check if execution was successful (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Get combined output (stdout + stderr).
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Validation tool adapter.
///
/// Implementations must not fail: a crashed or timed-out tool is a failing
/// verdict whose log describes the crash. Running the same kind twice on
/// unchanged artefacts must give the same verdict.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Run one kind of validation against a target.
    async fn validate(&self, target: &ValidationTarget, kind: ValidatorKind) -> Verdict;

    /// One-off preparation of a freshly scaffolded project (dependency install).
    async fn prepare(&self, _root: &Path) -> RunnerResult<()> {
        Ok(())
    }
}
