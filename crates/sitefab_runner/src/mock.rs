//! Mock validator for testing.
//!
//! Provides a scripted implementation of the [`Validator`] trait so that
//! pipeline and recovery tests can run without Node tooling.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{RunnerError, RunnerResult};
use crate::validator::{ValidationTarget, Validator, ValidatorKind, Verdict};

type Check = Arc<dyn Fn(&ValidationTarget) -> Verdict + Send + Sync>;

/// Captured call information for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedCall {
    pub kind: ValidatorKind,
    pub unit: Option<String>,
    pub test_file: Option<String>,
}

/// Mock validator for testing.
///
/// For each kind the mock answers, in order of precedence:
///
/// 1. a check function registered with [`MockValidator::with_check`], which
///    can inspect the files under the target root
/// 2. the next scripted verdict for that kind; the last scripted verdict is
///    repeated once the script runs out
/// 3. a passing verdict
#[derive(Clone, Default)]
pub struct MockValidator {
    scripts: Arc<RwLock<HashMap<ValidatorKind, VecDeque<Verdict>>>>,
    last: Arc<RwLock<HashMap<ValidatorKind, Verdict>>>,
    checks: Arc<RwLock<HashMap<ValidatorKind, Check>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    prepared: Arc<RwLock<Vec<PathBuf>>>,
    prepare_failure: Arc<RwLock<Option<String>>>,
}

impl MockValidator {
    /// Create a mock where every kind passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a verdict for the next run of a kind.
    pub fn add_verdict(self, kind: ValidatorKind, verdict: Verdict) -> Self {
        self.scripts
            .write()
            .entry(kind)
            .or_default()
            .push_back(verdict);
        self
    }

    /// Queue several verdicts for a kind.
    pub fn with_verdicts(self, kind: ValidatorKind, verdicts: Vec<Verdict>) -> Self {
        self.scripts
            .write()
            .entry(kind)
            .or_default()
            .extend(verdicts);
        self
    }

    /// Decide verdicts for a kind with a function of the target.
    pub fn with_check(
        self,
        kind: ValidatorKind,
        check: impl Fn(&ValidationTarget) -> Verdict + Send + Sync + 'static,
    ) -> Self {
        self.checks.write().insert(kind, Arc::new(check));
        self
    }

    /// Make `prepare` fail with a message.
    pub fn fail_prepare(self, message: impl Into<String>) -> Self {
        *self.prepare_failure.write() = Some(message.into());
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get calls for a specific kind.
    pub fn get_kind_calls(&self, kind: ValidatorKind) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Roots passed to `prepare`.
    pub fn prepared_roots(&self) -> Vec<PathBuf> {
        self.prepared.read().clone()
    }

    fn next_verdict(&self, kind: ValidatorKind, target: &ValidationTarget) -> Verdict {
        let check = self.checks.read().get(&kind).cloned();
        if let Some(check) = check {
            return check(target);
        }

        let scripted = self
            .scripts
            .write()
            .get_mut(&kind)
            .and_then(|queue| queue.pop_front());
        match scripted {
            Some(verdict) => {
                self.last.write().insert(kind, verdict.clone());
                verdict
            }
            None => self
                .last
                .read()
                .get(&kind)
                .cloned()
                .unwrap_or_else(|| Verdict::pass(format!("{} passed", kind))),
        }
    }
}

#[async_trait]
impl Validator for MockValidator {
    async fn validate(&self, target: &ValidationTarget, kind: ValidatorKind) -> Verdict {
        self.captured_calls.write().push(CapturedCall {
            kind,
            unit: target.unit.clone(),
            test_file: target.test_file.clone(),
        });
        self.next_verdict(kind, target)
    }

    async fn prepare(&self, root: &Path) -> RunnerResult<()> {
        self.prepared.write().push(root.to_path_buf());
        match self.prepare_failure.read().clone() {
            Some(message) => Err(RunnerError::ExecutionFailed(message)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_is_passing() {
        let mock = MockValidator::new();
        let target = ValidationTarget::project("/tmp/site");
        assert!(mock.validate(&target, ValidatorKind::Build).await.passed);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_script_then_repeat_last() {
        let mock = MockValidator::new().with_verdicts(
            ValidatorKind::UnitTest,
            vec![Verdict::fail("TypeError: a"), Verdict::pass("ok")],
        );
        let target = ValidationTarget::unit("/tmp/site", "component:Hero");

        assert!(!mock.validate(&target, ValidatorKind::UnitTest).await.passed);
        assert!(mock.validate(&target, ValidatorKind::UnitTest).await.passed);
        assert!(mock.validate(&target, ValidatorKind::UnitTest).await.passed);

        let calls = mock.get_kind_calls(ValidatorKind::UnitTest);
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].unit.as_deref(), Some("component:Hero"));
    }

    #[tokio::test]
    async fn test_check_takes_precedence() {
        let mock = MockValidator::new()
            .add_verdict(ValidatorKind::Build, Verdict::pass("scripted"))
            .with_check(ValidatorKind::Build, |t| {
                Verdict::fail(format!("checked {}", t.root.display()))
            });
        let verdict = mock
            .validate(&ValidationTarget::project("/p"), ValidatorKind::Build)
            .await;
        assert_eq!(verdict, Verdict::fail("checked /p"));
    }

    #[tokio::test]
    async fn test_prepare_failure() {
        let mock = MockValidator::new().fail_prepare("npm missing");
        assert!(mock.prepare(Path::new("/p")).await.is_err());
        assert_eq!(mock.prepared_roots(), vec![PathBuf::from("/p")]);
    }
}
