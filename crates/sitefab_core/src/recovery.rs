//! Self-healing recovery loop.
//!
//! Given a failing validation, repeatedly analyse, consult the knowledge base,
//! fix and re-verify until the failure is gone or the trial budget runs out.
//!
//! Knowledge base content only ever reaches the debugger as advisory context.
//! The single writer of project files here is the coder's fix response, and an
//! entry is recorded only after re-verification passed.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sitefab_agents::{
    AdvisoryContext, Agents, AttemptSummary, CodeRequest, Diagnosis, DiagnosisRequest, FixRequest,
    SourceFile,
};
use sitefab_kb::{fingerprint, FixPayload, KnowledgeEntry, KnowledgeStore, Signature};
use sitefab_runner::{ValidationTarget, Validator, ValidatorKind, Verdict};

use crate::workspace::Workspace;

/// Agent name stored with knowledge base entries.
pub const DIAGNOSING_AGENT: &str = "debugger";

/// What a recovery run is repairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// A single component or page, by unit id
    Unit(String),
    /// The whole project (final validation)
    Project,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Unit(id) => write!(f, "{}", id),
            Scope::Project => write!(f, "project"),
        }
    }
}

/// One observed validation failure. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub raw_log: String,
    pub signature: Signature,
    pub timestamp: DateTime<Utc>,
    /// Unit id or `project`
    pub scope: String,
    /// Validator kind that reported the failure
    pub kind: ValidatorKind,
    pub attempt: u32,
}

impl ErrorRecord {
    pub fn new(raw_log: &str, kind: ValidatorKind, scope: &Scope, attempt: u32) -> Self {
        Self {
            raw_log: raw_log.to_string(),
            signature: fingerprint(raw_log),
            timestamp: Utc::now(),
            scope: scope.to_string(),
            kind,
            attempt,
        }
    }
}

/// Recovery loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryState {
    Analyzing,
    Consulting,
    Fixing,
    Reverifying,
    Resolved,
    Exhausted,
    Cancelled,
}

/// How one attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Re-verification passed
    Resolved,
    /// The fix was applied but validation still fails
    StillFailing,
    /// File analysis could not be obtained
    AnalysisFailed(String),
    /// The debugger did not return a diagnosis
    DiagnosisFailed(String),
    /// The diagnosed file does not exist in the workspace
    UnresolvedTarget(String),
    /// The coder did not produce a usable fix, or it could not be written
    FixFailed(String),
    Cancelled,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Resolved => write!(f, "resolved"),
            AttemptOutcome::StillFailing => write!(f, "still failing after fix"),
            AttemptOutcome::AnalysisFailed(e) => write!(f, "file analysis failed: {}", e),
            AttemptOutcome::DiagnosisFailed(e) => write!(f, "diagnosis failed: {}", e),
            AttemptOutcome::UnresolvedTarget(p) => write!(f, "fix target not found: {}", p),
            AttemptOutcome::FixFailed(e) => write!(f, "fix failed: {}", e),
            AttemptOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// History entry for one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub signature: Signature,
    pub root_cause: Option<String>,
    pub fix_target: Option<String>,
    pub outcome: AttemptOutcome,
}

impl AttemptRecord {
    fn new(attempt: u32, signature: Signature, outcome: AttemptOutcome) -> Self {
        Self {
            attempt,
            signature,
            root_cause: None,
            fix_target: None,
            outcome,
        }
    }

    fn diagnosed(mut self, diagnosis: &Diagnosis) -> Self {
        self.root_cause = Some(diagnosis.root_cause_analysis.clone());
        self
    }

    fn targeting(mut self, target: &str) -> Self {
        self.fix_target = Some(target.to_string());
        self
    }

    /// Form handed back to the debugger as history.
    pub fn summary(&self) -> AttemptSummary {
        AttemptSummary {
            attempt: self.attempt,
            signature: self.signature.clone(),
            root_cause: self.root_cause.clone(),
            fix_target: self.fix_target.clone(),
            outcome: self.outcome.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStatus {
    Resolved,
    Exhausted,
    Cancelled,
}

/// Result of a recovery run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryOutcome {
    pub status: RecoveryStatus,
    pub attempts: Vec<AttemptRecord>,
    pub error_records: Vec<ErrorRecord>,
    /// Last failing log seen
    pub last_log: String,
}

impl RecoveryOutcome {
    pub fn is_resolved(&self) -> bool {
        self.status == RecoveryStatus::Resolved
    }

    /// Number of attempts consumed from the trial budget.
    pub fn trials(&self) -> u32 {
        self.attempts.len() as u32
    }

    /// Root causes named by the debugger, in attempt order.
    pub fn root_causes(&self) -> Vec<String> {
        self.attempts
            .iter()
            .filter_map(|a| a.root_cause.clone())
            .collect()
    }

    pub fn failure_report(&self, scope: &Scope) -> FailureReport {
        FailureReport {
            scope: scope.to_string(),
            last_log: self.last_log.clone(),
            root_causes: self.root_causes(),
            attempts: self.attempts.clone(),
        }
    }
}

/// User-facing description of an unrecovered failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub scope: String,
    pub last_log: String,
    pub root_causes: Vec<String>,
    pub attempts: Vec<AttemptRecord>,
}

impl FailureReport {
    /// Report for a failure that happened before any validation ran.
    pub fn generation_failed(scope: &Scope, message: impl Into<String>) -> Self {
        Self {
            scope: scope.to_string(),
            last_log: message.into(),
            root_causes: Vec::new(),
            attempts: Vec::new(),
        }
    }
}

/// Input for one recovery run.
#[derive(Debug, Clone)]
pub struct RecoveryRequest {
    pub scope: Scope,
    /// Validation target for re-verification
    pub target: ValidationTarget,
    /// The failing verdict that triggered recovery
    pub failure: Verdict,
    pub failed_kind: ValidatorKind,
    /// Kinds re-run after each fix, in order
    pub rerun: Vec<ValidatorKind>,
    /// Maximum number of attempts
    pub budget: u32,
    /// Files always given to the debugger, such as the unit's own artefacts
    pub focus_files: Vec<String>,
}

impl RecoveryRequest {
    pub fn new(
        scope: Scope,
        target: ValidationTarget,
        failed_kind: ValidatorKind,
        failure: Verdict,
        budget: u32,
    ) -> Self {
        Self {
            scope,
            target,
            failure,
            failed_kind,
            rerun: vec![failed_kind],
            budget,
            focus_files: Vec::new(),
        }
    }

    pub fn rerun(mut self, kinds: Vec<ValidatorKind>) -> Self {
        self.rerun = kinds;
        self
    }

    pub fn focus_on(mut self, files: Vec<String>) -> Self {
        self.focus_files = files;
        self
    }
}

/// Runs `future` unless `cancel` fires first.
pub(crate) async fn or_cancel<F: Future>(cancel: &CancellationToken, future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = future => Some(output),
    }
}

/// Run validator kinds in order, stopping at the first failure.
pub(crate) async fn verify_sequence(
    validator: &dyn Validator,
    target: &ValidationTarget,
    kinds: &[ValidatorKind],
) -> Result<(), (ValidatorKind, Verdict)> {
    for &kind in kinds {
        let verdict = validator.validate(target, kind).await;
        if !verdict.passed {
            return Err((kind, verdict));
        }
        debug!(kind = %kind, "Validation passed");
    }
    Ok(())
}

enum Step {
    Resolved,
    Retry { log: String, kind: ValidatorKind },
    Cancelled,
}

/// The recovery loop and its collaborators.
#[derive(Clone)]
pub struct RecoveryLoop {
    agents: Agents,
    kb: Arc<dyn KnowledgeStore>,
    validator: Arc<dyn Validator>,
    workspace: Workspace,
    similar_k: usize,
}

impl RecoveryLoop {
    pub fn new(
        agents: Agents,
        kb: Arc<dyn KnowledgeStore>,
        validator: Arc<dyn Validator>,
        workspace: Workspace,
    ) -> Self {
        Self {
            agents,
            kb,
            validator,
            workspace,
            similar_k: 2,
        }
    }

    pub fn with_similar_k(mut self, k: usize) -> Self {
        self.similar_k = k;
        self
    }

    /// Run recovery until resolved, exhausted or cancelled.
    pub async fn run(&self, request: RecoveryRequest, cancel: &CancellationToken) -> RecoveryOutcome {
        let scope = request.scope.clone();
        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut error_records: Vec<ErrorRecord> = Vec::new();
        let mut log = request.failure.log.clone();
        let mut kind = request.failed_kind;

        info!(scope = %scope, budget = request.budget, "Starting recovery");

        for n in 1..=request.budget {
            if cancel.is_cancelled() {
                return finish(RecoveryStatus::Cancelled, attempts, error_records, log);
            }

            let record = ErrorRecord::new(&log, kind, &scope, n);
            info!(
                scope = %scope,
                attempt = n,
                signature = %record.signature,
                "Recovery attempt"
            );
            error_records.push(record.clone());

            match self.attempt(&request, &record, &mut attempts, cancel).await {
                Step::Resolved => {
                    info!(scope = %scope, attempt = n, "Recovery resolved");
                    return finish(RecoveryStatus::Resolved, attempts, error_records, log);
                }
                Step::Cancelled => {
                    return finish(RecoveryStatus::Cancelled, attempts, error_records, log);
                }
                Step::Retry {
                    log: next_log,
                    kind: next_kind,
                } => {
                    log = next_log;
                    kind = next_kind;
                }
            }
        }

        warn!(scope = %scope, attempts = attempts.len(), "Recovery exhausted");
        finish(RecoveryStatus::Exhausted, attempts, error_records, log)
    }

    async fn attempt(
        &self,
        request: &RecoveryRequest,
        record: &ErrorRecord,
        attempts: &mut Vec<AttemptRecord>,
        cancel: &CancellationToken,
    ) -> Step {
        let n = record.attempt;
        let signature = record.signature.clone();
        let same_log = Step::Retry {
            log: record.raw_log.clone(),
            kind: record.kind,
        };

        // Analyzing
        debug!(state = ?RecoveryState::Analyzing, attempt = n);
        let available = self.workspace.list_code_files();
        let analysis = match or_cancel(
            cancel,
            self.agents.analyze_files(&record.raw_log, available.clone()),
        )
        .await
        {
            None => return cancelled(attempts, n, signature),
            Some(Ok(analysis)) => analysis,
            Some(Err(e)) => {
                warn!(attempt = n, "File analysis failed: {}", e);
                attempts.push(AttemptRecord::new(
                    n,
                    signature,
                    AttemptOutcome::AnalysisFailed(e.to_string()),
                ));
                return same_log;
            }
        };
        let mut implicated: Vec<String> = Vec::new();
        for file in request.focus_files.iter().chain(analysis.relevant_files.iter()) {
            if available.contains(file) && !implicated.contains(file) {
                implicated.push(file.clone());
            }
        }

        // Consulting
        debug!(state = ?RecoveryState::Consulting, attempt = n);
        let consulted = or_cancel(cancel, self.consult(&signature, &record.raw_log)).await;
        let Some(advisory) = consulted else {
            return cancelled(attempts, n, signature);
        };

        // Fixing
        debug!(state = ?RecoveryState::Fixing, attempt = n);
        let codebase = self.workspace.read_sources(&implicated).await;
        let diagnosis = match or_cancel(
            cancel,
            self.agents.diagnose(DiagnosisRequest {
                error_log: record.raw_log.clone(),
                error_kind: record.kind.as_str().to_string(),
                codebase: codebase.clone(),
                advisory,
                history: attempts.iter().map(AttemptRecord::summary).collect(),
            }),
        )
        .await
        {
            None => return cancelled(attempts, n, signature),
            Some(Ok(diagnosis)) => diagnosis,
            Some(Err(e)) => {
                warn!(attempt = n, "Diagnosis failed: {}", e);
                attempts.push(AttemptRecord::new(
                    n,
                    signature,
                    AttemptOutcome::DiagnosisFailed(e.to_string()),
                ));
                return same_log;
            }
        };
        info!(
            attempt = n,
            file = %diagnosis.file_to_fix,
            "Root cause: {}",
            diagnosis.root_cause_analysis
        );

        let Some(target) = self.workspace.resolve(&diagnosis.file_to_fix) else {
            warn!(attempt = n, "Diagnosed file {} not in workspace", diagnosis.file_to_fix);
            attempts.push(
                AttemptRecord::new(
                    n,
                    signature,
                    AttemptOutcome::UnresolvedTarget(diagnosis.file_to_fix.clone()),
                )
                .diagnosed(&diagnosis),
            );
            return same_log;
        };
        let base = AttemptRecord::new(n, signature, AttemptOutcome::StillFailing)
            .diagnosed(&diagnosis)
            .targeting(&target);

        let content = match self.apply_fix(&target, &diagnosis, codebase, cancel).await {
            None => {
                attempts.push(AttemptRecord {
                    outcome: AttemptOutcome::Cancelled,
                    ..base
                });
                return Step::Cancelled;
            }
            Some(Ok(content)) => content,
            Some(Err(reason)) => {
                warn!(attempt = n, "Fix failed: {}", reason);
                attempts.push(AttemptRecord {
                    outcome: AttemptOutcome::FixFailed(reason),
                    ..base
                });
                return same_log;
            }
        };

        // Reverifying
        debug!(state = ?RecoveryState::Reverifying, attempt = n);
        let verified = match or_cancel(
            cancel,
            verify_sequence(self.validator.as_ref(), &request.target, &request.rerun),
        )
        .await
        {
            None => {
                attempts.push(AttemptRecord {
                    outcome: AttemptOutcome::Cancelled,
                    ..base
                });
                return Step::Cancelled;
            }
            Some(result) => result,
        };

        match verified {
            Ok(()) => {
                self.remember(record, &diagnosis, &target, content).await;
                attempts.push(AttemptRecord {
                    outcome: AttemptOutcome::Resolved,
                    ..base
                });
                Step::Resolved
            }
            Err((kind, verdict)) => {
                info!(attempt = n, kind = %kind, "Still failing after fix");
                attempts.push(base);
                Step::Retry {
                    log: verdict.log,
                    kind,
                }
            }
        }
    }

    /// Knowledge base lookups. Failures degrade to an empty context.
    async fn consult(&self, signature: &Signature, log: &str) -> AdvisoryContext {
        let known = self.kb.lookup_exact(signature).await.unwrap_or_else(|e| {
            warn!("Knowledge base exact lookup failed: {}", e);
            None
        });
        let similar = self
            .kb
            .lookup_similar(log, self.similar_k)
            .await
            .unwrap_or_else(|e| {
                warn!("Knowledge base similarity lookup failed: {}", e);
                Vec::new()
            });
        let advisory = AdvisoryContext::new(known, similar);
        if !advisory.is_empty() {
            info!(
                known = advisory.known_solution.is_some(),
                similar = advisory.similar_incidents.len(),
                "Offering past incidents to the debugger as reference"
            );
        }
        advisory
    }

    /// Ask the coder for a fixed file and write it. Returns the written content.
    async fn apply_fix(
        &self,
        target: &str,
        diagnosis: &Diagnosis,
        codebase: Vec<SourceFile>,
        cancel: &CancellationToken,
    ) -> Option<Result<String, String>> {
        let code_to_fix = match self.workspace.read_file(target).await {
            Ok(content) => content,
            Err(e) => return Some(Err(e.to_string())),
        };
        let context = codebase.into_iter().filter(|f| f.path != target).collect();

        let request = CodeRequest::Fix(FixRequest {
            file_to_fix: target.to_string(),
            code_to_fix,
            root_cause: diagnosis.root_cause_analysis.clone(),
            fix_instructions: diagnosis.fix_suggestion.clone(),
            context,
        });
        let file = match or_cancel(cancel, self.agents.code(request)).await? {
            Ok(file) => file,
            Err(e) => return Some(Err(e.to_string())),
        };
        if file.filename != target {
            debug!(
                "Coder named {} for a fix of {}, writing to the diagnosed file",
                file.filename, target
            );
        }

        Some(
            self.workspace
                .write_file(target, &file.content)
                .await
                .map(|_| file.content)
                .map_err(|e| e.to_string()),
        )
    }

    async fn remember(
        &self,
        record: &ErrorRecord,
        diagnosis: &Diagnosis,
        target: &str,
        content: String,
    ) {
        let entry = KnowledgeEntry::new(
            record.signature.clone(),
            record.raw_log.clone(),
            FixPayload {
                file: target.to_string(),
                content,
            },
        )
        .with_root_cause(diagnosis.root_cause_analysis.clone())
        .with_reasoning(diagnosis.fix_suggestion.clone())
        .by_agent(DIAGNOSING_AGENT)
        .at_attempt(record.attempt);

        match self.kb.record(entry).await {
            Ok(()) => info!(signature = %record.signature, "Recorded verified fix"),
            Err(e) => warn!("Could not record fix in knowledge base: {}", e),
        }
    }
}

fn cancelled(attempts: &mut Vec<AttemptRecord>, n: u32, signature: Signature) -> Step {
    attempts.push(AttemptRecord::new(n, signature, AttemptOutcome::Cancelled));
    Step::Cancelled
}

fn finish(
    status: RecoveryStatus,
    attempts: Vec<AttemptRecord>,
    error_records: Vec<ErrorRecord>,
    last_log: String,
) -> RecoveryOutcome {
    RecoveryOutcome {
        status,
        attempts,
        error_records,
        last_log,
    }
}
