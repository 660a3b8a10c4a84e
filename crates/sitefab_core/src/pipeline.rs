//! Generation pipeline controller.
//!
//! Drives a checklist through planning, component generation, page assembly
//! and final validation. Validation failures are handed to the
//! [`RecoveryLoop`]; a component that cannot be recovered is marked failing
//! and the run continues, while an unrecoverable final validation fails the
//! run.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{watch, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use sitefab_agents::{
    AgentInvoker, Agents, CodeRequest, LlmAgentInvoker, PromptSet, RetryingInvoker, TestRequest,
};
use sitefab_kb::{JsonlKnowledgeStore, KnowledgeStore};
use sitefab_runner::{CommandValidator, ValidationTarget, Validator, ValidatorKind};
use sitefab_spec::{Checklist, ChecklistValidator, PlanTask, ProjectPlan, TaskKind};

use crate::config::FactoryConfig;
use crate::error::CoreResult;
use crate::recovery::{
    or_cancel, verify_sequence, FailureReport, RecoveryLoop, RecoveryRequest, RecoveryStatus,
    Scope,
};
use crate::report::GenerationReport;
use crate::state::{Phase, PipelineState, SessionRecord, UnitStatus, UnitUpdate};
use crate::workspace::Workspace;

/// Failure reason recorded when a run is cancelled.
pub const CANCELLED_REASON: &str = "cancelled";

/// Why a run stopped early, carrying the state at that point.
struct Stopped {
    state: PipelineState,
    reason: String,
    unresolved: Option<FailureReport>,
}

type Flow<T> = Result<T, Stopped>;

fn stop(state: PipelineState, reason: impl Into<String>) -> Stopped {
    Stopped {
        state,
        reason: reason.into(),
        unresolved: None,
    }
}

fn cancelled(state: PipelineState) -> Stopped {
    stop(state, CANCELLED_REASON)
}

fn generation_failed(mut update: UnitUpdate, message: String) -> UnitUpdate {
    warn!(unit = %update.id, "{}", message);
    update.status = UnitStatus::Failing;
    update.failure = Some(FailureReport::generation_failed(
        &Scope::Unit(update.id.clone()),
        message,
    ));
    update
}

/// Per-run inputs shared by every phase.
struct Run<'a> {
    checklist: &'a Checklist,
    cancel: &'a CancellationToken,
}

/// The generation pipeline.
pub struct PipelineController {
    config: FactoryConfig,
    agents: Agents,
    kb: Arc<dyn KnowledgeStore>,
    validator: Arc<dyn Validator>,
    progress: watch::Sender<PipelineState>,
}

impl PipelineController {
    pub fn new(
        config: FactoryConfig,
        invoker: Arc<dyn AgentInvoker>,
        kb: Arc<dyn KnowledgeStore>,
        validator: Arc<dyn Validator>,
    ) -> Self {
        let (progress, _) = watch::channel(PipelineState::new(Uuid::nil()));
        Self {
            config,
            agents: Agents::new(invoker),
            kb,
            validator,
            progress,
        }
    }

    /// Controller with the default collaborators: LLM agents with retries,
    /// shell-command validators and the JSON-lines knowledge base.
    pub fn from_config(config: FactoryConfig) -> CoreResult<Self> {
        let adapter = config.llm.adapter()?;
        info!(provider = %adapter.provider(), model = adapter.model(), "Using LLM");

        let mut prompts = PromptSet::new();
        if let Some(dir) = &config.prompts_dir {
            prompts = prompts.load_overrides(dir)?;
        }
        let llm = LlmAgentInvoker::new(Arc::new(adapter)).with_prompts(prompts);
        let invoker = RetryingInvoker::new(Arc::new(llm), config.retry_policy())
            .with_call_timeout(config.agent_timeout());

        let kb = JsonlKnowledgeStore::new(&config.kb_path);
        let validator = CommandValidator::new(config.validators.clone());

        Ok(Self::new(
            config,
            Arc::new(invoker),
            Arc::new(kb),
            Arc::new(validator),
        ))
    }

    /// Replace the knowledge base, e.g. with an in-memory store.
    pub fn with_knowledge_store(mut self, kb: Arc<dyn KnowledgeStore>) -> Self {
        self.kb = kb;
        self
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// Receive every state the pipeline moves through.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.progress.subscribe()
    }

    /// Generate a website from a checklist.
    ///
    /// Never returns an error: every failure, including cancellation, is
    /// reported through [`GenerationReport`].
    pub async fn run(&self, checklist: &Checklist, cancel: CancellationToken) -> GenerationReport {
        let run = Run {
            checklist,
            cancel: &cancel,
        };
        let state = PipelineState::new(Uuid::new_v4());
        info!(session = %state.session_id, "Starting generation");
        self.publish(&run, &state).await;

        let state = match self.execute(&run, state).await {
            Ok(state) => {
                info!(session = %state.session_id, "Generation complete");
                state
            }
            Err(stopped) => {
                error!(session = %stopped.state.session_id, reason = %stopped.reason, "Generation failed");
                stopped.state.fail(stopped.reason, stopped.unresolved)
            }
        };
        self.publish(&run, &state).await;
        GenerationReport::from_state(&state)
    }

    async fn execute(&self, run: &Run<'_>, state: PipelineState) -> Flow<PipelineState> {
        let (workspace, state) = self.prepare(run, state).await?;
        let (plan, state) = self.planning(run, state).await?;

        let recovery = RecoveryLoop::new(
            self.agents.clone(),
            self.kb.clone(),
            self.validator.clone(),
            workspace.clone(),
        )
        .with_similar_k(self.config.similar_k);

        let state = self
            .generate_units(run, &plan, &workspace, &recovery, state)
            .await?;
        let state = self.assemble(run, &plan, &workspace, state).await?;
        let state = self.validate(run, &workspace, &recovery, state).await?;

        let components = state.units_of(TaskKind::Component).count();
        let pages = state.units_of(TaskKind::Page).count();
        let message = format!(
            "Generated {} components and {} pages in {}",
            components,
            pages,
            workspace.root().display()
        );
        Ok(state.complete(message))
    }

    async fn publish(&self, run: &Run<'_>, state: &PipelineState) {
        self.progress.send_replace(state.clone());
        if let Some(output) = &state.output_path {
            if let Err(e) = SessionRecord::new(run.checklist, state).save(output).await {
                warn!("Could not persist session record: {}", e);
            }
        }
    }

    fn checkpoint(&self, run: &Run<'_>, state: PipelineState) -> Flow<PipelineState> {
        if run.cancel.is_cancelled() {
            return Err(cancelled(state));
        }
        Ok(state)
    }

    /// Checklist validation, output directory, scaffold and dependency install.
    async fn prepare(&self, run: &Run<'_>, state: PipelineState) -> Flow<(Workspace, PipelineState)> {
        let state = self.checkpoint(run, state)?;

        let validation = ChecklistValidator::validate(run.checklist);
        for warning in &validation.warnings {
            warn!("Checklist: {}", warning);
        }
        if !validation.valid {
            return Err(stop(
                state,
                format!("invalid checklist: {}", validation.errors.join("; ")),
            ));
        }

        let workspace = match Workspace::create(&self.config.output_root) {
            Ok(workspace) => workspace,
            Err(e) => return Err(stop(state, format!("cannot create output directory: {}", e))),
        };
        let state = state.with_output(workspace.root());

        if let Some(scaffold) = &self.config.scaffold_dir {
            if let Err(e) = workspace.apply_scaffold(scaffold) {
                return Err(stop(state, format!("scaffold setup failed: {}", e)));
            }
        }
        if let Err(e) = workspace.apply_brand_colors(&run.checklist.branding) {
            warn!("Could not apply brand colours: {}", e);
        }
        self.publish(run, &state).await;

        match or_cancel(run.cancel, self.validator.prepare(workspace.root())).await {
            None => Err(cancelled(state)),
            Some(Err(e)) => {
                warn!("Dependency install failed, continuing: {}", e);
                Ok((workspace, state))
            }
            Some(Ok(())) => Ok((workspace, state)),
        }
    }

    async fn planning(&self, run: &Run<'_>, state: PipelineState) -> Flow<(ProjectPlan, PipelineState)> {
        let state = self.checkpoint(run, state)?;
        info!("Planning");

        let plan = match or_cancel(run.cancel, self.agents.plan(run.checklist)).await {
            None => return Err(cancelled(state)),
            Some(Err(e)) => return Err(stop(state, format!("planning failed: {}", e))),
            Some(Ok(plan)) => plan.normalized(),
        };
        if let Err(e) = plan.validate() {
            return Err(stop(state, format!("planning failed: {}", e)));
        }
        info!(
            components = plan.components().count(),
            pages = plan.pages().count(),
            "Plan ready"
        );

        let state = state.with_plan(&plan).enter(Phase::GeneratingUnits);
        self.publish(run, &state).await;
        Ok((plan, state))
    }

    async fn generate_units(
        &self,
        run: &Run<'_>,
        plan: &ProjectPlan,
        workspace: &Workspace,
        recovery: &RecoveryLoop,
        state: PipelineState,
    ) -> Flow<PipelineState> {
        let mut state = self.checkpoint(run, state)?;
        let semaphore = Semaphore::new(self.config.max_parallel_units.max(1));
        let semaphore = &semaphore;

        let mut pending: FuturesUnordered<_> = plan
            .components()
            .map(|task| async move {
                let _permit = semaphore.acquire().await;
                self.build_component(run, task, workspace, recovery).await
            })
            .collect();

        while let Some(update) = pending.next().await {
            state = state.apply(update);
            self.publish(run, &state).await;
        }

        self.checkpoint(run, state)
    }

    async fn build_component(
        &self,
        run: &Run<'_>,
        task: &PlanTask,
        workspace: &Workspace,
        recovery: &RecoveryLoop,
    ) -> UnitUpdate {
        let id = task.unit_id();
        let mut update = UnitUpdate::new(&id);
        if run.cancel.is_cancelled() {
            return update;
        }
        info!(unit = %id, "Generating component");

        let mut design = match or_cancel(run.cancel, self.agents.design(&task.name, &task.details)).await {
            None => return update,
            Some(Err(e)) => return generation_failed(update, format!("design failed: {}", e)),
            Some(Ok(design)) => design,
        };
        match or_cancel(run.cancel, self.agents.copy(&design)).await {
            None => return update,
            Some(Err(e)) => warn!(unit = %id, "Copywriting failed, keeping placeholders: {}", e),
            Some(Ok(copy)) => design.merge_copy(&copy),
        }

        let request = CodeRequest::Component {
            name: task.name.clone(),
            spec: design,
        };
        let file = match or_cancel(run.cancel, self.agents.code(request)).await {
            None => return update,
            Some(Err(e)) => return generation_failed(update, format!("code generation failed: {}", e)),
            Some(Ok(file)) => file,
        };
        if let Err(e) = workspace.write_file(&file.filename, &file.content).await {
            return generation_failed(update, format!("cannot write {}: {}", file.filename, e));
        }
        update.artifact = Some(file.filename.clone());

        let request = TestRequest {
            component: task.name.clone(),
            source_file: file.filename.clone(),
            source: file.content,
        };
        let test = match or_cancel(run.cancel, self.agents.write_test(request)).await {
            None => return update,
            Some(Err(e)) => return generation_failed(update, format!("test generation failed: {}", e)),
            Some(Ok(test)) => test,
        };
        if let Err(e) = workspace.write_file(&test.filename, &test.content).await {
            return generation_failed(update, format!("cannot write {}: {}", test.filename, e));
        }
        update.test_file = Some(test.filename.clone());

        let target = ValidationTarget::unit(workspace.root(), &id).with_test_file(&test.filename);
        let verdict = match or_cancel(
            run.cancel,
            self.validator.validate(&target, ValidatorKind::UnitTest),
        )
        .await
        {
            None => return update,
            Some(verdict) => verdict,
        };
        if verdict.passed {
            info!(unit = %id, "Unit tests passed");
            update.status = UnitStatus::Passing;
            return update;
        }

        info!(unit = %id, "Unit tests failed, starting recovery");
        let scope = Scope::Unit(id.clone());
        let request = RecoveryRequest::new(
            scope.clone(),
            target,
            ValidatorKind::UnitTest,
            verdict,
            self.config.max_trials_per_component,
        )
        .focus_on(vec![file.filename, test.filename]);
        let outcome = recovery.run(request, run.cancel).await;

        update.trials = outcome.trials();
        update.error_records = outcome.error_records.clone();
        match outcome.status {
            RecoveryStatus::Resolved => update.status = UnitStatus::Passing,
            RecoveryStatus::Exhausted => {
                warn!(unit = %id, attempts = outcome.trials(), "Giving up on unit");
                update.status = UnitStatus::Failing;
                update.failure = Some(outcome.failure_report(&scope));
            }
            RecoveryStatus::Cancelled => {}
        }
        update
    }

    async fn assemble(
        &self,
        run: &Run<'_>,
        plan: &ProjectPlan,
        workspace: &Workspace,
        state: PipelineState,
    ) -> Flow<PipelineState> {
        let mut state = state.enter(Phase::Assembling);
        self.publish(run, &state).await;

        for task in plan.pages() {
            state = self.checkpoint(run, state)?;
            let update = match self.build_page(run, task, workspace).await {
                Some(update) => update,
                None => return Err(cancelled(state)),
            };
            state = state.apply(update);
            self.publish(run, &state).await;
        }
        Ok(state)
    }

    async fn build_page(&self, run: &Run<'_>, task: &PlanTask, workspace: &Workspace) -> Option<UnitUpdate> {
        let mut update = UnitUpdate::new(task.unit_id());
        info!(unit = %update.id, "Assembling page");

        let request = CodeRequest::Page {
            name: task.name.clone(),
            path: task.path.clone().unwrap_or_else(|| "/".to_string()),
            components: task.components.clone(),
        };
        let file = match or_cancel(run.cancel, self.agents.code(request)).await? {
            Err(e) => return Some(generation_failed(update, format!("page generation failed: {}", e))),
            Ok(file) => file,
        };
        if let Err(e) = workspace.write_file(&file.filename, &file.content).await {
            return Some(generation_failed(
                update,
                format!("cannot write {}: {}", file.filename, e),
            ));
        }
        update.artifact = Some(file.filename);
        Some(update)
    }

    async fn validate(
        &self,
        run: &Run<'_>,
        workspace: &Workspace,
        recovery: &RecoveryLoop,
        state: PipelineState,
    ) -> Flow<PipelineState> {
        let state = self.checkpoint(run, state)?.enter(Phase::Validating);
        self.publish(run, &state).await;

        match or_cancel(run.cancel, self.agents.write_e2e(run.checklist)).await {
            None => return Err(cancelled(state)),
            Some(Err(e)) => warn!("End-to-end test generation failed: {}", e),
            Some(Ok(file)) => {
                if let Err(e) = workspace.write_file(&file.filename, &file.content).await {
                    warn!("Could not write {}: {}", file.filename, e);
                }
            }
        }

        let target = ValidationTarget::project(workspace.root());
        let sequence = ValidatorKind::final_sequence();
        let (kind, verdict) = match or_cancel(
            run.cancel,
            verify_sequence(self.validator.as_ref(), &target, &sequence),
        )
        .await
        {
            None => return Err(cancelled(state)),
            Some(Ok(())) => {
                info!("Final validation passed");
                return Ok(state.pages_passing());
            }
            Some(Err(failure)) => failure,
        };

        info!(kind = %kind, "Final validation failed, starting recovery");
        let request = RecoveryRequest::new(
            Scope::Project,
            target,
            kind,
            verdict,
            self.config.max_trials_final,
        )
        .rerun(sequence);
        let outcome = recovery.run(request, run.cancel).await;
        let state = state.record_final(outcome.trials(), outcome.error_records.clone());

        match outcome.status {
            RecoveryStatus::Resolved => Ok(state.pages_passing()),
            RecoveryStatus::Cancelled => Err(cancelled(state)),
            RecoveryStatus::Exhausted => Err(Stopped {
                reason: format!(
                    "final validation still failing after {} attempts",
                    outcome.trials()
                ),
                unresolved: Some(outcome.failure_report(&Scope::Project)),
                state,
            }),
        }
    }
}
