//! Pipeline state.
//!
//! [`PipelineState`] is an immutable value: every transition consumes the old
//! state and returns the next one. The controller publishes each new state as
//! the progress projection and persists it as the session record.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use sitefab_spec::{Checklist, PlanTask, ProjectPlan, TaskKind};

use crate::error::CoreResult;
use crate::recovery::{ErrorRecord, FailureReport};

/// Directory inside the output folder holding run metadata.
pub const SESSION_DIR: &str = ".sitefab";
pub const SESSION_FILE: &str = "session.json";

/// Pipeline phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Planning,
    GeneratingUnits,
    Assembling,
    Validating,
    Complete,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Planning => "planning",
            Phase::GeneratingUnits => "generating_units",
            Phase::Assembling => "assembling",
            Phase::Validating => "validating",
            Phase::Complete => "complete",
            Phase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Complete | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validation status of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    #[default]
    Untested,
    Passing,
    Failing,
}

/// A component or page being produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// `component:<Name>` or `page:<Name>`
    pub id: String,
    pub name: String,
    pub kind: TaskKind,
    /// The plan task this unit implements
    pub spec: PlanTask,
    /// Generated file, relative to the output directory
    pub artifact: Option<String>,
    /// Generated unit test (components only)
    pub test_file: Option<String>,
    pub status: UnitStatus,
    /// Recovery attempts consumed
    pub trial_count: u32,
    pub failure: Option<FailureReport>,
}

impl Unit {
    pub fn from_task(task: &PlanTask) -> Self {
        Self {
            id: task.unit_id(),
            name: task.name.clone(),
            kind: task.kind,
            spec: task.clone(),
            artifact: None,
            test_file: None,
            status: UnitStatus::Untested,
            trial_count: 0,
            failure: None,
        }
    }
}

/// Result of generating one unit, folded into the state by the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitUpdate {
    pub id: String,
    pub artifact: Option<String>,
    pub test_file: Option<String>,
    pub status: UnitStatus,
    pub trials: u32,
    pub failure: Option<FailureReport>,
    pub error_records: Vec<ErrorRecord>,
}

impl UnitUpdate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            artifact: None,
            test_file: None,
            status: UnitStatus::Untested,
            trials: 0,
            failure: None,
            error_records: Vec::new(),
        }
    }
}

/// Snapshot of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub session_id: Uuid,
    pub phase: Phase,
    /// Components first, then pages, in plan order
    pub units: Vec<Unit>,
    pub output_path: Option<PathBuf>,
    /// Recovery attempts consumed by final validation
    pub final_trials: u32,
    pub error_records: Vec<ErrorRecord>,
    /// Final validation failure that could not be recovered
    pub unresolved: Option<FailureReport>,
    pub message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineState {
    pub fn new(session_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            phase: Phase::Planning,
            units: Vec::new(),
            output_path: None,
            final_trials: 0,
            error_records: Vec::new(),
            unresolved: None,
            message: None,
            started_at: now,
            updated_at: now,
            finished_at: None,
        }
    }

    fn touched(mut self) -> Self {
        self.updated_at = Utc::now();
        self
    }

    pub fn enter(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self.touched()
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self.touched()
    }

    pub fn with_plan(mut self, plan: &ProjectPlan) -> Self {
        self.units = plan.tasks.iter().map(Unit::from_task).collect();
        self.touched()
    }

    /// Fold a unit result into the state.
    pub fn apply(mut self, update: UnitUpdate) -> Self {
        if let Some(unit) = self.units.iter_mut().find(|u| u.id == update.id) {
            if update.artifact.is_some() {
                unit.artifact = update.artifact;
            }
            if update.test_file.is_some() {
                unit.test_file = update.test_file;
            }
            unit.status = update.status;
            unit.trial_count += update.trials;
            unit.failure = update.failure;
        }
        self.error_records.extend(update.error_records);
        self.touched()
    }

    /// Mark every generated page as passing after final validation.
    pub fn pages_passing(mut self) -> Self {
        for unit in self
            .units
            .iter_mut()
            .filter(|u| u.kind == TaskKind::Page && u.artifact.is_some())
        {
            unit.status = UnitStatus::Passing;
        }
        self.touched()
    }

    pub fn record_final(mut self, trials: u32, records: Vec<ErrorRecord>) -> Self {
        self.final_trials += trials;
        self.error_records.extend(records);
        self.touched()
    }

    pub fn complete(mut self, message: impl Into<String>) -> Self {
        self.phase = Phase::Complete;
        self.message = Some(message.into());
        self.finished_at = Some(Utc::now());
        self.touched()
    }

    pub fn fail(mut self, reason: impl Into<String>, unresolved: Option<FailureReport>) -> Self {
        self.phase = Phase::Failed;
        self.message = Some(reason.into());
        self.unresolved = unresolved;
        self.finished_at = Some(Utc::now());
        self.touched()
    }

    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn units_of(&self, kind: TaskKind) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(move |u| u.kind == kind)
    }

    /// Recovery attempts across all units and final validation.
    pub fn total_attempts(&self) -> u32 {
        self.units.iter().map(|u| u.trial_count).sum::<u32>() + self.final_trials
    }
}

/// The persisted generation session, written to `<output>/.sitefab/session.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub checklist: Checklist,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: Phase,
    pub output_path: Option<PathBuf>,
    pub state: PipelineState,
}

impl SessionRecord {
    pub fn new(checklist: &Checklist, state: &PipelineState) -> Self {
        Self {
            id: state.session_id,
            checklist: checklist.clone(),
            started_at: state.started_at,
            finished_at: state.finished_at,
            status: state.phase,
            output_path: state.output_path.clone(),
            state: state.clone(),
        }
    }

    pub fn path_in(output_dir: &Path) -> PathBuf {
        output_dir.join(SESSION_DIR).join(SESSION_FILE)
    }

    /// Save the record into an output directory.
    pub async fn save(&self, output_dir: &Path) -> CoreResult<PathBuf> {
        let path = Self::path_in(output_dir);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, json).await?;
        debug!("Saved session record to {:?}", path);
        Ok(path)
    }

    pub fn load(output_dir: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(Self::path_in(output_dir))?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitefab_spec::PageSpec;
    use tempfile::TempDir;

    fn plan() -> ProjectPlan {
        ProjectPlan::new(vec![
            PlanTask::component("Hero", serde_json::json!({"headline": true})),
            PlanTask::page("Home", "/").embeds("Hero"),
        ])
    }

    #[test]
    fn test_transitions_return_new_state() {
        let initial = PipelineState::new(Uuid::new_v4());
        let planned = initial.clone().with_plan(&plan()).enter(Phase::GeneratingUnits);

        assert_eq!(initial.phase, Phase::Planning);
        assert!(initial.units.is_empty());
        assert_eq!(planned.phase, Phase::GeneratingUnits);
        assert_eq!(planned.units.len(), 2);
        assert_eq!(planned.units[0].id, "component:Hero");
        assert_eq!(planned.units[0].status, UnitStatus::Untested);
    }

    #[test]
    fn test_apply_unit_update() {
        let state = PipelineState::new(Uuid::new_v4()).with_plan(&plan());
        let update = UnitUpdate {
            artifact: Some("src/components/Hero.tsx".to_string()),
            status: UnitStatus::Passing,
            trials: 2,
            ..UnitUpdate::new("component:Hero")
        };

        let state = state.apply(update).record_final(1, Vec::new());
        let hero = state.unit("component:Hero").unwrap();
        assert_eq!(hero.status, UnitStatus::Passing);
        assert_eq!(hero.trial_count, 2);
        assert_eq!(state.total_attempts(), 3);
    }

    #[test]
    fn test_pages_passing_only_with_artifact() {
        let state = PipelineState::new(Uuid::new_v4())
            .with_plan(&plan())
            .pages_passing();
        assert_eq!(state.unit("page:Home").unwrap().status, UnitStatus::Untested);

        let state = state
            .apply(UnitUpdate {
                artifact: Some("app/page.tsx".to_string()),
                ..UnitUpdate::new("page:Home")
            })
            .pages_passing();
        assert_eq!(state.unit("page:Home").unwrap().status, UnitStatus::Passing);
    }

    #[test]
    fn test_fail_is_terminal() {
        let state = PipelineState::new(Uuid::new_v4()).fail("cancelled", None);
        assert!(state.phase.is_terminal());
        assert_eq!(state.message.as_deref(), Some("cancelled"));
        assert!(state.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_session_record_round_trip() {
        let temp = TempDir::new().unwrap();
        let checklist = Checklist::new().with_page(PageSpec::new("Home", "/"));
        let state = PipelineState::new(Uuid::new_v4())
            .with_output(temp.path())
            .with_plan(&plan())
            .complete("done");

        let path = SessionRecord::new(&checklist, &state).save(temp.path()).await.unwrap();
        assert!(path.ends_with(".sitefab/session.json"));

        let loaded = SessionRecord::load(temp.path()).unwrap();
        assert_eq!(loaded.id, state.session_id);
        assert_eq!(loaded.status, Phase::Complete);
        assert_eq!(loaded.checklist, checklist);
    }
}
