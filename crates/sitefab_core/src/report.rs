//! Final report of a generation run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sitefab_spec::TaskKind;

use crate::recovery::{ErrorRecord, FailureReport};
use crate::state::{Phase, PipelineState, UnitStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Complete,
    Failed,
}

/// A unit that did not reach a passing state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUnit {
    pub id: String,
    pub last_log: String,
    pub root_causes: Vec<String>,
}

/// Outcome of [`crate::PipelineController::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub session_id: Uuid,
    pub status: ReportStatus,
    pub output_path: Option<PathBuf>,
    pub components_generated: usize,
    pub pages_generated: usize,
    /// Final validation passed and every unit is passing
    pub tests_passed: bool,
    pub failed_units: Vec<FailedUnit>,
    pub total_attempts: u32,
    pub error_records: Vec<ErrorRecord>,
    pub unresolved: Option<FailureReport>,
    pub message: String,
}

impl GenerationReport {
    pub fn from_state(state: &PipelineState) -> Self {
        let status = if state.phase == Phase::Complete {
            ReportStatus::Complete
        } else {
            ReportStatus::Failed
        };

        let generated = |kind: TaskKind| {
            state
                .units_of(kind)
                .filter(|u| u.artifact.is_some())
                .count()
        };

        let failed_units: Vec<FailedUnit> = state
            .units
            .iter()
            .filter(|u| u.status == UnitStatus::Failing)
            .map(|u| FailedUnit {
                id: u.id.clone(),
                last_log: u
                    .failure
                    .as_ref()
                    .map(|f| f.last_log.clone())
                    .unwrap_or_default(),
                root_causes: u
                    .failure
                    .as_ref()
                    .map(|f| f.root_causes.clone())
                    .unwrap_or_default(),
            })
            .collect();

        let tests_passed = status == ReportStatus::Complete
            && state.units.iter().all(|u| u.status == UnitStatus::Passing);

        Self {
            session_id: state.session_id,
            status,
            output_path: state.output_path.clone(),
            components_generated: generated(TaskKind::Component),
            pages_generated: generated(TaskKind::Page),
            tests_passed,
            failed_units,
            total_attempts: state.total_attempts(),
            error_records: state.error_records.clone(),
            unresolved: state.unresolved.clone(),
            message: state.message.clone().unwrap_or_default(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ReportStatus::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::UnitUpdate;
    use sitefab_spec::{PlanTask, ProjectPlan};

    #[test]
    fn test_report_counts_and_failures() {
        let plan = ProjectPlan::new(vec![
            PlanTask::component("Hero", serde_json::Value::Null),
            PlanTask::component("Footer", serde_json::Value::Null),
            PlanTask::page("Home", "/"),
        ]);
        let state = PipelineState::new(Uuid::new_v4())
            .with_plan(&plan)
            .apply(UnitUpdate {
                artifact: Some("src/components/Hero.tsx".to_string()),
                status: UnitStatus::Failing,
                trials: 3,
                failure: Some(FailureReport {
                    scope: "component:Hero".to_string(),
                    last_log: "TypeError: x is undefined".to_string(),
                    root_causes: vec!["missing guard".to_string()],
                    attempts: Vec::new(),
                }),
                ..UnitUpdate::new("component:Hero")
            })
            .apply(UnitUpdate {
                artifact: Some("src/components/Footer.tsx".to_string()),
                status: UnitStatus::Passing,
                ..UnitUpdate::new("component:Footer")
            })
            .apply(UnitUpdate {
                artifact: Some("app/page.tsx".to_string()),
                ..UnitUpdate::new("page:Home")
            })
            .pages_passing()
            .complete("Website generated");

        let report = GenerationReport::from_state(&state);
        assert!(report.is_success());
        assert_eq!(report.components_generated, 2);
        assert_eq!(report.pages_generated, 1);
        assert!(!report.tests_passed);
        assert_eq!(report.total_attempts, 3);
        assert_eq!(report.failed_units.len(), 1);
        assert_eq!(report.failed_units[0].id, "component:Hero");
        assert_eq!(report.failed_units[0].root_causes, vec!["missing guard".to_string()]);
    }
}
