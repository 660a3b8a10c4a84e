//! Project plan models.
//!
//! The plan is produced once by the planner agent and is read-only afterwards.
//! Components are always generated before the pages that embed them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{SpecError, SpecResult};

/// Kind of a plan task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Component,
    Page,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Component => "component",
            TaskKind::Page => "page",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single generation target in the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTask {
    /// Component or page
    #[serde(rename = "type", alias = "kind")]
    pub kind: TaskKind,
    /// Unique name within its kind ("Hero", "Home")
    pub name: String,
    /// Capability description or page composition details
    #[serde(default)]
    pub details: serde_json::Value,
    /// Route path (pages only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Components embedded by this page (pages only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
}

impl PlanTask {
    pub fn component(name: impl Into<String>, details: impl Into<serde_json::Value>) -> Self {
        Self {
            kind: TaskKind::Component,
            name: name.into(),
            details: details.into(),
            path: None,
            components: Vec::new(),
        }
    }

    pub fn page(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind: TaskKind::Page,
            name: name.into(),
            details: serde_json::Value::Null,
            path: Some(path.into()),
            components: Vec::new(),
        }
    }

    pub fn embeds(mut self, component: impl Into<String>) -> Self {
        self.components.push(component.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<serde_json::Value>) -> Self {
        self.details = details.into();
        self
    }

    /// Stable identifier used for units, e.g. `component:Hero`.
    pub fn unit_id(&self) -> String {
        format!("{}:{}", self.kind, self.name)
    }
}

/// Ordered list of components and pages to produce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectPlan {
    pub tasks: Vec<PlanTask>,
}

impl ProjectPlan {
    pub fn new(tasks: Vec<PlanTask>) -> Self {
        Self { tasks }
    }

    /// Component tasks in plan order.
    pub fn components(&self) -> impl Iterator<Item = &PlanTask> {
        self.tasks.iter().filter(|t| t.kind == TaskKind::Component)
    }

    /// Page tasks in plan order.
    pub fn pages(&self) -> impl Iterator<Item = &PlanTask> {
        self.tasks.iter().filter(|t| t.kind == TaskKind::Page)
    }

    /// Reorder so that every component precedes every page, preserving relative order.
    pub fn normalized(self) -> Self {
        let (components, pages): (Vec<_>, Vec<_>) = self
            .tasks
            .into_iter()
            .partition(|t| t.kind == TaskKind::Component);
        Self {
            tasks: components.into_iter().chain(pages).collect(),
        }
    }

    /// Check structural rules of a plan.
    ///
    /// A plan needs at least one component, and names must be non-empty and
    /// unique within their kind. Pages that reference unknown components are
    /// reported as warnings only.
    pub fn validate(&self) -> SpecResult<()> {
        if self.components().next().is_none() {
            return Err(SpecError::InvalidPlan(
                "plan contains no component tasks".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for task in &self.tasks {
            if task.name.trim().is_empty() {
                return Err(SpecError::InvalidPlan(format!(
                    "{} task with empty name",
                    task.kind
                )));
            }
            if !seen.insert((task.kind, task.name.as_str())) {
                return Err(SpecError::InvalidPlan(format!(
                    "duplicate {} '{}'",
                    task.kind, task.name
                )));
            }
        }

        for page in self.pages() {
            for component in &page.components {
                if !seen.contains(&(TaskKind::Component, component.as_str())) {
                    warn!(
                        page = %page.name,
                        component = %component,
                        "Page embeds a component that is not in the plan"
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_moves_components_first() {
        let plan = ProjectPlan::new(vec![
            PlanTask::page("Home", "/").embeds("Hero"),
            PlanTask::component("Hero", "Big banner"),
            PlanTask::component("Footer", "Links"),
        ])
        .normalized();

        let kinds: Vec<_> = plan.tasks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TaskKind::Component, TaskKind::Component, TaskKind::Page]
        );
        assert_eq!(plan.tasks[0].name, "Hero");
    }

    #[test]
    fn test_validate_requires_component() {
        let plan = ProjectPlan::new(vec![PlanTask::page("Home", "/")]);
        assert!(matches!(plan.validate(), Err(SpecError::InvalidPlan(_))));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let plan = ProjectPlan::new(vec![
            PlanTask::component("Hero", "a"),
            PlanTask::component("Hero", "b"),
        ]);
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_same_name_across_kinds_is_allowed() {
        let plan = ProjectPlan::new(vec![
            PlanTask::component("Contact", "form"),
            PlanTask::page("Contact", "/contact").embeds("Contact"),
        ]);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_deserialize_planner_shape() {
        let json = r#"{"tasks": [
            {"type": "component", "name": "Hero", "details": {"title": "x"}},
            {"type": "page", "name": "Home", "path": "/", "components": ["Hero"]}
        ]}"#;
        let plan: ProjectPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.components().count(), 1);
        assert_eq!(plan.pages().next().unwrap().unit_id(), "page:Home");
    }
}
