//! Integration tests for checklist loading, validation and plan handling.

use std::fs;
use tempfile::tempdir;

use sitefab_spec::{
    ChecklistReader, ChecklistValidator, PlanTask, ProjectPlan, SpecError, TaskKind,
};

const LANDING_PAGE: &str = r##"{
    "checklist": {
        "branding": {"colors": {"primary": "#6366F1", "secondary": "#10B981"}},
        "pages": [
            {"name": "Home", "path": "/", "sections": [
                {"component": "Hero", "props": {"title": "Fresh bread daily"}},
                {"component": "Features"}
            ]},
            {"name": "Contact", "path": "/contact", "sections": [
                {"component": "ContactForm", "props": {"fields": ["name", "email"]}}
            ]}
        ]
    }
}"##;

/// Test reading a checklist file and validating it end to end.
#[test]
fn test_read_and_validate_checklist_file() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("bakery.json");
    fs::write(&path, LANDING_PAGE).unwrap();

    let checklist = ChecklistReader::read(&path).unwrap();
    assert_eq!(checklist.pages.len(), 2);
    assert_eq!(checklist.branding.secondary_color(), "#10B981");
    assert_eq!(
        checklist.component_types(),
        vec!["Hero", "Features", "ContactForm"]
    );

    let result = ChecklistValidator::validate(&checklist);
    assert!(result.valid, "Validation failed: {:?}", result.errors);
}

/// Test that an invalid checklist is rejected with a readable message.
#[test]
fn test_invalid_checklist_reports_errors() {
    let checklist = ChecklistReader::from_json(r#"{"pages": []}"#).unwrap();

    let err = ChecklistValidator::validate(&checklist)
        .into_result()
        .unwrap_err();
    match err {
        SpecError::ValidationFailed(msg) => assert!(msg.contains("at least one page")),
        other => panic!("unexpected error: {other}"),
    }
}

/// Test that malformed JSON surfaces as a parse error.
#[test]
fn test_malformed_checklist_file() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        ChecklistReader::read(&path),
        Err(SpecError::Json(_))
    ));
}

/// Test plan round trip through the planner response shape.
#[test]
fn test_plan_from_planner_output() {
    let raw = serde_json::json!({
        "tasks": [
            {"type": "page", "name": "Home", "path": "/", "components": ["Hero", "Features"]},
            {"type": "component", "name": "Hero", "details": "Full-width banner with CTA"},
            {"type": "component", "name": "Features", "details": "Three column grid"}
        ]
    });

    let plan: ProjectPlan = serde_json::from_value(raw).unwrap();
    let plan = plan.normalized();
    plan.validate().unwrap();

    let names: Vec<_> = plan.components().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Hero", "Features"]);
    assert_eq!(plan.tasks.last().unwrap().kind, TaskKind::Page);
}

/// Test that unknown task kinds are rejected at deserialization time.
#[test]
fn test_plan_rejects_unknown_kind() {
    let raw = r#"{"tasks": [{"type": "widget", "name": "X"}]}"#;
    assert!(serde_json::from_str::<ProjectPlan>(raw).is_err());
}

/// Test that a page-only plan is invalid.
#[test]
fn test_plan_without_components_is_invalid() {
    let plan = ProjectPlan::new(vec![PlanTask::page("Home", "/").embeds("Hero")]);
    assert!(matches!(plan.validate(), Err(SpecError::InvalidPlan(_))));
}
