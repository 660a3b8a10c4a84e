//! Request and response schemas for every agent role.
//!
//! Each role has one request payload and one response payload. The closed
//! [`AgentRequest`] and [`AgentResponse`] enums carry them across the single
//! invocation boundary.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use sitefab_kb::{KnowledgeEntry, ScoredEntry, Signature};
use sitefab_spec::{Checklist, ProjectPlan};

use crate::roles::AgentRole;

/// Note attached to every advisory context handed to the debugger.
pub const REFERENCE_ONLY_NOTE: &str = "reference only: earlier fixes for similar errors. \
They may have been patches rather than root-cause fixes. Verify they apply to this error \
before reusing any part of them.";

/// A source file passed to an agent as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// A file written by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    /// Path relative to the project root
    pub filename: String,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// Knowledge base results offered to the debugger.
///
/// The content is reference material only; nothing here is ever written to
/// the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryContext {
    pub note: String,
    /// Most recent verified fix for the exact error signature
    pub known_solution: Option<KnowledgeEntry>,
    /// Fixes for similar errors, best first
    pub similar_incidents: Vec<ScoredEntry>,
}

impl Default for AdvisoryContext {
    fn default() -> Self {
        Self::empty()
    }
}

impl AdvisoryContext {
    pub fn empty() -> Self {
        Self {
            note: REFERENCE_ONLY_NOTE.to_string(),
            known_solution: None,
            similar_incidents: Vec::new(),
        }
    }

    /// Build a context, removing the exact hit from the similar list.
    pub fn new(known_solution: Option<KnowledgeEntry>, similar: Vec<ScoredEntry>) -> Self {
        let similar_incidents = match &known_solution {
            Some(known) => similar
                .into_iter()
                .filter(|s| &s.entry != known)
                .collect(),
            None => similar,
        };
        Self {
            note: REFERENCE_ONLY_NOTE.to_string(),
            known_solution,
            similar_incidents,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.known_solution.is_none() && self.similar_incidents.is_empty()
    }
}

/// Summary of an earlier recovery attempt for the same scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub attempt: u32,
    pub signature: Signature,
    pub root_cause: Option<String>,
    pub fix_target: Option<String>,
    pub outcome: String,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub checklist: Checklist,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignRequest {
    pub component: String,
    pub details: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyRequest {
    pub design_spec: DesignSpec,
}

/// Coder tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum CodeRequest {
    /// Write a component from its design spec.
    Component { name: String, spec: DesignSpec },
    /// Compose a page from already generated components.
    Page {
        name: String,
        path: String,
        components: Vec<String>,
    },
    /// Rewrite one file to remove the diagnosed root cause.
    Fix(FixRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixRequest {
    pub file_to_fix: String,
    pub code_to_fix: String,
    pub root_cause: String,
    pub fix_instructions: String,
    /// Other implicated files
    pub context: Vec<SourceFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRequest {
    pub component: String,
    pub source_file: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysisRequest {
    pub error_log: String,
    /// Files the analyzer may choose from
    pub available_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisRequest {
    pub error_log: String,
    /// Validator kind that produced the log
    pub error_kind: String,
    pub codebase: Vec<SourceFile>,
    pub advisory: AdvisoryContext,
    pub history: Vec<AttemptSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct E2eRequest {
    pub checklist: Checklist,
}

/// A request to one agent role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", content = "input", rename_all = "snake_case")]
pub enum AgentRequest {
    Planner(PlanRequest),
    Designer(DesignRequest),
    Copywriter(CopyRequest),
    Coder(CodeRequest),
    Tester(TestRequest),
    FileAnalyzer(FileAnalysisRequest),
    Debugger(DiagnosisRequest),
    E2eTester(E2eRequest),
}

impl AgentRequest {
    pub fn role(&self) -> AgentRole {
        match self {
            AgentRequest::Planner(_) => AgentRole::Planner,
            AgentRequest::Designer(_) => AgentRole::Designer,
            AgentRequest::Copywriter(_) => AgentRole::Copywriter,
            AgentRequest::Coder(_) => AgentRole::Coder,
            AgentRequest::Tester(_) => AgentRole::Tester,
            AgentRequest::FileAnalyzer(_) => AgentRole::FileAnalyzer,
            AgentRequest::Debugger(_) => AgentRole::Debugger,
            AgentRequest::E2eTester(_) => AgentRole::E2eTester,
        }
    }

    /// The request payload as JSON, the user message sent to a model.
    pub fn payload(&self) -> Value {
        let result = match self {
            AgentRequest::Planner(r) => serde_json::to_value(r),
            AgentRequest::Designer(r) => serde_json::to_value(r),
            AgentRequest::Copywriter(r) => serde_json::to_value(r),
            AgentRequest::Coder(r) => serde_json::to_value(r),
            AgentRequest::Tester(r) => serde_json::to_value(r),
            AgentRequest::FileAnalyzer(r) => serde_json::to_value(r),
            AgentRequest::Debugger(r) => serde_json::to_value(r),
            AgentRequest::E2eTester(r) => serde_json::to_value(r),
        };
        result.unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Designer output: a JSON object describing structure and props.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesignSpec(pub Map<String, Value>);

impl DesignSpec {
    /// Merge finalized copy into the spec's `props` object.
    pub fn merge_copy(&mut self, copy: &CopyDeck) {
        let props = self
            .0
            .entry("props")
            .or_insert_with(|| Value::Object(Map::new()));
        if !props.is_object() {
            *props = Value::Object(Map::new());
        }
        if let Value::Object(props) = props {
            for (key, value) in &copy.0 {
                props.insert(key.clone(), value.clone());
            }
        }
    }

    pub fn props(&self) -> Option<&Map<String, Value>> {
        self.0.get("props").and_then(Value::as_object)
    }
}

/// Copywriter output: finalized copy strings keyed by placeholder or prop name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CopyDeck(pub Map<String, Value>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub relevant_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub file_to_fix: String,
    pub root_cause_analysis: String,
    pub fix_suggestion: String,
}

/// A response from one agent role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", content = "output", rename_all = "snake_case")]
pub enum AgentResponse {
    Plan(ProjectPlan),
    Design(DesignSpec),
    Copy(CopyDeck),
    Code(GeneratedFile),
    Test(GeneratedFile),
    FileAnalysis(FileAnalysis),
    Diagnosis(Diagnosis),
    E2e(GeneratedFile),
}

impl AgentResponse {
    /// Role that produces this kind of response.
    pub fn role(&self) -> AgentRole {
        match self {
            AgentResponse::Plan(_) => AgentRole::Planner,
            AgentResponse::Design(_) => AgentRole::Designer,
            AgentResponse::Copy(_) => AgentRole::Copywriter,
            AgentResponse::Code(_) => AgentRole::Coder,
            AgentResponse::Test(_) => AgentRole::Tester,
            AgentResponse::FileAnalysis(_) => AgentRole::FileAnalyzer,
            AgentResponse::Diagnosis(_) => AgentRole::Debugger,
            AgentResponse::E2e(_) => AgentRole::E2eTester,
        }
    }
}
