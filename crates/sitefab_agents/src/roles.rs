//! Agent role definitions.

use serde::{Deserialize, Serialize};

/// The closed set of agent roles driven by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Planner,
    Designer,
    Copywriter,
    Coder,
    Tester,
    FileAnalyzer,
    Debugger,
    E2eTester,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Planner => "planner",
            AgentRole::Designer => "designer",
            AgentRole::Copywriter => "copywriter",
            AgentRole::Coder => "coder",
            AgentRole::Tester => "tester",
            AgentRole::FileAnalyzer => "file_analyzer",
            AgentRole::Debugger => "debugger",
            AgentRole::E2eTester => "e2e_tester",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgentRole::Planner => "Turns a checklist into an ordered component and page plan",
            AgentRole::Designer => "Designs component structure and props",
            AgentRole::Copywriter => "Writes final copy for design placeholders",
            AgentRole::Coder => "Writes component, page and fix source files",
            AgentRole::Tester => "Writes unit and accessibility tests for components",
            AgentRole::FileAnalyzer => "Finds the source files implicated by an error log",
            AgentRole::Debugger => "Diagnoses the root cause of a failure",
            AgentRole::E2eTester => "Writes end-to-end browser tests for the site",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            AgentRole::Planner,
            AgentRole::Designer,
            AgentRole::Copywriter,
            AgentRole::Coder,
            AgentRole::Tester,
            AgentRole::FileAnalyzer,
            AgentRole::Debugger,
            AgentRole::E2eTester,
        ]
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
