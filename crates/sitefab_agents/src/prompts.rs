//! System prompts per agent role.
//!
//! Every role has a built-in prompt. A directory of `<role>.md` files can
//! override any subset of them.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{AgentError, AgentResult};
use crate::roles::AgentRole;

const PLANNER: &str = "You are a project planner for Next.js 14 websites. \
Read the website checklist in the input and produce a build plan as a JSON object \
with a `tasks` array. Each task has `type` (\"component\" or \"page\"), `name`, and \
`details`. Page tasks also carry `path` (the route, e.g. \"/contact\") and \
`components` (names of the components the page renders, in order). \
List every component task before any page task. Use the App Router layout: \
the home page lives at app/page.tsx, other pages at app/<route>/page.tsx. \
Reply with the JSON object only.";

const DESIGNER: &str = "You are a UI designer. Given a component name and its \
description, produce a JSON object describing the component's structure and its \
`props`. Use bracketed placeholders such as \"[HERO_TITLE]\" for every piece of \
visible text. Use the Tailwind classes `bg-primary` and `bg-secondary` for brand \
colours. Reply with a single JSON object.";

const COPYWRITER: &str = "You are a copywriter. The input is a component design \
with bracketed placeholders. Write clear, friendly copy for each placeholder. \
Reply with a single JSON object that maps each prop or placeholder name to its \
final text, and nothing else.";

const CODER: &str = "You are a frontend developer working in Next.js 14, React, \
TypeScript and Tailwind CSS. The input `task` is one of: `component` (write the \
component from its design spec), `page` (compose a page from the listed \
components, importing them from '@/components/<Name>'), or `fix` (rewrite \
`file_to_fix` so the diagnosed root cause is gone). Components go in \
src/components/<Name>.tsx and pages in app/. Export components as default. \
Mark files that use hooks or event handlers with 'use client'. For a fix, return \
the complete corrected file, never a diff. Reply with a JSON object with \
`filename` and `content` keys.";

const TESTER: &str = "You are a test engineer using Jest, React Testing Library \
and jest-axe. Write a test file for the component in the input. Cover rendering of \
its main content and assert there are no accessibility violations with \
`expect(await axe(container)).toHaveNoViolations()`. Place the test next to the \
component, e.g. src/components/Header.test.tsx. Reply with a JSON object with \
`filename` and `content` keys.";

const FILE_ANALYZER: &str = "You read build and test error logs and decide which \
source files are involved. Look at stack traces, file paths, import errors and \
component names in the log. Choose only from `available_files`, most likely \
culprit first, at most five files. Reply with a JSON object: \
{\"relevant_files\": [\"path\", ...]}.";

const DEBUGGER: &str = "You are a senior debugger. Find the root cause of the \
failure in `error_log`, not just the line where it surfaced. Read the implicated \
files in `codebase` and the earlier attempts in `history`; do not repeat a fix that \
already failed. The `advisory` section holds reference only material from earlier \
incidents. It may describe a patch rather than a real fix, so use it to inform your \
reasoning and never copy it blindly. Pick the single file whose change removes the \
root cause. Reply with a JSON object with `file_to_fix`, `root_cause_analysis` \
(what is wrong and why) and `fix_suggestion` (concrete instructions for the \
developer).";

const E2E_TESTER: &str = "You are a QA automation engineer using Playwright. From \
the website checklist, write an end-to-end test that visits every page, checks \
the main heading and navigation, and confirms each listed section renders. Use \
relative URLs against the configured baseURL. Reply with a JSON object with \
`filename` set to \"tests/e2e.spec.ts\" and `content`.";

fn builtin(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Planner => PLANNER,
        AgentRole::Designer => DESIGNER,
        AgentRole::Copywriter => COPYWRITER,
        AgentRole::Coder => CODER,
        AgentRole::Tester => TESTER,
        AgentRole::FileAnalyzer => FILE_ANALYZER,
        AgentRole::Debugger => DEBUGGER,
        AgentRole::E2eTester => E2E_TESTER,
    }
}

/// System prompts for all roles.
#[derive(Debug, Clone, Default)]
pub struct PromptSet {
    overrides: HashMap<AgentRole, String>,
}

impl PromptSet {
    /// Built-in prompts only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the prompt for one role.
    pub fn with_prompt(mut self, role: AgentRole, prompt: impl Into<String>) -> Self {
        self.overrides.insert(role, prompt.into());
        self
    }

    /// Load overrides from `<dir>/<role>.md`. Missing files keep the built-in
    /// prompt; a missing directory is not an error.
    pub fn load_overrides(mut self, dir: impl AsRef<Path>) -> AgentResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            debug!("Prompt directory {:?} not found, using built-in prompts", dir);
            return Ok(self);
        }

        for role in AgentRole::all() {
            let path = dir.join(format!("{}.md", role.as_str()));
            if !path.is_file() {
                continue;
            }
            let content = std::fs::read_to_string(&path).map_err(|e| {
                AgentError::NotConfigured(format!("cannot read prompt {:?}: {}", path, e))
            })?;
            let content = content.trim();
            if content.is_empty() {
                continue;
            }
            info!(role = %role, "Loaded prompt override from {:?}", path);
            self.overrides.insert(role, content.to_string());
        }
        Ok(self)
    }

    pub fn system_prompt(&self, role: AgentRole) -> &str {
        self.overrides
            .get(&role)
            .map(String::as_str)
            .unwrap_or_else(|| builtin(role))
    }

    pub fn is_overridden(&self, role: AgentRole) -> bool {
        self.overrides.contains_key(&role)
    }
}
