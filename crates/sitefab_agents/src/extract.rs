//! Parsing model replies into typed responses.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{AgentError, AgentResult};
use crate::request::{AgentResponse, GeneratedFile};
use crate::roles::AgentRole;

fn fenced_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*\n?(.*?)```").expect("fence pattern must compile")
    })
}

/// Extract the JSON object from a model reply.
///
/// Prefers the first fenced code block that contains an object, then falls
/// back to the outermost `{ ... }` span.
pub fn extract_json(text: &str) -> Option<&str> {
    for captures in fenced_block().captures_iter(text) {
        if let Some(body) = captures.get(1) {
            let body = body.as_str().trim();
            if body.starts_with('{') && body.ends_with('}') {
                return Some(body);
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_as<T: DeserializeOwned>(role: AgentRole, text: &str) -> AgentResult<T> {
    let json = extract_json(text)
        .ok_or_else(|| AgentError::parse(role, "reply contains no JSON object"))?;
    serde_json::from_str(json).map_err(|e| AgentError::parse(role, e.to_string()))
}

fn checked_file(role: AgentRole, file: GeneratedFile) -> AgentResult<GeneratedFile> {
    if file.filename.trim().is_empty() {
        return Err(AgentError::parse(role, "generated file has an empty filename"));
    }
    if file.content.trim().is_empty() {
        return Err(AgentError::parse(
            role,
            format!("generated file '{}' is empty", file.filename),
        ));
    }
    Ok(file)
}

/// Parse a reply into the response type of `role`.
pub fn parse_response(role: AgentRole, text: &str) -> AgentResult<AgentResponse> {
    let response = match role {
        AgentRole::Planner => AgentResponse::Plan(parse_as(role, text)?),
        AgentRole::Designer => AgentResponse::Design(parse_as(role, text)?),
        AgentRole::Copywriter => AgentResponse::Copy(parse_as(role, text)?),
        AgentRole::Coder => AgentResponse::Code(checked_file(role, parse_as(role, text)?)?),
        AgentRole::Tester => AgentResponse::Test(checked_file(role, parse_as(role, text)?)?),
        AgentRole::FileAnalyzer => AgentResponse::FileAnalysis(parse_as(role, text)?),
        AgentRole::Debugger => AgentResponse::Diagnosis(parse_as(role, text)?),
        AgentRole::E2eTester => AgentResponse::E2e(checked_file(role, parse_as(role, text)?)?),
    };
    Ok(response)
}
