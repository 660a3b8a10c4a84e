//! The agent invocation boundary and a typed facade over it.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use sitefab_spec::{Checklist, ProjectPlan};

use crate::error::{AgentError, AgentResult};
use crate::request::{
    AgentRequest, AgentResponse, CodeRequest, CopyDeck, CopyRequest, DesignRequest, DesignSpec,
    Diagnosis, DiagnosisRequest, E2eRequest, FileAnalysis, FileAnalysisRequest, GeneratedFile,
    PlanRequest, TestRequest,
};
use crate::roles::AgentRole;

/// Invokes an agent: structured input in, structured output out, or an error.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(&self, request: AgentRequest) -> AgentResult<AgentResponse>;
}

/// Typed helpers over an [`AgentInvoker`].
///
/// Each helper sends the role's request and unwraps the matching response
/// variant. Any other variant is an [`AgentError::UnexpectedResponse`].
#[derive(Clone)]
pub struct Agents {
    invoker: Arc<dyn AgentInvoker>,
}

impl Agents {
    pub fn new(invoker: Arc<dyn AgentInvoker>) -> Self {
        Self { invoker }
    }

    pub fn invoker(&self) -> &Arc<dyn AgentInvoker> {
        &self.invoker
    }

    async fn call(&self, request: AgentRequest) -> AgentResult<AgentResponse> {
        let role = request.role();
        debug!(role = %role, "Invoking agent");
        let response = self.invoker.invoke(request).await?;
        if response.role() != role {
            return Err(AgentError::UnexpectedResponse {
                expected: role,
                actual: response.role(),
            });
        }
        Ok(response)
    }

    pub async fn plan(&self, checklist: &Checklist) -> AgentResult<ProjectPlan> {
        match self
            .call(AgentRequest::Planner(PlanRequest {
                checklist: checklist.clone(),
            }))
            .await?
        {
            AgentResponse::Plan(plan) => Ok(plan),
            other => Err(unexpected(AgentRole::Planner, &other)),
        }
    }

    pub async fn design(&self, component: &str, details: &Value) -> AgentResult<DesignSpec> {
        match self
            .call(AgentRequest::Designer(DesignRequest {
                component: component.to_string(),
                details: details.clone(),
            }))
            .await?
        {
            AgentResponse::Design(spec) => Ok(spec),
            other => Err(unexpected(AgentRole::Designer, &other)),
        }
    }

    pub async fn copy(&self, design_spec: &DesignSpec) -> AgentResult<CopyDeck> {
        match self
            .call(AgentRequest::Copywriter(CopyRequest {
                design_spec: design_spec.clone(),
            }))
            .await?
        {
            AgentResponse::Copy(copy) => Ok(copy),
            other => Err(unexpected(AgentRole::Copywriter, &other)),
        }
    }

    pub async fn code(&self, request: CodeRequest) -> AgentResult<GeneratedFile> {
        match self.call(AgentRequest::Coder(request)).await? {
            AgentResponse::Code(file) => Ok(file),
            other => Err(unexpected(AgentRole::Coder, &other)),
        }
    }

    pub async fn write_test(&self, request: TestRequest) -> AgentResult<GeneratedFile> {
        match self.call(AgentRequest::Tester(request)).await? {
            AgentResponse::Test(file) => Ok(file),
            other => Err(unexpected(AgentRole::Tester, &other)),
        }
    }

    pub async fn analyze_files(
        &self,
        error_log: &str,
        available_files: Vec<String>,
    ) -> AgentResult<FileAnalysis> {
        match self
            .call(AgentRequest::FileAnalyzer(FileAnalysisRequest {
                error_log: error_log.to_string(),
                available_files,
            }))
            .await?
        {
            AgentResponse::FileAnalysis(analysis) => Ok(analysis),
            other => Err(unexpected(AgentRole::FileAnalyzer, &other)),
        }
    }

    pub async fn diagnose(&self, request: DiagnosisRequest) -> AgentResult<Diagnosis> {
        match self.call(AgentRequest::Debugger(request)).await? {
            AgentResponse::Diagnosis(diagnosis) => Ok(diagnosis),
            other => Err(unexpected(AgentRole::Debugger, &other)),
        }
    }

    pub async fn write_e2e(&self, checklist: &Checklist) -> AgentResult<GeneratedFile> {
        match self
            .call(AgentRequest::E2eTester(E2eRequest {
                checklist: checklist.clone(),
            }))
            .await?
        {
            AgentResponse::E2e(file) => Ok(file),
            other => Err(unexpected(AgentRole::E2eTester, &other)),
        }
    }
}

fn unexpected(expected: AgentRole, response: &AgentResponse) -> AgentError {
    AgentError::UnexpectedResponse {
        expected,
        actual: response.role(),
    }
}
