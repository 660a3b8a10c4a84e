//! Agent invoker backed by a completion model.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{AgentError, AgentResult};
use crate::extract::parse_response;
use crate::invoker::AgentInvoker;
use crate::llm::CompletionClient;
use crate::prompts::PromptSet;
use crate::request::{AgentRequest, AgentResponse};

/// Sends the role's system prompt plus the request payload as pretty JSON,
/// then parses the reply into the role's response type.
pub struct LlmAgentInvoker {
    client: Arc<dyn CompletionClient>,
    prompts: PromptSet,
}

impl LlmAgentInvoker {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            prompts: PromptSet::new(),
        }
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn prompts(&self) -> &PromptSet {
        &self.prompts
    }
}

#[async_trait]
impl AgentInvoker for LlmAgentInvoker {
    async fn invoke(&self, request: AgentRequest) -> AgentResult<AgentResponse> {
        let role = request.role();
        let user = serde_json::to_string_pretty(&request.payload())
            .map_err(|e| AgentError::invocation(role, format!("cannot encode request: {}", e)))?;

        let reply = self
            .client
            .complete(role, self.prompts.system_prompt(role), &user)
            .await?;
        debug!(role = %role, chars = reply.len(), "Agent replied");

        parse_response(role, &reply).inspect_err(|e| {
            warn!(role = %role, "Discarding agent reply: {}", e);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{FileAnalysis, FileAnalysisRequest};
    use crate::roles::AgentRole;
    use parking_lot::Mutex;

    struct CannedClient {
        reply: String,
        seen: Mutex<Vec<(AgentRole, String, String)>>,
    }

    #[async_trait]
    impl CompletionClient for CannedClient {
        async fn complete(&self, role: AgentRole, system: &str, user: &str) -> AgentResult<String> {
            self.seen
                .lock()
                .push((role, system.to_string(), user.to_string()));
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_sends_prompt_and_payload() {
        let client = Arc::new(CannedClient {
            reply: "```json\n{\"relevant_files\": [\"app/page.tsx\"]}\n```".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let invoker = LlmAgentInvoker::new(client.clone())
            .with_prompts(PromptSet::new().with_prompt(AgentRole::FileAnalyzer, "find files"));

        let response = invoker
            .invoke(AgentRequest::FileAnalyzer(FileAnalysisRequest {
                error_log: "Error: boom".to_string(),
                available_files: vec!["app/page.tsx".to_string()],
            }))
            .await
            .unwrap();

        assert_eq!(
            response,
            AgentResponse::FileAnalysis(FileAnalysis {
                relevant_files: vec!["app/page.tsx".to_string()]
            })
        );
        let seen = client.seen.lock();
        assert_eq!(seen[0].0, AgentRole::FileAnalyzer);
        assert_eq!(seen[0].1, "find files");
        let user: serde_json::Value = serde_json::from_str(&seen[0].2).unwrap();
        assert_eq!(user["error_log"], "Error: boom");
    }

    #[tokio::test]
    async fn test_garbage_reply_is_parse_error() {
        let client = Arc::new(CannedClient {
            reply: "I could not do that".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let invoker = LlmAgentInvoker::new(client);
        let err = invoker
            .invoke(AgentRequest::FileAnalyzer(FileAnalysisRequest {
                error_log: String::new(),
                available_files: Vec::new(),
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Parse { .. }));
    }
}
