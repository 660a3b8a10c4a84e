//! Integration tests for the agent invocation layer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use sitefab_agents::{
    AgentError, AgentResponse, AgentResult, AgentRole, Agents, CodeRequest, CompletionClient,
    DesignSpec, FixRequest, GeneratedFile, LlmAgentInvoker, PromptSet, RetryPolicy,
    RetryingInvoker, ScriptedInvoker,
};
use sitefab_spec::{Checklist, PageSpec, SectionSpec, TaskKind};

/// Completion client that answers each role with a fixed reply.
struct RoleReplies {
    replies: Vec<(AgentRole, String)>,
    calls: Mutex<Vec<AgentRole>>,
}

impl RoleReplies {
    fn new(replies: Vec<(AgentRole, &str)>) -> Self {
        Self {
            replies: replies
                .into_iter()
                .map(|(role, reply)| (role, reply.to_string()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionClient for RoleReplies {
    async fn complete(&self, role: AgentRole, _system: &str, _user: &str) -> AgentResult<String> {
        self.calls.lock().push(role);
        self.replies
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, reply)| reply.clone())
            .ok_or_else(|| AgentError::invocation(role, "no reply configured"))
    }
}

fn checklist() -> Checklist {
    Checklist::new()
        .with_color("primary", "#112233")
        .with_page(PageSpec::new("Home", "/").section(SectionSpec::new("Hero")))
}

/// Test that a planner reply in a code fence becomes a typed plan.
#[tokio::test]
async fn test_plan_through_llm_invoker() {
    let client = Arc::new(RoleReplies::new(vec![(
        AgentRole::Planner,
        "Here is the plan:\n```json\n{\"tasks\": [\
            {\"type\": \"page\", \"name\": \"Home\", \"path\": \"/\", \"components\": [\"Hero\"]},\
            {\"type\": \"component\", \"name\": \"Hero\", \"details\": {\"headline\": true}}\
        ]}\n```",
    )]));
    let agents = Agents::new(Arc::new(LlmAgentInvoker::new(client.clone())));

    let plan = agents.plan(&checklist()).await.unwrap().normalized();

    assert_eq!(plan.tasks.len(), 2);
    assert_eq!(plan.tasks[0].kind, TaskKind::Component);
    assert_eq!(plan.tasks[1].components, vec!["Hero".to_string()]);
    assert_eq!(*client.calls.lock(), vec![AgentRole::Planner]);
}

/// Test that a wrong response variant is reported, not coerced.
#[tokio::test]
async fn test_mismatched_response_is_unexpected() {
    let scripted = ScriptedInvoker::new().respond(
        AgentRole::Designer,
        AgentResponse::Code(GeneratedFile::new("x.tsx", "x")),
    );
    let agents = Agents::new(Arc::new(scripted));

    let err = agents.design("Hero", &json!({})).await.unwrap_err();
    assert_eq!(
        err,
        AgentError::UnexpectedResponse {
            expected: AgentRole::Designer,
            actual: AgentRole::Coder,
        }
    );
}

/// Test the design, copy and component flow over a scripted invoker.
#[tokio::test]
async fn test_component_flow_with_scripted_agents() {
    let design: DesignSpec =
        serde_json::from_value(json!({"props": {"title": "[HERO_TITLE]"}})).unwrap();
    let scripted = ScriptedInvoker::new()
        .respond(AgentRole::Designer, AgentResponse::Design(design))
        .respond(
            AgentRole::Copywriter,
            AgentResponse::Copy(serde_json::from_value(json!({"title": "Hello"})).unwrap()),
        )
        .with_responder(AgentRole::Coder, |request| {
            let name = match request {
                sitefab_agents::AgentRequest::Coder(CodeRequest::Component { name, spec }) => {
                    assert_eq!(spec.props().unwrap()["title"], "Hello");
                    name.clone()
                }
                _ => return Err(AgentError::invocation(AgentRole::Coder, "unexpected task")),
            };
            Ok(AgentResponse::Code(GeneratedFile::new(
                format!("src/components/{}.tsx", name),
                "export default function Hero() { return <h1>Hello</h1> }",
            )))
        });
    let agents = Agents::new(Arc::new(scripted.clone()));

    let mut spec = agents.design("Hero", &json!({"headline": true})).await.unwrap();
    let copy = agents.copy(&spec).await.unwrap();
    spec.merge_copy(&copy);
    let file = agents
        .code(CodeRequest::Component {
            name: "Hero".to_string(),
            spec,
        })
        .await
        .unwrap();

    assert_eq!(file.filename, "src/components/Hero.tsx");
    assert_eq!(scripted.call_count(), 3);
}

/// Test that retries wrap the LLM invoker and recover from a parse failure.
#[tokio::test]
async fn test_retrying_invoker_over_flaky_agent() {
    let scripted = Arc::new(
        ScriptedInvoker::new()
            .fail(AgentRole::Coder, AgentError::parse(AgentRole::Coder, "truncated JSON"))
            .respond(
                AgentRole::Coder,
                AgentResponse::Code(GeneratedFile::new("app/page.tsx", "fixed")),
            ),
    );
    let agents = Agents::new(Arc::new(RetryingInvoker::new(
        scripted.clone(),
        RetryPolicy::new(3, Duration::from_millis(1)),
    )));

    let file = agents
        .code(CodeRequest::Fix(FixRequest {
            file_to_fix: "app/page.tsx".to_string(),
            code_to_fix: "broken".to_string(),
            root_cause: "missing import".to_string(),
            fix_instructions: "import Hero".to_string(),
            context: Vec::new(),
        }))
        .await
        .unwrap();

    assert_eq!(file.content, "fixed");
    assert_eq!(scripted.call_count(), 2);
}

/// Test that the prompt set handed to the invoker is the one used.
#[tokio::test]
async fn test_prompt_override_reaches_client() {
    struct SystemEcho(Mutex<Option<String>>);

    #[async_trait]
    impl CompletionClient for SystemEcho {
        async fn complete(&self, _role: AgentRole, system: &str, _user: &str) -> AgentResult<String> {
            *self.0.lock() = Some(system.to_string());
            Ok(r#"{"filename": "tests/e2e.spec.ts", "content": "test('home', async () => {})"}"#
                .to_string())
        }
    }

    let client = Arc::new(SystemEcho(Mutex::new(None)));
    let invoker = LlmAgentInvoker::new(client.clone())
        .with_prompts(PromptSet::new().with_prompt(AgentRole::E2eTester, "playwright please"));
    let agents = Agents::new(Arc::new(invoker));

    let file = agents.write_e2e(&checklist()).await.unwrap();
    assert_eq!(file.filename, "tests/e2e.spec.ts");
    assert_eq!(client.0.lock().as_deref(), Some("playwright please"));
}
