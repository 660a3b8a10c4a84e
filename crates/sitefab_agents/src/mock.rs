//! Scripted agent invoker for testing.
//!
//! Provides a configurable implementation of [`AgentInvoker`] so that the
//! pipeline and recovery loop can be exercised without a model.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{AgentError, AgentResult};
use crate::invoker::AgentInvoker;
use crate::request::{AgentRequest, AgentResponse};
use crate::roles::AgentRole;

type Responder = Arc<dyn Fn(&AgentRequest) -> AgentResult<AgentResponse> + Send + Sync>;

/// Agent invoker that answers from per-role scripts.
///
/// Queued responses are consumed first. When a role's queue is empty the
/// role's responder function is used, if any. Otherwise the call fails with
/// an invocation error.
#[derive(Clone, Default)]
pub struct ScriptedInvoker {
    queues: Arc<RwLock<HashMap<AgentRole, VecDeque<AgentResult<AgentResponse>>>>>,
    responders: Arc<RwLock<HashMap<AgentRole, Responder>>>,
    captured_calls: Arc<RwLock<Vec<AgentRequest>>>,
    delay: Option<Duration>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next call to a role.
    pub fn respond(self, role: AgentRole, response: AgentResponse) -> Self {
        self.queues
            .write()
            .entry(role)
            .or_default()
            .push_back(Ok(response));
        self
    }

    /// Queue a failure for the next call to a role.
    pub fn fail(self, role: AgentRole, error: AgentError) -> Self {
        self.queues
            .write()
            .entry(role)
            .or_default()
            .push_back(Err(error));
        self
    }

    /// Answer calls to a role with a function of the request.
    pub fn with_responder(
        self,
        role: AgentRole,
        responder: impl Fn(&AgentRequest) -> AgentResult<AgentResponse> + Send + Sync + 'static,
    ) -> Self {
        self.responders.write().insert(role, Arc::new(responder));
        self
    }

    /// Sleep before answering every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get all captured requests.
    pub fn get_calls(&self) -> Vec<AgentRequest> {
        self.captured_calls.read().clone()
    }

    /// Get requests sent to a specific role.
    pub fn calls_for(&self, role: AgentRole) -> Vec<AgentRequest> {
        self.captured_calls
            .read()
            .iter()
            .filter(|r| r.role() == role)
            .cloned()
            .collect()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    fn answer(&self, request: &AgentRequest) -> AgentResult<AgentResponse> {
        let role = request.role();
        let queued = self
            .queues
            .write()
            .get_mut(&role)
            .and_then(|queue| queue.pop_front());
        if let Some(result) = queued {
            return result;
        }

        let responder = self.responders.read().get(&role).cloned();
        match responder {
            Some(responder) => responder(request),
            None => Err(AgentError::invocation(role, "no scripted response")),
        }
    }
}

#[async_trait]
impl AgentInvoker for ScriptedInvoker {
    async fn invoke(&self, request: AgentRequest) -> AgentResult<AgentResponse> {
        self.captured_calls.write().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answer(&request)
    }
}
