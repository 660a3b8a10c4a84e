//! Retry and timeout wrapper for agent calls.
//!
//! Transport retries are independent of the recovery loop's trial budget: a
//! call that still fails after `max_attempts` is one invocation failure to
//! the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{AgentError, AgentResult};
use crate::invoker::AgentInvoker;
use crate::request::{AgentRequest, AgentResponse};

/// Linear back-off retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before the retry that follows failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Wraps an invoker with retries and a per-call timeout.
pub struct RetryingInvoker {
    inner: Arc<dyn AgentInvoker>,
    policy: RetryPolicy,
    call_timeout: Option<Duration>,
}

impl RetryingInvoker {
    pub fn new(inner: Arc<dyn AgentInvoker>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            call_timeout: None,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn attempt(&self, request: AgentRequest) -> AgentResult<AgentResponse> {
        let role = request.role();
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, self.inner.invoke(request))
                .await
                .unwrap_or(Err(AgentError::Timeout {
                    role,
                    seconds: limit.as_secs(),
                })),
            None => self.inner.invoke(request).await,
        }
    }
}

#[async_trait]
impl AgentInvoker for RetryingInvoker {
    async fn invoke(&self, request: AgentRequest) -> AgentResult<AgentResponse> {
        let role = request.role();
        let mut attempt = 1;
        loop {
            match self.attempt(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        role = %role,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        "Agent call failed, retrying in {:?}: {}",
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
