//! Run loop driving the chat and tool nodes

use super::chat_node::ChatNode;
use super::decision::{route, UnknownToolError, UnknownToolPolicy};
use super::state::{ConversationState, Message, RunResult, StateError};
use super::tool_node::ToolNode;
use super::transition::{transition, Event, Node, TransitionError};
use crate::config::{env_flag, env_parse};
use crate::llm::{LlmService, ProviderError};
use crate::tools::ToolRegistry;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Limits and policies applied to every run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Chat node invocations allowed per run
    pub max_iterations: u32,
    pub tool_timeout: Duration,
    pub unknown_tools: UnknownToolPolicy,
    /// Advertise registered tools to the provider
    pub native_tools: bool,
    pub max_tokens: Option<u32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tool_timeout: Duration::from_secs(30),
            unknown_tools: UnknownToolPolicy::Ignore,
            native_tools: true,
            max_tokens: None,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_tokens = env_parse("AGENT_MAX_TOKENS", 0u32);
        Self {
            max_iterations: env_parse("AGENT_MAX_ITERATIONS", defaults.max_iterations).max(1),
            tool_timeout: Duration::from_secs(env_parse(
                "AGENT_TOOL_TIMEOUT_SECS",
                defaults.tool_timeout.as_secs(),
            )),
            unknown_tools: env_parse("AGENT_UNKNOWN_TOOLS", defaults.unknown_tools),
            native_tools: env_flag("AGENT_NATIVE_TOOLS", defaults.native_tools),
            max_tokens: (max_tokens > 0).then_some(max_tokens),
        }
    }
}

/// Why a run ended without a result
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("conversation has no messages")]
    EmptyConversation,
    #[error("invalid conversation: {0}")]
    InvalidConversation(StateError),
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    UnknownTool(#[from] UnknownToolError),
    #[error("run exceeded {limit} chat iterations")]
    IterationLimit { limit: u32 },
    #[error("run cancelled")]
    Cancelled,
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl From<StateError> for AgentError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::Empty => AgentError::EmptyConversation,
            other => AgentError::InvalidConversation(other),
        }
    }
}

/// Drives runs over a fixed provider and tool registry.
///
/// Holds no per-run state, so one instance serves concurrent runs.
pub struct Orchestrator {
    chat: ChatNode,
    tools: ToolNode,
    registry: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmService>,
        registry: Arc<ToolRegistry>,
        chat_timeout: Duration,
        config: AgentConfig,
    ) -> Self {
        Self {
            chat: ChatNode::new(llm, chat_timeout, config.max_tokens),
            tools: ToolNode::new(registry.clone(), config.tool_timeout),
            registry,
            config,
        }
    }

    /// Run the conversation to completion
    pub async fn run(
        &self,
        initial_messages: Vec<Message>,
        proverbs: Vec<String>,
    ) -> Result<RunResult, AgentError> {
        self.run_with_cancel(initial_messages, proverbs, CancellationToken::new())
            .await
    }

    /// Run the conversation, stopping early when `cancel` fires.
    ///
    /// On any error the partial conversation is discarded.
    pub async fn run_with_cancel(
        &self,
        initial_messages: Vec<Message>,
        proverbs: Vec<String>,
        cancel: CancellationToken,
    ) -> Result<RunResult, AgentError> {
        let state = ConversationState::new(initial_messages, proverbs, self.registry.names())?;
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("run", run_id = %run_id, model = %self.chat.model_id());

        async move {
            tracing::info!(messages = state.messages().len(), "Run started");
            let result = self.drive(state, &run_id, &cancel).await;
            match &result {
                Ok(r) => tracing::info!(
                    iterations = r.iterations,
                    messages = r.messages.len(),
                    "Run completed"
                ),
                Err(e) => tracing::warn!(error = %e, "Run failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        mut state: ConversationState,
        run_id: &str,
        cancel: &CancellationToken,
    ) -> Result<RunResult, AgentError> {
        let definitions = if self.config.native_tools {
            self.registry.definitions()
        } else {
            Vec::new()
        };

        let mut node = Node::Chat;
        let mut iterations = 0u32;

        loop {
            let event = match &node {
                Node::Chat => {
                    if iterations >= self.config.max_iterations {
                        return Err(AgentError::IterationLimit {
                            limit: self.config.max_iterations,
                        });
                    }
                    iterations += 1;
                    tracing::debug!(node = "chat", iteration = iterations, "Invoking node");

                    let message =
                        until_cancelled(cancel, self.chat.invoke(&state, &definitions)).await??;
                    let decision = route(message, &state.tools, self.config.unknown_tools)?;
                    tracing::debug!(
                        node = "chat",
                        dispatch = decision.dispatches(),
                        tool_calls = decision.message().tool_calls.len(),
                        "Node completed"
                    );
                    Event::ChatCompleted(decision)
                }
                Node::Tools { calls } => {
                    tracing::debug!(node = "tools", calls = calls.len(), "Invoking node");
                    let results =
                        until_cancelled(cancel, self.tools.invoke(run_id, calls, cancel)).await?;
                    Event::ToolsCompleted { results }
                }
                Node::Terminal => break,
            };

            let result = transition(&node, event)?;
            state.extend(result.append);
            node = result.next;
        }

        let (messages, proverbs) = state.into_parts();
        Ok(RunResult {
            messages,
            proverbs,
            iterations,
        })
    }
}

async fn until_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, AgentError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(AgentError::Cancelled),
        value = fut => Ok(value),
    }
}
