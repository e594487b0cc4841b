//! Chat node: one model invocation per visit

use super::state::{ConversationState, Message, ToolCall};
use crate::llm::{LlmRequest, LlmService, ProviderError, ToolDefinition};
use crate::system_prompt::build_prompt;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

pub struct ChatNode {
    llm: Arc<dyn LlmService>,
    timeout: Duration,
    max_tokens: Option<u32>,
}

impl ChatNode {
    pub fn new(llm: Arc<dyn LlmService>, timeout: Duration, max_tokens: Option<u32>) -> Self {
        Self {
            llm,
            timeout,
            max_tokens,
        }
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    /// Ask the model for the next assistant message.
    ///
    /// Makes exactly one provider call. `tools` is advertised to the
    /// provider as-is; pass an empty slice to disable native tool calling.
    pub async fn invoke(
        &self,
        state: &ConversationState,
        tools: &[ToolDefinition],
    ) -> Result<Message, ProviderError> {
        let mut request = LlmRequest::new(build_prompt(state)).with_tools(tools.to_vec());
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = tokio::time::timeout(self.timeout, self.llm.complete(&request))
            .await
            .map_err(|_| {
                ProviderError::timeout(format!(
                    "No response from {} within {:?}",
                    self.llm.model_id(),
                    self.timeout
                ))
            })??;

        let mut seen: HashSet<String> = state.call_ids().map(str::to_string).collect();
        let tool_calls = response
            .tool_uses()
            .into_iter()
            .map(|(id, name, input)| {
                let id = if id.is_empty() || seen.contains(id) {
                    let fresh = format!("call_{}", uuid::Uuid::new_v4().simple());
                    tracing::debug!(original = %id, id = %fresh, tool = %name, "Reassigned tool call id");
                    fresh
                } else {
                    id.to_string()
                };
                seen.insert(id.clone());
                ToolCall::new(id, name, input.clone())
            })
            .collect();

        Ok(Message::assistant_with_tools(response.text(), tool_calls))
    }
}
