//! Tool node: executes dispatched calls and records their results

use super::state::{Message, ToolCall};
use crate::tools::{ToolContext, ToolRegistry};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// A single tool call that did not produce a result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("tool `{tool}` failed: {cause}")]
pub struct ToolExecutionError {
    pub tool: String,
    pub cause: String,
}

pub struct ToolNode {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolNode {
    pub fn new(registry: Arc<ToolRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// Execute `calls` sequentially, one result message per call in call
    /// order. Failures become error results; they never abort the batch.
    pub async fn invoke(
        &self,
        run_id: &str,
        calls: &[ToolCall],
        cancel: &CancellationToken,
    ) -> Vec<Message> {
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            let message = match self.execute(run_id, call, cancel).await {
                Ok(output) => Message::tool_result(&call.id, output),
                Err(e) => {
                    tracing::warn!(call_id = %call.id, tool = %e.tool, cause = %e.cause, "Tool call failed");
                    Message::tool_error(&call.id, e.to_string())
                }
            };
            results.push(message);
        }

        results
    }

    async fn execute(
        &self,
        run_id: &str,
        call: &ToolCall,
        cancel: &CancellationToken,
    ) -> Result<String, ToolExecutionError> {
        let failed = |cause: String| ToolExecutionError {
            tool: call.name.clone(),
            cause,
        };

        let ctx = ToolContext::new(cancel.child_token(), run_id.to_string(), call.id.clone());
        let start = std::time::Instant::now();

        let output = tokio::time::timeout(
            self.timeout,
            self.registry.execute(&call.name, call.arguments.clone(), ctx),
        )
        .await
        .map_err(|_| failed(format!("timed out after {:?}", self.timeout)))?
        .ok_or_else(|| failed("no such tool is registered".to_string()))?;

        tracing::info!(
            call_id = %call.id,
            tool = %call.name,
            success = output.success,
            duration_ms = %start.elapsed().as_millis(),
            "Tool call completed"
        );

        if output.success {
            Ok(output.output)
        } else {
            Err(failed(output.output))
        }
    }
}
