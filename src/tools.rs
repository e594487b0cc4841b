//! Tools the agent can invoke
//!
//! Tools are stateless singletons registered once at startup; all per-call
//! context arrives through [`ToolContext`].

mod weather;

pub use weather::GetWeatherTool;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::llm::ToolDefinition;

/// Result from tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
        }
    }
}

/// All context needed for a tool invocation.
///
/// Created fresh for each tool call.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Cancellation signal for long-running operations
    pub cancel: CancellationToken,

    /// The run this tool is executing within
    pub run_id: String,

    /// Id of the tool call being answered
    pub tool_call_id: String,
}

impl ToolContext {
    pub fn new(cancel: CancellationToken, run_id: String, tool_call_id: String) -> Self {
        Self {
            cancel,
            run_id,
            tool_call_id,
        }
    }
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, unique within a registry
    fn name(&self) -> &str;

    /// Tool description for the LLM
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Execute the tool
    ///
    /// Long-running tools should watch `ctx.cancel` and stop early.
    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput;
}

/// Collection of tools available to every run.
///
/// Immutable once built, so it is shared across runs without locking.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry with the built-in tools
    pub fn standard() -> Self {
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(GetWeatherTool)];
        Self::new(tools)
    }

    /// Build a registry from explicit tools. Later duplicates of a name are
    /// ignored so names stay unique.
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        let mut unique: Vec<Arc<dyn Tool>> = Vec::with_capacity(tools.len());
        for tool in tools {
            if unique.iter().any(|t| t.name() == tool.name()) {
                tracing::warn!(tool = tool.name(), "Duplicate tool name ignored");
                continue;
            }
            unique.push(tool);
        }
        Self { tools: unique }
    }

    pub fn empty() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registered tool names, in registration order
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// Get all tool definitions for the LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name. `None` when no such tool is registered.
    pub async fn execute(&self, name: &str, input: Value, ctx: ToolContext) -> Option<ToolOutput> {
        for tool in &self.tools {
            if tool.name() == name {
                if ctx.cancel.is_cancelled() {
                    return Some(ToolOutput::error("Cancelled before start"));
                }
                return Some(tool.run(input, ctx).await);
            }
        }
        None
    }
}
