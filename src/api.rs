//! HTTP API for the proverbs agent

mod handlers;
mod types;

pub use handlers::create_router;

use crate::agent::{AgentConfig, Orchestrator};
use crate::llm::{LlmService, ModelRegistry};
use crate::speech::SpeechService;
use crate::tools::ToolRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub llm_registry: Arc<ModelRegistry>,
    pub tools: Arc<ToolRegistry>,
    pub agent_config: AgentConfig,
    pub chat_timeout: Duration,
    /// Absent when no speech provider is configured
    pub speech: Option<Arc<dyn SpeechService>>,
}

impl AppState {
    pub fn new(
        llm_registry: Arc<ModelRegistry>,
        tools: Arc<ToolRegistry>,
        agent_config: AgentConfig,
        chat_timeout: Duration,
    ) -> Self {
        Self {
            llm_registry,
            tools,
            agent_config,
            chat_timeout,
            speech: None,
        }
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechService>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Orchestrator bound to one chat model
    pub fn orchestrator(&self, llm: Arc<dyn LlmService>) -> Orchestrator {
        Orchestrator::new(
            llm,
            self.tools.clone(),
            self.chat_timeout,
            self.agent_config.clone(),
        )
    }
}
