//! API request and response types

use crate::agent::Message;
use crate::llm::{ModelInfo, ToolDefinition};
use serde::{Deserialize, Serialize};

/// Request to run the agent over a conversation
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub proverbs: Vec<String>,
    /// Model id; the registry default when absent
    #[serde(default)]
    pub model: Option<String>,
}

/// Request to transcribe audio hosted elsewhere
#[derive(Debug, Deserialize)]
pub struct TranscribeUrlRequest {
    pub audio_url: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptResponse {
    pub text: String,
}

/// Text to synthesize, sent as a form field or JSON
#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolDefinition>,
}

/// Response for model list
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub default: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
