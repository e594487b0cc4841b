//! Chat model definitions for all supported providers

use super::gemini::{GeminiModel, GeminiService};
use super::openai::{OpenAIModel, OpenAIService};
use super::{LlmService, ProviderError};
use std::sync::Arc;
use std::time::Duration;

/// LLM provider enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Gemini,
    OpenAI,
}

impl Provider {
    /// Get the display name for this provider
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Gemini => "Google Gemini",
            Provider::OpenAI => "OpenAI",
        }
    }

    /// Environment variable holding this provider's API key
    pub fn api_key_env_var(self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        }
    }
}

type ServiceFactory = fn(&str, Duration) -> Result<Arc<dyn LlmService>, ProviderError>;

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID, also sent to the provider
    pub id: &'static str,
    pub provider: Provider,
    pub description: &'static str,
    /// Builds the service from an API key and request timeout
    pub factory: ServiceFactory,
}

fn gemini(
    api_key: &str,
    timeout: Duration,
    model: GeminiModel,
) -> Result<Arc<dyn LlmService>, ProviderError> {
    Ok(Arc::new(GeminiService::new(api_key.to_string(), model, timeout)?))
}

fn openai(
    api_key: &str,
    timeout: Duration,
    model: OpenAIModel,
) -> Result<Arc<dyn LlmService>, ProviderError> {
    Ok(Arc::new(OpenAIService::new(api_key.to_string(), model, timeout)?))
}

static MODELS: &[ModelDef] = &[
    ModelDef {
        id: "gemini-1.5-flash",
        provider: Provider::Gemini,
        description: "Gemini 1.5 Flash (fast, default)",
        factory: |key, timeout| gemini(key, timeout, GeminiModel::Gemini15Flash),
    },
    ModelDef {
        id: "gemini-1.5-pro",
        provider: Provider::Gemini,
        description: "Gemini 1.5 Pro (more capable, slower)",
        factory: |key, timeout| gemini(key, timeout, GeminiModel::Gemini15Pro),
    },
    ModelDef {
        id: "gemini-2.0-flash",
        provider: Provider::Gemini,
        description: "Gemini 2.0 Flash",
        factory: |key, timeout| gemini(key, timeout, GeminiModel::Gemini20Flash),
    },
    ModelDef {
        id: "gpt-4o",
        provider: Provider::OpenAI,
        description: "GPT-4o",
        factory: |key, timeout| openai(key, timeout, OpenAIModel::GPT4o),
    },
    ModelDef {
        id: "gpt-4o-mini",
        provider: Provider::OpenAI,
        description: "GPT-4o mini (fast, inexpensive)",
        factory: |key, timeout| openai(key, timeout, OpenAIModel::GPT4oMini),
    },
];

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    MODELS
}
