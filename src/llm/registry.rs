//! Model registry for managing available chat providers

use super::{all_models, LlmService, LoggingService, ModelDef, Provider};
use crate::config::env_parse;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const PREFERRED_DEFAULT: &str = "gemini-1.5-flash";

/// Configuration for chat providers, read once at startup
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Default model ID
    pub default_model: Option<String>,
    /// Timeout applied to each completion request
    pub request_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            openai_api_key: None,
            default_model: None,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            default_model: std::env::var("DEFAULT_MODEL").ok(),
            request_timeout: Duration::from_secs(env_parse(
                "AGENT_CHAT_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
        }
    }

    fn api_key(&self, provider: Provider) -> Option<&str> {
        let key = match provider {
            Provider::Gemini => self.gemini_api_key.as_deref(),
            Provider::OpenAI => self.openai_api_key.as_deref(),
        };
        key.filter(|k| !k.is_empty())
    }
}

/// Model information with metadata
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub provider: String,
    pub description: String,
}

/// Registry of available chat models
pub struct ModelRegistry {
    services: HashMap<String, Arc<dyn LlmService>>,
    default_model: String,
}

impl ModelRegistry {
    pub fn new(config: &LlmConfig) -> Self {
        let mut services: HashMap<String, Arc<dyn LlmService>> = HashMap::new();

        for model_def in all_models() {
            if let Some(service) = Self::try_create_model(model_def, config) {
                services.insert(model_def.id.to_string(), service);
            }
        }

        let default_model = config
            .default_model
            .clone()
            .or_else(|| {
                if services.contains_key(PREFERRED_DEFAULT) {
                    Some(PREFERRED_DEFAULT.to_string())
                } else {
                    let mut ids: Vec<_> = services.keys().cloned().collect();
                    ids.sort();
                    ids.into_iter().next()
                }
            })
            .unwrap_or_else(|| PREFERRED_DEFAULT.to_string());

        Self {
            services,
            default_model,
        }
    }

    /// Registry backed by a single pre-built service
    pub fn with_service(service: Arc<dyn LlmService>) -> Self {
        let model_id = service.model_id().to_string();
        let mut services = HashMap::new();
        services.insert(model_id.clone(), service);
        Self {
            services,
            default_model: model_id,
        }
    }

    fn try_create_model(model_def: &ModelDef, config: &LlmConfig) -> Option<Arc<dyn LlmService>> {
        let api_key = config.api_key(model_def.provider)?;

        match (model_def.factory)(api_key, config.request_timeout) {
            Ok(service) => Some(Arc::new(LoggingService::new(service))),
            Err(e) => {
                tracing::warn!(model = model_def.id, error = %e, "Failed to create model service");
                None
            }
        }
    }

    /// Get a model by ID
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    /// Get the default model
    pub fn default(&self) -> Option<Arc<dyn LlmService>> {
        self.get(&self.default_model)
    }

    pub fn default_model_id(&self) -> &str {
        &self.default_model
    }

    /// List all available model IDs
    pub fn available_models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.services.keys().cloned().collect();
        models.sort();
        models
    }

    /// Detailed information about available models, in definition order
    pub fn available_model_info(&self) -> Vec<ModelInfo> {
        all_models()
            .iter()
            .filter(|def| self.services.contains_key(def.id))
            .map(|def| ModelInfo {
                id: def.id.to_string(),
                provider: def.provider.display_name().to_string(),
                description: def.description.to_string(),
            })
            .collect()
    }

    pub fn has_models(&self) -> bool {
        !self.services.is_empty()
    }

    /// Env vars that would enable more models, for startup diagnostics
    pub fn missing_key_vars(config: &LlmConfig) -> Vec<&'static str> {
        [Provider::Gemini, Provider::OpenAI]
            .into_iter()
            .filter(|p| config.api_key(*p).is_none())
            .map(Provider::api_key_env_var)
            .collect()
    }
}
