//! Google Gemini provider implementation

use super::types::{ContentBlock, LlmRequest, LlmResponse, Usage};
use super::{LlmService, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini models
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiModel {
    Gemini15Flash,
    Gemini15Pro,
    Gemini20Flash,
}

impl GeminiModel {
    pub fn api_name(self) -> &'static str {
        match self {
            GeminiModel::Gemini15Flash => "gemini-1.5-flash",
            GeminiModel::Gemini15Pro => "gemini-1.5-pro",
            GeminiModel::Gemini20Flash => "gemini-2.0-flash",
        }
    }
}

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: String,
    model: GeminiModel,
    url: String,
}

impl GeminiService {
    pub fn new(
        api_key: String,
        model: GeminiModel,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, model, timeout, DEFAULT_BASE_URL)
    }

    /// Point the service at a different API root (proxies, local fakes)
    pub fn with_base_url(
        api_key: String,
        model: GeminiModel,
        timeout: Duration,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::unknown(format!("Failed to create HTTP client: {e}")))?;

        let url = format!(
            "{}/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            model.api_name()
        );

        Ok(Self {
            client,
            api_key,
            model,
            url,
        })
    }

    fn translate_request(request: &LlmRequest) -> GeminiRequest {
        let contents = vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart::Text {
                text: request.prompt.clone(),
            }],
        }];

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(vec![GeminiTool {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.input_schema.clone(),
                    })
                    .collect(),
            }])
        };

        GeminiRequest {
            contents,
            tools,
            generation_config: request.max_tokens.map(|max| GeminiGenerationConfig {
                max_output_tokens: Some(max),
            }),
        }
    }

    fn normalize_response(resp: GeminiResponse) -> Result<LlmResponse, ProviderError> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::unknown("No candidates in response"))?;

        let mut content = Vec::new();
        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

        for part in parts {
            match part {
                GeminiPart::Text { text } => {
                    if !text.is_empty() {
                        content.push(ContentBlock::Text { text });
                    }
                }
                GeminiPart::FunctionCall { function_call } => {
                    if function_call.name.is_empty() {
                        continue;
                    }
                    // Gemini only sometimes assigns ids; results are matched by id
                    let id = function_call
                        .id
                        .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
                    content.push(ContentBlock::ToolUse {
                        id,
                        name: function_call.name,
                        input: function_call.args,
                    });
                }
                GeminiPart::Other(_) => {}
            }
        }

        if content.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
            return Err(ProviderError::unknown(format!(
                "Empty response from Gemini (finish reason: {reason})"
            )));
        }

        let usage = resp.usage_metadata.unwrap_or_default();
        Ok(LlmResponse {
            content,
            usage: Usage {
                input_tokens: u64::from(usage.prompt_token_count),
                output_tokens: u64::from(usage.candidates_token_count),
            },
        })
    }
}

#[async_trait]
impl LlmService for GeminiService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
        let gemini_request = Self::translate_request(request);

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error_resp) = serde_json::from_str::<GeminiErrorResponse>(&body) {
                return Err(ProviderError::from_status(status, &error_resp.error.message));
            }
            return Err(ProviderError::from_status(status, &body));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(gemini_response)
    }

    fn model_id(&self) -> &str {
        self.model.api_name()
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
    },
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
