//! HTTP request handlers

use super::types::{
    ChatRequest, ErrorResponse, ModelsResponse, ToolsResponse, TranscribeUrlRequest,
    TranscriptResponse, TtsRequest,
};
use super::AppState;
use crate::agent::{AgentError, RunResult};
use crate::llm::{ProviderError, ProviderErrorKind};
use crate::speech::{AudioInput, SpeechService, MAX_AUDIO_BYTES};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use std::sync::Arc;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Agent run
        .route("/api/chat", post(chat))
        // Speech
        .route(
            "/api/transcribe",
            post(transcribe).layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES)),
        )
        .route("/api/transcribe/url", post(transcribe_url))
        .route("/transcribeAudioUrl", post(transcribe_url))
        .route("/api/tts", post(text_to_speech))
        // Metadata
        .route("/api/tools", get(list_tools))
        .route("/api/models", get(list_models))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Agent Run
// ============================================================

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<RunResult>, AppError> {
    if !state.llm_registry.has_models() {
        return Err(AppError::Unavailable(
            "No chat models configured; set GEMINI_API_KEY or OPENAI_API_KEY".to_string(),
        ));
    }

    let llm = match req.model.as_deref() {
        Some(model_id) => state
            .llm_registry
            .get(model_id)
            .ok_or_else(|| AppError::NotFound(format!("Unknown model: {model_id}")))?,
        None => state.llm_registry.default().ok_or_else(|| {
            AppError::Internal(format!(
                "Default model {} is not available",
                state.llm_registry.default_model_id()
            ))
        })?,
    };

    // Dropping this future on client disconnect abandons the run
    let result = state
        .orchestrator(llm)
        .run(req.messages, req.proverbs)
        .await?;
    Ok(Json(result))
}

// ============================================================
// Speech
// ============================================================

fn speech(state: &AppState) -> Result<Arc<dyn SpeechService>, AppError> {
    state.speech.clone().ok_or_else(|| {
        AppError::Unavailable("Speech is not configured; set OPENAI_API_KEY".to_string())
    })
}

async fn transcribe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TranscriptResponse>, AppError> {
    let speech = speech(&state)?;

    let mut audio = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("audio.wav").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let mut input = AudioInput::new(bytes, file_name);
        if let Some(content_type) = content_type {
            input = input.with_content_type(content_type);
        }
        audio = Some(input);
        break;
    }

    let audio = audio.ok_or_else(|| AppError::BadRequest("Missing `file` field".to_string()))?;
    let text = speech.transcribe(audio).await?;
    Ok(Json(TranscriptResponse { text }))
}

async fn transcribe_url(
    State(state): State<AppState>,
    Json(req): Json<TranscribeUrlRequest>,
) -> Result<Json<TranscriptResponse>, AppError> {
    let speech = speech(&state)?;
    let audio = speech.fetch_audio(&req.audio_url).await?;
    let text = speech.transcribe(audio).await?;
    Ok(Json(TranscriptResponse { text }))
}

async fn text_to_speech(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, AppError> {
    let speech = speech(&state)?;

    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let TtsRequest { text } = if is_json {
        let Json(req) = Json::<TtsRequest>::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        req
    } else {
        let Form(req) = Form::<TtsRequest>::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        req
    };

    let stream = speech.synthesize(&text).await?;
    Ok((
        [(header::CONTENT_TYPE, "audio/mpeg")],
        Body::from_stream(stream),
    )
        .into_response())
}

// ============================================================
// Metadata
// ============================================================

async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        tools: state.tools.definitions(),
    })
}

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.llm_registry.available_model_info(),
        default: state.llm_registry.default_model_id().to_string(),
    })
}

async fn get_version() -> &'static str {
    concat!("proverbs-agent ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Unavailable(String),
    BadGateway(String),
    GatewayTimeout(String),
    Internal(String),
}

impl From<AgentError> for AppError {
    fn from(e: AgentError) -> Self {
        let message = e.to_string();
        match e {
            AgentError::EmptyConversation | AgentError::InvalidConversation(_) => {
                AppError::BadRequest(message)
            }
            AgentError::Provider(ref p) if p.kind == ProviderErrorKind::Timeout => {
                AppError::GatewayTimeout(message)
            }
            AgentError::Provider(_) | AgentError::UnknownTool(_) => AppError::BadGateway(message),
            AgentError::IterationLimit { .. }
            | AgentError::Cancelled
            | AgentError::Transition(_) => AppError::Internal(message),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        match e.kind {
            ProviderErrorKind::InvalidRequest => AppError::BadRequest(e.message),
            ProviderErrorKind::Timeout => AppError::GatewayTimeout(e.message),
            _ => AppError::BadGateway(e.message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %message, "Request failed");
        }

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
