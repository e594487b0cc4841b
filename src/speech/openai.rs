//! `OpenAI` audio endpoints: transcription and speech synthesis

use super::{file_name_from_url, AudioInput, SpeechConfig, SpeechService, SpeechStream, MAX_AUDIO_BYTES};
use crate::llm::ProviderError;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAISpeechService {
    client: Client,
    api_key: String,
    base_url: String,
    transcribe_model: String,
    tts_model: String,
    voice: String,
}

impl OpenAISpeechService {
    pub fn new(api_key: String, config: &SpeechConfig) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, config, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: String,
        config: &SpeechConfig,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            transcribe_model: config.transcribe_model.clone(),
            tts_model: config.tts_model.clone(),
            voice: config.voice.clone(),
        })
    }

    fn speech_request<'a>(&'a self, text: &'a str) -> SpeechRequest<'a> {
        SpeechRequest {
            model: &self.tts_model,
            voice: &self.voice,
            input: text,
            response_format: "mp3",
        }
    }

    /// Turn a non-2xx response into a classified error
    async fn error_from(response: Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        ProviderError::from_status(status, &message)
    }
}

#[async_trait]
impl SpeechService for OpenAISpeechService {
    async fn transcribe(&self, audio: AudioInput) -> Result<String, ProviderError> {
        if audio.bytes.is_empty() {
            return Err(ProviderError::invalid_request("Audio file is empty"));
        }

        let size = audio.bytes.len();
        let mut part = Part::bytes(audio.bytes.to_vec()).file_name(audio.file_name);
        if let Some(content_type) = audio.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|e| ProviderError::invalid_request(format!("Bad content type: {e}")))?;
        }
        let form = Form::new()
            .text("model", self.transcribe_model.clone())
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let transcript: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::unknown(format!("Failed to parse transcription: {e}")))?;

        tracing::info!(model = %self.transcribe_model, bytes = size, chars = transcript.text.len(), "Audio transcribed");
        Ok(transcript.text)
    }

    async fn synthesize(&self, text: &str) -> Result<SpeechStream, ProviderError> {
        if text.trim().is_empty() {
            return Err(ProviderError::invalid_request("Text is empty"));
        }

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.speech_request(text))
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        tracing::info!(model = %self.tts_model, voice = %self.voice, chars = text.len(), "Streaming synthesized speech");
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ProviderError::from_transport(&e)));
        Ok(Box::pin(stream))
    }

    async fn fetch_audio(&self, url: &str) -> Result<AudioInput, ProviderError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ProviderError::invalid_request(format!("Invalid audio URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProviderError::invalid_request(format!(
                "Unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        if !response.status().is_success() {
            return Err(ProviderError::invalid_request(format!(
                "Audio download failed with status {}",
                response.status()
            )));
        }
        if response
            .content_length()
            .is_some_and(|len| len > MAX_AUDIO_BYTES as u64)
        {
            return Err(ProviderError::invalid_request("Audio file too large"));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::network(format!("Failed to read audio: {e}")))?;
        if bytes.len() > MAX_AUDIO_BYTES {
            return Err(ProviderError::invalid_request("Audio file too large"));
        }

        let mut audio = AudioInput::new(bytes, file_name_from_url(url));
        audio.content_type = content_type;
        Ok(audio)
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderErrorKind;
    use axum::extract::Multipart;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn fake_transcriptions(headers: HeaderMap, mut multipart: Multipart) -> impl IntoResponse {
        if headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) != Some("Bearer sk-test") {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": {"message": "bad key"}})));
        }
        let mut model = String::new();
        let mut file = (String::new(), 0usize);
        while let Ok(Some(field)) = multipart.next_field().await {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("model") => model = field.text().await.unwrap_or_default(),
                Some("file") => {
                    let name = field.file_name().unwrap_or_default().to_string();
                    let len = field.bytes().await.map(|b| b.len()).unwrap_or_default();
                    file = (name, len);
                }
                _ => {}
            }
        }
        (
            StatusCode::OK,
            Json(json!({"text": format!("{model}:{}:{}", file.0, file.1)})),
        )
    }

    async fn fake_speech(Json(body): Json<Value>) -> impl IntoResponse {
        if body["input"] == "fail" {
            return (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response();
        }
        let audio = format!("{}|{}|{}", body["model"], body["voice"], body["input"]);
        ([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response()
    }

    async fn serve() -> String {
        let app = Router::new()
            .route("/v1/audio/transcriptions", post(fake_transcriptions))
            .route("/v1/audio/speech", post(fake_speech))
            .route("/files/clip.mp3", get(|| async { ([(header::CONTENT_TYPE, "audio/mpeg")], "ID3data") }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    fn service(base: &str, key: &str) -> OpenAISpeechService {
        OpenAISpeechService::with_base_url(key.to_string(), &SpeechConfig::default(), &format!("{base}/v1"))
            .unwrap()
    }

    #[tokio::test]
    async fn test_transcribe_uploads_multipart() {
        let base = serve().await;
        let text = service(&base, "sk-test")
            .transcribe(AudioInput::new(&b"RIFF1234"[..], "temp_audio.wav").with_content_type("audio/wav"))
            .await
            .unwrap();
        assert_eq!(text, "whisper-1:temp_audio.wav:8");
    }

    #[tokio::test]
    async fn test_transcribe_auth_error_classified() {
        let base = serve().await;
        let err = service(&base, "sk-wrong")
            .transcribe(AudioInput::new(&b"RIFF"[..], "a.wav"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Auth);
        assert!(err.message.ends_with("bad key"));
    }

    #[tokio::test]
    async fn test_transcribe_rejects_empty_audio() {
        let err = service("http://127.0.0.1:9", "sk-test")
            .transcribe(AudioInput::new(Vec::<u8>::new(), "a.wav"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_synthesize_streams_audio() {
        let base = serve().await;
        let mut stream = service(&base, "sk-test").synthesize("Hello").await.unwrap();

        let mut audio = Vec::new();
        while let Some(chunk) = stream.next().await {
            audio.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(
            String::from_utf8(audio).unwrap(),
            "\"gpt-4o-mini-tts\"|\"alloy\"|\"Hello\""
        );
    }

    #[tokio::test]
    async fn test_synthesize_error_status() {
        let base = serve().await;
        let err = service(&base, "sk-test").synthesize("fail").await.err().unwrap();
        assert_eq!(err.kind, ProviderErrorKind::RateLimit);
    }

    #[tokio::test]
    async fn test_fetch_audio_keeps_name_and_type() {
        let base = serve().await;
        let audio = service(&base, "sk-test")
            .fetch_audio(&format!("{base}/files/clip.mp3"))
            .await
            .unwrap();
        assert_eq!(audio.file_name, "clip.mp3");
        assert_eq!(audio.content_type.as_deref(), Some("audio/mpeg"));
        assert_eq!(&audio.bytes[..], b"ID3data");
    }

    #[tokio::test]
    async fn test_fetch_audio_rejects_other_schemes() {
        let err = service("http://127.0.0.1:9", "sk-test")
            .fetch_audio("file:///etc/passwd")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);
    }
}
