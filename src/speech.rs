//! Speech transcription and synthesis providers

mod openai;

pub use openai::OpenAISpeechService;

use crate::config::env_parse;
use crate::llm::ProviderError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Largest audio payload accepted for transcription
pub const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// Synthesized audio, delivered as it arrives from the provider
pub type SpeechStream = Pin<Box<dyn Stream<Item = Result<Bytes, ProviderError>> + Send>>;

/// Audio to transcribe
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInput {
    pub bytes: Bytes,
    pub file_name: String,
    pub content_type: Option<String>,
}

impl AudioInput {
    pub fn new(bytes: impl Into<Bytes>, file_name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: file_name.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Convert recorded speech to text
    async fn transcribe(&self, audio: AudioInput) -> Result<String, ProviderError>;

    /// Convert text to `audio/mpeg`
    async fn synthesize(&self, text: &str) -> Result<SpeechStream, ProviderError>;

    /// Download audio from a URL for transcription
    async fn fetch_audio(&self, url: &str) -> Result<AudioInput, ProviderError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechConfig {
    pub openai_api_key: Option<String>,
    pub transcribe_model: String,
    pub tts_model: String,
    pub voice: String,
    pub timeout: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            transcribe_model: "whisper-1".to_string(),
            tts_model: "gpt-4o-mini-tts".to_string(),
            voice: "alloy".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl SpeechConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            transcribe_model: std::env::var("TRANSCRIBE_MODEL").unwrap_or(defaults.transcribe_model),
            tts_model: std::env::var("TTS_MODEL").unwrap_or(defaults.tts_model),
            voice: std::env::var("TTS_VOICE").unwrap_or(defaults.voice),
            timeout: Duration::from_secs(env_parse(
                "AGENT_CHAT_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )),
        }
    }

    /// Build the speech provider, or `None` when no key is configured
    pub fn build(&self) -> Result<Option<Arc<dyn SpeechService>>, ProviderError> {
        let Some(api_key) = self.openai_api_key.clone() else {
            return Ok(None);
        };
        let service = OpenAISpeechService::new(api_key, self)?;
        Ok(Some(Arc::new(service)))
    }
}

/// Pick a file name for audio downloaded from `url`
pub fn file_name_from_url(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| name.contains('.'))
        .unwrap_or("audio.wav")
        .to_string()
}

#[cfg(test)]
pub mod testing {
    //! In-memory speech provider

    use super::*;
    use std::sync::Mutex;

    pub struct MockSpeechService {
        pub transcript: String,
        pub audio: Vec<Bytes>,
        pub transcribed: Mutex<Vec<AudioInput>>,
        pub synthesized: Mutex<Vec<String>>,
    }

    impl MockSpeechService {
        pub fn new(transcript: &str, audio: &[&'static [u8]]) -> Self {
            Self {
                transcript: transcript.to_string(),
                audio: audio.iter().copied().map(Bytes::from_static).collect(),
                transcribed: Mutex::new(Vec::new()),
                synthesized: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SpeechService for MockSpeechService {
        async fn transcribe(&self, audio: AudioInput) -> Result<String, ProviderError> {
            if audio.bytes.is_empty() {
                return Err(ProviderError::invalid_request("empty audio"));
            }
            self.transcribed.lock().unwrap().push(audio);
            Ok(self.transcript.clone())
        }

        async fn synthesize(&self, text: &str) -> Result<SpeechStream, ProviderError> {
            self.synthesized.lock().unwrap().push(text.to_string());
            let chunks: Vec<Result<Bytes, ProviderError>> =
                self.audio.iter().cloned().map(Ok).collect();
            Ok(Box::pin(futures::stream::iter(chunks)))
        }

        async fn fetch_audio(&self, url: &str) -> Result<AudioInput, ProviderError> {
            if url.starts_with("http") {
                Ok(AudioInput::new(Bytes::from_static(b"RIFF"), file_name_from_url(url)))
            } else {
                Err(ProviderError::invalid_request(format!("unsupported url: {url}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(file_name_from_url("https://cdn.example.com/a/clip.mp3"), "clip.mp3");
        assert_eq!(file_name_from_url("https://x.test/voice.webm?sig=abc"), "voice.webm");
        assert_eq!(file_name_from_url("https://x.test/stream"), "audio.wav");
        assert_eq!(file_name_from_url("https://x.test/"), "audio.wav");
    }

    #[test]
    fn test_build_without_key_is_none() {
        let config = SpeechConfig::default();
        assert!(config.build().unwrap().is_none());
        assert_eq!(config.transcribe_model, "whisper-1");
        assert_eq!(config.tts_model, "gpt-4o-mini-tts");
        assert_eq!(config.voice, "alloy");
    }

    #[test]
    fn test_build_with_key() {
        let config = SpeechConfig {
            openai_api_key: Some("sk-test".to_string()),
            ..SpeechConfig::default()
        };
        assert!(config.build().unwrap().is_some());
    }
}
