//! Speech-to-text clients for audio files on disk.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use parley_core::config::TranscriptionConfig;
use parley_core::error::{ParleyError, Result};

const ASSEMBLYAI_BASE_URL: &str = "https://api.assemblyai.com";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// A remote speech-to-text service.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Provider identifier (e.g. "assemblyai").
    fn id(&self) -> &str;

    /// Transcribe the audio file at `path`, returning the raw transcript.
    async fn transcribe(&self, path: &Path) -> Result<String>;
}

/// Transcribe a file and require that it contains speech.
///
/// Returns the trimmed transcript, or [`ParleyError::EmptySpeech`] when the
/// provider succeeded but heard nothing.
pub async fn transcribe_speech(transcriber: &dyn Transcriber, path: &Path) -> Result<String> {
    let text = transcriber.transcribe(path).await?;
    let text = text.trim();
    if text.is_empty() {
        return Err(ParleyError::EmptySpeech);
    }
    Ok(text.to_string())
}

/// Build the transcriber selected by `config.provider`.
pub fn build_transcriber(config: &TranscriptionConfig) -> Result<Box<dyn Transcriber>> {
    let api_key = config.require_api_key()?;
    let base_url = config.base_url.as_deref();

    let transcriber: Box<dyn Transcriber> = match config.provider.as_str() {
        "assemblyai" => Box::new(AssemblyAiTranscriber::new(
            api_key,
            base_url,
            Duration::from_millis(config.poll_interval_ms),
        )),
        "groq" => Box::new(WhisperTranscriber::groq(
            api_key,
            base_url,
            config.model.as_deref(),
        )),
        "openai" => Box::new(WhisperTranscriber::openai(
            api_key,
            base_url,
            config.model.as_deref(),
        )),
        other => {
            return Err(ParleyError::Config(format!(
                "unknown transcription provider: {other}"
            )));
        }
    };
    Ok(transcriber)
}

fn stt_error(e: impl std::fmt::Display) -> ParleyError {
    ParleyError::Transcription(e.to_string())
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(ParleyError::Transcription(format!(
        "Transcription API error {status}: {body}"
    )))
}

// --- AssemblyAI ---

/// AssemblyAI upload → submit → poll transcription.
pub struct AssemblyAiTranscriber {
    base_url: String,
    api_key: String,
    poll_interval: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: String,
    status: TranscriptStatus,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TranscriptStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

impl AssemblyAiTranscriber {
    pub fn new(api_key: impl Into<String>, base_url: Option<&str>, poll_interval: Duration) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(ASSEMBLYAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
            poll_interval,
            client: reqwest::Client::new(),
        }
    }

    async fn upload(&self, audio: Vec<u8>) -> Result<String> {
        let resp = self
            .client
            .post(format!("{}/v2/upload", self.base_url))
            .header("authorization", &self.api_key)
            .header("content-type", "application/octet-stream")
            .body(audio)
            .send()
            .await
            .map_err(stt_error)?;
        let upload: UploadResponse = ensure_success(resp).await?.json().await.map_err(stt_error)?;
        Ok(upload.upload_url)
    }

    async fn submit(&self, audio_url: &str) -> Result<String> {
        let resp = self
            .client
            .post(format!("{}/v2/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .json(&json!({ "audio_url": audio_url }))
            .send()
            .await
            .map_err(stt_error)?;
        let transcript: TranscriptResponse =
            ensure_success(resp).await?.json().await.map_err(stt_error)?;
        Ok(transcript.id)
    }

    async fn wait_for_completion(&self, transcript_id: &str) -> Result<String> {
        let url = format!("{}/v2/transcript/{transcript_id}", self.base_url);
        loop {
            let resp = self
                .client
                .get(&url)
                .header("authorization", &self.api_key)
                .send()
                .await
                .map_err(stt_error)?;
            let transcript: TranscriptResponse =
                ensure_success(resp).await?.json().await.map_err(stt_error)?;

            match transcript.status {
                TranscriptStatus::Completed => return Ok(transcript.text.unwrap_or_default()),
                TranscriptStatus::Error => {
                    let reason = transcript.error.unwrap_or_else(|| "unknown error".into());
                    return Err(ParleyError::Transcription(format!(
                        "Transcription failed: {reason}"
                    )));
                }
                status @ (TranscriptStatus::Queued | TranscriptStatus::Processing) => {
                    debug!(id = %transcript.id, ?status, "Transcript not ready");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

#[async_trait]
impl Transcriber for AssemblyAiTranscriber {
    fn id(&self) -> &str {
        "assemblyai"
    }

    async fn transcribe(&self, path: &Path) -> Result<String> {
        info!(file = %path.display(), "Starting transcription");
        let audio = tokio::fs::read(path).await?;
        let audio_url = self.upload(audio).await?;
        let transcript_id = self.submit(&audio_url).await?;
        let text = self.wait_for_completion(&transcript_id).await?;
        let text = text.trim().to_string();
        info!(id = %transcript_id, chars = text.len(), "Transcription completed");
        Ok(text)
    }
}

// --- Whisper-compatible (Groq, OpenAI) ---

/// Multipart Whisper transcription (`/audio/transcriptions`).
pub struct WhisperTranscriber {
    id: &'static str,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl WhisperTranscriber {
    pub fn groq(api_key: impl Into<String>, base_url: Option<&str>, model: Option<&str>) -> Self {
        Self::new(
            "groq",
            api_key.into(),
            base_url.unwrap_or(GROQ_BASE_URL),
            model.unwrap_or("whisper-large-v3-turbo"),
        )
    }

    pub fn openai(api_key: impl Into<String>, base_url: Option<&str>, model: Option<&str>) -> Self {
        Self::new(
            "openai",
            api_key.into(),
            base_url.unwrap_or(OPENAI_BASE_URL),
            model.unwrap_or("whisper-1"),
        )
    }

    fn new(id: &'static str, api_key: String, base_url: &str, model: &str) -> Self {
        Self {
            id,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url)
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    fn id(&self) -> &str {
        self.id
    }

    async fn transcribe(&self, path: &Path) -> Result<String> {
        let file_bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.webm".into());

        debug!(provider = self.id, model = %self.model, bytes = file_bytes.len(), "Sending audio for transcription");

        let part = reqwest::multipart::Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")
            .map_err(stt_error)?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "text");

        let resp = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(stt_error)?;

        let text = ensure_success(resp).await?.text().await.map_err(stt_error)?;
        let text = text.trim().to_string();
        info!(provider = self.id, chars = text.len(), "Transcription completed");
        Ok(text)
    }
}
