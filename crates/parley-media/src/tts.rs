//! Chunked text-to-speech: one synthesis request per text chunk.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info};

use parley_core::config::SynthesisConfig;
use parley_core::error::{ParleyError, Result};

use crate::chunker::split_into_chunks;

const MURF_BASE_URL: &str = "https://api.murf.ai";

/// A remote text-to-speech service that returns hosted audio locations.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Provider identifier (e.g. "murf").
    fn id(&self) -> &str;

    /// Synthesize `text`, returning one audio URL per chunk in text order.
    ///
    /// All-or-nothing: any failing chunk fails the whole call.
    async fn synthesize(&self, text: &str) -> Result<Vec<String>>;
}

/// Murf speech generation.
pub struct MurfSynthesizer {
    base_url: String,
    api_key: String,
    voice_id: String,
    format: String,
    max_chars: usize,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    voice_id: &'a str,
    text: &'a str,
    format: &'a str,
}

impl MurfSynthesizer {
    pub fn new(api_key: impl Into<String>, config: &SynthesisConfig) -> Self {
        Self {
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(MURF_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
            voice_id: config.voice_id.clone(),
            format: config.format.clone(),
            max_chars: config.max_chars,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &SynthesisConfig) -> Result<Self> {
        Ok(Self::new(config.require_api_key()?, config))
    }

    async fn synthesize_chunk(&self, chunk: &str) -> Result<String> {
        let resp = self
            .client
            .post(format!("{}/v1/speech/generate", self.base_url))
            .header("api-key", &self.api_key)
            .json(&GenerateRequest {
                voice_id: &self.voice_id,
                text: chunk,
                format: &self.format,
            })
            .send()
            .await
            .map_err(|e| ParleyError::Synthesis(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ParleyError::Synthesis(format!(
                "TTS API error {status}: {body}"
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ParleyError::Synthesis(e.to_string()))?;
        body.get("audioFile")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ParleyError::Synthesis(format!(
                    "Could not find audioFile in TTS response. Response structure: {body}"
                ))
            })
    }
}

#[async_trait]
impl Synthesizer for MurfSynthesizer {
    fn id(&self) -> &str {
        "murf"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<String>> {
        let chunks = split_into_chunks(text, self.max_chars);
        if chunks.is_empty() {
            return Err(ParleyError::Synthesis("no text to synthesize".into()));
        }
        info!(chunks = chunks.len(), chars = text.chars().count(), voice = %self.voice_id, "Generating speech");

        let mut audio_urls = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            debug!(chunk = i + 1, total = chunks.len(), "Synthesizing chunk");
            let url = self.synthesize_chunk(chunk).await.inspect_err(|e| {
                error!(chunk = i + 1, total = chunks.len(), "Chunk synthesis failed: {e}");
            })?;
            audio_urls.push(url);
        }

        info!(urls = audio_urls.len(), "Speech generation completed");
        Ok(audio_urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn synthesizer(base_url: &str, max_chars: usize) -> MurfSynthesizer {
        let config = SynthesisConfig {
            base_url: Some(base_url.to_string()),
            max_chars,
            ..Default::default()
        };
        MurfSynthesizer::new("murf-key", &config)
    }

    async fn chunk_mock(
        server: &mut mockito::ServerGuard,
        text: &str,
        status: usize,
        body: &str,
        hits: usize,
    ) -> mockito::Mock {
        server
            .mock("POST", "/v1/speech/generate")
            .match_header("api-key", "murf-key")
            .match_body(Matcher::PartialJson(json!({ "text": text })))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_single_chunk_request_shape() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/speech/generate")
            .match_header("api-key", "murf-key")
            .match_body(Matcher::Json(json!({
                "voiceId": "en-US-marcus",
                "text": "Hello there",
                "format": "MP3",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"audioFile": "https://cdn.test/1.mp3", "audioLengthInSeconds": 1.2}"#)
            .create_async()
            .await;

        let urls = synthesizer(&server.url(), 3000)
            .synthesize("Hello there")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(urls, vec!["https://cdn.test/1.mp3"]);
    }

    #[tokio::test]
    async fn test_urls_follow_chunk_order() {
        let mut server = mockito::Server::new_async().await;
        let first = chunk_mock(&mut server, "alpha beta", 200, r#"{"audioFile": "u1"}"#, 1).await;
        let second = chunk_mock(&mut server, "gamma delta", 200, r#"{"audioFile": "u2"}"#, 1).await;
        let third = chunk_mock(&mut server, "omega", 200, r#"{"audioFile": "u3"}"#, 1).await;

        let urls = synthesizer(&server.url(), 11)
            .synthesize("alpha beta gamma delta omega")
            .await
            .unwrap();

        first.assert_async().await;
        second.assert_async().await;
        third.assert_async().await;
        assert_eq!(urls, vec!["u1", "u2", "u3"]);
    }

    #[tokio::test]
    async fn test_failed_chunk_aborts_remaining() {
        let mut server = mockito::Server::new_async().await;
        let first = chunk_mock(&mut server, "alpha beta", 200, r#"{"audioFile": "u1"}"#, 1).await;
        let second = chunk_mock(&mut server, "gamma delta", 500, r#"{"error": "boom"}"#, 1).await;
        let third = chunk_mock(&mut server, "omega", 200, r#"{"audioFile": "u3"}"#, 0).await;

        let err = synthesizer(&server.url(), 11)
            .synthesize("alpha beta gamma delta omega")
            .await
            .unwrap_err();

        first.assert_async().await;
        second.assert_async().await;
        third.assert_async().await;
        assert!(matches!(err, ParleyError::Synthesis(_)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_missing_audio_file_field() {
        let mut server = mockito::Server::new_async().await;
        chunk_mock(&mut server, "hi", 200, r#"{"encodedAudio": null}"#, 1).await;

        let err = synthesizer(&server.url(), 3000)
            .synthesize("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::Synthesis(_)));
        assert!(err.to_string().contains("audioFile"));
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected_without_requests() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/speech/generate")
            .expect(0)
            .create_async()
            .await;

        let err = synthesizer(&server.url(), 3000)
            .synthesize("   ")
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, ParleyError::Synthesis(_)));
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let config = SynthesisConfig {
            api_key_env: Some("TEST_PARLEY_MURF_UNSET".into()),
            ..Default::default()
        };
        assert!(matches!(
            MurfSynthesizer::from_config(&config),
            Err(ParleyError::Config(_))
        ));
    }
}
