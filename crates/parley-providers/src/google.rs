//! Google Generative AI (Gemini) provider.
//!
//! Uses the non-streaming `generateContent` endpoint. Auth is via API key in
//! query parameter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info};

use parley_core::config::GenerationConfig;
use parley_core::error::{ParleyError, Result};
use parley_core::session::{Role, Turn};

use crate::ResponseGenerator;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiGenerator {
    pub base_url: String,
    pub model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Ok(Self::new(
            config.require_api_key()?,
            config.model.clone(),
            config.base_url.as_deref(),
        ))
    }

    async fn generate_content(&self, contents: Vec<serde_json::Value>) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        debug!(model = %self.model, turns = contents.len(), "Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&GeminiRequest { contents })
            .send()
            .await
            .map_err(|e| ParleyError::Generation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error");
            return Err(ParleyError::Generation(format!(
                "Gemini API error {status}: {body}"
            )));
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ParleyError::Generation(format!("malformed Gemini response: {e}")))?;

        let text = body.reply_text().trim().to_string();
        if text.is_empty() {
            let reason = body
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!(" (blocked: {r})"))
                .unwrap_or_default();
            return Err(ParleyError::Generation(format!(
                "No response generated from LLM{reason}"
            )));
        }

        info!(model = %self.model, chars = text.len(), "LLM response generated");
        Ok(text)
    }
}

/// Convert conversation turns to Gemini `contents`.
///
/// Gemini labels model-authored turns `"model"` rather than `"assistant"`.
pub fn format_history(history: &[Turn]) -> Vec<serde_json::Value> {
    history
        .iter()
        .map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "model",
            };
            json!({ "role": role, "parts": [{ "text": turn.content }] })
        })
        .collect()
}

fn user_content(text: &str) -> serde_json::Value {
    json!({ "role": "user", "parts": [{ "text": text }] })
}

// --- Gemini request/response types ---

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GeminiResponse {
    /// Concatenated text parts of the first candidate.
    fn reply_text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl ResponseGenerator for GeminiGenerator {
    fn id(&self) -> &str {
        "google"
    }

    async fn generate(&self, text: &str) -> Result<String> {
        info!(chars = text.len(), "Generating LLM response");
        self.generate_content(vec![user_content(text)]).await
    }

    async fn generate_with_history(&self, message: &str, history: &[Turn]) -> Result<String> {
        info!(history = history.len(), "Generating chat response");
        let mut contents = format_history(history);
        contents.push(user_content(message));
        self.generate_content(contents).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn generator(server: &mockito::ServerGuard) -> GeminiGenerator {
        GeminiGenerator::new("g-key", "gemini-1.5-flash", Some(server.url().as_str()))
    }

    fn endpoint() -> Matcher {
        Matcher::Regex(r"^/v1beta/models/gemini-1\.5-flash:generateContent".into())
    }

    #[test]
    fn test_gemini_generator_creation() {
        let generator = GeminiGenerator::new("k", "gemini-1.5-flash", None);
        assert_eq!(generator.id(), "google");
        assert_eq!(generator.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_format_history_maps_assistant_to_model() {
        let history = vec![Turn::user("Hello"), Turn::assistant("Hi there")];
        let contents = format_history(&history);
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "Hello");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["text"], "Hi there");
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"Hello"},{"text":" world"}],"role":"model"},"finishReason":"STOP"}]}"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.reply_text(), "Hello world");
    }

    #[tokio::test]
    async fn test_generate_single_turn() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", endpoint())
            .match_query(Matcher::UrlEncoded("key".into(), "g-key".into()))
            .match_body(Matcher::Json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "What is Rust?" }] }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"  A language.\n"}]}}]}"#)
            .create_async()
            .await;

        let reply = generator(&server).generate("What is Rust?").await.unwrap();

        mock.assert_async().await;
        assert_eq!(reply, "A language.");
    }

    #[tokio::test]
    async fn test_generate_with_history_sends_turns_then_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", endpoint())
            .match_body(Matcher::Json(json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "My name is Ada." }] },
                    { "role": "model", "parts": [{ "text": "Nice to meet you, Ada." }] },
                    { "role": "user", "parts": [{ "text": "What is my name?" }] },
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"Your name is Ada."}]}}]}"#)
            .create_async()
            .await;

        let history = vec![
            Turn::user("My name is Ada."),
            Turn::assistant("Nice to meet you, Ada."),
        ];
        let reply = generator(&server)
            .generate_with_history("What is my name?", &history)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(reply, "Your name is Ada.");
    }

    #[tokio::test]
    async fn test_error_status_is_generation_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", endpoint())
            .with_status(403)
            .with_body(r#"{"error":{"message":"API key not valid"}}"#)
            .create_async()
            .await;

        let err = generator(&server).generate("hi").await.unwrap_err();
        assert!(matches!(err, ParleyError::Generation(_)));
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_blocked_prompt_without_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", endpoint())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .create_async()
            .await;

        let err = generator(&server).generate("hi").await.unwrap_err();
        assert!(matches!(err, ParleyError::Generation(_)));
        assert!(err.to_string().contains("No response generated"));
        assert!(err.to_string().contains("SAFETY"));
    }
}
