//! Request and response bodies. Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsResponse {
    pub audio_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoResponse {
    pub audio_url: String,
    pub transcript: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmQueryResponse {
    pub success: bool,
    /// First entry of `audio_urls`.
    pub audio_url: String,
    pub audio_urls: Vec<String>,
    pub transcript: String,
    pub llm_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub success: bool,
    pub audio_url: String,
    pub audio_urls: Vec<String>,
    pub transcript: String,
    pub llm_text: String,
    pub session_id: String,
    /// Number of turns stored for the session after this exchange.
    pub history_length: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_uses_camel_case() {
        let response = ChatResponse {
            success: true,
            audio_url: "u1".into(),
            audio_urls: vec!["u1".into(), "u2".into()],
            transcript: "hi".into(),
            llm_text: "hello".into(),
            session_id: "s1".into(),
            history_length: 2,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["audioUrl"], "u1");
        assert_eq!(value["audioUrls"][1], "u2");
        assert_eq!(value["llmText"], "hello");
        assert_eq!(value["sessionId"], "s1");
        assert_eq!(value["historyLength"], 2);
        assert!(value.get("audio_url").is_none());
    }

    #[test]
    fn test_tts_request_requires_text() {
        assert!(serde_json::from_str::<TtsRequest>(r#"{"text": "hi"}"#).is_ok());
        assert!(serde_json::from_str::<TtsRequest>(r#"{}"#).is_err());
    }
}
