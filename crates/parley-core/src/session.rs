//! Conversation turns and the session store abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One role-tagged message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Storage for per-session conversation history.
///
/// Sessions are created lazily on first append and are never removed.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Ordered turns for a session; empty if the session has never been seen.
    async fn get(&self, session_id: &str) -> Result<Vec<Turn>>;

    /// Append a turn to the end of a session's history.
    async fn append(&self, session_id: &str, turn: Turn) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_serialization() {
        let turn = Turn::assistant("Hi there");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "Hi there");

        let back: Turn = serde_json::from_str(r#"{"role":"user","content":"Hello"}"#).unwrap();
        assert_eq!(back, Turn::user("Hello"));
    }
}
