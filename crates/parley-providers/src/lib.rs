//! Response generation providers.
//!
//! Each provider implements [`ResponseGenerator`] to turn a user message
//! (optionally with prior conversation turns) into a reply.

use async_trait::async_trait;

use parley_core::error::Result;
use parley_core::session::Turn;

pub mod google;

/// A remote language model that produces conversational replies.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Provider identifier (e.g. "google").
    fn id(&self) -> &str;

    /// Stateless single-turn completion. Returns the trimmed reply.
    async fn generate(&self, text: &str) -> Result<String>;

    /// Reply to `message` given the prior turns of a conversation.
    ///
    /// `history` must not already contain `message`; only the new reply is
    /// returned.
    async fn generate_with_history(&self, message: &str, history: &[Turn]) -> Result<String>;
}
