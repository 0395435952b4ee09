//! Speech pipeline clients and text chunking.

pub mod chunker;
pub mod stt;
pub mod tts;
