use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParleyError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("No speech detected in the audio")]
    EmptySpeech,

    #[error("STT service error: {0}")]
    Transcription(String),

    #[error("LLM service error: {0}")]
    Generation(String),

    #[error("TTS service error: {0}")]
    Synthesis(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification used when translating errors for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any upstream call (bad content type, empty speech).
    InvalidInput,
    /// A provider returned an error status or a malformed payload.
    UpstreamFailure,
    /// Local failure: temp files, config, serialization.
    InternalIo,
}

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Stt,
    Llm,
    Tts,
    Unknown,
}

impl ParleyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::EmptySpeech => ErrorKind::InvalidInput,
            Self::Transcription(_) | Self::Generation(_) | Self::Synthesis(_) => {
                ErrorKind::UpstreamFailure
            }
            Self::Config(_) | Self::Io(_) | Self::Json(_) | Self::Other(_) => {
                ErrorKind::InternalIo
            }
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::Transcription(_) | Self::EmptySpeech => Stage::Stt,
            Self::Generation(_) => Stage::Llm,
            Self::Synthesis(_) => Stage::Tts,
            _ => Stage::Unknown,
        }
    }
}

pub type Result<T> = std::result::Result<T, ParleyError>;
