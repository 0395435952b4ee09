//! Configuration loading and secret resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ParleyError, Result};

/// Top-level Parley configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub transcription: TranscriptionConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bind")]
    pub bind: String,

    /// Directory for uploaded files and transient audio.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,

    /// Request body limit for audio uploads, in megabytes.
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            uploads_dir: default_uploads_dir(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

fn default_port() -> u16 {
    8000
}

fn default_bind() -> String {
    "0.0.0.0".into()
}

fn default_uploads_dir() -> String {
    "uploads".into()
}

fn default_max_upload_mb() -> usize {
    25
}

/// Speech-to-text configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Provider: "assemblyai", "groq" or "openai" (default: "assemblyai").
    #[serde(default = "default_transcription_provider")]
    pub provider: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Model name for Whisper-compatible providers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Delay between transcript status polls (AssemblyAI only).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            provider: default_transcription_provider(),
            api_key: None,
            api_key_env: None,
            base_url: None,
            model: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_transcription_provider() -> String {
    "assemblyai".into()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl TranscriptionConfig {
    /// Env var consulted when `api_key_env` is not set.
    pub fn default_key_env(&self) -> &'static str {
        match self.provider.as_str() {
            "groq" => "GROQ_API_KEY",
            "openai" => "OPENAI_API_KEY",
            _ => "ASSEMBLYAI_API_KEY",
        }
    }

    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret_field(
            &self.api_key,
            &Some(key_env_or(&self.api_key_env, self.default_key_env())),
        )
    }

    pub fn require_api_key(&self) -> Result<String> {
        self.resolve_api_key()
            .ok_or_else(|| missing_key(&self.api_key_env, self.default_key_env()))
    }
}

/// Language model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_generation_model")]
    pub model: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: None,
            base_url: None,
            model: default_generation_model(),
        }
    }
}

const GENERATION_KEY_ENV: &str = "GOOGLE_AI_KEY";

fn default_generation_model() -> String {
    "gemini-1.5-flash".into()
}

impl GenerationConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret_field(
            &self.api_key,
            &Some(key_env_or(&self.api_key_env, GENERATION_KEY_ENV)),
        )
    }

    pub fn require_api_key(&self) -> Result<String> {
        self.resolve_api_key()
            .ok_or_else(|| missing_key(&self.api_key_env, GENERATION_KEY_ENV))
    }
}

/// Text-to-speech configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    #[serde(default = "default_audio_format")]
    pub format: String,

    /// Provider character limit per synthesis request.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: None,
            base_url: None,
            voice_id: default_voice_id(),
            format: default_audio_format(),
            max_chars: default_max_chars(),
        }
    }
}

const SYNTHESIS_KEY_ENV: &str = "MURF_API_KEY";

fn default_voice_id() -> String {
    "en-US-marcus".into()
}

fn default_audio_format() -> String {
    "MP3".into()
}

fn default_max_chars() -> usize {
    3000
}

impl SynthesisConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret_field(
            &self.api_key,
            &Some(key_env_or(&self.api_key_env, SYNTHESIS_KEY_ENV)),
        )
    }

    pub fn require_api_key(&self) -> Result<String> {
        self.resolve_api_key()
            .ok_or_else(|| missing_key(&self.api_key_env, SYNTHESIS_KEY_ENV))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "parley_gateway=debug").
    #[serde(default)]
    pub filters: Vec<String>,
}

fn default_log_format() -> String {
    "plain".into()
}

fn key_env_or(configured: &Option<String>, fallback: &str) -> String {
    configured
        .clone()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn missing_key(configured: &Option<String>, fallback: &str) -> ParleyError {
    ParleyError::Config(format!(
        "{} environment variable not set",
        key_env_or(configured, fallback)
    ))
}

/// Resolve a secret: check the direct value first, then the env-var reference.
pub fn resolve_secret_field(direct: &Option<String>, env_var: &Option<String>) -> Option<String> {
    if let Some(val) = direct {
        if !val.is_empty() {
            return Some(val.clone());
        }
    }
    if let Some(env) = env_var {
        if let Ok(val) = std::env::var(env) {
            if !val.is_empty() {
                return Some(val);
            }
        }
    }
    None
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(anyhow::Error::from)?;
    Ok(re
        .replace_all(input, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned())
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let substituted = substitute_env_vars(&raw)?;

        json5::from_str(&substituted).map_err(|e| ParleyError::Config(e.to_string()))
    }

    /// Default config file location: `~/.parley/config.json`
    pub fn default_path() -> PathBuf {
        data_dir().join("config.json")
    }

    /// Fail unless every provider has an API key.
    pub fn validate_keys(&self) -> Result<()> {
        self.transcription.require_api_key()?;
        self.generation.require_api_key()?;
        self.synthesis.require_api_key()?;
        Ok(())
    }

    /// Uploads directory with `~` expanded.
    pub fn uploads_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.server.uploads_dir).as_ref())
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_mb.saturating_mul(1024 * 1024)
    }

    /// Copy of this config with all direct secret values masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for key in [
            &mut config.transcription.api_key,
            &mut config.generation.api_key,
            &mut config.synthesis.api_key,
        ] {
            if key.is_some() {
                *key = Some("***".into());
            }
        }
        config
    }
}

/// Base directory for Parley data: `~/.parley/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".parley")
}
