//! Gateway shared state.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use parley_core::config::Config;
use parley_core::error::Result;
use parley_core::session::SessionStore;
use parley_core::session_store::{InMemorySessionStore, SessionLocks};
use parley_media::stt::{build_transcriber, Transcriber};
use parley_media::tts::{MurfSynthesizer, Synthesizer};
use parley_providers::google::GeminiGenerator;
use parley_providers::ResponseGenerator;

/// Shared gateway state accessible from all handlers.
pub struct GatewayState {
    pub config: Arc<Config>,
    pub transcriber: Arc<dyn Transcriber>,
    pub generator: Arc<dyn ResponseGenerator>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub sessions: Arc<dyn SessionStore>,
    pub session_locks: SessionLocks,
    pub uploads_dir: PathBuf,
}

impl GatewayState {
    pub fn new(
        config: Arc<Config>,
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn ResponseGenerator>,
        synthesizer: Arc<dyn Synthesizer>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let uploads_dir = config.uploads_dir();
        Self {
            config,
            transcriber,
            generator,
            synthesizer,
            sessions,
            session_locks: SessionLocks::new(),
            uploads_dir,
        }
    }

    /// Build the provider clients named in `config`.
    ///
    /// Fails if any provider is missing its API key or the uploads
    /// directory cannot be created.
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        config.validate_keys()?;

        let transcriber: Arc<dyn Transcriber> = build_transcriber(&config.transcription)?.into();
        let generator = Arc::new(GeminiGenerator::from_config(&config.generation)?);
        let synthesizer = Arc::new(MurfSynthesizer::from_config(&config.synthesis)?);
        let sessions = Arc::new(InMemorySessionStore::new());

        let state = Self::new(config, transcriber, generator, synthesizer, sessions);
        state.ensure_uploads_dir()?;
        Ok(state)
    }

    pub fn ensure_uploads_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.uploads_dir)?;
        info!(dir = %self.uploads_dir.display(), "Uploads directory ready");
        Ok(())
    }
}
