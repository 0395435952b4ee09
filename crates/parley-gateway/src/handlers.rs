//! HTTP handlers composing transcription, generation and synthesis.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    Json,
};
use tracing::{info, warn};

use parley_core::error::{ParleyError, Result};
use parley_core::session::Turn;
use parley_media::stt::transcribe_speech;

use crate::error::ApiError;
use crate::schema::{
    ChatResponse, EchoResponse, LlmQueryResponse, TtsRequest, TtsResponse, UploadResponse,
};
use crate::state::GatewayState;
use crate::temp_file::TempAudioFile;

/// The `file` part of an audio upload.
struct AudioUpload {
    file_name: Option<String>,
    content_type: String,
    bytes: Bytes,
}

/// Pull the `file` part out of a multipart body, rejecting non-audio parts.
async fn read_audio_upload(mut multipart: Multipart) -> Result<AudioUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ParleyError::InvalidInput(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("audio/") {
            return Err(ParleyError::InvalidInput("File must be an audio file".into()));
        }

        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ParleyError::InvalidInput(format!("Failed to read upload: {e}")))?;

        return Ok(AudioUpload {
            file_name,
            content_type,
            bytes,
        });
    }

    Err(ParleyError::InvalidInput("Missing 'file' field".into()))
}

/// Final path component of a client-supplied name, or a fresh UUID name.
fn sanitize_file_name(name: Option<&str>) -> String {
    name.and_then(|n| FsPath::new(n).file_name())
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string())
}

fn first_url(urls: &[String]) -> Result<String> {
    urls.first()
        .cloned()
        .ok_or_else(|| ParleyError::Synthesis("no audio returned".into()))
}

/// Write the upload to a temp file and transcribe it. The guard is returned
/// so the caller controls when the file goes away.
async fn transcribe_upload(
    state: &GatewayState,
    upload: &AudioUpload,
) -> Result<(TempAudioFile, String)> {
    let temp = TempAudioFile::create(&state.uploads_dir, &upload.bytes).await?;
    let transcript = transcribe_speech(state.transcriber.as_ref(), temp.path()).await?;
    info!(chars = transcript.len(), "Transcription completed");
    Ok((temp, transcript))
}

// --- POST /upload-audio ---

pub async fn upload_audio(
    State(state): State<Arc<GatewayState>>,
    multipart: Multipart,
) -> std::result::Result<Json<UploadResponse>, ApiError> {
    store_upload(&state, multipart)
        .await
        .map(Json)
        .map_err(|e| ApiError::detail("Failed to upload file", e))
}

async fn store_upload(state: &GatewayState, multipart: Multipart) -> Result<UploadResponse> {
    let upload = read_audio_upload(multipart).await?;
    let file_name = sanitize_file_name(upload.file_name.as_deref());
    let path = state.uploads_dir.join(&file_name);

    tokio::fs::write(&path, &upload.bytes).await?;
    info!(file = %file_name, size = upload.bytes.len(), "Audio file uploaded");

    Ok(UploadResponse {
        file_name,
        content_type: upload.content_type,
        size: upload.bytes.len(),
    })
}

// --- POST /tts/echo ---

pub async fn echo_audio(
    State(state): State<Arc<GatewayState>>,
    multipart: Multipart,
) -> std::result::Result<Json<EchoResponse>, ApiError> {
    echo(&state, multipart)
        .await
        .map(Json)
        .map_err(|e| ApiError::detail("Failed to process audio", e))
}

async fn echo(state: &GatewayState, multipart: Multipart) -> Result<EchoResponse> {
    let upload = read_audio_upload(multipart).await?;
    let (_temp, transcript) = transcribe_upload(state, &upload).await?;

    let audio_urls = state.synthesizer.synthesize(&transcript).await?;
    Ok(EchoResponse {
        audio_url: first_url(&audio_urls)?,
        transcript,
    })
}

// --- POST /tts ---

pub async fn generate_tts(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<TtsRequest>,
) -> std::result::Result<Json<TtsResponse>, ApiError> {
    synthesize_text(&state, &req.text)
        .await
        .map(Json)
        .map_err(|e| ApiError::detail("TTS generation failed", e))
}

async fn synthesize_text(state: &GatewayState, text: &str) -> Result<TtsResponse> {
    if text.trim().is_empty() {
        return Err(ParleyError::InvalidInput("Text must not be empty".into()));
    }
    info!(chars = text.chars().count(), "Generating TTS");

    let audio_urls = state.synthesizer.synthesize(text).await?;
    Ok(TtsResponse {
        audio_url: first_url(&audio_urls)?,
    })
}

// --- POST /llm/query ---

pub async fn query_llm(
    State(state): State<Arc<GatewayState>>,
    multipart: Multipart,
) -> std::result::Result<Json<LlmQueryResponse>, ApiError> {
    single_turn(&state, multipart)
        .await
        .map(Json)
        .map_err(ApiError::structured)
}

async fn single_turn(state: &GatewayState, multipart: Multipart) -> Result<LlmQueryResponse> {
    let upload = read_audio_upload(multipart).await?;
    let (_temp, transcript) = transcribe_upload(state, &upload).await?;

    let llm_text = state.generator.generate(&transcript).await?;
    let audio_urls = state.synthesizer.synthesize(&llm_text).await?;

    Ok(LlmQueryResponse {
        success: true,
        audio_url: first_url(&audio_urls)?,
        audio_urls,
        transcript,
        llm_text,
    })
}

// --- POST /agent/chat/{session_id} ---

pub async fn chat_with_agent(
    State(state): State<Arc<GatewayState>>,
    Path(session_id): Path<String>,
    multipart: Multipart,
) -> std::result::Result<Json<ChatResponse>, ApiError> {
    chat_turn(&state, session_id, multipart)
        .await
        .map(Json)
        .map_err(ApiError::structured)
}

async fn chat_turn(
    state: &GatewayState,
    session_id: String,
    multipart: Multipart,
) -> Result<ChatResponse> {
    let upload = read_audio_upload(multipart).await?;
    let (_temp, transcript) = transcribe_upload(state, &upload).await?;

    let _session_guard = state.session_locks.acquire(&session_id).await;
    let history = state.sessions.get(&session_id).await?;

    let llm_text = state
        .generator
        .generate_with_history(&transcript, &history)
        .await?;

    // Turns are only recorded once the generator has answered
    state
        .sessions
        .append(&session_id, Turn::user(transcript.clone()))
        .await?;
    state
        .sessions
        .append(&session_id, Turn::assistant(llm_text.clone()))
        .await?;
    let history_length = history.len() + 2;

    let audio_urls = state.synthesizer.synthesize(&llm_text).await.inspect_err(|e| {
        warn!(session_id = %session_id, "Synthesis failed after history was updated: {e}");
    })?;

    info!(session_id = %session_id, history_length, "Chat response generated");

    Ok(ChatResponse {
        success: true,
        audio_url: first_url(&audio_urls)?,
        audio_urls,
        transcript,
        llm_text,
        session_id,
        history_length,
    })
}
