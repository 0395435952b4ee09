//! HTTP gateway for the Parley voice pipeline.
//!
//! Accepts audio uploads, runs them through transcription, response
//! generation and speech synthesis, and keeps per-session chat history in
//! memory.

pub mod error;
pub mod handlers;
pub mod schema;
pub mod server;
pub mod state;
pub mod temp_file;

pub use server::{build_router, serve, start_gateway};
pub use state::GatewayState;
