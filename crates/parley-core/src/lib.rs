//! Core config, errors, and conversation session model for Parley.

pub mod config;
pub mod error;
pub mod session;
pub mod session_store;
