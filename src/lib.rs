//! Client for a password-gated conversation API: start a session with an
//! access code, load its history, and exchange messages with the assistant.

pub mod api;
pub mod config;
pub mod credential;
pub mod errors;
pub mod models;
pub mod service;

pub use errors::ClientError;
