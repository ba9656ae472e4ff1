//! Ollama adapter
//!
//! One HTTP client (`/api/chat`, non-streaming) backs all three provider
//! ports: role assessments, synthesis and model-based paste parsing.

mod client;
mod protocol;

pub use client::OllamaClient;
