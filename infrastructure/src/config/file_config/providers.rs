//! Provider configuration from TOML (`[providers]` section)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ollama server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOllamaConfig {
    pub base_url: String,
    /// Model used for every call unless overridden below
    pub model: String,
    /// Model used for synthesis (default: `model`)
    pub synthesis_model: Option<String>,
    /// Per-role model overrides keyed by role id
    pub role_models: HashMap<String, String>,
    /// Sampling temperature sent with each request
    pub temperature: Option<f32>,
    /// HTTP timeout in seconds for one request
    pub request_timeout_secs: u64,
}

impl Default for FileOllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "ministral-3:14b".to_string(),
            synthesis_model: None,
            role_models: HashMap::new(),
            temperature: None,
            request_timeout_secs: 300,
        }
    }
}

/// Raw providers configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProvidersConfig {
    pub ollama: FileOllamaConfig,
}
