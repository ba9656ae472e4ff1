//! Ollama HTTP client implementing the provider ports

use super::protocol::{ChatMessage, ChatOptions, ChatRequest, ChatResponse, ErrorResponse};
use crate::config::FileOllamaConfig;
use crate::intake::StructuredCaseParser;
use async_trait::async_trait;
use ckm_application::{AssessmentProvider, IntakeParser, ProviderError, SynthesisProvider};
use ckm_domain::{AssessmentRequest, CaseDiff, PromptTemplate, Role, SynthesisRequest};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Client for a local or remote Ollama server
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    synthesis_model: Option<String>,
    role_models: HashMap<String, String>,
    temperature: Option<f32>,
}

impl OllamaClient {
    pub fn new(config: &FileOllamaConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("ckm-board/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Other(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            synthesis_model: config.synthesis_model.clone(),
            role_models: config
                .role_models
                .iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v.clone()))
                .collect(),
            temperature: config.temperature,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Model used for `role`'s assessments
    pub fn model_for_role(&self, role: &Role) -> &str {
        self.role_models
            .get(role.as_str())
            .map(String::as_str)
            .unwrap_or(self.model.as_str())
    }

    pub fn synthesis_model(&self) -> &str {
        self.synthesis_model.as_deref().unwrap_or(self.model.as_str())
    }

    /// One non-streaming chat round trip; returns the assistant's content
    async fn chat(
        &self,
        model: &str,
        system: &str,
        user: String,
        format: Option<&str>,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model,
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            stream: false,
            options: self.temperature.map(|temperature| ChatOptions { temperature }),
            format,
        };

        let started = Instant::now();
        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_send_error)?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ProviderError::RequestFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                detail
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(format!("unexpected body: {}", e)))?;
        debug!(
            model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ollama chat completed"
        );

        let content = parsed.message.content.trim().to_string();
        if content.is_empty() {
            return Err(ProviderError::InvalidResponse("empty reply".to_string()));
        }
        Ok(content)
    }
}

fn map_send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else if e.is_connect() {
        ProviderError::ConnectionError(e.to_string())
    } else {
        ProviderError::RequestFailed(e.to_string())
    }
}

/// The outermost `{...}` of a reply, tolerating code fences and prose
fn json_object(reply: &str) -> Option<Map<String, Value>> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&reply[start..=end]).ok()
}

#[async_trait]
impl AssessmentProvider for OllamaClient {
    async fn assess(&self, request: &AssessmentRequest) -> Result<String, ProviderError> {
        let model = self.model_for_role(&request.role);
        info!("Requesting {} assessment from {}", request.role, model);
        self.chat(
            model,
            &PromptTemplate::role_system(&request.role),
            PromptTemplate::assessment_prompt(request),
            None,
        )
        .await
    }
}

#[async_trait]
impl SynthesisProvider for OllamaClient {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<String, ProviderError> {
        info!(
            "Requesting synthesis attempt {} from {}",
            request.attempt,
            self.synthesis_model()
        );
        self.chat(
            self.synthesis_model(),
            PromptTemplate::synthesis_system(),
            PromptTemplate::synthesis_prompt(request),
            None,
        )
        .await
    }
}

#[async_trait]
impl IntakeParser for OllamaClient {
    async fn parse(&self, text: &str) -> Result<CaseDiff, ProviderError> {
        let reply = self
            .chat(
                &self.model,
                PromptTemplate::intake_parse_system(),
                PromptTemplate::intake_parse_prompt(text),
                Some("json"),
            )
            .await?;
        let map = json_object(&reply).ok_or_else(|| {
            ProviderError::InvalidResponse("reply did not contain a JSON object".to_string())
        })?;
        Ok(StructuredCaseParser::from_json(&map))
    }
}
