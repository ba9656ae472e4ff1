//! Wire types for Ollama's `/api/chat` endpoint

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatOptions {
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ChatOptions>,
    /// "json" constrains the reply to a JSON document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub message: ChatMessage,
    #[serde(default)]
    pub total_duration: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_unset_options() {
        let request = ChatRequest {
            model: "ministral-3:14b",
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            stream: false,
            options: None,
            format: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert!(json.get("options").is_none());
        assert!(json.get("format").is_none());
    }

    #[test]
    fn test_response_ignores_extra_fields() {
        let body = r#"{"model":"m","created_at":"2024-01-01T00:00:00Z",
            "message":{"role":"assistant","content":"- Hold SGLT2i"},
            "done":true,"total_duration":1200}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.message.content, "- Hold SGLT2i");
        assert_eq!(response.total_duration, Some(1200));
    }
}
