//! Language-model boundary.
//!
//! The pipeline only sees the `LlmChat` trait; `OllamaClient` talks to
//! a local Ollama instance over HTTP and `MockLlmClient` serves tests.
//! The model is a black box that may be slow and may return an
//! unexpected shape, so the client unwraps defensively.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Ollama connection failed: {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Ollama returned status {status}: {body}")]
    Ollama { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

/// Text-in/text-out chat contract. Blocking: callers run it from a
/// worker thread, never from the async runtime directly.
pub trait LlmChat: Send + Sync {
    fn chat(&self, model: &str, system: &str, prompt: &str) -> Result<String, LlmError>;
}

/// Ollama HTTP client against `/api/generate`.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a new client. The model call can take tens of seconds on
    /// CPU-only hosts, hence the generous timeout.
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }

    /// Default local instance with a 5-minute timeout.
    pub fn default_local() -> Self {
        Self::new("http://localhost:11434", 300)
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

/// Response body from Ollama /api/generate. Only `response` matters;
/// everything else in the payload is ignored.
#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

impl LlmChat for OllamaClient {
    fn chat(&self, model: &str, system: &str, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            system,
            stream: false,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                LlmError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                LlmError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
            } else {
                LlmError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Ollama {
                status: status.as_u16(),
                body,
            });
        }

        // Defensive unwrap: if the payload parses but lacks the text
        // field, fall back to the raw body rather than failing the task.
        let raw = response
            .text()
            .map_err(|e| LlmError::ResponseParsing(e.to_string()))?;
        match serde_json::from_str::<GenerateResponse>(&raw) {
            Ok(GenerateResponse {
                response: Some(text),
            }) => Ok(text),
            Ok(GenerateResponse { response: None }) => {
                tracing::warn!("Ollama response missing `response` field, returning raw body");
                Ok(raw)
            }
            Err(e) => Err(LlmError::ResponseParsing(e.to_string())),
        }
    }
}

/// Mock chat client for tests — returns a configurable response or a
/// configurable failure.
pub struct MockLlmClient {
    response: Result<String, String>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
        }
    }
}

impl LlmChat for MockLlmClient {
    fn chat(&self, _model: &str, _system: &str, _prompt: &str) -> Result<String, LlmError> {
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(LlmError::Connection(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = OllamaClient::new("http://localhost:11434/", 10);
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn mock_client_round_trips() {
        let mock = MockLlmClient::new("42 casos");
        assert_eq!(
            mock.chat("m", "sys", "prompt").unwrap(),
            "42 casos".to_string()
        );
        assert!(MockLlmClient::failing("down").chat("m", "s", "p").is_err());
    }

    #[test]
    fn generate_response_tolerates_missing_field() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.response.is_none());
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"response":"hola","done":true}"#).unwrap();
        assert_eq!(parsed.response.as_deref(), Some("hola"));
    }
}
