//! Chat-completion transport for live decomposition.
//!
//! Speaks the OpenAI-compatible `chat/completions` shape over a blocking
//! reqwest client. The client-level timeout bounds the whole request.

use crate::decompose::UnavailableReason;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// One completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub system: String,
    pub user: String,
    pub model: String,
    pub temperature: f32,
}

/// Transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Timeout,
    Http(String),
    Status(u16),
    Serialization(String),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::Http(message) => write!(f, "http error: {message}"),
            Self::Status(status) => write!(f, "unexpected HTTP status {status}"),
            Self::Serialization(message) => write!(f, "serialization error: {message}"),
        }
    }
}

impl Error for TransportError {}

impl From<TransportError> for UnavailableReason {
    fn from(value: TransportError) -> Self {
        match value {
            TransportError::Timeout => Self::Timeout,
            TransportError::Http(message) => Self::Transport(message),
            TransportError::Status(status) => Self::Status(status),
            TransportError::Serialization(message) => Self::Malformed(message),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            return Self::Timeout;
        }
        if value.is_decode() {
            return Self::Serialization(value.to_string());
        }
        Self::Http(value.to_string())
    }
}

/// Sends one completion request and returns the assistant's text.
pub trait LlmTransport: Send + Sync {
    fn complete(&self, request: &LlmRequest) -> Result<String, TransportError>;
}

/// Blocking HTTP transport against an OpenAI-compatible endpoint.
pub struct HttpLlmTransport {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpLlmTransport {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|err| TransportError::Http(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn headers(&self) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|err| TransportError::Http(err.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

impl LlmTransport for HttpLlmTransport {
    fn complete(&self, request: &LlmRequest) -> Result<String, TransportError> {
        let body = ChatRequest {
            model: &request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers()?)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let text = response.text()?;
        extract_content(&text)
    }
}

fn extract_content(body: &str) -> Result<String, TransportError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|err| TransportError::Serialization(err.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| TransportError::Serialization("response has no message content".to_string()))
}

#[cfg(test)]
mod tests {
    use super::{extract_content, TransportError};
    use crate::decompose::UnavailableReason;

    #[test]
    fn extracts_first_choice_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"[\"a\"]"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), r#"["a"]"#);
    }

    #[test]
    fn missing_choices_is_serialization_error() {
        assert!(matches!(
            extract_content(r#"{"choices":[]}"#),
            Err(TransportError::Serialization(_))
        ));
        assert!(matches!(
            extract_content(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(TransportError::Serialization(_))
        ));
        assert!(matches!(
            extract_content("<html>"),
            Err(TransportError::Serialization(_))
        ));
    }

    #[test]
    fn transport_errors_map_to_unavailable_reasons() {
        assert_eq!(
            UnavailableReason::from(TransportError::Timeout),
            UnavailableReason::Timeout
        );
        assert_eq!(
            UnavailableReason::from(TransportError::Status(503)),
            UnavailableReason::Status(503)
        );
        assert!(matches!(
            UnavailableReason::from(TransportError::Serialization("x".into())),
            UnavailableReason::Malformed(_)
        ));
    }
}
