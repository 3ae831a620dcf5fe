//! Task decomposition client.
//!
//! # Responsibility
//! - Turn one task title into an ordered list of short subtask titles.
//! - Provide a live implementation backed by a chat-completion service and a
//!   deterministic offline implementation.
//!
//! # Invariants
//! - Both implementations run their output through [`parse::normalize_subtasks`]:
//!   blank entries are dropped, the list is capped at `max_subtasks`, and an
//!   empty result is [`DecompositionError::Empty`].
//! - The implementation is chosen once from configuration by
//!   [`build_decomposer`]; callers never branch on the mode.

use crate::config::DecompositionConfig;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod client;
pub mod http;
pub mod parse;

pub use client::{LlmDecomposer, MockDecomposer};
pub use http::{HttpLlmTransport, LlmRequest, LlmTransport, TransportError};

/// Hard cap on subtasks accepted from one decomposition.
pub const MAX_SUBTASKS: usize = 20;

/// Which implementation is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompositionMode {
    Live,
    Mock,
}

impl DecompositionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Mock => "mock",
        }
    }
}

/// Why the decomposition service could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// Call exceeded the configured timeout.
    Timeout,
    /// Connection or protocol failure.
    Transport(String),
    /// Service answered with a non-success HTTP status.
    Status(u16),
    /// Service answered, but nothing list-shaped could be read from it.
    Malformed(String),
}

impl Display for UnavailableReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out"),
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::Status(status) => write!(f, "service returned HTTP {status}"),
            Self::Malformed(message) => write!(f, "malformed output: {message}"),
        }
    }
}

impl UnavailableReason {
    /// Short label for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport(_) => "transport",
            Self::Status(_) => "status",
            Self::Malformed(_) => "malformed",
        }
    }
}

/// Decomposition failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecompositionError {
    /// No usable answer; nothing was created and the caller may retry.
    Unavailable(UnavailableReason),
    /// Answer parsed, but every entry was blank.
    Empty,
}

impl Display for DecompositionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "decomposition unavailable: {reason}"),
            Self::Empty => write!(f, "decomposition produced no subtasks"),
        }
    }
}

impl Error for DecompositionError {}

impl From<TransportError> for DecompositionError {
    fn from(value: TransportError) -> Self {
        Self::Unavailable(value.into())
    }
}

/// Capability that expands one title into ordered subtask titles.
pub trait Decomposer: Send + Sync {
    fn mode(&self) -> DecompositionMode;
    fn decompose(&self, title: &str) -> Result<Vec<String>, DecompositionError>;
}

impl<D: Decomposer + ?Sized> Decomposer for Box<D> {
    fn mode(&self) -> DecompositionMode {
        (**self).mode()
    }

    fn decompose(&self, title: &str) -> Result<Vec<String>, DecompositionError> {
        (**self).decompose(title)
    }
}

/// Builds the decomposer selected by `config`: live when a usable API key is
/// present, mock otherwise.
pub fn build_decomposer(
    config: &DecompositionConfig,
) -> Result<Box<dyn Decomposer>, TransportError> {
    let decomposer: Box<dyn Decomposer> = match config.live_api_key() {
        Some(api_key) => {
            let transport =
                HttpLlmTransport::new(config.endpoint.clone(), Some(api_key.to_string()), config.timeout)?;
            Box::new(LlmDecomposer::new(
                transport,
                config.model.clone(),
                config.max_subtasks,
            ))
        }
        None => Box::new(MockDecomposer::new(config.max_subtasks)),
    };

    info!(
        "event=decomposer_select module=decompose status=ok mode={} max_subtasks={}",
        decomposer.mode().as_str(),
        config.max_subtasks
    );
    Ok(decomposer)
}

#[cfg(test)]
mod tests {
    use super::{build_decomposer, DecompositionMode};
    use crate::config::DecompositionConfig;

    #[test]
    fn missing_key_selects_mock_mode() {
        let decomposer = build_decomposer(&DecompositionConfig::default()).unwrap();
        assert_eq!(decomposer.mode(), DecompositionMode::Mock);
    }

    #[test]
    fn real_key_selects_live_mode() {
        let config = DecompositionConfig {
            api_key: Some("sk-test".to_string()),
            ..DecompositionConfig::default()
        };
        let decomposer = build_decomposer(&config).unwrap();
        assert_eq!(decomposer.mode(), DecompositionMode::Live);
    }
}
