//! Decomposer implementations.

use crate::decompose::http::{LlmRequest, LlmTransport};
use crate::decompose::parse::{normalize_subtasks, parse_subtasks};
use crate::decompose::{DecompositionError, DecompositionMode, Decomposer};
use log::{info, warn};
use std::time::Instant;

const LLM_TEMPERATURE: f32 = 0.7;
const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that breaks a task down into small, actionable subtasks.";

/// Offline decomposer with fixed, title-derived output.
///
/// Same title in, same list out. Used when no API key is configured and in
/// tests.
#[derive(Debug, Clone)]
pub struct MockDecomposer {
    max_subtasks: usize,
}

impl MockDecomposer {
    pub fn new(max_subtasks: usize) -> Self {
        Self { max_subtasks }
    }
}

impl Default for MockDecomposer {
    fn default() -> Self {
        Self::new(crate::decompose::MAX_SUBTASKS)
    }
}

impl Decomposer for MockDecomposer {
    fn mode(&self) -> DecompositionMode {
        DecompositionMode::Mock
    }

    fn decompose(&self, title: &str) -> Result<Vec<String>, DecompositionError> {
        let title = title.trim();
        let items = vec![
            format!("Step 1: Research {title}"),
            format!("Step 2: Plan {title}"),
            format!("Step 3: Prepare for {title}"),
        ];
        normalize_subtasks(items, self.max_subtasks)
    }
}

/// Live decomposer that asks a chat-completion service for subtasks.
pub struct LlmDecomposer<T: LlmTransport> {
    transport: T,
    model: String,
    max_subtasks: usize,
}

impl<T: LlmTransport> LlmDecomposer<T> {
    pub fn new(transport: T, model: impl Into<String>, max_subtasks: usize) -> Self {
        Self {
            transport,
            model: model.into(),
            max_subtasks,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn build_request(&self, title: &str) -> LlmRequest {
        let user = format!(
            "Break down the following task into 3-5 smaller, actionable subtasks.\n\
             Task: {title}\n\n\
             Return ONLY a JSON array of strings, one per subtask. No extra text."
        );
        LlmRequest {
            system: SYSTEM_PROMPT.to_string(),
            user,
            model: self.model.clone(),
            temperature: LLM_TEMPERATURE,
        }
    }
}

impl<T: LlmTransport> Decomposer for LlmDecomposer<T> {
    fn mode(&self) -> DecompositionMode {
        DecompositionMode::Live
    }

    fn decompose(&self, title: &str) -> Result<Vec<String>, DecompositionError> {
        let started_at = Instant::now();
        let request = self.build_request(title.trim());

        let raw = match self.transport.complete(&request) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    "event=llm_call module=decompose status=error model={} duration_ms={} error={}",
                    self.model,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };

        info!(
            "event=llm_call module=decompose status=ok model={} duration_ms={} response_chars={}",
            self.model,
            started_at.elapsed().as_millis(),
            raw.chars().count()
        );

        let items = parse_subtasks(&raw).map_err(DecompositionError::Unavailable)?;
        normalize_subtasks(items, self.max_subtasks)
    }
}
