//! Request-boundary error kinds.
//!
//! # Invariants
//! - Ownership is never leaked: a task owned by someone else reports
//!   `NotFound` exactly like a missing task.
//! - `user_message` never includes storage or transport internals.

use crate::decompose::{DecompositionError, UnavailableReason};
use crate::model::task::TaskId;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CoreResult<T> = Result<T, CoreError>;

/// Error kinds surfaced by every core operation.
#[derive(Debug)]
pub enum CoreError {
    /// Malformed input: blank title, non-permutation reorder, bad email.
    Validation(String),
    /// Task missing or owned by another user.
    NotFound(TaskId),
    /// Decomposition service failed, timed out, or answered unreadably.
    DecompositionUnavailable(UnavailableReason),
    /// Decomposition succeeded but produced no usable subtask.
    DecompositionEmpty,
    /// Storage failure.
    Persistence(RepoError),
    /// Credential did not resolve to a registered user.
    Unauthenticated,
}

impl CoreError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::DecompositionUnavailable(_) => "decomposition_unavailable",
            Self::DecompositionEmpty => "decomposition_empty",
            Self::Persistence(_) => "persistence_error",
            Self::Unauthenticated => "unauthenticated",
        }
    }

    /// Message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::NotFound(id) => format!("Task {id} was not found."),
            Self::DecompositionUnavailable(_) => {
                "The AI assistant is unavailable right now. Please retry in a moment.".to_string()
            }
            Self::DecompositionEmpty => {
                "The AI assistant found nothing to add. Try a different phrasing.".to_string()
            }
            Self::Persistence(_) => "Something went wrong. Please try again later.".to_string(),
            Self::Unauthenticated => "Please sign in again.".to_string(),
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DecompositionUnavailable(_) | Self::Persistence(_)
        )
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "validation failed: {message}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::DecompositionUnavailable(reason) => {
                write!(f, "decomposition unavailable: {reason}")
            }
            Self::DecompositionEmpty => write!(f, "decomposition produced no subtasks"),
            Self::Persistence(err) => write!(f, "persistence failure: {err}"),
            Self::Unauthenticated => write!(f, "unauthenticated"),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(_)
            | RepoError::Permutation(_)
            | RepoError::InvalidEmail(_)
            | RepoError::DuplicateEmail(_)
            | RepoError::InvalidCredentialHash => Self::Validation(value.to_string()),
            other => Self::Persistence(other),
        }
    }
}

impl From<DecompositionError> for CoreError {
    fn from(value: DecompositionError) -> Self {
        match value {
            DecompositionError::Unavailable(reason) => Self::DecompositionUnavailable(reason),
            DecompositionError::Empty => Self::DecompositionEmpty,
        }
    }
}
