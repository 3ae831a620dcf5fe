//! Task domain model.
//!
//! # Responsibility
//! - Define the task record returned by every task operation.
//! - Own title normalization rules shared by create, update and decomposition.
//!
//! # Invariants
//! - `title` is trimmed, non-empty and at most [`TITLE_MAX_CHARS`] characters.
//! - `position` is unique within one owner's task set.

use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-assigned task identifier. Ids are never reused after delete.
pub type TaskId = i64;

/// Maximum title length, counted in characters after trimming.
pub const TITLE_MAX_CHARS: usize = 100;

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    /// Sort key within the owner's list. Ties break on ascending `id`.
    pub position: i64,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

/// Input for creating one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns a copy with the title normalized.
    pub fn normalized(&self) -> Result<Self, TaskValidationError> {
        Ok(Self {
            title: normalize_title(&self.title)?,
            description: self.description.clone(),
        })
    }
}

/// Partial update. `None` fields are left untouched.
///
/// `description` is doubly optional: `Some(None)` clears the description,
/// `Some(Some(text))` replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }

    pub fn completed(value: bool) -> Self {
        Self {
            completed: Some(value),
            ..Self::default()
        }
    }

    /// Returns a copy with the title (when supplied) normalized.
    pub fn normalized(&self) -> Result<Self, TaskValidationError> {
        Ok(Self {
            title: self.title.as_deref().map(normalize_title).transpose()?,
            description: self.description.clone(),
            completed: self.completed,
        })
    }
}

/// Validation errors for task input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyTitle,
    TitleTooLong { max_chars: usize, actual_chars: usize },
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::TitleTooLong {
                max_chars,
                actual_chars,
            } => write!(
                f,
                "title must be at most {max_chars} characters, got {actual_chars}"
            ),
        }
    }
}

impl Error for TaskValidationError {}

/// Trims and checks one task title.
pub fn normalize_title(raw: &str) -> Result<String, TaskValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TaskValidationError::EmptyTitle);
    }
    let actual_chars = trimmed.chars().count();
    if actual_chars > TITLE_MAX_CHARS {
        return Err(TaskValidationError::TitleTooLong {
            max_chars: TITLE_MAX_CHARS,
            actual_chars,
        });
    }
    Ok(trimmed.to_string())
}
