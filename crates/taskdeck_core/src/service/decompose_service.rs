//! Decomposition orchestration.
//!
//! # Responsibility
//! - Ask a [`Decomposer`] for subtasks of one title.
//! - Append every returned subtask, in order, to the owner's list.
//!
//! # Invariants
//! - The decomposition call runs outside the owner lock; only the append
//!   batch is serialized.
//! - Nothing is created when the decomposer fails.
//! - Successful creates are kept even when later entries fail.

use crate::decompose::Decomposer;
use crate::error::{CoreError, CoreResult};
use crate::model::task::{normalize_title, NewTask, Task, TaskId};
use crate::model::user::UserId;
use crate::repo::task_repo::TaskRepository;
use crate::service::task_service::{BatchFailure, TaskService};
use log::{info, warn};
use std::time::Instant;

/// Result of one decomposition request.
#[derive(Debug)]
pub struct DecompositionOutcome {
    /// Normalized title that was decomposed.
    pub source_title: String,
    /// Number of subtasks the decomposer returned.
    pub requested: usize,
    /// Tasks created, in append order.
    pub created: Vec<Task>,
    /// Subtasks that could not be stored.
    pub failures: Vec<BatchFailure>,
}

impl DecompositionOutcome {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Turns one title into appended subtasks.
pub struct DecompositionOrchestrator<D: Decomposer> {
    decomposer: D,
}

impl<D: Decomposer> DecompositionOrchestrator<D> {
    pub fn new(decomposer: D) -> Self {
        Self { decomposer }
    }

    pub fn decomposer(&self) -> &D {
        &self.decomposer
    }

    /// Decomposes `source_title` and appends the subtasks for `owner`.
    ///
    /// # Errors
    /// - `Validation` when `source_title` is blank or too long.
    /// - `DecompositionUnavailable` / `DecompositionEmpty` from the decomposer.
    /// - The first per-item error when no subtask could be stored.
    pub fn decompose_title<R: TaskRepository>(
        &self,
        tasks: &TaskService<R>,
        owner: UserId,
        source_title: &str,
    ) -> CoreResult<DecompositionOutcome> {
        let source_title =
            normalize_title(source_title).map_err(|err| CoreError::Validation(err.to_string()))?;
        let started_at = Instant::now();

        let subtasks = match self.decomposer.decompose(&source_title) {
            Ok(subtasks) => subtasks,
            Err(err) => {
                let err = CoreError::from(err);
                warn!(
                    "event=task_decompose module=service status=error owner={} mode={} duration_ms={} error_code={} error={}",
                    owner,
                    self.decomposer.mode().as_str(),
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                return Err(err);
            }
        };

        let requested = subtasks.len();
        let batch = tasks.append_batch(owner, subtasks.into_iter().map(NewTask::new).collect());

        if batch.created.is_empty() && !batch.failures.is_empty() {
            let mut failures = batch.failures;
            let first = failures.swap_remove(0);
            warn!(
                "event=task_decompose module=service status=error owner={} mode={} requested={} created=0 failed={} error_code={}",
                owner,
                self.decomposer.mode().as_str(),
                requested,
                failures.len() + 1,
                first.error.code()
            );
            return Err(first.error);
        }

        info!(
            "event=task_decompose module=service status={} owner={} mode={} requested={} created={} failed={} duration_ms={}",
            if batch.failures.is_empty() { "ok" } else { "partial" },
            owner,
            self.decomposer.mode().as_str(),
            requested,
            batch.created.len(),
            batch.failures.len(),
            started_at.elapsed().as_millis()
        );

        Ok(DecompositionOutcome {
            source_title,
            requested,
            created: batch.created,
            failures: batch.failures,
        })
    }

    /// Decomposes the title of an existing owned task.
    pub fn decompose_task<R: TaskRepository>(
        &self,
        tasks: &TaskService<R>,
        owner: UserId,
        task_id: TaskId,
    ) -> CoreResult<DecompositionOutcome> {
        let source = tasks.get_task(owner, task_id)?;
        self.decompose_title(tasks, owner, &source.title)
    }
}
