//! Task use-case service.
//!
//! # Responsibility
//! - Serialize mutations per owner through [`OwnerLocks`].
//! - Translate repository errors into request-level [`CoreError`] kinds.
//! - Emit one metadata-only log event per operation.
//!
//! # Invariants
//! - Reads never take the owner lock; SQLite transactions keep them from
//!   observing a partially applied mutation.
//! - Batch appends hold the owner lock for the whole batch so the new tasks
//!   end up contiguous.

use crate::error::{CoreError, CoreResult};
use crate::model::task::{NewTask, Task, TaskId, TaskPatch};
use crate::model::user::UserId;
use crate::ordering;
use crate::repo::task_repo::{ReorderOutcome, TaskRepository};
use crate::repo::{RepoError, RepoResult};
use crate::service::owner_lock::OwnerLocks;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Instant;

/// One failed entry of a batch append.
#[derive(Debug)]
pub struct BatchFailure {
    /// Index of the entry in the submitted batch.
    pub index: usize,
    pub title: String,
    pub error: CoreError,
}

/// Result of a batch append. Successful creates are never rolled back.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub created: Vec<Task>,
    pub failures: Vec<BatchFailure>,
}

/// Task service facade over a task repository.
pub struct TaskService<R: TaskRepository> {
    repo: R,
    locks: Arc<OwnerLocks>,
}

impl<R: TaskRepository> TaskService<R> {
    /// Creates a service with its own lock registry.
    pub fn new(repo: R) -> Self {
        Self::with_locks(repo, Arc::new(OwnerLocks::new()))
    }

    /// Creates a service sharing `locks` with other services (typically one
    /// per connection) over the same database.
    pub fn with_locks(repo: R, locks: Arc<OwnerLocks>) -> Self {
        Self { repo, locks }
    }

    pub fn locks(&self) -> &Arc<OwnerLocks> {
        &self.locks
    }

    /// Appends a new task after the owner's last task.
    pub fn create_task(&self, owner: UserId, task: NewTask) -> CoreResult<Task> {
        let started_at = Instant::now();
        let _guard = self.locks.acquire(owner);
        let result = self.repo.create_task(owner, &task);
        finish("task_create", owner, started_at, result)
    }

    /// Lists the owner's tasks ordered by position, then id.
    pub fn list_tasks(&self, owner: UserId) -> CoreResult<Vec<Task>> {
        let started_at = Instant::now();
        let result = self.repo.list_tasks(owner);
        finish("task_list", owner, started_at, result)
    }

    /// Loads one owned task.
    pub fn get_task(&self, owner: UserId, task_id: TaskId) -> CoreResult<Task> {
        let started_at = Instant::now();
        let result = self
            .repo
            .get_task(owner, task_id)
            .and_then(|task| task.ok_or(RepoError::NotFound(task_id)));
        finish("task_get", owner, started_at, result)
    }

    /// Applies a partial update to one owned task.
    pub fn update_task(
        &self,
        owner: UserId,
        task_id: TaskId,
        patch: TaskPatch,
    ) -> CoreResult<Task> {
        let started_at = Instant::now();
        let _guard = self.locks.acquire(owner);
        let result = self.repo.update_task(owner, task_id, &patch);
        finish("task_update", owner, started_at, result)
    }

    /// Permanently deletes one owned task.
    pub fn delete_task(&self, owner: UserId, task_id: TaskId) -> CoreResult<()> {
        let started_at = Instant::now();
        let _guard = self.locks.acquire(owner);
        let result = self.repo.delete_task(owner, task_id);
        finish("task_delete", owner, started_at, result)
    }

    /// Reorders the owner's tasks to follow `ordered_ids` exactly.
    pub fn reorder_tasks(
        &self,
        owner: UserId,
        ordered_ids: &[TaskId],
    ) -> CoreResult<ReorderOutcome> {
        let started_at = Instant::now();
        let _guard = self.locks.acquire(owner);
        let result = self.repo.reorder_tasks(owner, ordered_ids);
        finish("task_reorder", owner, started_at, result)
    }

    /// Moves one task to `target_index` (clamped) and shifts the rest.
    pub fn move_task(
        &self,
        owner: UserId,
        task_id: TaskId,
        target_index: usize,
    ) -> CoreResult<ReorderOutcome> {
        let started_at = Instant::now();
        let _guard = self.locks.acquire(owner);
        let result = self.repo.list_tasks(owner).and_then(|tasks| {
            let current: Vec<TaskId> = tasks.iter().map(|task| task.id).collect();
            let order = ordering::move_to_index(&current, task_id, target_index)
                .ok_or(RepoError::NotFound(task_id))?;
            self.repo.reorder_tasks(owner, &order)
        });
        finish("task_move", owner, started_at, result)
    }

    /// Renumbers positions when they collide or approach the key ceiling.
    pub fn repair_order(&self, owner: UserId) -> CoreResult<bool> {
        let started_at = Instant::now();
        let _guard = self.locks.acquire(owner);
        let result = self.repo.repair_positions(owner);
        if matches!(result, Ok(true)) {
            warn!(
                "event=task_positions_renumber module=service status=ok owner={}",
                owner
            );
        }
        finish("task_repair_order", owner, started_at, result)
    }

    /// Appends `tasks` in order under one lock acquisition.
    ///
    /// Each entry is its own transaction; a failed entry is recorded and the
    /// remaining entries are still attempted.
    pub fn append_batch(&self, owner: UserId, tasks: Vec<NewTask>) -> BatchOutcome {
        let started_at = Instant::now();
        let _guard = self.locks.acquire(owner);

        let mut outcome = BatchOutcome::default();
        for (index, task) in tasks.into_iter().enumerate() {
            match self.repo.create_task(owner, &task) {
                Ok(created) => outcome.created.push(created),
                Err(err) => {
                    let error = CoreError::from(err);
                    error!(
                        "event=task_batch_item module=service status=error owner={} index={} error_code={} error={}",
                        owner,
                        index,
                        error.code(),
                        error
                    );
                    outcome.failures.push(BatchFailure {
                        index,
                        title: task.title,
                        error,
                    });
                }
            }
        }

        info!(
            "event=task_batch_append module=service status={} owner={} created={} failed={} duration_ms={}",
            if outcome.failures.is_empty() { "ok" } else { "partial" },
            owner,
            outcome.created.len(),
            outcome.failures.len(),
            started_at.elapsed().as_millis()
        );
        outcome
    }
}

fn finish<T>(
    event: &'static str,
    owner: UserId,
    started_at: Instant,
    result: RepoResult<T>,
) -> CoreResult<T> {
    match result {
        Ok(value) => {
            info!(
                "event={} module=service status=ok owner={} duration_ms={}",
                event,
                owner,
                started_at.elapsed().as_millis()
            );
            Ok(value)
        }
        Err(err) => {
            let err = CoreError::from(err);
            if matches!(err, CoreError::Persistence(_)) {
                error!(
                    "event={} module=service status=error owner={} duration_ms={} error_code={} error={}",
                    event,
                    owner,
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
            } else {
                info!(
                    "event={} module=service status=rejected owner={} duration_ms={} error_code={}",
                    event,
                    owner,
                    started_at.elapsed().as_millis(),
                    err.code()
                );
            }
            Err(err)
        }
    }
}
