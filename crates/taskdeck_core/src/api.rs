//! Core API surface consumed by transport layers.
//!
//! Every operation takes an already authenticated owner. Results are either
//! canonical task state or a [`CoreError`].

use crate::config::DecompositionConfig;
use crate::decompose::{build_decomposer, Decomposer, DecompositionMode, UnavailableReason};
use crate::error::{CoreError, CoreResult};
use crate::model::task::{NewTask, Task, TaskId, TaskPatch};
use crate::model::user::UserId;
use crate::repo::task_repo::TaskRepository;
use crate::service::decompose_service::{DecompositionOrchestrator, DecompositionOutcome};
use crate::service::task_service::TaskService;

/// Facade bundling task operations with decomposition.
pub struct TaskApi<R: TaskRepository> {
    tasks: TaskService<R>,
    orchestrator: DecompositionOrchestrator<Box<dyn Decomposer>>,
}

impl<R: TaskRepository> TaskApi<R> {
    pub fn new(tasks: TaskService<R>, decomposer: Box<dyn Decomposer>) -> Self {
        Self {
            tasks,
            orchestrator: DecompositionOrchestrator::new(decomposer),
        }
    }

    /// Builds the facade with the decomposer selected by `config`.
    pub fn from_config(tasks: TaskService<R>, config: &DecompositionConfig) -> CoreResult<Self> {
        let decomposer = build_decomposer(config)
            .map_err(|err| CoreError::DecompositionUnavailable(UnavailableReason::from(err)))?;
        Ok(Self::new(tasks, decomposer))
    }

    pub fn tasks(&self) -> &TaskService<R> {
        &self.tasks
    }

    pub fn decomposition_mode(&self) -> DecompositionMode {
        self.orchestrator.decomposer().mode()
    }

    pub fn create_task(&self, owner: UserId, task: NewTask) -> CoreResult<Task> {
        self.tasks.create_task(owner, task)
    }

    pub fn list_tasks(&self, owner: UserId) -> CoreResult<Vec<Task>> {
        self.tasks.list_tasks(owner)
    }

    pub fn get_task(&self, owner: UserId, task_id: TaskId) -> CoreResult<Task> {
        self.tasks.get_task(owner, task_id)
    }

    pub fn update_task(&self, owner: UserId, task_id: TaskId, patch: TaskPatch) -> CoreResult<Task> {
        self.tasks.update_task(owner, task_id, patch)
    }

    pub fn delete_task(&self, owner: UserId, task_id: TaskId) -> CoreResult<()> {
        self.tasks.delete_task(owner, task_id)
    }

    /// Applies a full reorder and returns the resulting canonical list.
    pub fn reorder_tasks(&self, owner: UserId, ordered_ids: &[TaskId]) -> CoreResult<Vec<Task>> {
        self.tasks.reorder_tasks(owner, ordered_ids)?;
        self.tasks.list_tasks(owner)
    }

    pub fn move_task(
        &self,
        owner: UserId,
        task_id: TaskId,
        target_index: usize,
    ) -> CoreResult<Vec<Task>> {
        self.tasks.move_task(owner, task_id, target_index)?;
        self.tasks.list_tasks(owner)
    }

    pub fn repair_order(&self, owner: UserId) -> CoreResult<bool> {
        self.tasks.repair_order(owner)
    }

    /// Decomposes `source_title` into appended subtasks.
    pub fn decompose_task(
        &self,
        owner: UserId,
        source_title: &str,
    ) -> CoreResult<DecompositionOutcome> {
        self.orchestrator
            .decompose_title(&self.tasks, owner, source_title)
    }

    /// Decomposes the title of an existing owned task; the task itself is
    /// left untouched.
    pub fn decompose_task_by_id(
        &self,
        owner: UserId,
        task_id: TaskId,
    ) -> CoreResult<DecompositionOutcome> {
        self.orchestrator.decompose_task(&self.tasks, owner, task_id)
    }
}
