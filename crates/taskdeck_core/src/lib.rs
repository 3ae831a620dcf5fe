//! Core domain logic for Taskdeck.
//! This crate is the single source of truth for task ownership, ordering and
//! decomposition invariants.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod decompose;
pub mod error;
pub mod logging;
pub mod model;
pub mod ordering;
pub mod repo;
pub mod service;

pub use api::TaskApi;
pub use auth::{authenticate_owner, AuthError, CredentialService, EmailCredentials};
pub use config::{ConfigError, CoreConfig, DecompositionConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use decompose::{
    build_decomposer, Decomposer, DecompositionError, DecompositionMode, LlmDecomposer,
    MockDecomposer, UnavailableReason,
};
pub use error::{CoreError, CoreResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::task::{NewTask, Task, TaskId, TaskPatch, TaskValidationError};
pub use model::user::{User, UserId};
pub use repo::task_repo::{ReorderOutcome, SqliteTaskRepository, TaskRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::decompose_service::{DecompositionOrchestrator, DecompositionOutcome};
pub use service::owner_lock::OwnerLocks;
pub use service::task_service::{BatchFailure, BatchOutcome, TaskService};
