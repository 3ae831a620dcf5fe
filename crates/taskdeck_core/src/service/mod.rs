//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Serialize mutations per owner and map storage errors to request errors.

pub mod decompose_service;
pub mod owner_lock;
pub mod task_service;
