//! Domain model for owned, ordered task lists.
//!
//! # Invariants
//! - Every task has exactly one owner, fixed at creation.
//! - Task ids are assigned by storage and never reused.
//! - Deletion is permanent; there are no tombstones.

pub mod task;
pub mod user;
