//! Ordering engine for one owner's task list.
//!
//! # Responsibility
//! - Validate that a reorder request is an exact permutation of the owner's
//!   current task ids.
//! - Assign dense, strictly increasing positions for a permutation.
//! - Decide when existing positions need a full renumber.
//!
//! # Invariants
//! - Partial reorders are rejected; omitted tasks would have no defined place.
//! - Duplicate ids are rejected, never deduplicated.
//! - Assigned positions are `0..n` in request order.
//!
//! Everything here is synchronous and storage-free; the task repository runs
//! these checks inside its write transaction.

use crate::model::task::TaskId;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Upper bound on ids accepted by one reorder request.
pub const MAX_REORDER_IDS: usize = 10_000;

/// Appends stop short of this key and trigger a renumber instead.
pub const POSITION_CEILING: i64 = i64::MAX / 2;

/// Why a reorder request is not an exact permutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermutationError {
    /// Request names more ids than one reorder may carry.
    TooManyIds { max: usize, actual: usize },
    /// Same id listed more than once.
    DuplicateId(TaskId),
    /// Id is not one of the owner's tasks.
    UnknownId(TaskId),
    /// Owner task missing from the request.
    MissingId(TaskId),
}

impl Display for PermutationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooManyIds { max, actual } => {
                write!(f, "reorder accepts at most {max} ids, got {actual}")
            }
            Self::DuplicateId(id) => write!(f, "task id {id} appears more than once"),
            Self::UnknownId(id) => write!(f, "task id {id} is not in this task list"),
            Self::MissingId(id) => write!(f, "task id {id} is missing from the new order"),
        }
    }
}

impl Error for PermutationError {}

/// Rejects requests that exceed [`MAX_REORDER_IDS`] before any storage work.
pub fn check_request_len(requested: &[TaskId]) -> Result<(), PermutationError> {
    if requested.len() > MAX_REORDER_IDS {
        return Err(PermutationError::TooManyIds {
            max: MAX_REORDER_IDS,
            actual: requested.len(),
        });
    }
    Ok(())
}

/// Checks that `requested` names every id in `current` exactly once.
///
/// Errors are reported in a fixed precedence: length, duplicates, unknown
/// ids, then missing ids.
pub fn validate_permutation(
    current: &[TaskId],
    requested: &[TaskId],
) -> Result<(), PermutationError> {
    check_request_len(requested)?;

    let mut seen = HashSet::with_capacity(requested.len());
    for id in requested {
        if !seen.insert(*id) {
            return Err(PermutationError::DuplicateId(*id));
        }
    }

    let owned: HashSet<TaskId> = current.iter().copied().collect();
    if let Some(unknown) = requested.iter().find(|id| !owned.contains(id)) {
        return Err(PermutationError::UnknownId(*unknown));
    }
    if let Some(missing) = current.iter().find(|id| !seen.contains(id)) {
        return Err(PermutationError::MissingId(*missing));
    }
    Ok(())
}

/// Assigns positions `0..n` following the order of `ids`.
pub fn assign_positions(ids: &[TaskId]) -> Vec<(TaskId, i64)> {
    ids.iter()
        .enumerate()
        .map(|(index, id)| (*id, index as i64))
        .collect()
}

/// Returns whether `positions` (sorted ascending) collide or have drifted
/// close enough to the ceiling that appends could overflow.
pub fn needs_renumber(positions: &[i64]) -> bool {
    let collided = positions.windows(2).any(|pair| pair[0] >= pair[1]);
    let near_ceiling = positions.last().is_some_and(|last| *last >= POSITION_CEILING);
    let below_floor = positions.first().is_some_and(|first| *first < 0);
    collided || near_ceiling || below_floor
}

/// Position for a task appended after `max_position`.
pub fn next_append_position(max_position: Option<i64>) -> i64 {
    max_position.map_or(0, |max| max + 1)
}

/// Builds the full permutation for moving one task to `target_index`.
///
/// `target_index` is clamped into range. Returns `None` when `task_id` is not
/// in `current`.
pub fn move_to_index(
    current: &[TaskId],
    task_id: TaskId,
    target_index: usize,
) -> Option<Vec<TaskId>> {
    let from = current.iter().position(|id| *id == task_id)?;
    let mut order = current.to_vec();
    let moved = order.remove(from);
    let target = target_index.min(order.len());
    order.insert(target, moved);
    Some(order)
}
