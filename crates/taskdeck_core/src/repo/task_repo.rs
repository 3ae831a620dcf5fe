//! Task store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist owner-scoped task records with append-on-create ordering.
//! - Apply reorders and renumbers as single atomic batches.
//!
//! # Invariants
//! - Listing is deterministic: `position ASC, id ASC`.
//! - Committed positions are non-negative and unique per owner
//!   (`idx_tasks_owner_position`).
//! - Position rewrites stage rows below the current minimum key first so the
//!   unique index never sees a transient collision.

use crate::model::task::{NewTask, Task, TaskId, TaskPatch};
use crate::model::user::UserId;
use crate::ordering;
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    title,
    description,
    completed,
    position,
    created_at,
    updated_at
FROM tasks";

const TASK_COLUMNS: &[&str] = &[
    "id",
    "owner_id",
    "title",
    "description",
    "completed",
    "position",
    "created_at",
    "updated_at",
];

/// Result of a reorder request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// Requested order already matched storage; nothing was written.
    Unchanged,
    /// Positions were rewritten for `count` tasks.
    Applied { count: usize },
}

/// Repository interface for the owner-scoped task store.
pub trait TaskRepository {
    /// Appends one task after the owner's current last task.
    fn create_task(&self, owner: UserId, task: &NewTask) -> RepoResult<Task>;
    /// Loads one owned task.
    fn get_task(&self, owner: UserId, id: TaskId) -> RepoResult<Option<Task>>;
    /// Lists all owned tasks in display order.
    fn list_tasks(&self, owner: UserId) -> RepoResult<Vec<Task>>;
    /// Applies a partial update and returns the stored result.
    fn update_task(&self, owner: UserId, id: TaskId, patch: &TaskPatch) -> RepoResult<Task>;
    /// Permanently removes one owned task.
    fn delete_task(&self, owner: UserId, id: TaskId) -> RepoResult<()>;
    /// Rewrites positions to follow `ordered_ids`, which must be an exact
    /// permutation of the owner's task ids.
    fn reorder_tasks(&self, owner: UserId, ordered_ids: &[TaskId]) -> RepoResult<ReorderOutcome>;
    /// Renumbers positions densely when they collide or approach the ceiling.
    /// Returns whether a renumber happened.
    fn repair_positions(&self, owner: UserId) -> RepoResult<bool>;
}

/// SQLite-backed task store.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Creates a repository over a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "tasks", TASK_COLUMNS)?;
        Ok(Self { conn })
    }

    fn begin(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, owner: UserId, task: &NewTask) -> RepoResult<Task> {
        let task = task.normalized()?;

        let tx = self.begin()?;
        let placed = load_placement(&tx, owner)?;
        let positions: Vec<i64> = placed.iter().map(|(_, position)| *position).collect();
        let max_position = if ordering::needs_renumber(&positions) {
            warn!(
                "event=task_positions_renumber module=repo status=start owner={} reason=append count={}",
                owner,
                placed.len()
            );
            let ids: Vec<TaskId> = placed.iter().map(|(id, _)| *id).collect();
            write_positions(&tx, owner, &placed, &ordering::assign_positions(&ids))?;
            ids.len().checked_sub(1).map(|last| last as i64)
        } else {
            positions.last().copied()
        };

        tx.execute(
            "INSERT INTO tasks (
                owner_id,
                title,
                description,
                completed,
                position
            ) VALUES (?1, ?2, ?3, 0, ?4);",
            params![
                owner.to_string(),
                task.title.as_str(),
                task.description.as_deref(),
                ordering::next_append_position(max_position),
            ],
        )?;
        let id = tx.last_insert_rowid();
        let created = load_owned_task(&tx, owner, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("task {id} missing after insert"))
        })?;
        tx.commit()?;

        Ok(created)
    }

    fn get_task(&self, owner: UserId, id: TaskId) -> RepoResult<Option<Task>> {
        load_owned_task(self.conn, owner, id)
    }

    fn list_tasks(&self, owner: UserId) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE owner_id = ?1
             ORDER BY position ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([owner.to_string()])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn update_task(&self, owner: UserId, id: TaskId, patch: &TaskPatch) -> RepoResult<Task> {
        let patch = patch.normalized()?;

        let tx = self.begin()?;
        let current = load_owned_task(&tx, owner, id)?.ok_or(RepoError::NotFound(id))?;
        if patch.is_empty() {
            return Ok(current);
        }

        let title = patch.title.unwrap_or(current.title);
        let description = match patch.description {
            Some(next) => next,
            None => current.description,
        };
        let completed = patch.completed.unwrap_or(current.completed);

        tx.execute(
            "UPDATE tasks
             SET
                title = ?3,
                description = ?4,
                completed = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND owner_id = ?2;",
            params![
                id,
                owner.to_string(),
                title,
                description,
                bool_to_int(completed),
            ],
        )?;
        let updated = load_owned_task(&tx, owner, id)?.ok_or(RepoError::NotFound(id))?;
        tx.commit()?;

        Ok(updated)
    }

    fn delete_task(&self, owner: UserId, id: TaskId) -> RepoResult<()> {
        let tx = self.begin()?;
        let changed = tx.execute(
            "DELETE FROM tasks
             WHERE id = ?1
               AND owner_id = ?2;",
            params![id, owner.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        tx.commit()?;
        Ok(())
    }

    fn reorder_tasks(&self, owner: UserId, ordered_ids: &[TaskId]) -> RepoResult<ReorderOutcome> {
        ordering::check_request_len(ordered_ids)?;

        let tx = self.begin()?;
        let placed = load_placement(&tx, owner)?;
        let current_ids: Vec<TaskId> = placed.iter().map(|(id, _)| *id).collect();
        ordering::validate_permutation(&current_ids, ordered_ids)?;

        if current_ids == ordered_ids {
            return Ok(ReorderOutcome::Unchanged);
        }

        let targets = ordering::assign_positions(ordered_ids);
        write_positions(&tx, owner, &placed, &targets)?;
        tx.commit()?;

        Ok(ReorderOutcome::Applied {
            count: targets.len(),
        })
    }

    fn repair_positions(&self, owner: UserId) -> RepoResult<bool> {
        let tx = self.begin()?;
        let placed = load_placement(&tx, owner)?;
        let positions: Vec<i64> = placed.iter().map(|(_, position)| *position).collect();
        if !ordering::needs_renumber(&positions) {
            return Ok(false);
        }

        let ids: Vec<TaskId> = placed.iter().map(|(id, _)| *id).collect();
        write_positions(&tx, owner, &placed, &ordering::assign_positions(&ids))?;
        tx.commit()?;
        Ok(true)
    }
}

/// Loads `(id, position)` for every owned task in display order.
fn load_placement(conn: &Connection, owner: UserId) -> RepoResult<Vec<(TaskId, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT id, position
         FROM tasks
         WHERE owner_id = ?1
         ORDER BY position ASC, id ASC;",
    )?;
    let mut rows = stmt.query([owner.to_string()])?;
    let mut placed = Vec::new();
    while let Some(row) = rows.next()? {
        placed.push((row.get(0)?, row.get(1)?));
    }
    Ok(placed)
}

/// Writes `targets` in two passes: stage every row at a unique key below the
/// current minimum, then set the final key. `updated_at` only moves for rows whose position
/// actually changed.
fn write_positions(
    conn: &Connection,
    owner: UserId,
    current: &[(TaskId, i64)],
    targets: &[(TaskId, i64)],
) -> RepoResult<()> {
    let owner_text = owner.to_string();
    let previous: HashMap<TaskId, i64> = current.iter().copied().collect();
    let floor = previous.values().copied().min().unwrap_or(0).min(0);

    let mut stage = conn.prepare_cached(
        "UPDATE tasks
         SET position = ?3
         WHERE id = ?1
           AND owner_id = ?2;",
    )?;
    for (index, (id, _)) in targets.iter().enumerate() {
        stage.execute(params![id, owner_text, floor - 1 - index as i64])?;
    }

    let mut place = conn.prepare_cached(
        "UPDATE tasks
         SET
            position = ?3,
            updated_at = CASE
                WHEN ?4 IS NULL OR ?4 != ?3 THEN (strftime('%s', 'now') * 1000)
                ELSE updated_at
            END
         WHERE id = ?1
           AND owner_id = ?2;",
    )?;
    for (id, position) in targets {
        place.execute(params![id, owner_text, position, previous.get(id)])?;
    }
    Ok(())
}

fn load_owned_task(conn: &Connection, owner: UserId, id: TaskId) -> RepoResult<Option<Task>> {
    let task = conn
        .query_row(
            &format!(
                "{TASK_SELECT_SQL}
                 WHERE id = ?1
                   AND owner_id = ?2;"
            ),
            params![id, owner.to_string()],
            |row| Ok(parse_task_row(row)),
        )
        .optional()?;
    task.transpose()
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let owner_text: String = row.get("owner_id")?;
    let owner_id = Uuid::parse_str(&owner_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid `{owner_text}` in tasks.owner_id"))
    })?;

    let completed = match row.get::<_, i64>("completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid completed value `{other}` in tasks.completed"
            )));
        }
    };

    Ok(Task {
        id: row.get("id")?,
        owner_id,
        title: row.get("title")?,
        description: row.get("description")?,
        completed,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
