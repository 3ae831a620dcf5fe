//! User record repository.
//!
//! # Invariants
//! - Emails are stored normalized; lookups normalize their input the same way.
//! - One email maps to at most one user (`idx_users_email`).

use crate::model::user::{normalize_email, User, UserId};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT
    id,
    email,
    credential_hash,
    created_at
FROM users";

/// Repository interface for user records.
pub trait UserRepository {
    /// Registers a user. `credential_hash` is opaque to the core.
    fn create_user(&self, email: &str, credential_hash: &str) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    /// Looks a user up by email; malformed input simply finds nobody.
    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            "users",
            &["id", "email", "credential_hash", "created_at"],
        )?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, email: &str, credential_hash: &str) -> RepoResult<User> {
        let email =
            normalize_email(email).ok_or_else(|| RepoError::InvalidEmail(email.to_string()))?;
        if credential_hash.trim().is_empty() {
            return Err(RepoError::InvalidCredentialHash);
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if load_user_by_email(&tx, &email)?.is_some() {
            return Err(RepoError::DuplicateEmail(email));
        }

        let id = Uuid::new_v4();
        tx.execute(
            "INSERT INTO users (id, email, credential_hash) VALUES (?1, ?2, ?3);",
            params![id.to_string(), email, credential_hash],
        )?;
        let user = load_user_by_email(&tx, &email)?
            .ok_or_else(|| RepoError::InvalidData(format!("user {id} missing after insert")))?;
        tx.commit()?;

        Ok(user)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_user_row(row)),
            )
            .optional()?;
        user.transpose()
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        match normalize_email(email) {
            Some(email) => load_user_by_email(self.conn, &email),
            None => Ok(None),
        }
    }
}

fn load_user_by_email(conn: &Connection, normalized_email: &str) -> RepoResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("{USER_SELECT_SQL} WHERE email = ?1;"),
            [normalized_email],
            |row| Ok(parse_user_row(row)),
        )
        .optional()?;
    user.transpose()
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{id_text}` in users.id")))?;

    Ok(User {
        id,
        email: row.get("email")?,
        credential_hash: row.get("credential_hash")?,
        created_at: row.get("created_at")?,
    })
}
