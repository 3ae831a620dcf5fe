//! User identity model.
//!
//! Users are the ownership boundary for tasks. Credential material is stored
//! as an opaque hash produced by the external credential service.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable user identifier.
pub type UserId = Uuid;

static EMAIL_SHAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Registered user record. The credential hash is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Normalized (trimmed, lowercase) email.
    pub email: String,
    #[serde(skip_serializing, default)]
    pub credential_hash: String,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// Normalizes an email for storage and lookup.
///
/// Returns `None` when the value does not look like an address.
pub fn normalize_email(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_lowercase();
    if EMAIL_SHAPE_RE.is_match(&normalized) {
        Some(normalized)
    } else {
        None
    }
}
