//! Data-access layer for forums and comments.
//!
//! Each store wraps the database handle and exposes the operations the HTTP
//! handlers need. All mutations enforce the single authorization rule of the
//! system: only the owner of a record may modify or delete it. Existence is
//! always checked before ownership, so a missing record surfaces as
//! [`StoreError::NotFound`], never as [`StoreError::Forbidden`].

mod comments;
mod forums;

pub use comments::CommentStore;
pub use forums::ForumStore;

use std::fmt;

use surrealdb::RecordId;

use crate::db::{Db, UserRecord};

/// Errors produced by the store layer.
///
/// The variants are the tagged error kinds the API layer maps to HTTP status
/// codes. Handlers match on the variant, not on the message text.
#[derive(Debug)]
pub enum StoreError {
    /// Input failed validation before reaching the database.
    InvalidInput(String),
    /// The addressed record does not exist. Carries the resource name
    /// ("Forum", "Comment") for the error message.
    NotFound(&'static str),
    /// The requester is not the owner of the addressed record.
    Forbidden(&'static str),
    /// The database reported an error.
    Database(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "{}", msg),
            Self::NotFound(resource) => write!(f, "{} not found", resource),
            Self::Forbidden(msg) => write!(f, "Unauthorized: {}", msg),
            Self::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// The authorization guard.
///
/// Compares the record's owning-user id against the requester's resolved
/// local user id. Callers must have established that the record exists
/// before invoking this.
pub(crate) fn check_owner(
    owner: &RecordId,
    requester: &RecordId,
    denial: &'static str,
) -> Result<(), StoreError> {
    if owner != requester {
        return Err(StoreError::Forbidden(denial));
    }
    Ok(())
}

/// Load the user record referenced by an owning-user field.
///
/// Owners are never deleted, so a dangling reference is a database-level
/// inconsistency rather than a caller error.
pub(crate) async fn fetch_owner(db: &Db, user_id: &RecordId) -> Result<UserRecord, StoreError> {
    let mut res = db
        .query("SELECT * FROM user WHERE id = $id LIMIT 1")
        .bind(("id", user_id.clone()))
        .await?;

    let users: Vec<UserRecord> = res.take(0)?;
    users
        .into_iter()
        .next()
        .ok_or_else(|| StoreError::Database(format!("owner record missing: {}", user_id)))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::auth::UserStore;
    use crate::db::{create_connection, ensure_schema, DatabaseConfig, Db, UserRecord};

    pub async fn setup_test_db() -> Db {
        let config = DatabaseConfig {
            url: "memory".to_string(),
            ..Default::default()
        };
        let db = create_connection(config).await.unwrap();
        ensure_schema(&db).await.unwrap();
        db
    }

    pub async fn create_test_user(db: &Db, email: &str) -> UserRecord {
        UserStore::new(db.clone())
            .get_or_create_user(email, None)
            .await
            .unwrap()
    }
}
