//! The identity bridge: maps provider-verified identities to local users.

use anyhow::{anyhow, bail, Result};
use surrealdb::RecordId;
use tracing::debug;

use crate::db::{Db, UserRecord};

/// User store for database operations.
///
/// The entry point is [`get_or_create_user`](UserStore::get_or_create_user):
/// every authenticated request resolves through it, creating the local user
/// record the first time an email is seen.
pub struct UserStore {
    db: Db,
}

impl UserStore {
    /// Create a new user store.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Get or create a user by provider-verified email.
    ///
    /// Performs at most one insert. Two concurrent first-contact requests
    /// for the same email race on the unique index; the loser re-selects
    /// the winner's row.
    pub async fn get_or_create_user(
        &self,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<UserRecord> {
        let email = email.trim();
        if email.is_empty() {
            bail!("email is required");
        }

        if let Some(user) = self.get_user_by_email(email).await? {
            return Ok(user);
        }

        match self.create_user(email, display_name).await {
            Ok(user) => {
                debug!(email, "provisioned new user");
                Ok(user)
            }
            Err(_) => {
                // Lost the insert race: the unique email index rejected us,
                // so the row exists now.
                self.get_user_by_email(email)
                    .await?
                    .ok_or_else(|| anyhow!("failed to create user for {}", email))
            }
        }
    }

    /// Get a user by email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let email = email.to_string();

        let mut res = self
            .db
            .query("SELECT * FROM user WHERE email = $email LIMIT 1")
            .bind(("email", email))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Get a user by database ID.
    pub async fn get_user_by_id(&self, user_id: &RecordId) -> Result<Option<UserRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM user WHERE id = $id LIMIT 1")
            .bind(("id", user_id.clone()))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    async fn create_user(&self, email: &str, display_name: Option<&str>) -> Result<UserRecord> {
        // Default the display name to the local part of the email, the way
        // the identity provider UIs usually do.
        let display_name = display_name
            .map(str::to_string)
            .or_else(|| email.split('@').next().map(str::to_string));
        let email = email.to_string();

        let mut res = self
            .db
            .query(
                r#"
                CREATE user SET
                    email = $email,
                    display_name = $display_name,
                    created_at = time::now()
                "#,
            )
            .bind(("email", email))
            .bind(("display_name", display_name))
            .await?;

        // A unique-index violation surfaces here and is handled by the
        // caller's re-select.
        let users: Vec<UserRecord> = res.take(0)?;
        users
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("failed to create user"))
    }
}
