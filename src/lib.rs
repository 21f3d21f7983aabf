//! Forum server: a small REST service for forums and comments.
//!
//! Users are provisioned lazily from provider-verified identities, forums
//! and comments are owned by their creators, and ownership is enforced on
//! every mutation.

pub mod api;
pub mod auth;
pub mod db;
pub mod seed;
pub mod store;
pub mod types;

pub use api::{create_router, AppState};
pub use auth::{AuthConfig, AuthExtractor, UserContext, UserStore};
pub use db::{create_connection, ensure_schema, DatabaseConfig, Db};
pub use store::{CommentStore, ForumStore, StoreError};

use anyhow::Result;

/// Connect, apply the schema and build the application router.
pub async fn create_app(
    db_config: DatabaseConfig,
    auth_config: AuthConfig,
) -> Result<axum::Router> {
    let db = create_connection(db_config).await?;
    ensure_schema(&db).await?;
    Ok(create_router(AppState::new(db, auth_config)))
}
