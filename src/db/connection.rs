use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;

pub type Db = Surreal<Any>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("FORUM_DB_URL")
                .unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("FORUM_DB_NAMESPACE")
                .unwrap_or_else(|_| "forum".to_string()),
            database: env::var("FORUM_DB_DATABASE")
                .unwrap_or_else(|_| "main".to_string()),
            username: env::var("FORUM_DB_USERNAME").ok(),
            password: env::var("FORUM_DB_PASSWORD").ok(),
        }
    }
}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db> {
    let db = surrealdb::engine::any::connect(config.url).await?;

    // Sign in if credentials are provided
    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await?;
    }

    db.use_ns(config.namespace).use_db(config.database).await?;

    Ok(db)
}

pub async fn ensure_schema(db: &Db) -> Result<()> {
    let schema_queries = vec![
        // User table: one row per email, provisioned lazily on first
        // authenticated request.
        "DEFINE TABLE user SCHEMAFULL;
         DEFINE FIELD email ON TABLE user TYPE string;
         DEFINE FIELD display_name ON TABLE user TYPE option<string>;
         DEFINE FIELD created_at ON TABLE user TYPE datetime DEFAULT time::now();",

        // Forum table: a discussion thread owned by a user.
        "DEFINE TABLE forum SCHEMAFULL;
         DEFINE FIELD title ON TABLE forum TYPE string;
         DEFINE FIELD description ON TABLE forum TYPE option<string>;
         DEFINE FIELD tags ON TABLE forum TYPE array<string> DEFAULT [];
         DEFINE FIELD user_id ON TABLE forum TYPE record<user>;
         DEFINE FIELD created_at ON TABLE forum TYPE datetime DEFAULT time::now();
         DEFINE FIELD updated_at ON TABLE forum TYPE datetime DEFAULT time::now();",

        // Comment table: a reply attached to a forum, owned by a user.
        "DEFINE TABLE comment SCHEMAFULL;
         DEFINE FIELD content ON TABLE comment TYPE string;
         DEFINE FIELD user_id ON TABLE comment TYPE record<user>;
         DEFINE FIELD forum_id ON TABLE comment TYPE record<forum>;
         DEFINE FIELD created_at ON TABLE comment TYPE datetime DEFAULT time::now();",

        // The unique email index is what makes lazy provisioning safe: a
        // lost create race fails here and the bridge re-selects the winner.
        "DEFINE INDEX user_email ON TABLE user COLUMNS email UNIQUE;
         DEFINE INDEX comment_forum ON TABLE comment COLUMNS forum_id;
         DEFINE INDEX comment_user ON TABLE comment COLUMNS user_id;
         DEFINE INDEX forum_user ON TABLE forum COLUMNS user_id;",
    ];

    for query in schema_queries {
        db.query(query).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_connection_and_schema() {
        let config = DatabaseConfig {
            url: "memory".to_string(),
            ..Default::default()
        };
        let db = create_connection(config).await.unwrap();
        ensure_schema(&db).await.unwrap();

        // Schema application is idempotent.
        ensure_schema(&db).await.unwrap();
    }

    #[tokio::test]
    async fn test_unique_email_index() {
        let config = DatabaseConfig {
            url: "memory".to_string(),
            ..Default::default()
        };
        let db = create_connection(config).await.unwrap();
        ensure_schema(&db).await.unwrap();

        db.query("CREATE user SET email = 'a@example.com', created_at = time::now()")
            .await
            .unwrap()
            .check()
            .unwrap();

        let dup = db
            .query("CREATE user SET email = 'a@example.com', created_at = time::now()")
            .await
            .unwrap()
            .check();
        assert!(dup.is_err());
    }
}
