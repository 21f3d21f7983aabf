//! Comment storage and ownership enforcement.

use surrealdb::RecordId;

use crate::db::{CommentCreate, CommentRecord, CommentWithOwner, Db};
use crate::store::{check_owner, fetch_owner, StoreError};

/// Comment store for database operations.
pub struct CommentStore {
    db: Db,
}

impl CommentStore {
    /// Create a new comment store.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// List the comments of a forum, oldest first, each with its owner.
    ///
    /// An unknown forum yields an empty list; only `add` requires the forum
    /// to exist.
    pub async fn list_by_forum(
        &self,
        forum_id: &RecordId,
    ) -> Result<Vec<CommentWithOwner>, StoreError> {
        comments_with_owners(&self.db, forum_id).await
    }

    /// Add a comment to an existing forum.
    pub async fn add(
        &self,
        forum_id: &RecordId,
        owner_id: &RecordId,
        input: CommentCreate,
    ) -> Result<CommentWithOwner, StoreError> {
        let content = input.content.trim();
        if content.is_empty() {
            return Err(StoreError::InvalidInput("Content is required".to_string()));
        }
        let content = content.to_string();

        // The forum must exist before we attach anything to it.
        let mut res = self
            .db
            .query("SELECT id FROM forum WHERE id = $id LIMIT 1")
            .bind(("id", forum_id.clone()))
            .await?;
        #[derive(serde::Deserialize)]
        struct IdRow {
            #[allow(dead_code)]
            id: RecordId,
        }
        let found: Vec<IdRow> = res.take(0)?;
        if found.is_empty() {
            return Err(StoreError::NotFound("Forum"));
        }

        let mut res = self
            .db
            .query(
                r#"
                CREATE comment SET
                    content = $content,
                    user_id = $user_id,
                    forum_id = $forum_id,
                    created_at = time::now()
                "#,
            )
            .bind(("content", content))
            .bind(("user_id", owner_id.clone()))
            .bind(("forum_id", forum_id.clone()))
            .await?;

        let created: Option<CommentRecord> = res.take(0)?;
        let comment =
            created.ok_or_else(|| StoreError::Database("failed to create comment".to_string()))?;

        let owner = fetch_owner(&self.db, &comment.user_id).await?;
        Ok(CommentWithOwner { comment, owner })
    }

    /// Delete a comment. Owner-only.
    pub async fn delete(&self, id: &RecordId, requester_id: &RecordId) -> Result<(), StoreError> {
        let mut res = self
            .db
            .query("SELECT * FROM comment WHERE id = $id LIMIT 1")
            .bind(("id", id.clone()))
            .await?;
        let comments: Vec<CommentRecord> = res.take(0)?;
        let existing = comments
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound("Comment"))?;

        check_owner(
            &existing.user_id,
            requester_id,
            "you can only delete your own comments",
        )?;

        self.db
            .query("DELETE comment WHERE id = $id")
            .bind(("id", id.clone()))
            .await?;

        Ok(())
    }
}

/// Fetch a forum's comments oldest-first and join each with its owner.
///
/// Shared with `ForumStore::get`, which embeds the thread in its detail view.
pub(crate) async fn comments_with_owners(
    db: &Db,
    forum_id: &RecordId,
) -> Result<Vec<CommentWithOwner>, StoreError> {
    let mut res = db
        .query("SELECT * FROM comment WHERE forum_id = $forum ORDER BY created_at ASC")
        .bind(("forum", forum_id.clone()))
        .await?;

    let comments: Vec<CommentRecord> = res.take(0)?;

    let mut joined = Vec::with_capacity(comments.len());
    for comment in comments {
        let owner = fetch_owner(db, &comment.user_id).await?;
        joined.push(CommentWithOwner { comment, owner });
    }

    Ok(joined)
}
