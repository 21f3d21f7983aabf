//! Forum storage and ownership enforcement.

use serde::Deserialize;
use surrealdb::RecordId;

use crate::db::{Db, ForumCreate, ForumDetail, ForumRecord, ForumSummary, ForumUpdate};
use crate::store::comments::comments_with_owners;
use crate::store::{check_owner, fetch_owner, StoreError};

/// Maximum number of tags a forum may carry.
pub const MAX_TAGS: usize = 5;

/// Maximum description length in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Forum store for database operations.
pub struct ForumStore {
    db: Db,
}

impl ForumStore {
    /// Create a new forum store.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// List all forums, newest first, each with its owner and comment count.
    pub async fn list(&self) -> Result<Vec<ForumSummary>, StoreError> {
        let mut res = self
            .db
            .query("SELECT * FROM forum ORDER BY created_at DESC")
            .await?;

        let forums: Vec<ForumRecord> = res.take(0)?;

        let mut summaries = Vec::with_capacity(forums.len());
        for forum in forums {
            let owner = fetch_owner(&self.db, &forum.user_id).await?;
            let comment_count = self.count_comments(&forum.id).await?;
            summaries.push(ForumSummary {
                forum,
                owner,
                comment_count,
            });
        }

        Ok(summaries)
    }

    /// Get a single forum with its owner and full comment thread
    /// (oldest first).
    pub async fn get(&self, id: &RecordId) -> Result<ForumDetail, StoreError> {
        let forum = self
            .find_by_id(id)
            .await?
            .ok_or(StoreError::NotFound("Forum"))?;

        let owner = fetch_owner(&self.db, &forum.user_id).await?;
        let comments = comments_with_owners(&self.db, id).await?;
        let comment_count = comments.len() as u64;

        Ok(ForumDetail {
            forum,
            owner,
            comment_count,
            comments,
        })
    }

    /// Create a forum owned by the given user.
    pub async fn create(
        &self,
        owner_id: &RecordId,
        input: ForumCreate,
    ) -> Result<ForumSummary, StoreError> {
        let title = validate_title(&input.title)?;
        let description = validate_description(input.description)?;
        let tags = normalize_tags(input.tags);

        let mut res = self
            .db
            .query(
                r#"
                CREATE forum SET
                    title = $title,
                    description = $description,
                    tags = $tags,
                    user_id = $user_id,
                    created_at = time::now(),
                    updated_at = time::now()
                "#,
            )
            .bind(("title", title))
            .bind(("description", description))
            .bind(("tags", tags))
            .bind(("user_id", owner_id.clone()))
            .await?;

        let created: Option<ForumRecord> = res.take(0)?;
        let forum =
            created.ok_or_else(|| StoreError::Database("failed to create forum".to_string()))?;

        let owner = fetch_owner(&self.db, &forum.user_id).await?;
        Ok(ForumSummary {
            forum,
            owner,
            comment_count: 0,
        })
    }

    /// Update a forum's title, description, or tags. Owner-only.
    ///
    /// Absent fields keep their stored values; a provided field is validated
    /// the same way as on create.
    pub async fn update(
        &self,
        id: &RecordId,
        requester_id: &RecordId,
        input: ForumUpdate,
    ) -> Result<ForumSummary, StoreError> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or(StoreError::NotFound("Forum"))?;

        check_owner(
            &existing.user_id,
            requester_id,
            "you can only update your own forums",
        )?;

        let title = match input.title {
            Some(t) => validate_title(&t)?,
            None => existing.title,
        };
        let description = match input.description {
            Some(d) => validate_description(Some(d))?,
            None => existing.description,
        };
        let tags = match input.tags {
            Some(t) => normalize_tags(t),
            None => existing.tags,
        };

        let mut res = self
            .db
            .query(
                r#"
                UPDATE forum SET
                    title = $title,
                    description = $description,
                    tags = $tags,
                    updated_at = time::now()
                WHERE id = $id
                "#,
            )
            .bind(("id", id.clone()))
            .bind(("title", title))
            .bind(("description", description))
            .bind(("tags", tags))
            .await?;

        let updated: Vec<ForumRecord> = res.take(0)?;
        let forum = updated
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Database("failed to update forum".to_string()))?;

        let owner = fetch_owner(&self.db, &forum.user_id).await?;
        let comment_count = self.count_comments(&forum.id).await?;
        Ok(ForumSummary {
            forum,
            owner,
            comment_count,
        })
    }

    /// Delete a forum and all of its comments. Owner-only.
    pub async fn delete(&self, id: &RecordId, requester_id: &RecordId) -> Result<(), StoreError> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or(StoreError::NotFound("Forum"))?;

        check_owner(
            &existing.user_id,
            requester_id,
            "you can only delete your own forums",
        )?;

        // Comments first, then the forum itself.
        self.db
            .query(
                r#"
                DELETE comment WHERE forum_id = $id;
                DELETE forum WHERE id = $id;
                "#,
            )
            .bind(("id", id.clone()))
            .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<ForumRecord>, StoreError> {
        let mut res = self
            .db
            .query("SELECT * FROM forum WHERE id = $id LIMIT 1")
            .bind(("id", id.clone()))
            .await?;

        let forums: Vec<ForumRecord> = res.take(0)?;
        Ok(forums.into_iter().next())
    }

    async fn count_comments(&self, forum_id: &RecordId) -> Result<u64, StoreError> {
        #[derive(Deserialize)]
        struct CountRow {
            count: u64,
        }

        let mut res = self
            .db
            .query("SELECT count() AS count FROM comment WHERE forum_id = $forum GROUP ALL")
            .bind(("forum", forum_id.clone()))
            .await?;

        let rows: Vec<CountRow> = res.take(0)?;
        Ok(rows.into_iter().next().map(|r| r.count).unwrap_or(0))
    }
}

fn validate_title(title: &str) -> Result<String, StoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StoreError::InvalidInput("Title is required".to_string()));
    }
    Ok(title.to_string())
}

fn validate_description(description: Option<String>) -> Result<Option<String>, StoreError> {
    if let Some(desc) = &description {
        if desc.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(StoreError::InvalidInput(format!(
                "Description must be at most {} characters",
                MAX_DESCRIPTION_CHARS
            )));
        }
    }
    Ok(description)
}

/// Normalize a tag list: trim, lowercase, drop empties, deduplicate while
/// preserving first-occurrence order, cap at [`MAX_TAGS`].
pub(crate) fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(tags.len().min(MAX_TAGS));
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() || seen.contains(&tag) {
            continue;
        }
        seen.push(tag);
        if seen.len() == MAX_TAGS {
            break;
        }
    }
    seen
}
