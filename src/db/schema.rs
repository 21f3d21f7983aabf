use serde::{Deserialize, Serialize};
use surrealdb::{sql::Datetime, RecordId};

/// Persisted representation of a user in SurrealDB.
///
/// Users are provisioned lazily by the identity bridge the first time an
/// authenticated request arrives with an email the database has not seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Stable database identifier (table: `user`).
    pub id: RecordId,
    /// Email address from the identity provider. Unique.
    pub email: String,
    /// Optional display name. Defaults to the local part of the email
    /// when the provider supplies none.
    pub display_name: Option<String>,
    /// When this record was first created.
    pub created_at: Option<Datetime>,
}

/// Persisted representation of a forum (discussion thread).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumRecord {
    /// Stable database identifier (table: `forum`).
    pub id: RecordId,
    /// Title. Non-empty after trimming.
    pub title: String,
    /// Optional description, at most 500 characters.
    pub description: Option<String>,
    /// Tags: lowercase, deduplicated, at most 5, in the order entered.
    pub tags: Vec<String>,
    /// Owning user. Ownership checks compare against this.
    pub user_id: RecordId,
    /// When this record was first created.
    pub created_at: Option<Datetime>,
    /// When this record was last updated.
    pub updated_at: Option<Datetime>,
}

/// Persisted representation of a comment attached to a forum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    /// Stable database identifier (table: `comment`).
    pub id: RecordId,
    /// Comment body, stored trimmed. Non-empty.
    pub content: String,
    /// Owning user.
    pub user_id: RecordId,
    /// Forum this comment belongs to. Deleted with it.
    pub forum_id: RecordId,
    /// When this record was first created.
    pub created_at: Option<Datetime>,
}

/// Fields accepted when creating a forum.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForumCreate {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update of a forum. Absent fields keep their stored values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForumUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Fields accepted when adding a comment to a forum.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentCreate {
    pub content: String,
}

/// A forum as returned from listings: the record plus its owner and the
/// number of comments attached to it.
#[derive(Debug, Clone, Serialize)]
pub struct ForumSummary {
    #[serde(flatten)]
    pub forum: ForumRecord,
    pub owner: UserRecord,
    pub comment_count: u64,
}

/// A single forum with its full comment thread.
#[derive(Debug, Clone, Serialize)]
pub struct ForumDetail {
    #[serde(flatten)]
    pub forum: ForumRecord,
    pub owner: UserRecord,
    pub comment_count: u64,
    /// Oldest-first.
    pub comments: Vec<CommentWithOwner>,
}

/// A comment joined with its owning user, for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct CommentWithOwner {
    #[serde(flatten)]
    pub comment: CommentRecord,
    pub owner: UserRecord,
}
