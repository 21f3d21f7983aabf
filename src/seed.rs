//! Demo data for local development.

use anyhow::{anyhow, Result};
use surrealdb::RecordId;
use tracing::info;

use crate::auth::UserStore;
use crate::db::{CommentCreate, Db, ForumCreate};
use crate::store::{CommentStore, ForumStore};

/// Populate the database with a few demo users, forums and comments.
///
/// Idempotent for users (they resolve by email) but not for forums, so run
/// it against a fresh database.
pub async fn seed_demo_data(db: &Db) -> Result<()> {
    let users = UserStore::new(db.clone());
    let forums = ForumStore::new(db.clone());
    let comments = CommentStore::new(db.clone());

    let john = users
        .get_or_create_user("john@example.com", Some("John Doe"))
        .await?;
    let jane = users
        .get_or_create_user("jane@example.com", Some("Jane Smith"))
        .await?;
    let bob = users
        .get_or_create_user("bob@example.com", Some("Bob Johnson"))
        .await?;
    info!("seeded 3 users");

    let welcome = create_forum(
        &forums,
        &john.id,
        "Welcome to the Community!",
        "This is our first forum where we discuss community guidelines and introduce ourselves. Feel free to share your thoughts and get to know other members!",
        &["welcome", "introduction", "community"],
    )
    .await?;

    let tech = create_forum(
        &forums,
        &jane.id,
        "Tech Discussion",
        "A place to discuss the latest in technology, programming languages, frameworks, and development tools. Share your experiences and learn from others!",
        &["technology", "programming", "innovation"],
    )
    .await?;

    let showcase = create_forum(
        &forums,
        &bob.id,
        "Project Showcase",
        "Show off your latest projects! Whether it's a web app, mobile app, or any other creation, we'd love to see what you've been working on.",
        &["projects", "showcase", "feedback"],
    )
    .await?;

    let questions = create_forum(
        &forums,
        &john.id,
        "General Questions",
        "Have a question that doesn't fit anywhere else? Ask it here! Our community is always happy to help with any questions you might have.",
        &["questions", "help", "support"],
    )
    .await?;
    info!("seeded 4 forums");

    let thread = [
        (&welcome, &jane.id, "Welcome to the community! Great to have you here."),
        (&welcome, &bob.id, "Thanks for the warm welcome! Excited to be part of this community."),
        (&welcome, &john.id, "I love how friendly everyone is here! 😊"),
        (&tech, &john.id, "What do you all think about the latest React 19 features?"),
        (&tech, &bob.id, "The new use() hook looks really promising for data fetching!"),
        (&showcase, &jane.id, "Just finished my portfolio website using Next.js and Supabase!"),
        (&showcase, &john.id, "That sounds awesome! Would love to see how you implemented the authentication."),
        (&questions, &bob.id, "How do I deploy a Next.js app to Vercel?"),
        (&questions, &jane.id, "It's super easy! Just connect your GitHub repo to Vercel and it deploys automatically."),
        (&questions, &john.id, "Don't forget to set up your environment variables in the Vercel dashboard!"),
    ];

    for (forum, author, content) in thread {
        comments
            .add(
                forum,
                author,
                CommentCreate {
                    content: content.to_string(),
                },
            )
            .await
            .map_err(|e| anyhow!("failed to seed comment: {}", e))?;
    }
    info!("seeded {} comments", thread.len());

    Ok(())
}

async fn create_forum(
    forums: &ForumStore,
    owner: &RecordId,
    title: &str,
    description: &str,
    tags: &[&str],
) -> Result<RecordId> {
    let summary = forums
        .create(
            owner,
            ForumCreate {
                title: title.to_string(),
                description: Some(description.to_string()),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
        )
        .await
        .map_err(|e| anyhow!("failed to seed forum '{}': {}", title, e))?;
    Ok(summary.forum.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_connection, ensure_schema, DatabaseConfig};

    #[tokio::test]
    async fn test_seed_populates_everything() {
        let config = DatabaseConfig {
            url: "memory".to_string(),
            ..Default::default()
        };
        let db = create_connection(config).await.unwrap();
        ensure_schema(&db).await.unwrap();

        seed_demo_data(&db).await.unwrap();

        let forums = ForumStore::new(db.clone());
        let listing = forums.list().await.unwrap();
        assert_eq!(listing.len(), 4);

        let welcome = listing
            .iter()
            .find(|f| f.forum.title == "Welcome to the Community!")
            .unwrap();
        assert_eq!(welcome.comment_count, 3);
        assert_eq!(welcome.owner.email, "john@example.com");

        let detail = forums.get(&welcome.forum.id).await.unwrap();
        assert_eq!(detail.comments.len(), 3);
        assert_eq!(
            detail.comments[0].comment.content,
            "Welcome to the community! Great to have you here."
        );
    }
}
