//! REST API for forums and comments.
//!
//! Handlers translate requests into store calls and map the tagged error
//! kinds to HTTP status codes: validation 400, missing credentials 401,
//! ownership 403, missing records 404, everything else 500.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get},
    Router,
};
use serde_json::{json, Value};
use surrealdb::RecordId;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, AuthError, AuthExtractor, UserContext};
use crate::db::{CommentCreate, Db, ForumCreate, ForumUpdate};
use crate::store::{CommentStore, ForumStore, StoreError};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    forums: Arc<ForumStore>,
    comments: Arc<CommentStore>,
    auth: Arc<AuthExtractor>,
}

impl AppState {
    /// Build the state from a connected database and auth configuration.
    pub fn new(db: Db, auth_config: AuthConfig) -> Self {
        Self {
            forums: Arc::new(ForumStore::new(db.clone())),
            comments: Arc::new(CommentStore::new(db.clone())),
            auth: Arc::new(AuthExtractor::new(auth_config, db)),
        }
    }
}

/// Build the application router.
///
/// Reads are public; writes go through the [`AuthUser`] extractor.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/forums", get(list_forums).post(create_forum))
        .route(
            "/forums/{id}",
            get(get_forum).put(update_forum).delete(delete_forum),
        )
        .route(
            "/forums/{id}/comments",
            get(list_comments).post(add_comment),
        )
        .route("/comments/{id}", delete(delete_comment))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API error response: `{"error": "..."}` plus a status picked from the
/// error kind.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthenticated(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Internal(msg) => {
                tracing::error!("request failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidInput(_) => Self::BadRequest(err.to_string()),
            StoreError::NotFound(_) => Self::NotFound(err.to_string()),
            StoreError::Forbidden(_) => Self::Forbidden(err.to_string()),
            StoreError::Database(msg) => Self::Internal(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated
            | AuthError::InvalidApiKey
            | AuthError::InvalidToken(_) => Self::Unauthenticated(err.to_string()),
            AuthError::Jwks(msg) | AuthError::Database(msg) => Self::Internal(msg),
        }
    }
}

/// Extractor that authenticates the request and resolves the local user.
pub struct AuthUser(pub UserContext);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let api_key = parts
            .headers
            .get(state.auth.api_key_header())
            .and_then(|v| v.to_str().ok());

        let ctx = state.auth.extract_user(authorization, api_key).await?;
        Ok(AuthUser(ctx))
    }
}

/// Build a record id from a path segment, accepting both the bare key
/// ("abc123") and the full form ("forum:abc123").
fn record_id(table: &'static str, raw: &str) -> RecordId {
    let key = raw
        .strip_prefix(table)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(raw);
    RecordId::from_table_key(table, key)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn list_forums(State(state): State<AppState>) -> Result<Response, ApiError> {
    let forums = state.forums.list().await?;
    Ok(Json(forums).into_response())
}

async fn create_forum(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<ForumCreate>,
) -> Result<Response, ApiError> {
    let forum = state.forums.create(user.user_id(), input).await?;
    tracing::info!(user = %user.display(), forum = %forum.forum.id, "forum created");
    Ok((StatusCode::CREATED, Json(forum)).into_response())
}

async fn get_forum(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let forum = state.forums.get(&record_id("forum", &id)).await?;
    Ok(Json(forum).into_response())
}

async fn update_forum(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthUser(user): AuthUser,
    Json(input): Json<ForumUpdate>,
) -> Result<Response, ApiError> {
    let forum = state
        .forums
        .update(&record_id("forum", &id), user.user_id(), input)
        .await?;
    Ok(Json(forum).into_response())
}

async fn delete_forum(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthUser(user): AuthUser,
) -> Result<Response, ApiError> {
    let id = record_id("forum", &id);
    state.forums.delete(&id, user.user_id()).await?;
    tracing::info!(user = %user.display(), forum = %id, "forum deleted");
    Ok(Json(json!({ "message": "Forum deleted successfully" })).into_response())
}

async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let comments = state
        .comments
        .list_by_forum(&record_id("forum", &id))
        .await?;
    Ok(Json(comments).into_response())
}

async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthUser(user): AuthUser,
    Json(input): Json<CommentCreate>,
) -> Result<Response, ApiError> {
    let comment = state
        .comments
        .add(&record_id("forum", &id), user.user_id(), input)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)).into_response())
}

async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthUser(user): AuthUser,
) -> Result<Response, ApiError> {
    state
        .comments
        .delete(&record_id("comment", &id), user.user_id())
        .await?;
    Ok(Json(json!({ "message": "Comment deleted successfully" })).into_response())
}
