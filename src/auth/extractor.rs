//! Authentication extractor for HTTP requests.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::auth::context::UserContext;
use crate::auth::jwks::{JwksCache, DEFAULT_CACHE_TTL_SECONDS};
use crate::auth::user_store::UserStore;
use crate::db::Db;
use crate::types::{ApiKeyHash, ExternalUserId, IdentityProvider};

/// Email the anonymous local user is provisioned under.
const ANONYMOUS_EMAIL: &str = "local@localhost";

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Whether to allow anonymous access (single-user local mode).
    pub allow_anonymous: bool,
    /// Header name for API key authentication.
    pub api_key_header: String,
    /// Expected API key value, for simple deployments. Authenticates a
    /// single service account.
    pub api_key: Option<String>,
    /// Whether to validate JWT bearer tokens.
    pub jwt_enabled: bool,
    /// JWT issuer for validation.
    pub jwt_issuer: Option<String>,
    /// JWT audience for validation.
    pub jwt_audience: Option<String>,
    /// JWKS endpoint URL for key fetching.
    #[serde(default)]
    pub jwks_url: Option<String>,
    /// JWKS cache TTL in seconds.
    #[serde(default = "default_jwks_cache_seconds")]
    pub jwks_cache_seconds: u64,
    /// Whether to allow a stale JWKS cache on fetch failure.
    #[serde(default = "default_allow_stale_jwks")]
    pub allow_stale_jwks: bool,
}

fn default_jwks_cache_seconds() -> u64 {
    DEFAULT_CACHE_TTL_SECONDS
}

fn default_allow_stale_jwks() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // Default to anonymous for local development
            allow_anonymous: true,
            api_key_header: "X-API-Key".to_string(),
            api_key: None,
            jwt_enabled: false,
            jwt_issuer: None,
            jwt_audience: None,
            jwks_url: None,
            jwks_cache_seconds: DEFAULT_CACHE_TTL_SECONDS,
            allow_stale_jwks: true,
        }
    }
}

impl AuthConfig {
    /// Create a config for local single-user mode.
    pub fn local() -> Self {
        Self {
            allow_anonymous: true,
            ..Default::default()
        }
    }

    /// Create a config for static API key authentication.
    pub fn with_api_key(api_key: String) -> Self {
        Self {
            allow_anonymous: false,
            api_key: Some(api_key),
            ..Default::default()
        }
    }

    /// Create a config for JWT authentication with JWKS signature
    /// verification.
    pub fn with_jwt(issuer: String, jwks_url: String, audience: Option<String>) -> Self {
        Self {
            allow_anonymous: false,
            jwt_enabled: true,
            jwt_issuer: Some(issuer),
            jwt_audience: audience,
            jwks_url: Some(jwks_url),
            ..Default::default()
        }
    }
}

/// Authentication errors.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No credentials provided and anonymous access not allowed.
    Unauthenticated,
    /// Invalid API key.
    InvalidApiKey,
    /// Invalid or expired JWT.
    InvalidToken(String),
    /// JWKS fetch or parse failure.
    Jwks(String),
    /// Identity bridge failure.
    Database(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "Authentication required"),
            Self::InvalidApiKey => write!(f, "Invalid API key"),
            Self::InvalidToken(msg) => write!(f, "Invalid token: {}", msg),
            Self::Jwks(msg) => write!(f, "JWKS error: {}", msg),
            Self::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

/// Authentication extractor for HTTP requests.
///
/// Resolves request credentials to a [`UserContext`], provisioning the
/// local user record through the identity bridge on first contact.
pub struct AuthExtractor {
    config: AuthConfig,
    user_store: Arc<UserStore>,
    jwks_cache: Option<Arc<JwksCache>>,
}

impl AuthExtractor {
    /// Create a new auth extractor.
    pub fn new(config: AuthConfig, db: Db) -> Self {
        let jwks_cache = config.jwks_url.as_ref().map(|url| {
            Arc::new(JwksCache::new(
                url.clone(),
                config.jwks_cache_seconds,
                config.allow_stale_jwks,
            ))
        });

        Self {
            config,
            user_store: Arc::new(UserStore::new(db)),
            jwks_cache,
        }
    }

    /// Get reference to the user store.
    pub fn user_store(&self) -> &Arc<UserStore> {
        &self.user_store
    }

    /// Header name carrying the API key.
    pub fn api_key_header(&self) -> &str {
        &self.config.api_key_header
    }

    /// Extract a user context from request credentials.
    ///
    /// Checked in order:
    /// 1. Bearer token (JWT)
    /// 2. API key header
    /// 3. Anonymous, if allowed
    pub async fn extract_user(
        &self,
        authorization: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<UserContext, AuthError> {
        if let Some(auth_header) = authorization
            && let Some(token) = auth_header.strip_prefix("Bearer ")
        {
            return self.extract_from_jwt(token).await;
        }

        if let Some(key) = api_key {
            return self.extract_from_api_key(key).await;
        }

        if self.config.allow_anonymous {
            return self.extract_anonymous().await;
        }

        Err(AuthError::Unauthenticated)
    }

    /// Extract a user from a JWT with RS256 signature verification.
    async fn extract_from_jwt(&self, token: &str) -> Result<UserContext, AuthError> {
        if !self.config.jwt_enabled {
            return Err(AuthError::InvalidToken(
                "JWT authentication not enabled".to_string(),
            ));
        }

        let jwks_cache = self.jwks_cache.as_ref().ok_or_else(|| {
            AuthError::InvalidToken("JWT enabled but JWKS URL not configured".to_string())
        })?;

        let header = decode_header(token)
            .map_err(|e| AuthError::InvalidToken(format!("Invalid JWT header: {}", e)))?;

        let decoding_key = jwks_cache
            .get_key(header.kid.as_deref())
            .await
            .map_err(|e| AuthError::Jwks(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        if let Some(issuer) = &self.config.jwt_issuer {
            validation.set_issuer(&[issuer]);
        }
        if let Some(audience) = &self.config.jwt_audience {
            validation.set_audience(&[audience]);
        }

        let token_data = decode::<JwtClaims>(token, &decoding_key, &validation).map_err(|e| {
            AuthError::InvalidToken(format!("Signature verification failed: {}", e))
        })?;

        let claims = token_data.claims;

        // jsonwebtoken already validates exp, but be explicit.
        if let Some(exp) = claims.exp {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or(Duration::ZERO)
                .as_secs();
            if exp < now {
                return Err(AuthError::InvalidToken("Token expired".to_string()));
            }
        }

        // The identity bridge is keyed by email, so a token without one
        // cannot be mapped to a local user.
        let email = claims.email.ok_or_else(|| {
            AuthError::InvalidToken("token is missing an email claim".to_string())
        })?;

        debug!("JWT verified for subject: {}", claims.sub);

        let user = self
            .user_store
            .get_or_create_user(&email, claims.name.as_deref())
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;

        Ok(UserContext::new(
            user.id,
            ExternalUserId::new(claims.sub),
            IdentityProvider::new("jwt"),
            user.email,
            user.display_name,
        ))
    }

    /// Extract a service-account user from a static API key.
    async fn extract_from_api_key(&self, key: &str) -> Result<UserContext, AuthError> {
        let Some(expected_key) = &self.config.api_key else {
            return Err(AuthError::InvalidApiKey);
        };
        if key != expected_key {
            return Err(AuthError::InvalidApiKey);
        }

        // Identity derives from the hash of the key, never the raw key.
        let key_hash = hash_api_key(key);
        let email = format!("{}@service.local", &key_hash.as_str()[..16]);

        let user = self
            .user_store
            .get_or_create_user(&email, Some("Service Account"))
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;

        Ok(UserContext::new(
            user.id,
            ExternalUserId::new(key_hash.into_inner()),
            IdentityProvider::new("api_key"),
            user.email,
            user.display_name,
        ))
    }

    /// Extract the anonymous local user.
    async fn extract_anonymous(&self) -> Result<UserContext, AuthError> {
        let user = self
            .user_store
            .get_or_create_user(ANONYMOUS_EMAIL, Some("Local User"))
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;

        Ok(UserContext::anonymous(user.id, user.email))
    }
}

/// JWT claims structure.
#[derive(Debug, Deserialize)]
pub struct JwtClaims {
    /// Subject (provider user ID).
    pub sub: String,
    /// Email. Required by the identity bridge.
    pub email: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Expiration time (Unix timestamp).
    pub exp: Option<u64>,
}

/// Hash an API key for identity derivation (don't use raw keys).
pub fn hash_api_key(key: &str) -> ApiKeyHash {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let result = hasher.finalize();
    ApiKeyHash::new(format!("{:x}", result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_connection, ensure_schema, DatabaseConfig};

    async fn setup_test_db() -> Db {
        let config = DatabaseConfig {
            url: "memory".to_string(),
            ..Default::default()
        };
        let db = create_connection(config).await.unwrap();
        ensure_schema(&db).await.unwrap();
        db
    }

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert!(config.allow_anonymous);
        assert_eq!(config.api_key_header, "X-API-Key");
        assert!(!config.jwt_enabled);
        assert!(config.jwks_url.is_none());
        assert_eq!(config.jwks_cache_seconds, DEFAULT_CACHE_TTL_SECONDS);
        assert!(config.allow_stale_jwks);
    }

    #[test]
    fn test_auth_config_with_api_key() {
        let config = AuthConfig::with_api_key("secret123".to_string());
        assert!(!config.allow_anonymous);
        assert_eq!(config.api_key, Some("secret123".to_string()));
    }

    #[test]
    fn test_auth_config_with_jwt() {
        let config = AuthConfig::with_jwt(
            "https://issuer.example.com".to_string(),
            "https://issuer.example.com/.well-known/jwks.json".to_string(),
            Some("forum-api".to_string()),
        );
        assert!(!config.allow_anonymous);
        assert!(config.jwt_enabled);
        assert_eq!(
            config.jwt_issuer,
            Some("https://issuer.example.com".to_string())
        );
        assert_eq!(config.jwt_audience, Some("forum-api".to_string()));
    }

    #[test]
    fn test_hash_api_key() {
        let hash1 = hash_api_key("secret123");
        let hash2 = hash_api_key("secret123");
        let hash3 = hash_api_key("different");

        assert!(hash1.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
    }

    #[test]
    fn test_auth_error_display() {
        assert_eq!(
            AuthError::Unauthenticated.to_string(),
            "Authentication required"
        );
        assert_eq!(AuthError::InvalidApiKey.to_string(), "Invalid API key");
        assert_eq!(
            AuthError::InvalidToken("bad".to_string()).to_string(),
            "Invalid token: bad"
        );
    }

    #[tokio::test]
    async fn test_anonymous_mode() {
        let db = setup_test_db().await;
        let extractor = AuthExtractor::new(AuthConfig::local(), db);

        let ctx = extractor.extract_user(None, None).await.unwrap();
        assert!(ctx.is_anonymous());
        assert_eq!(ctx.email(), ANONYMOUS_EMAIL);
    }

    #[tokio::test]
    async fn test_anonymous_mode_is_stable() {
        let db = setup_test_db().await;
        let extractor = AuthExtractor::new(AuthConfig::local(), db);

        let ctx1 = extractor.extract_user(None, None).await.unwrap();
        let ctx2 = extractor.extract_user(None, None).await.unwrap();
        assert_eq!(ctx1.user_id(), ctx2.user_id());
    }

    #[tokio::test]
    async fn test_api_key_valid() {
        let db = setup_test_db().await;
        let config = AuthConfig::with_api_key("secret123".to_string());
        let extractor = AuthExtractor::new(config, db);

        let ctx = extractor
            .extract_user(None, Some("secret123"))
            .await
            .unwrap();
        assert!(!ctx.is_anonymous());
        assert_eq!(ctx.provider().as_str(), "api_key");
        assert!(ctx.email().ends_with("@service.local"));
    }

    #[tokio::test]
    async fn test_api_key_invalid() {
        let db = setup_test_db().await;
        let config = AuthConfig::with_api_key("secret123".to_string());
        let extractor = AuthExtractor::new(config, db);

        let result = extractor.extract_user(None, Some("wrong_key")).await;
        assert!(matches!(result.unwrap_err(), AuthError::InvalidApiKey));
    }

    #[tokio::test]
    async fn test_no_credentials_rejected_when_anonymous_disabled() {
        let db = setup_test_db().await;
        let config = AuthConfig::with_api_key("secret123".to_string());
        let extractor = AuthExtractor::new(config, db);

        let result = extractor.extract_user(None, None).await;
        assert!(matches!(result.unwrap_err(), AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_bearer_rejected_when_jwt_disabled() {
        let db = setup_test_db().await;
        let extractor = AuthExtractor::new(AuthConfig::local(), db);

        let result = extractor
            .extract_user(Some("Bearer not-a-real-token"), None)
            .await;
        assert!(matches!(result.unwrap_err(), AuthError::InvalidToken(_)));
    }

    #[test]
    fn test_jwt_claims_deserialization() {
        let json = r#"{
            "sub": "user123",
            "email": "user@example.com",
            "name": "Test User",
            "exp": 1735689600
        }"#;

        let claims: JwtClaims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.sub, "user123");
        assert_eq!(claims.email, Some("user@example.com".to_string()));
        assert_eq!(claims.name, Some("Test User".to_string()));
        assert_eq!(claims.exp, Some(1735689600));
    }
}
