//! User context for request-scoped identity.

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use crate::types::{ExternalUserId, IdentityProvider};

/// User context extracted from the HTTP request.
///
/// Passed to the store layer to provide the requester's identity for
/// ownership checks. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    /// Local database record ID. This is what ownership checks compare.
    user_id: RecordId,
    /// External identity (JWT sub claim, API key hash, or "anonymous").
    external_id: ExternalUserId,
    /// Identity provider that authenticated this user.
    provider: IdentityProvider,
    /// Email the local user record is keyed by.
    email: String,
    /// Optional display name.
    display_name: Option<String>,
    /// Whether this is the anonymous local user.
    is_anonymous: bool,
}

impl UserContext {
    /// Create a new user context.
    pub fn new(
        user_id: RecordId,
        external_id: ExternalUserId,
        provider: IdentityProvider,
        email: String,
        display_name: Option<String>,
    ) -> Self {
        let is_anonymous = provider.as_str() == "anonymous";
        Self {
            user_id,
            external_id,
            provider,
            email,
            display_name,
            is_anonymous,
        }
    }

    /// Create an anonymous user context for local single-user mode.
    pub fn anonymous(user_id: RecordId, email: String) -> Self {
        Self {
            user_id,
            external_id: ExternalUserId::new("anonymous"),
            provider: IdentityProvider::new("anonymous"),
            email,
            display_name: Some("Local User".to_string()),
            is_anonymous: true,
        }
    }

    /// Get the local database user ID.
    pub fn user_id(&self) -> &RecordId {
        &self.user_id
    }

    /// Get the external identity.
    pub fn external_id(&self) -> &ExternalUserId {
        &self.external_id
    }

    /// Get the identity provider.
    pub fn provider(&self) -> &IdentityProvider {
        &self.provider
    }

    /// Get the email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Get the display name.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Check if this is the anonymous local user.
    pub fn is_anonymous(&self) -> bool {
        self.is_anonymous
    }

    /// Get a display-friendly name for this user.
    pub fn display(&self) -> String {
        match &self.display_name {
            Some(name) => name.clone(),
            None => self.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user_id() -> RecordId {
        RecordId::from_table_key("user", "test123")
    }

    #[test]
    fn test_user_context_new() {
        let ctx = UserContext::new(
            test_user_id(),
            ExternalUserId::new("sub123"),
            IdentityProvider::new("jwt"),
            "user@example.com".to_string(),
            Some("Test User".to_string()),
        );

        assert_eq!(ctx.external_id().as_str(), "sub123");
        assert_eq!(ctx.provider().as_str(), "jwt");
        assert_eq!(ctx.email(), "user@example.com");
        assert_eq!(ctx.display_name(), Some("Test User"));
        assert!(!ctx.is_anonymous());
        assert_eq!(ctx.display(), "Test User");
    }

    #[test]
    fn test_user_context_anonymous() {
        let ctx = UserContext::anonymous(test_user_id(), "local@localhost".to_string());

        assert_eq!(ctx.external_id().as_str(), "anonymous");
        assert_eq!(ctx.provider().as_str(), "anonymous");
        assert!(ctx.is_anonymous());
        assert_eq!(ctx.display(), "Local User");
    }

    #[test]
    fn test_display_falls_back_to_email() {
        let ctx = UserContext::new(
            test_user_id(),
            ExternalUserId::new("sub123"),
            IdentityProvider::new("jwt"),
            "user@example.com".to_string(),
            None,
        );
        assert_eq!(ctx.display(), "user@example.com");
    }
}
