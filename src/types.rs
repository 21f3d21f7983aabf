//! NewType wrappers for strong typing throughout the forum server.
//!
//! These types prevent accidental mixing of semantically different strings
//! (e.g., passing an email where an external identity is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// External user identifier from the authentication provider.
    ///
    /// This might be a JWT `sub` claim, an API key hash, or "anonymous"
    /// for local single-user mode. It is distinct from the local database
    /// user id, which is what ownership checks compare against.
    ExternalUserId
);

newtype_string!(
    /// Identity provider that authenticated the user.
    ///
    /// Common values: "jwt", "api_key", "anonymous".
    IdentityProvider
);

newtype_string!(
    /// SHA-256 hash of an API key.
    ///
    /// API keys are never used directly as an identity. The hash is
    /// computed once when the key is received and used as the external
    /// identifier for the service account it maps to.
    ApiKeyHash
);
