//! Authentication and user identity.
//!
//! Authenticated requests carry credentials from an external identity
//! provider; this module verifies them and bridges the verified identity to
//! a local user record, creating one on first sight. Supported methods:
//!
//! - **JWT**: Bearer token verified against the provider's JWKS endpoint
//! - **API Key**: static key in the X-API-Key header (service account)
//! - **Anonymous**: single-user mode for local development
//!
//! The resolved [`UserContext`] carries the local user id that the store
//! layer's ownership checks compare against.

mod context;
mod extractor;
pub mod jwks;
mod user_store;

pub use context::UserContext;
pub use extractor::{hash_api_key, AuthConfig, AuthError, AuthExtractor, JwtClaims};
pub use jwks::{JwksCache, JwksError, DEFAULT_CACHE_TTL_SECONDS};
pub use user_store::UserStore;
