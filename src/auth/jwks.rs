//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! The identity provider publishes its RSA public keys at a JWKS endpoint.
//! Keys are cached with a TTL; if a refresh fails, a stale cache may be
//! served for a bounded window so token verification survives short
//! provider outages.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use base64::Engine;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Default cache TTL in seconds (1 hour).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

/// Maximum age at which a stale cache may still be served (24 hours).
const MAX_STALE_SECONDS: u64 = 86400;

/// A single JSON Web Key from a JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type (e.g., "RSA").
    pub kty: String,
    /// Key ID, matched against the JWT header `kid`.
    pub kid: Option<String>,
    /// Key use ("sig" for signature, "enc" for encryption).
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    /// RSA modulus (base64url encoded).
    pub n: Option<String>,
    /// RSA exponent (base64url encoded).
    pub e: Option<String>,
    /// X.509 certificate chain.
    pub x5c: Option<Vec<String>>,
}

/// A JWKS document containing multiple keys.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<Jwk>,
}

struct CacheState {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Option<Instant>,
}

/// Thread-safe JWKS cache with automatic refresh.
pub struct JwksCache {
    jwks_url: String,
    cache_ttl: Duration,
    allow_stale: bool,
    state: RwLock<CacheState>,
    client: reqwest::Client,
}

impl JwksCache {
    /// Create a new JWKS cache.
    pub fn new(jwks_url: String, cache_ttl_seconds: u64, allow_stale: bool) -> Self {
        Self {
            jwks_url,
            cache_ttl: Duration::from_secs(cache_ttl_seconds),
            allow_stale,
            state: RwLock::new(CacheState {
                keys: HashMap::new(),
                fetched_at: None,
            }),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Get a decoding key by key ID, refreshing the cache when stale.
    ///
    /// If `kid` is `None`, the first available key is returned.
    pub async fn get_key(&self, kid: Option<&str>) -> Result<DecodingKey, JwksError> {
        let fresh = {
            let state = self.state.read().await;
            match state.fetched_at {
                Some(t) => t.elapsed() <= self.cache_ttl,
                None => false,
            }
        };

        if fresh {
            if let Some(key) = self.lookup(kid).await {
                return Ok(key);
            }
        }

        match self.refresh().await {
            Ok(()) => self.lookup(kid).await.ok_or_else(|| match kid {
                Some(k) => JwksError::KeyNotFound(k.to_string()),
                None => JwksError::NoKeys,
            }),
            Err(e) => {
                if self.allow_stale {
                    let state = self.state.read().await;
                    let stale_ok = state
                        .fetched_at
                        .map(|t| t.elapsed() < Duration::from_secs(MAX_STALE_SECONDS))
                        .unwrap_or(false);
                    if stale_ok {
                        if let Some(key) = match kid {
                            Some(k) => state.keys.get(k).cloned(),
                            None => state.keys.values().next().cloned(),
                        } {
                            warn!("JWKS refresh failed, serving stale cache: {}", e);
                            return Ok(key);
                        }
                    }
                }
                Err(e)
            }
        }
    }

    async fn lookup(&self, kid: Option<&str>) -> Option<DecodingKey> {
        let state = self.state.read().await;
        match kid {
            Some(k) => state.keys.get(k).cloned(),
            None => state.keys.values().next().cloned(),
        }
    }

    /// Fetch the JWKS document and replace the cached key set.
    pub async fn refresh(&self) -> Result<(), JwksError> {
        debug!("Fetching JWKS from {}", self.jwks_url);

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksError::Fetch(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let document: JwksDocument = response
            .json()
            .await
            .map_err(|e| JwksError::Parse(e.to_string()))?;

        let mut keys = HashMap::new();
        for jwk in &document.keys {
            if jwk.kty != "RSA" || jwk.key_use.as_deref() == Some("enc") {
                continue;
            }
            match decoding_key_from_jwk(jwk) {
                Ok(key) => {
                    let kid = jwk.kid.clone().unwrap_or_else(|| "default".to_string());
                    keys.insert(kid, key);
                }
                Err(e) => warn!("Skipping unparseable JWK: {}", e),
            }
        }

        if keys.is_empty() {
            return Err(JwksError::NoKeys);
        }

        let count = keys.len();
        let mut state = self.state.write().await;
        state.keys = keys;
        state.fetched_at = Some(Instant::now());
        debug!("Cached {} JWKS keys", count);

        Ok(())
    }

    /// Number of cached keys.
    pub async fn key_count(&self) -> usize {
        self.state.read().await.keys.len()
    }
}

/// Convert a JWK to a jsonwebtoken decoding key.
///
/// Prefers the `n`/`e` RSA components; falls back to the first `x5c`
/// certificate for providers that only publish the chain.
fn decoding_key_from_jwk(jwk: &Jwk) -> Result<DecodingKey, JwksError> {
    if let (Some(n), Some(e)) = (&jwk.n, &jwk.e) {
        return DecodingKey::from_rsa_components(n, e)
            .map_err(|e| JwksError::Parse(format!("Invalid RSA components: {}", e)));
    }

    if let Some(cert) = jwk.x5c.as_ref().and_then(|chain| chain.first()) {
        // x5c entries are standard (not URL-safe) base64-encoded DER.
        let der = base64::engine::general_purpose::STANDARD
            .decode(cert)
            .map_err(|e| JwksError::Parse(format!("Invalid x5c: {}", e)))?;
        return Ok(DecodingKey::from_rsa_der(&der));
    }

    Err(JwksError::Parse("JWK has neither n/e nor x5c".to_string()))
}

/// Errors that can occur when working with the JWKS cache.
#[derive(Debug, Clone)]
pub enum JwksError {
    /// Failed to fetch the JWKS document.
    Fetch(String),
    /// Failed to parse the JWKS document or a key in it.
    Parse(String),
    /// The document contained no usable keys.
    NoKeys,
    /// No key matched the requested kid.
    KeyNotFound(String),
}

impl std::fmt::Display for JwksError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(msg) => write!(f, "Failed to fetch JWKS: {}", msg),
            Self::Parse(msg) => write!(f, "Failed to parse JWKS: {}", msg),
            Self::NoKeys => write!(f, "No valid keys found in JWKS"),
            Self::KeyNotFound(kid) => write!(f, "Key not found: {}", kid),
        }
    }
}

impl std::error::Error for JwksError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwk_deserialization() {
        let json = r#"{
            "kty": "RSA",
            "kid": "key-1",
            "use": "sig",
            "n": "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw",
            "e": "AQAB"
        }"#;

        let jwk: Jwk = serde_json::from_str(json).unwrap();
        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.kid, Some("key-1".to_string()));
        assert_eq!(jwk.key_use, Some("sig".to_string()));
        assert!(decoding_key_from_jwk(&jwk).is_ok());
    }

    #[test]
    fn test_jwk_without_material_is_rejected() {
        let jwk = Jwk {
            kty: "RSA".to_string(),
            kid: None,
            key_use: None,
            n: None,
            e: None,
            x5c: None,
        };
        assert!(matches!(
            decoding_key_from_jwk(&jwk),
            Err(JwksError::Parse(_))
        ));
    }

    #[test]
    fn test_jwks_document_deserialization() {
        let json = r#"{
            "keys": [
                { "kty": "RSA", "kid": "key1", "n": "test", "e": "AQAB" },
                { "kty": "EC", "kid": "key2" }
            ]
        }"#;

        let doc: JwksDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.keys.len(), 2);
        assert_eq!(doc.keys[0].kid, Some("key1".to_string()));
    }

    #[tokio::test]
    async fn test_cache_starts_empty() {
        let cache = JwksCache::new(
            "https://issuer.example.com/.well-known/jwks.json".to_string(),
            DEFAULT_CACHE_TTL_SECONDS,
            true,
        );
        assert_eq!(cache.key_count().await, 0);
    }

    #[test]
    fn test_jwks_error_display() {
        assert_eq!(
            JwksError::Fetch("timeout".to_string()).to_string(),
            "Failed to fetch JWKS: timeout"
        );
        assert_eq!(
            JwksError::KeyNotFound("kid1".to_string()).to_string(),
            "Key not found: kid1"
        );
    }
}
