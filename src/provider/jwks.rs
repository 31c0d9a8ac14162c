//! Provider signing keys and their in-memory cache.
//!
//! Keys are cached for an hour. A token naming an unknown `kid` forces a
//! refresh, throttled by a cooldown so a flood of bad tokens cannot hammer the
//! provider. A failed refresh keeps the last known keys and is not retried
//! until the same cooldown elapses.

use super::session::TokenError;
use base64ct::{Base64UrlUnpadded, Encoding};
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

pub const JWKS_CACHE_TTL_SECONDS: u64 = 3600;
pub const JWKS_REFRESH_COOLDOWN_SECONDS: u64 = 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Find a key by `kid` (Key ID).
    #[must_use]
    pub fn find_by_kid(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    pub kty: String,
    pub kid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    pub n: String,
    pub e: String,
}

impl Jwk {
    /// Rebuild the RSA public key from its base64url modulus and exponent.
    ///
    /// # Errors
    /// Returns an error if the key is not RSA or its components are malformed.
    pub fn to_rsa_public_key(&self) -> Result<RsaPublicKey, TokenError> {
        if self.kty != "RSA" {
            return Err(TokenError::KeyType(self.kty.clone()));
        }
        let n = Base64UrlUnpadded::decode_vec(&self.n).map_err(|_| TokenError::Base64)?;
        let e = Base64UrlUnpadded::decode_vec(&self.e).map_err(|_| TokenError::Base64)?;
        Ok(RsaPublicKey::new(
            BigUint::from_bytes_be(&n),
            BigUint::from_bytes_be(&e),
        )?)
    }
}

#[derive(Debug)]
struct CachedKeys {
    jwks: Jwks,
    fetched_at: Option<Instant>,
}

/// Last fetched JWKS plus the bookkeeping that decides when to refetch.
#[derive(Debug)]
pub struct JwksCache {
    keys: RwLock<CachedKeys>,
    ttl: Duration,
    last_forced_refresh_unix: AtomicU64,
    last_failed_refresh_unix: AtomicU64,
}

impl Default for JwksCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(JWKS_CACHE_TTL_SECONDS))
    }
}

impl JwksCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            keys: RwLock::new(CachedKeys {
                jwks: Jwks::default(),
                fetched_at: None,
            }),
            ttl,
            last_forced_refresh_unix: AtomicU64::new(0),
            last_failed_refresh_unix: AtomicU64::new(0),
        }
    }

    /// Cached keys and whether they are still within the TTL.
    pub async fn snapshot(&self) -> (Jwks, bool) {
        let cache = self.keys.read().await;
        let fresh = cache
            .fetched_at
            .is_some_and(|fetched_at| fetched_at.elapsed() < self.ttl);
        (cache.jwks.clone(), fresh)
    }

    pub async fn replace(&self, jwks: Jwks) {
        let mut cache = self.keys.write().await;
        cache.jwks = jwks;
        cache.fetched_at = Some(Instant::now());
    }

    /// Claim the right to refresh for an unknown `kid`.
    ///
    /// Returns `false` while the cooldown from the previous forced refresh runs.
    pub fn try_begin_forced_refresh(&self, now_unix: u64) -> bool {
        let last = self.last_forced_refresh_unix.load(Ordering::Relaxed);
        if last != 0 && now_unix.saturating_sub(last) < JWKS_REFRESH_COOLDOWN_SECONDS {
            return false;
        }
        self.last_forced_refresh_unix
            .compare_exchange(last, now_unix, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }

    pub fn record_failed_refresh(&self, now_unix: u64) {
        self.last_failed_refresh_unix.store(now_unix, Ordering::Relaxed);
    }

    /// `true` while the cooldown after a failed refresh runs.
    pub fn refresh_backoff_active(&self, now_unix: u64) -> bool {
        let last = self.last_failed_refresh_unix.load(Ordering::Relaxed);
        last != 0 && now_unix.saturating_sub(last) < JWKS_REFRESH_COOLDOWN_SECONDS
    }
}
