// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-in nonces.
//!
//! A nonce is scoped to the requesting origin and the claimed wallet
//! address, lives for a short TTL and is destroyed by the first login
//! attempt that reads it, whether that attempt succeeds or not.
//!
//! Storage is behind the [`NonceStore`] trait. The default
//! [`LruNonceStore`] keeps nonces in process; a multi-instance deployment
//! swaps in a shared store without touching [`NonceService`].

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use super::AuthError;
use crate::clock::Clock;

/// Origin used for the cache key when a request carries neither
/// `Origin` nor `Referer` (native apps, curl).
pub const FALLBACK_ORIGIN: &str = "quyx://no-origin";

/// A live challenge nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Nonce {
    #[serde(rename = "nonce")]
    pub value: String,
    pub issued_at: DateTime<Utc>,
    #[serde(rename = "expirationTime")]
    pub expires_at: DateTime<Utc>,
}

impl Nonce {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

// =============================================================================
// Cache key
// =============================================================================

/// Normalized origin of a request, from `Origin` or else `Referer`.
///
/// Returns the scheme://host[:port] serialization, or `None` if neither
/// header is present or parseable.
pub fn request_origin(headers: &HeaderMap) -> Option<String> {
    [header::ORIGIN, header::REFERER]
        .iter()
        .filter_map(|name| headers.get(name))
        .filter_map(|value| value.to_str().ok())
        .find_map(normalize_origin)
}

fn normalize_origin(raw: &str) -> Option<String> {
    let url = url::Url::parse(raw.trim()).ok()?;
    let origin = url.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// EVM addresses are case-insensitive, base58 addresses are not.
fn normalize_address(address: &str) -> String {
    let address = address.trim();
    if address.starts_with("0x") || address.starts_with("0X") {
        address.to_lowercase()
    } else {
        address.to_string()
    }
}

/// Derive the nonce cache key for an (origin, address) pair.
pub fn cache_key(origin: Option<&str>, address: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(origin.unwrap_or(FALLBACK_ORIGIN).as_bytes());
    hasher.update(b":");
    hasher.update(normalize_address(address).as_bytes());
    alloy::hex::encode(hasher.finalize())
}

/// Cache key for a request made on behalf of `address`.
pub fn cache_key_for_request(headers: &HeaderMap, address: &str) -> String {
    cache_key(request_origin(headers).as_deref(), address)
}

// =============================================================================
// Store
// =============================================================================

/// Key/value storage for nonces.
pub trait NonceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Nonce>;

    fn set(&self, key: &str, nonce: Nonce);

    /// Return the entry for `key` if it is live at `now`, otherwise store
    /// and return the result of `mint`, in one step.
    ///
    /// Two concurrent callers for the same key must get the same nonce.
    fn get_or_insert_live(
        &self,
        key: &str,
        now: DateTime<Utc>,
        mint: &mut dyn FnMut() -> Nonce,
    ) -> Nonce;

    /// Remove and return the entry in one step.
    ///
    /// Two concurrent callers for the same key must not both see `Some`.
    fn remove(&self, key: &str) -> Option<Nonce>;
}

/// In-process nonce store with LRU eviction.
///
/// Expired entries are not swept; they are dropped when next read or
/// pushed out by newer entries.
pub struct LruNonceStore {
    cache: Mutex<LruCache<String, Nonce>>,
}

impl LruNonceStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }
}

impl NonceStore for LruNonceStore {
    fn get(&self, key: &str) -> Option<Nonce> {
        let mut cache = self.cache.lock().ok()?;
        cache.get(key).cloned()
    }

    fn set(&self, key: &str, nonce: Nonce) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key.to_string(), nonce);
        }
    }

    fn get_or_insert_live(
        &self,
        key: &str,
        now: DateTime<Utc>,
        mint: &mut dyn FnMut() -> Nonce,
    ) -> Nonce {
        let Ok(mut cache) = self.cache.lock() else {
            // Not stored; the login that follows fails as a missing nonce
            return mint();
        };
        if let Some(existing) = cache.get(key).filter(|nonce| nonce.is_live(now)) {
            return existing.clone();
        }
        let nonce = mint();
        cache.put(key.to_string(), nonce.clone());
        nonce
    }

    fn remove(&self, key: &str) -> Option<Nonce> {
        let mut cache = self.cache.lock().ok()?;
        cache.pop(key)
    }
}

// =============================================================================
// Service
// =============================================================================

/// Issues and consumes nonces against an injected store and clock.
pub struct NonceService {
    store: Arc<dyn NonceStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl NonceService {
    pub fn new(store: Arc<dyn NonceStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the live nonce for `key`, or mint a new one.
    pub fn issue(&self, key: &str) -> Nonce {
        let now = self.clock.now();
        let mut minted = false;
        let nonce = self.store.get_or_insert_live(key, now, &mut || {
            minted = true;
            Nonce {
                value: uuid::Uuid::new_v4().simple().to_string(),
                issued_at: now,
                expires_at: now + self.ttl,
            }
        });
        if minted {
            tracing::debug!(expires_at = %nonce.expires_at, "Nonce issued");
        }
        nonce
    }

    /// Take the nonce for `key` out of the store and compare it.
    ///
    /// The entry is gone after this call regardless of the outcome.
    /// Returns whether `supplied` matched the stored value.
    pub fn consume_and_check(&self, key: &str, supplied: &str) -> Result<bool, AuthError> {
        let nonce = self
            .store
            .remove(key)
            .ok_or(AuthError::NonceExpiredOrMissing)?;

        if !nonce.is_live(self.clock.now()) {
            return Err(AuthError::NonceExpiredOrMissing);
        }

        Ok(nonce.value == supplied)
    }
}
