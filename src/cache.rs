// ABOUTME: Local cache abstraction for per-domain data snapshots
// ABOUTME: In-memory LRU implementation; mobile hosts may substitute disk-backed stores
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use crate::errors::{SyncError, SyncResult};
use crate::tracker::SyncDomain;
use async_trait::async_trait;
use lru::LruCache;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Structured cache key scoping a snapshot to a user and domain
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Account the snapshot belongs to (email or user id)
    pub user: String,
    /// Data domain being snapshotted
    pub domain: SyncDomain,
}

impl CacheKey {
    /// Create a new cache key
    #[must_use]
    pub fn new(user: &str, domain: SyncDomain) -> Self {
        Self {
            user: user.to_owned(),
            domain,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}:domain:{}", self.user, self.domain)
    }
}

/// Typed key-value snapshot store.
///
/// Writes happen on every local mutation and after every successful push, so
/// implementations must be cheap; a slow remote network must never delay a
/// cache write.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store a serialized snapshot under the key
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or storage fails.
    async fn set_raw(&self, key: &CacheKey, value: Vec<u8>) -> SyncResult<()>;

    /// Fetch the raw snapshot for a key, if present
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    async fn get_raw(&self, key: &CacheKey) -> SyncResult<Option<Vec<u8>>>;

    /// Drop a single snapshot (called per domain on logout)
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    async fn invalidate(&self, key: &CacheKey) -> SyncResult<()>;
}

/// Typed convenience wrappers over the raw byte interface
pub struct TypedCache;

impl TypedCache {
    /// Serialize and store a value
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or storage fails.
    pub async fn set<T: Serialize + Sync>(
        store: &Arc<dyn CacheStore>,
        key: &CacheKey,
        value: &T,
    ) -> SyncResult<()> {
        let bytes = serde_json::to_vec(value)?;
        store.set_raw(key, bytes).await
    }

    /// Fetch and deserialize a value
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails, or `Cache` when a
    /// stored snapshot no longer decodes as `T`.
    pub async fn get<T: DeserializeOwned>(
        store: &Arc<dyn CacheStore>,
        key: &CacheKey,
    ) -> SyncResult<Option<T>> {
        match store.get_raw(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| SyncError::cache(format!("corrupt snapshot at {key}: {e}"))),
            None => Ok(None),
        }
    }
}

/// Default number of snapshots kept by the in-memory cache
const DEFAULT_CACHE_CAPACITY: usize = 256;

/// In-memory LRU snapshot cache
#[derive(Clone)]
pub struct InMemoryCache {
    store: Arc<RwLock<LruCache<String, Vec<u8>>>>,
}

impl InMemoryCache {
    /// Create a cache with the default capacity
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a cache bounded to `capacity` snapshots; zero falls back to
    /// the default capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            store: Arc::new(RwLock::new(LruCache::new(capacity))),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn set_raw(&self, key: &CacheKey, value: Vec<u8>) -> SyncResult<()> {
        self.store.write().await.push(key.to_string(), value);
        Ok(())
    }

    async fn get_raw(&self, key: &CacheKey) -> SyncResult<Option<Vec<u8>>> {
        Ok(self.store.write().await.get(&key.to_string()).cloned())
    }

    async fn invalidate(&self, key: &CacheKey) -> SyncResult<()> {
        self.store.write().await.pop(&key.to_string());
        Ok(())
    }
}

impl fmt::Debug for InMemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryCache").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn store() -> Arc<dyn CacheStore> {
        Arc::new(InMemoryCache::new())
    }

    #[tokio::test]
    async fn invalidate_drops_one_key_and_leaves_others() {
        let cache = store();
        let a = CacheKey::new("player@test", SyncDomain::OrderedDrills);
        let b = CacheKey::new("player@test", SyncDomain::SavedFilters);
        TypedCache::set(&cache, &a, &vec!["v1"]).await.unwrap();
        TypedCache::set(&cache, &b, &vec!["v2"]).await.unwrap();

        cache.invalidate(&a).await.unwrap();

        let gone: Option<Vec<String>> = TypedCache::get(&cache, &a).await.unwrap();
        assert!(gone.is_none());
        let kept: Option<Vec<String>> = TypedCache::get(&cache, &b).await.unwrap();
        assert_eq!(kept, Some(vec!["v2".to_owned()]));
    }

    #[tokio::test]
    async fn corrupt_snapshot_surfaces_as_cache_error() {
        let cache = store();
        let key = CacheKey::new("player@test", SyncDomain::OrderedDrills);
        cache
            .set_raw(&key, b"not json".to_vec())
            .await
            .unwrap();

        let err = TypedCache::get::<Vec<String>>(&cache, &key)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Cache(_)));
    }
}
