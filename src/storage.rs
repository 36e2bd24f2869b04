// ABOUTME: Credential store seam over the platform's secure storage
// ABOUTME: Ships an in-memory implementation for tests and non-mobile hosts
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use crate::constants::token_keys;
use crate::errors::SyncResult;
use crate::models::AuthTokenPair;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Secure string storage keyed by name.
///
/// The mobile host backs this with its keychain; this crate never owns the
/// persistence lifecycle, only reads and writes through it.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read a stored value
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store is unavailable.
    async fn get(&self, key: &str) -> SyncResult<Option<String>>;

    /// Write or overwrite a stored value
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store rejects the write.
    async fn set(&self, key: &str, value: &str) -> SyncResult<()>;

    /// Remove a stored value; absent keys are not an error
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store is unavailable.
    async fn remove(&self, key: &str) -> SyncResult<()>;
}

/// Token-pair helpers shared by the client and login flow
pub(crate) async fn load_tokens(
    store: &Arc<dyn CredentialStore>,
) -> SyncResult<(Option<String>, Option<String>)> {
    let access = store.get(token_keys::ACCESS_TOKEN).await?;
    let refresh = store.get(token_keys::REFRESH_TOKEN).await?;
    Ok((access, refresh))
}

pub(crate) async fn store_tokens(
    store: &Arc<dyn CredentialStore>,
    pair: &AuthTokenPair,
) -> SyncResult<()> {
    store.set(token_keys::ACCESS_TOKEN, &pair.access_token).await?;
    store
        .set(token_keys::REFRESH_TOKEN, &pair.refresh_token)
        .await
}

pub(crate) async fn clear_tokens(store: &Arc<dyn CredentialStore>) -> SyncResult<()> {
    store.remove(token_keys::ACCESS_TOKEN).await?;
    store.remove(token_keys::REFRESH_TOKEN).await
}

/// In-memory credential store for tests and desktop hosts
#[derive(Default)]
pub struct InMemoryCredentialStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a token pair
    #[must_use]
    pub fn with_tokens(access: &str, refresh: &str) -> Self {
        let mut values = HashMap::new();
        values.insert(token_keys::ACCESS_TOKEN.to_owned(), access.to_owned());
        values.insert(token_keys::REFRESH_TOKEN.to_owned(), refresh.to_owned());
        Self {
            values: RwLock::new(values),
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, key: &str) -> SyncResult<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> SyncResult<()> {
        self.values
            .write()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> SyncResult<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}
