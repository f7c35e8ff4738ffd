//! Credential persistence in the platform secure store.
//!
//! One entry per provider, keyed by [`ProviderKind::credential_alias`], holding
//! the [`CredentialRecord`] as JSON. Nothing is cached: every call goes to the
//! store, so a credential deleted behind our back is noticed immediately.
//!
//! ```no_run
//! use core_auth::{CredentialRecord, CredentialStore, ProviderKind};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let store = CredentialStore::new(secure_store, ProviderKind::Google);
//!
//! store
//!     .save(&CredentialRecord::new("ya29", "1//0g", "someone@example.com", 3600))
//!     .await?;
//! assert!(store.is_connected().await);
//!
//! store.delete().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::{CredentialRecord, ProviderKind};
use bridge_traits::storage::SecureStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct CredentialStore {
    secure_store: Arc<dyn SecureStore>,
    provider: ProviderKind,
}

impl CredentialStore {
    pub fn new(secure_store: Arc<dyn SecureStore>, provider: ProviderKind) -> Self {
        debug!(provider = %provider, "Initializing CredentialStore");
        Self {
            secure_store,
            provider,
        }
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    fn key(&self) -> &'static str {
        self.provider.credential_alias()
    }

    /// Persist `record`, replacing whatever was stored before.
    pub async fn save(&self, record: &CredentialRecord) -> Result<()> {
        let json = serde_json::to_vec(record).map_err(|e| {
            warn!(provider = %self.provider, error = %e, "Failed to serialize credential");
            AuthError::StorageFailure(format!("credential serialization: {}", e))
        })?;

        self.secure_store
            .set_secret(self.key(), &json)
            .await
            .map_err(|e| {
                warn!(provider = %self.provider, error = %e, "Failed to write credential");
                AuthError::StorageFailure(e.to_string())
            })?;

        info!(
            provider = %self.provider,
            expires_at = record.expires_at,
            "Credential stored"
        );
        Ok(())
    }

    /// Load the stored record.
    ///
    /// Returns `Ok(None)` when nothing is stored. Data that no longer parses is
    /// deleted and reported as [`AuthError::StorageFailure`].
    pub async fn load(&self) -> Result<Option<CredentialRecord>> {
        let data = self.secure_store.get_secret(self.key()).await.map_err(|e| {
            warn!(provider = %self.provider, error = %e, "Failed to read credential");
            AuthError::StorageFailure(e.to_string())
        })?;

        let Some(data) = data else {
            debug!(provider = %self.provider, "No credential stored");
            return Ok(None);
        };

        match serde_json::from_slice::<CredentialRecord>(&data) {
            Ok(record) => {
                debug!(
                    provider = %self.provider,
                    expires_at = record.expires_at,
                    "Credential loaded"
                );
                Ok(Some(record))
            }
            Err(e) => {
                warn!(
                    provider = %self.provider,
                    error = %e,
                    "Stored credential is corrupted, deleting it"
                );

                if let Err(delete_err) = self.secure_store.delete_secret(self.key()).await {
                    warn!(
                        provider = %self.provider,
                        error = %delete_err,
                        "Failed to delete corrupted credential"
                    );
                }

                Err(AuthError::StorageFailure(format!(
                    "stored credential is corrupted: {}",
                    e
                )))
            }
        }
    }

    /// Remove the stored record. Succeeds when nothing was stored.
    pub async fn delete(&self) -> Result<()> {
        self.secure_store
            .delete_secret(self.key())
            .await
            .map_err(|e| {
                warn!(provider = %self.provider, error = %e, "Failed to delete credential");
                AuthError::StorageFailure(e.to_string())
            })?;

        info!(provider = %self.provider, "Credential deleted");
        Ok(())
    }

    /// True iff a record with a non-empty refresh token is stored.
    ///
    /// Storage errors count as "not connected".
    pub async fn is_connected(&self) -> bool {
        match self.load().await {
            Ok(Some(record)) => record.is_connected(),
            Ok(None) => false,
            Err(e) => {
                warn!(provider = %self.provider, error = %e, "Connectivity check failed");
                false
            }
        }
    }

    /// Email of the connected account, if any.
    pub async fn connected_email(&self) -> Option<String> {
        match self.load().await {
            Ok(Some(record)) if record.is_connected() => Some(record.account_email),
            Ok(_) => None,
            Err(e) => {
                warn!(provider = %self.provider, error = %e, "Could not read connected account");
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct MemorySecureStore {
        data: Mutex<HashMap<String, Vec<u8>>>,
        fail: bool,
    }

    impl MemorySecureStore {
        pub(crate) fn failing() -> Self {
            Self {
                data: Mutex::default(),
                fail: true,
            }
        }

        pub(crate) async fn raw(&self, key: &str) -> Option<Vec<u8>> {
            self.data.lock().await.get(key).cloned()
        }

        pub(crate) async fn put_raw(&self, key: &str, value: &[u8]) {
            self.data
                .lock()
                .await
                .insert(key.to_string(), value.to_vec());
        }

        fn check(&self) -> BridgeResult<()> {
            if self.fail {
                Err(BridgeError::NotAvailable("keychain locked".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl SecureStore for MemorySecureStore {
        async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
            self.check()?;
            self.put_raw(key, value).await;
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
            self.check()?;
            Ok(self.raw(key).await)
        }

        async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
            self.check()?;
            self.data.lock().await.remove(key);
            Ok(())
        }
    }

    fn store_with(backend: Arc<MemorySecureStore>) -> CredentialStore {
        CredentialStore::new(backend, ProviderKind::Google)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let backend = Arc::new(MemorySecureStore::default());
        let store = store_with(backend.clone());
        let record = CredentialRecord::new("access", "refresh", "someone@example.com", 3600);

        store.save(&record).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(record));
        assert!(backend.raw("google-oauth").await.is_some());
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let store = store_with(Arc::new(MemorySecureStore::default()));
        assert_eq!(store.load().await.unwrap(), None);
        assert!(!store.is_connected().await);
        assert_eq!(store.connected_email().await, None);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = store_with(Arc::new(MemorySecureStore::default()));
        store
            .save(&CredentialRecord::new("a1", "r1", "first@example.com", 3600))
            .await
            .unwrap();
        store
            .save(&CredentialRecord::new("a2", "r2", "second@example.com", 3600))
            .await
            .unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "a2");
        assert_eq!(loaded.account_email, "second@example.com");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = store_with(Arc::new(MemorySecureStore::default()));
        store
            .save(&CredentialRecord::new("a", "r", "e@example.com", 3600))
            .await
            .unwrap();

        store.delete().await.unwrap();
        store.delete().await.unwrap();
        assert!(!store.is_connected().await);
    }

    #[tokio::test]
    async fn test_empty_refresh_token_is_disconnected() {
        let store = store_with(Arc::new(MemorySecureStore::default()));
        store
            .save(&CredentialRecord::new("a", "", "e@example.com", 3600))
            .await
            .unwrap();

        assert!(store.load().await.unwrap().is_some());
        assert!(!store.is_connected().await);
        assert_eq!(store.connected_email().await, None);
    }

    #[tokio::test]
    async fn test_corrupted_record_is_deleted() {
        let backend = Arc::new(MemorySecureStore::default());
        backend.put_raw("google-oauth", b"{not json").await;
        let store = store_with(backend.clone());

        let result = store.load().await;
        assert!(matches!(result, Err(AuthError::StorageFailure(_))));
        assert!(backend.raw("google-oauth").await.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = store_with(Arc::new(MemorySecureStore::failing()));

        let saved = store
            .save(&CredentialRecord::new("a", "r", "e@example.com", 3600))
            .await;
        assert!(matches!(saved, Err(AuthError::StorageFailure(_))));
        assert!(matches!(store.delete().await, Err(AuthError::StorageFailure(_))));
        assert!(!store.is_connected().await);
    }

    #[tokio::test]
    async fn test_connected_email() {
        let store = store_with(Arc::new(MemorySecureStore::default()));
        store
            .save(&CredentialRecord::new("a", "r", "someone@example.com", 3600))
            .await
            .unwrap();
        assert_eq!(
            store.connected_email().await.as_deref(),
            Some("someone@example.com")
        );
    }
}
