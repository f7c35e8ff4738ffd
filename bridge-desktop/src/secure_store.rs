//! Secure Credential Storage using OS Keychain

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use keyring::Entry;
use tracing::debug;

pub const DEFAULT_SERVICE_NAME: &str = "finder-link";

/// Keyring-based secure storage implementation
///
/// Each key becomes one keyring entry under this store's service name:
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: kernel keyutils
///
/// Values are stored as raw secret bytes.
pub struct KeyringSecureStore {
    service_name: String,
}

impl KeyringSecureStore {
    pub fn new() -> Self {
        Self::with_service_name(DEFAULT_SERVICE_NAME)
    }

    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn get_entry(&self, key: &str) -> std::result::Result<Entry, keyring::Error> {
        Entry::new(&self.service_name, key)
    }

    fn map_keyring_error(e: keyring::Error) -> BridgeError {
        BridgeError::OperationFailed(format!("Keyring error: {}", e))
    }
}

impl Default for KeyringSecureStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecureStore for KeyringSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        let entry = self.get_entry(key).map_err(Self::map_keyring_error)?;
        entry.set_secret(value).map_err(Self::map_keyring_error)?;

        debug!(service = %self.service_name, key, "Stored secret in keyring");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entry = self.get_entry(key).map_err(Self::map_keyring_error)?;

        match entry.get_secret() {
            Ok(secret) => {
                debug!(service = %self.service_name, key, "Retrieved secret from keyring");
                Ok(Some(secret))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service_name, key, "Secret not found in keyring");
                Ok(None)
            }
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        let entry = self.get_entry(key).map_err(Self::map_keyring_error)?;

        match entry.delete_credential() {
            Ok(()) => {
                debug!(service = %self.service_name, key, "Deleted secret from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service_name, key, "Secret already absent");
                Ok(())
            }
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_service_name() {
        let store = KeyringSecureStore::new();
        assert_eq!(store.service_name(), DEFAULT_SERVICE_NAME);
    }

    #[test]
    fn test_custom_service_name() {
        let store = KeyringSecureStore::with_service_name("test-service");
        assert_eq!(store.service_name(), "test-service");
    }

    #[tokio::test]
    async fn test_set_get_delete_secret() {
        // The platform keyring may be unavailable on headless CI machines.
        let store = KeyringSecureStore::with_service_name("finder-link-test");
        let key = "test-key-unique-7f3a";
        let value = br#"{"refresh_token":"r"}"#;

        let _ = store.delete_secret(key).await;

        match store.set_secret(key, value).await {
            Ok(()) => {
                if let Ok(Some(retrieved)) = store.get_secret(key).await {
                    assert_eq!(retrieved, value.to_vec());
                }
                store.delete_secret(key).await.unwrap();
                assert!(matches!(store.get_secret(key).await, Ok(None) | Err(_)));
            }
            Err(e) => println!("Keyring not available ({}), skipping test", e),
        }
    }

    #[tokio::test]
    async fn test_delete_missing_secret_is_ok() {
        let store = KeyringSecureStore::with_service_name("finder-link-test");
        if let Err(e) = store.delete_secret("never-written-key-91c2").await {
            println!("Keyring not available ({}), skipping test", e);
        }
    }
}
