//! # Core Configuration Module
//!
//! Configuration for the cloud link core, built once at startup and passed
//! explicitly to every component that needs it.
//!
//! ## Overview
//!
//! `CoreConfig` is assembled with a builder that fails fast: the OAuth client
//! id and the database location are mandatory, and every host bridge must be
//! either injected or supplied by the desktop defaults.
//!
//! ## Bridges (desktop defaults under `desktop-shims`)
//!
//! - `HttpClient` - reqwest
//! - `SecureStore` - OS keyring, service name from [`CoreConfigBuilder::keyring_service`]
//! - `FileSystemAccess` - tokio fs
//! - `UrlOpener` - the `open` crate
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, OAuthClientSettings};
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/finder.db")
//!     .oauth(OAuthClientSettings::from_env()?)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Missing OAuth client settings
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/finder.db")
//!     .build()
//!     .expect("Should fail - missing OAuth client id");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{FileSystemAccess, HttpClient, SecureStore, UrlOpener};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CALLBACK_HOST: &str = "localhost";
pub const DEFAULT_CALLBACK_PORT: u16 = 8080;
pub const DEFAULT_CALLBACK_PATH: &str = "/auth/google/callback";
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_KEYRING_SERVICE: &str = "finder-link";

pub const CLIENT_ID_ENV: &str = "GOOGLE_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "GOOGLE_CLIENT_SECRET";

/// Scopes requested at login: Drive file access, Drive metadata, Gmail read
/// and send, and the account email.
pub const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive.file",
    "https://www.googleapis.com/auth/drive.metadata",
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Where the external reference database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    InMemory,
}

/// OAuth client registration and loopback listener settings.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthClientSettings {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub scopes: Vec<String>,
    pub callback_host: String,
    /// Port 0 lets the OS choose; the redirect URI then uses the bound port.
    pub callback_port: u16,
    pub callback_path: String,
    /// Upper bound on how long `wait_for_login` blocks.
    pub login_timeout: Duration,
}

impl OAuthClientSettings {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            callback_host: DEFAULT_CALLBACK_HOST.to_string(),
            callback_port: DEFAULT_CALLBACK_PORT,
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
        }
    }

    /// Reads `GOOGLE_CLIENT_ID` and the optional `GOOGLE_CLIENT_SECRET`.
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var(CLIENT_ID_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "{} is not set. Register an OAuth client and export its id.",
                    CLIENT_ID_ENV
                ))
            })?;

        let mut settings = Self::new(client_id);
        if let Ok(secret) = std::env::var(CLIENT_SECRET_ENV) {
            if !secret.trim().is_empty() {
                settings.client_secret = Some(secret);
            }
        }
        Ok(settings)
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_callback_host(mut self, host: impl Into<String>) -> Self {
        self.callback_host = host.into();
        self
    }

    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }

    pub fn with_callback_path(mut self, path: impl Into<String>) -> Self {
        self.callback_path = path.into();
        self
    }

    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// Redirect URI for a listener bound to `port`.
    pub fn redirect_uri(&self, port: u16) -> String {
        format!("http://{}:{}{}", self.callback_host, port, self.callback_path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Config("OAuth client id cannot be empty".to_string()));
        }
        if self.scopes.is_empty() {
            return Err(Error::Config(
                "At least one OAuth scope is required".to_string(),
            ));
        }
        if !self.callback_path.starts_with('/') {
            return Err(Error::Config(format!(
                "Callback path must start with '/': {}",
                self.callback_path
            )));
        }
        if self.login_timeout.is_zero() {
            return Err(Error::Config(
                "Login timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for OAuthClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClientSettings")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("scopes", &self.scopes)
            .field("callback_host", &self.callback_host)
            .field("callback_port", &self.callback_port)
            .field("callback_path", &self.callback_path)
            .field("login_timeout", &self.login_timeout)
            .finish()
    }
}

/// Core configuration for the cloud link subsystem.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    pub database: DatabaseLocation,
    pub oauth: OAuthClientSettings,
    pub keyring_service: String,
    pub event_buffer_size: usize,
    pub http_client: Arc<dyn HttpClient>,
    pub secure_store: Arc<dyn SecureStore>,
    pub file_system: Arc<dyn FileSystemAccess>,
    pub url_opener: Arc<dyn UrlOpener>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database", &self.database)
            .field("oauth", &self.oauth)
            .field("keyring_service", &self.keyring_service)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("http_client", &"HttpClient { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("url_opener", &"UrlOpener { ... }")
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if let DatabaseLocation::File(path) = &self.database {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Database path cannot be empty".to_string()));
            }
        }

        if self.keyring_service.trim().is_empty() {
            return Err(Error::Config(
                "Keyring service name cannot be empty".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        self.oauth.validate()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str, purpose: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required for {}. \
             Desktop: enable the 'desktop-shims' feature to use the default adapter. \
             Other hosts: inject a platform-native implementation.",
            capability, purpose
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    let client = bridge_desktop::ReqwestHttpClient::new()
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(capability_missing("HttpClient", "OAuth and Drive requests"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store(service: &str) -> Result<Arc<dyn SecureStore>> {
    Ok(Arc::new(bridge_desktop::KeyringSecureStore::with_service_name(
        service,
    )))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store(_service: &str) -> Result<Arc<dyn SecureStore>> {
    Err(capability_missing("SecureStore", "credential persistence"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Ok(Arc::new(bridge_desktop::TokioFileSystem::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(capability_missing("FileSystemAccess", "pointer file I/O"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_url_opener() -> Result<Arc<dyn UrlOpener>> {
    Ok(Arc::new(bridge_desktop::SystemUrlOpener::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_url_opener() -> Result<Arc<dyn UrlOpener>> {
    Err(capability_missing("UrlOpener", "opening documents and the login page"))
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database: Option<DatabaseLocation>,
    oauth: Option<OAuthClientSettings>,
    keyring_service: Option<String>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    url_opener: Option<Arc<dyn UrlOpener>>,
}

impl CoreConfigBuilder {
    /// Sets the SQLite database file.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database = Some(DatabaseLocation::File(path.into()));
        self
    }

    /// Uses a private in-memory database. Mappings do not survive the process.
    pub fn in_memory_database(mut self) -> Self {
        self.database = Some(DatabaseLocation::InMemory);
        self
    }

    pub fn oauth(mut self, settings: OAuthClientSettings) -> Self {
        self.oauth = Some(settings);
        self
    }

    /// Service name under which the default keyring store files secrets.
    ///
    /// Default: `finder-link`. Ignored when a secure store is injected.
    pub fn keyring_service(mut self, service: impl Into<String>) -> Self {
        self.keyring_service = Some(service.into());
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn url_opener(mut self, opener: Arc<dyn UrlOpener>) -> Self {
        self.url_opener = Some(opener);
        self
    }

    /// Builds the final `CoreConfig`.
    ///
    /// Fails if the database location or OAuth settings are missing, if a
    /// bridge is neither injected nor available as a desktop default, or if a
    /// value is out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let database = self.database.ok_or_else(|| {
            Error::Config(
                "Database location is required. Use .database_path() or .in_memory_database()."
                    .to_string(),
            )
        })?;

        let oauth = self.oauth.ok_or_else(|| {
            Error::Config(
                "OAuth client settings are required. Use .oauth(OAuthClientSettings::new(..))."
                    .to_string(),
            )
        })?;

        let keyring_service = self
            .keyring_service
            .unwrap_or_else(|| DEFAULT_KEYRING_SERVICE.to_string());

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store(&keyring_service)?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let url_opener = match self.url_opener {
            Some(opener) => opener,
            None => provide_default_url_opener()?,
        };

        let config = CoreConfig {
            database,
            oauth,
            keyring_service,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
            secure_store,
            file_system,
            url_opener,
        };

        config.validate()?;

        Ok(config)
    }
}
