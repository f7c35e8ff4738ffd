//! Core service façade.
//!
//! [`LinkService`] wires the host bridges from a [`CoreConfig`] into the
//! login controller, the credential-backed client factory, the reference
//! store and the link orchestrator, and exposes the operations a desktop
//! shell calls. Desktop hosts enable the `desktop-shims` feature to get the
//! default bridges; other hosts inject their own through the config builder.
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, OAuthClientSettings};
//! use core_service::LinkService;
//!
//! let config = CoreConfig::builder()
//!     .database_path(data_dir.join("finder.db"))
//!     .oauth(OAuthClientSettings::from_env()?)
//!     .build()?;
//! let service = LinkService::new(config).await?;
//!
//! if !service.is_connected().await {
//!     service.login().await?;
//! }
//! let doc = service.create_linked_document(&workspace, "Report").await?;
//! service.open_linked_document(&doc.local_path).await?;
//! ```

pub mod error;
pub mod links;

pub use error::{CoreError, Result};
pub use core_runtime::config::{CoreConfig, OAuthClientSettings};
pub use links::{is_pointer_file, LinkOrchestrator, LinkedDocument, MAX_LISTED_MESSAGES};

use bridge_traits::documents::{DocumentProvider, MailMessage, MessageSender, RemoteDocument};
use bridge_traits::UrlOpener;
use core_auth::{
    AuthorizedClientFactory, CredentialStore, LoginController, LoginPhase, LoginStart,
    OAuthConfig, OAuthFlowManager, ProviderKind,
};
use core_library::{
    create_pool, DatabaseConfig, ExternalReference, SqliteExternalFileRepository,
};
use core_runtime::config::DatabaseLocation;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use provider_google::{GmailSender, GoogleDriveConnector};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::Receiver;
use tracing::{info, instrument};

/// Entry point for login, credential and linked-document operations.
pub struct LinkService {
    events: EventBus,
    credentials: CredentialStore,
    login: LoginController,
    links: LinkOrchestrator,
    url_opener: Arc<dyn UrlOpener>,
}

impl LinkService {
    /// Build the service with the Google Drive and Gmail providers.
    pub async fn new(config: CoreConfig) -> Result<Self> {
        Self::with_providers(
            config,
            Arc::new(GoogleDriveConnector::new()),
            Arc::new(GmailSender::new()),
        )
        .await
    }

    /// Build the service with explicit remote document collaborators.
    #[instrument(skip_all)]
    pub async fn with_providers(
        config: CoreConfig,
        documents: Arc<dyn DocumentProvider>,
        messages: Arc<dyn MessageSender>,
    ) -> Result<Self> {
        config.validate()?;

        let database = match &config.database {
            DatabaseLocation::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    config.file_system.create_dir_all(parent).await?;
                }
                DatabaseConfig::new(path)
            }
            DatabaseLocation::InMemory => DatabaseConfig::in_memory(),
        };
        let pool = create_pool(database).await?;

        let events = EventBus::new(config.event_buffer_size);
        let provider = ProviderKind::Google;
        let flow = Arc::new(OAuthFlowManager::new(
            OAuthConfig::from_settings(provider, &config.oauth),
            Arc::clone(&config.http_client),
        ));
        let credentials = CredentialStore::new(Arc::clone(&config.secure_store), provider);

        let login = LoginController::new(
            Arc::clone(&flow),
            credentials.clone(),
            config.oauth.clone(),
        )
        .with_events(events.clone());

        let clients = AuthorizedClientFactory::new(
            flow,
            credentials.clone(),
            Arc::clone(&config.http_client),
        )
        .with_events(events.clone());

        let links = LinkOrchestrator::new(
            clients,
            documents,
            messages,
            Arc::new(SqliteExternalFileRepository::new(pool)),
            Arc::clone(&config.file_system),
            Arc::clone(&config.url_opener),
        )
        .with_events(events.clone());

        info!(database = ?config.database, "Link service ready");

        Ok(Self {
            events,
            credentials,
            login,
            links,
            url_opener: config.url_opener,
        })
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // Login

    /// Start the loopback listener; the caller opens `auth_url` itself.
    pub async fn start_login(&self) -> Result<LoginStart> {
        Ok(self.login.start_login().await?)
    }

    /// Block until the running login finishes. Returns the account email.
    pub async fn wait_for_login(&self) -> Result<String> {
        Ok(self.login.wait_for_login().await?)
    }

    pub async fn stop_login(&self) {
        self.login.stop_login().await
    }

    /// Start a login, open the consent page with the host opener and wait.
    pub async fn login(&self) -> Result<String> {
        Ok(self.login.login(self.url_opener.as_ref()).await?)
    }

    pub fn login_phase(&self) -> LoginPhase {
        self.login.phase()
    }

    /// Forget the stored credential.
    pub async fn disconnect(&self) -> Result<()> {
        self.credentials.delete().await?;
        info!("Account disconnected");
        let _ = self.events.emit(CoreEvent::Auth(AuthEvent::SignedOut));
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.credentials.is_connected().await
    }

    pub async fn connected_email(&self) -> Option<String> {
        self.credentials.connected_email().await
    }

    // Linked documents

    pub async fn create_linked_document(
        &self,
        directory: &Path,
        name: &str,
    ) -> Result<LinkedDocument> {
        self.links.create_linked_document(directory, name).await
    }

    pub async fn open_linked_document(&self, path: &Path) -> Result<LinkedDocument> {
        self.links.open_linked_document(path).await
    }

    /// Remote id behind a pointer file.
    pub async fn resolve_linked_document(&self, path: &Path) -> Result<String> {
        Ok(self.links.resolve_linked_document(path).await?.remote_id)
    }

    pub async fn rename_linked_document(&self, from: &Path, to: &Path) -> Result<()> {
        self.links.rename_linked_document(from, to).await
    }

    pub async fn delete_linked_document(&self, path: &Path) -> Result<()> {
        self.links.delete_linked_document(path).await
    }

    pub async fn list_linked_documents(&self) -> Result<Vec<ExternalReference>> {
        self.links.list_linked_documents().await
    }

    pub async fn linked_document_count(&self) -> Result<i64> {
        self.links.linked_document_count().await
    }

    pub async fn list_remote_documents(&self) -> Result<Vec<RemoteDocument>> {
        self.links.list_remote_documents().await
    }

    /// Up to [`MAX_LISTED_MESSAGES`] recent messages from the connected mailbox.
    pub async fn list_messages(&self) -> Result<Vec<MailMessage>> {
        self.links.list_messages().await
    }

    pub async fn share_file_by_email(
        &self,
        path: &Path,
        recipient: &str,
        subject: Option<&str>,
        body: Option<&str>,
    ) -> Result<String> {
        self.links
            .share_file_by_email(path, recipient, subject, body)
            .await
    }

    pub fn is_pointer_file(path: &Path) -> bool {
        is_pointer_file(path)
    }
}
