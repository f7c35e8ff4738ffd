//! Authenticated HTTP access for remote API calls.
//!
//! [`AuthorizedClientFactory::get_client`] turns the stored credential into an
//! [`AuthorizedClient`], an [`HttpClient`] that attaches a bearer token to every
//! request. An access token inside the expiry buffer is refreshed on first use
//! and the new credential is written back before the request goes out.

use crate::credential_store::CredentialStore;
use crate::error::{AuthError, Result};
use crate::oauth::OAuthFlowManager;
use crate::types::CredentialRecord;
use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

#[derive(Clone)]
pub struct AuthorizedClientFactory {
    flow: Arc<OAuthFlowManager>,
    credentials: CredentialStore,
    http_client: Arc<dyn HttpClient>,
    events: Option<EventBus>,
}

impl AuthorizedClientFactory {
    pub fn new(
        flow: Arc<OAuthFlowManager>,
        credentials: CredentialStore,
        http_client: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            flow,
            credentials,
            http_client,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Client for the stored credential.
    ///
    /// Fails with [`AuthError::NotConnected`] when no credential is stored or
    /// its refresh token is empty.
    #[instrument(skip(self))]
    pub async fn get_client(&self) -> Result<AuthorizedClient> {
        let record = self
            .credentials
            .load()
            .await?
            .filter(CredentialRecord::is_connected)
            .ok_or(AuthError::NotConnected)?;

        debug!(expires_at = record.expires_at, "Authorized client ready");

        Ok(AuthorizedClient {
            inner: Arc::clone(&self.http_client),
            flow: Arc::clone(&self.flow),
            credentials: self.credentials.clone(),
            events: self.events.clone(),
            record: Mutex::new(record),
        })
    }
}

pub struct AuthorizedClient {
    inner: Arc<dyn HttpClient>,
    flow: Arc<OAuthFlowManager>,
    credentials: CredentialStore,
    events: Option<EventBus>,
    record: Mutex<CredentialRecord>,
}

impl AuthorizedClient {
    pub async fn account_email(&self) -> String {
        self.record.lock().await.account_email.clone()
    }

    /// A valid access token, refreshing and persisting first if needed.
    pub async fn access_token(&self) -> Result<String> {
        let mut record = self.record.lock().await;

        if record.is_expired() {
            debug!(expires_at = record.expires_at, "Access token expired, refreshing");

            let grant = self.flow.refresh_access_token(&record.refresh_token).await?;
            let refresh_token = grant
                .refresh_token
                .unwrap_or_else(|| record.refresh_token.clone());
            let refreshed = CredentialRecord::new(
                grant.access_token,
                refresh_token,
                record.account_email.clone(),
                grant.expires_in,
            );

            self.credentials.save(&refreshed).await?;
            info!(expires_at = refreshed.expires_at, "Access token refreshed");

            if let Some(bus) = &self.events {
                let _ = bus.emit(CoreEvent::Auth(AuthEvent::TokenRefreshed {
                    expires_at: refreshed.expires_at,
                }));
            }

            *record = refreshed;
        }

        Ok(record.access_token.clone())
    }
}

#[async_trait]
impl HttpClient for AuthorizedClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let token = self.access_token().await.map_err(|e| {
            warn!(error = %e, "Could not authorize request");
            BridgeError::NotAvailable(format!("Authorization failed: {}", e))
        })?;

        self.inner.execute(request.bearer_token(token)).await
    }
}
