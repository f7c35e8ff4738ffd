//! Loopback login controller.
//!
//! Runs the browser half of the authorization-code flow: a short-lived axum
//! listener on the configured callback address receives the provider's
//! redirect, verifies it, exchanges the code and persists the resulting
//! credential. At most one login is in flight per controller.
//!
//! ```no_run
//! use core_auth::{LoginController, OAuthConfig, OAuthFlowManager, CredentialStore, ProviderKind};
//! use core_runtime::config::OAuthClientSettings;
//! use std::sync::Arc;
//! # async fn example(
//! #     http: Arc<dyn bridge_traits::HttpClient>,
//! #     store: Arc<dyn bridge_traits::SecureStore>,
//! #     opener: &dyn bridge_traits::UrlOpener,
//! # ) -> core_auth::Result<()> {
//! let settings = OAuthClientSettings::from_env().expect("client id");
//! let config = OAuthConfig::from_settings(ProviderKind::Google, &settings);
//! let flow = OAuthFlowManager::new(config, http);
//! let credentials = CredentialStore::new(store, ProviderKind::Google);
//! let controller = LoginController::new(Arc::new(flow), credentials, settings);
//!
//! let email = controller.login(opener).await?;
//! # Ok(())
//! # }
//! ```

use crate::credential_store::CredentialStore;
use crate::error::{AuthError, Result};
use crate::oauth::{OAuthFlowManager, PkceVerifier};
use crate::types::{CredentialRecord, LoginPhase, UNKNOWN_EMAIL};
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use bridge_traits::opener::UrlOpener;
use core_runtime::config::OAuthClientSettings;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use core_runtime::logging::redact_if_sensitive;
use serde::Deserialize;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Returned by [`LoginController::start_login`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginStart {
    /// Consent URL to open in the user's browser.
    pub auth_url: String,
    /// Redirect URI the listener is serving, with the bound port.
    pub redirect_uri: String,
}

type Outcome = Result<String>;

pub struct LoginController {
    flow: Arc<OAuthFlowManager>,
    credentials: CredentialStore,
    settings: OAuthClientSettings,
    events: Option<EventBus>,
    session: Mutex<Option<LoginSession>>,
    phase: Arc<StdMutex<LoginPhase>>,
}

struct LoginSession {
    shutdown: CancellationToken,
    outcome: Option<oneshot::Receiver<Outcome>>,
    callback: Arc<CallbackState>,
}

/// Everything the callback handler needs; one per session.
struct CallbackState {
    flow: Arc<OAuthFlowManager>,
    credentials: CredentialStore,
    verifier: PkceVerifier,
    redirect_uri: String,
    sender: StdMutex<Option<oneshot::Sender<Outcome>>>,
    phase: Arc<StdMutex<LoginPhase>>,
    shutdown: CancellationToken,
    events: Option<EventBus>,
}

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl LoginController {
    pub fn new(
        flow: Arc<OAuthFlowManager>,
        credentials: CredentialStore,
        settings: OAuthClientSettings,
    ) -> Self {
        Self {
            flow,
            credentials,
            settings,
            events: None,
            session: Mutex::new(None),
            phase: Arc::new(StdMutex::new(LoginPhase::Idle)),
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn phase(&self) -> LoginPhase {
        read_phase(&self.phase)
    }

    /// Bind the callback listener and build the consent URL.
    ///
    /// Fails with [`AuthError::AlreadyInProgress`] while another login is
    /// listening. A session whose listener has already stopped is replaced.
    #[instrument(skip(self))]
    pub async fn start_login(&self) -> Result<LoginStart> {
        let mut session = self.session.lock().await;

        if let Some(existing) = session.as_ref() {
            if !existing.shutdown.is_cancelled() {
                return Err(AuthError::AlreadyInProgress);
            }
            debug!("Replacing finished login session");
        }

        let address = format!(
            "{}:{}",
            self.settings.callback_host, self.settings.callback_port
        );
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            warn!(address = %address, error = %e, "Failed to bind callback listener");
            AuthError::ListenerBindFailed {
                address: address.clone(),
                reason: e.to_string(),
            }
        })?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::ListenerBindFailed {
                address: address.clone(),
                reason: e.to_string(),
            })?
            .port();

        let redirect_uri = self.settings.redirect_uri(port);
        let (auth_url, verifier) = self.flow.build_auth_url(&redirect_uri)?;

        let (sender, receiver) = oneshot::channel();
        let shutdown = CancellationToken::new();
        let callback = Arc::new(CallbackState {
            flow: Arc::clone(&self.flow),
            credentials: self.credentials.clone(),
            verifier,
            redirect_uri: redirect_uri.clone(),
            sender: StdMutex::new(Some(sender)),
            phase: Arc::clone(&self.phase),
            shutdown: shutdown.clone(),
            events: self.events.clone(),
        });

        let router = Router::new()
            .route(&self.settings.callback_path, get(handle_callback))
            .with_state(Arc::clone(&callback));

        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(server_shutdown.cancelled_owned())
                .await
            {
                warn!(error = %e, "Callback listener failed");
            }
            debug!("Callback listener stopped");
        });

        *session = Some(LoginSession {
            shutdown,
            outcome: Some(receiver),
            callback,
        });
        write_phase(&self.phase, LoginPhase::Listening);

        info!(redirect_uri = %redirect_uri, "Login started");
        emit(
            &self.events,
            AuthEvent::LoginStarted {
                redirect_uri: redirect_uri.clone(),
            },
        );

        Ok(LoginStart {
            auth_url,
            redirect_uri,
        })
    }

    /// Wait for the callback of the current login.
    ///
    /// Returns the connected account's email. Gives up after the configured
    /// login timeout, stopping the listener.
    #[instrument(skip(self))]
    pub async fn wait_for_login(&self) -> Result<String> {
        let (receiver, callback) = {
            let mut session = self.session.lock().await;
            let active = session.as_mut().ok_or(AuthError::NoLoginInProgress)?;
            let receiver = active
                .outcome
                .take()
                .ok_or(AuthError::NoLoginInProgress)?;
            (receiver, Arc::clone(&active.callback))
        };

        let timeout = self.settings.login_timeout;
        let outcome = match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(AuthError::LoginCancelled),
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "Login timed out");
                emit(
                    &self.events,
                    AuthEvent::LoginFailed {
                        message: "Login timed out".to_string(),
                    },
                );
                Err(AuthError::LoginTimedOut(timeout.as_secs()))
            }
        };

        callback.shutdown.cancel();

        // stop_login may already have cleared or replaced the session
        let mut session = self.session.lock().await;
        let still_ours = session
            .as_ref()
            .is_some_and(|s| Arc::ptr_eq(&s.callback, &callback));
        if still_ours {
            *session = None;
            write_phase(&self.phase, LoginPhase::Completed);
        }

        outcome
    }

    /// Abort the current login, if any.
    ///
    /// Stops the listener and releases a pending [`wait_for_login`] with
    /// [`AuthError::LoginCancelled`]. Does nothing when idle.
    ///
    /// [`wait_for_login`]: Self::wait_for_login
    pub async fn stop_login(&self) {
        let session = self.session.lock().await.take();

        if let Some(session) = session {
            session.shutdown.cancel();
            if let Some(sender) = session.callback.take_sender() {
                let _ = sender.send(Err(AuthError::LoginCancelled));
            }
            info!("Login stopped");
        }

        write_phase(&self.phase, LoginPhase::Idle);
    }

    /// Start a login, open the consent page and wait for the outcome.
    pub async fn login(&self, opener: &dyn UrlOpener) -> Result<String> {
        let start = self.start_login().await?;

        if let Err(e) = opener.open_url(&start.auth_url) {
            warn!(error = %e, "Could not open browser; open the login URL manually");
            info!(url = %start.auth_url, "Login URL");
        }

        self.wait_for_login().await
    }
}

impl CallbackState {
    fn take_sender(&self) -> Option<oneshot::Sender<Outcome>> {
        self.sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Validate the redirect and, if it carries a code, finish the login.
    async fn complete(&self, params: CallbackParams) -> Outcome {
        if let Some(error) = params.error.filter(|e| !e.is_empty()) {
            return Err(AuthError::AuthorizationDenied(error));
        }

        if params.state.as_deref() != Some(self.verifier.state()) {
            return Err(AuthError::StateMismatch);
        }

        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::MissingCode)?;

        let grant = self
            .flow
            .exchange_code(&code, &self.redirect_uri, &self.verifier)
            .await?;

        let refresh_token = grant.refresh_token.ok_or_else(|| {
            AuthError::ExchangeFailed("Provider did not return a refresh token".to_string())
        })?;

        let email = match self.flow.fetch_account_email(&grant.access_token).await {
            Ok(email) => email,
            Err(e) => {
                warn!(error = %e, "Could not look up account email");
                UNKNOWN_EMAIL.to_string()
            }
        };

        // The waiter may have timed out or stopped the login during the exchange.
        if self.shutdown.is_cancelled() {
            warn!("Login ended before the exchange finished; discarding credential");
            return Err(AuthError::LoginCancelled);
        }

        let record =
            CredentialRecord::new(grant.access_token, refresh_token, &email, grant.expires_in);
        self.credentials.save(&record).await?;

        Ok(email)
    }
}

async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> Html<String> {
    // Only the first redirect counts.
    let Some(sender) = state.take_sender() else {
        debug!("Ignoring callback for a finished login");
        return Html(failure_page("This login has already been handled."));
    };

    let outcome = state.complete(params).await;
    // A cancelled session already handed its phase back to the controller.
    let abandoned = state.shutdown.is_cancelled();

    let page = match &outcome {
        Ok(email) => {
            write_phase(&state.phase, LoginPhase::CodeReceived);
            info!(email = %redact_if_sensitive("email", email), "Account connected");
            emit(
                &state.events,
                AuthEvent::SignedIn {
                    email: email.clone(),
                },
            );
            success_page()
        }
        Err(e) => {
            if !abandoned {
                write_phase(&state.phase, LoginPhase::ErrorReceived);
            }
            warn!(error = %e, "Login failed");
            emit(
                &state.events,
                AuthEvent::LoginFailed {
                    message: e.to_string(),
                },
            );
            failure_page(&e.browser_message())
        }
    };

    let _ = sender.send(outcome);
    state.shutdown.cancel();

    Html(page)
}

fn read_phase(phase: &StdMutex<LoginPhase>) -> LoginPhase {
    *phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_phase(phase: &StdMutex<LoginPhase>, value: LoginPhase) {
    *phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = value;
}

fn emit(events: &Option<EventBus>, event: AuthEvent) {
    if let Some(bus) = events {
        let _ = bus.emit(CoreEvent::Auth(event));
    }
}

fn success_page() -> String {
    page(
        "#4caf50",
        "Authentication Successful",
        "<p>You have successfully connected your Google account.</p>\
         <p>You can close this window now and return to the app.</p>",
    )
}

fn failure_page(message: &str) -> String {
    page(
        "#d32f2f",
        "Authentication Failed",
        &format!(
            "<p>{}</p><p>You can close this window now.</p>",
            escape_html(message)
        ),
    )
}

fn page(color: &str, title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body style=\"font-family: Arial, sans-serif; text-align: center; padding-top: 50px;\">\
         <h1 style=\"color: {color};\">{title}</h1>{body}</body></html>"
    )
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential_store::tests::MemorySecureStore;
    use crate::oauth::OAuthConfig;
    use crate::types::ProviderKind;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;
    use std::time::Duration;
    use url::Url;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    /// Token endpoint and userinfo both succeed.
    fn google_ok() -> MockHttpClient {
        let mut http = MockHttpClient::new();
        http.expect_execute().returning(|req| {
            if req.url.ends_with("/token") {
                Ok(response(
                    200,
                    r#"{"access_token":"ya29","refresh_token":"1//0g","expires_in":3599}"#,
                ))
            } else {
                Ok(response(200, r#"{"email":"someone@example.com"}"#))
            }
        });
        http
    }

    fn settings(timeout: Duration) -> OAuthClientSettings {
        OAuthClientSettings::new("test-client")
            .with_callback_host("127.0.0.1")
            .with_callback_port(0)
            .with_login_timeout(timeout)
    }

    fn controller_with(
        http: impl HttpClient + 'static,
        timeout: Duration,
    ) -> (LoginController, Arc<MemorySecureStore>) {
        let settings = settings(timeout);
        let flow = OAuthFlowManager::new(
            OAuthConfig::from_settings(ProviderKind::Google, &settings),
            Arc::new(http),
        );
        let backend = Arc::new(MemorySecureStore::default());
        let credentials = CredentialStore::new(backend.clone(), ProviderKind::Google);
        (
            LoginController::new(Arc::new(flow), credentials, settings),
            backend,
        )
    }

    fn query_param(url: &str, name: &str) -> String {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    async fn hit(redirect_uri: &str, query: &str) -> String {
        reqwest::get(format!("{}?{}", redirect_uri, query))
            .await
            .unwrap()
            .text()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_successful_login_persists_credential() {
        let (controller, backend) = controller_with(google_ok(), Duration::from_secs(5));

        let start = controller.start_login().await.unwrap();
        assert_eq!(controller.phase(), LoginPhase::Listening);
        assert!(start.redirect_uri.starts_with("http://127.0.0.1:"));
        assert!(start.redirect_uri.ends_with("/auth/google/callback"));
        assert_eq!(query_param(&start.auth_url, "redirect_uri"), start.redirect_uri);

        let state = query_param(&start.auth_url, "state");
        let page = hit(&start.redirect_uri, &format!("code=4%2F0Ab&state={}", state)).await;
        assert!(page.contains("Authentication Successful"));
        assert!(page.contains("You have successfully connected your Google account."));

        let email = controller.wait_for_login().await.unwrap();
        assert_eq!(email, "someone@example.com");
        assert_eq!(controller.phase(), LoginPhase::Completed);

        let stored: CredentialRecord =
            serde_json::from_slice(&backend.raw("google-oauth").await.unwrap()).unwrap();
        assert_eq!(stored.refresh_token, "1//0g");
        assert_eq!(stored.account_email, "someone@example.com");
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let (controller, _) = controller_with(MockHttpClient::new(), Duration::from_secs(5));

        controller.start_login().await.unwrap();
        assert!(matches!(
            controller.start_login().await,
            Err(AuthError::AlreadyInProgress)
        ));

        controller.stop_login().await;
        assert_eq!(controller.phase(), LoginPhase::Idle);
        controller.start_login().await.unwrap();
        controller.stop_login().await;
    }

    #[tokio::test]
    async fn test_provider_error_is_reported() {
        let (controller, backend) = controller_with(MockHttpClient::new(), Duration::from_secs(5));
        let start = controller.start_login().await.unwrap();

        let page = hit(&start.redirect_uri, "error=access_denied").await;
        assert!(page.contains("Authentication Failed"));
        assert!(page.contains("access_denied"));
        assert!(page.contains("You can close this window now."));
        assert_eq!(controller.phase(), LoginPhase::ErrorReceived);

        match controller.wait_for_login().await {
            Err(AuthError::AuthorizationDenied(reason)) => assert_eq!(reason, "access_denied"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(backend.raw("google-oauth").await.is_none());
    }

    #[tokio::test]
    async fn test_state_mismatch_is_rejected() {
        let (controller, backend) = controller_with(MockHttpClient::new(), Duration::from_secs(5));
        let start = controller.start_login().await.unwrap();

        let page = hit(&start.redirect_uri, "code=abc&state=forged").await;
        assert!(page.contains("Authentication Failed"));

        assert!(matches!(
            controller.wait_for_login().await,
            Err(AuthError::StateMismatch)
        ));
        assert!(backend.raw("google-oauth").await.is_none());
    }

    #[tokio::test]
    async fn test_missing_code() {
        let (controller, _) = controller_with(MockHttpClient::new(), Duration::from_secs(5));
        let start = controller.start_login().await.unwrap();
        let state = query_param(&start.auth_url, "state");

        let page = hit(&start.redirect_uri, &format!("state={}", state)).await;
        assert!(page.contains("No authorization code received"));
        assert!(matches!(
            controller.wait_for_login().await,
            Err(AuthError::MissingCode)
        ));
    }

    #[tokio::test]
    async fn test_missing_refresh_token_fails_exchange() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(200, r#"{"access_token":"ya29","expires_in":3599}"#)));
        let (controller, backend) = controller_with(http, Duration::from_secs(5));
        let start = controller.start_login().await.unwrap();
        let state = query_param(&start.auth_url, "state");

        hit(&start.redirect_uri, &format!("code=abc&state={}", state)).await;

        assert!(matches!(
            controller.wait_for_login().await,
            Err(AuthError::ExchangeFailed(_))
        ));
        assert!(backend.raw("google-oauth").await.is_none());
    }

    #[tokio::test]
    async fn test_email_lookup_failure_records_unknown() {
        let mut http = MockHttpClient::new();
        http.expect_execute().returning(|req| {
            if req.url.ends_with("/token") {
                Ok(response(200, r#"{"access_token":"a","refresh_token":"r"}"#))
            } else {
                Err(BridgeError::OperationFailed("offline".to_string()))
            }
        });
        let (controller, backend) = controller_with(http, Duration::from_secs(5));
        let start = controller.start_login().await.unwrap();
        let state = query_param(&start.auth_url, "state");

        hit(&start.redirect_uri, &format!("code=abc&state={}", state)).await;

        assert_eq!(controller.wait_for_login().await.unwrap(), UNKNOWN_EMAIL);
        let stored: CredentialRecord =
            serde_json::from_slice(&backend.raw("google-oauth").await.unwrap()).unwrap();
        assert_eq!(stored.account_email, "unknown");
    }

    #[tokio::test]
    async fn test_only_first_callback_counts() {
        let (controller, _) = controller_with(MockHttpClient::new(), Duration::from_secs(5));
        let start = controller.start_login().await.unwrap();

        let first = reqwest::get(format!("{}?error=access_denied", start.redirect_uri));
        let first = first.await.unwrap().text().await.unwrap();
        assert!(first.contains("access_denied"));

        // The listener may already be gone; if it still answers, it refuses.
        if let Ok(response) = reqwest::get(format!("{}?code=late", start.redirect_uri)).await {
            let page = response.text().await.unwrap();
            assert!(page.contains("already been handled"));
        }

        assert!(matches!(
            controller.wait_for_login().await,
            Err(AuthError::AuthorizationDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let (controller, _) = controller_with(MockHttpClient::new(), Duration::from_millis(100));
        controller.start_login().await.unwrap();

        assert!(matches!(
            controller.wait_for_login().await,
            Err(AuthError::LoginTimedOut(_))
        ));
        assert_eq!(controller.phase(), LoginPhase::Completed);

        // The listener is released, so a new login can start.
        controller.start_login().await.unwrap();
        controller.stop_login().await;
    }

    /// Token endpoint that answers only after `delay`.
    struct SlowTokenEndpoint {
        delay: Duration,
    }

    #[async_trait]
    impl HttpClient for SlowTokenEndpoint {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            if request.url.ends_with("/token") {
                tokio::time::sleep(self.delay).await;
                Ok(response(
                    200,
                    r#"{"access_token":"ya29","refresh_token":"1//0g","expires_in":3599}"#,
                ))
            } else {
                Ok(response(200, r#"{"email":"someone@example.com"}"#))
            }
        }
    }

    #[tokio::test]
    async fn test_timeout_during_exchange_discards_credential() {
        let http = SlowTokenEndpoint {
            delay: Duration::from_millis(800),
        };
        let (controller, backend) = controller_with(http, Duration::from_millis(300));
        let start = controller.start_login().await.unwrap();
        let state = query_param(&start.auth_url, "state");

        let callback = tokio::spawn(async move {
            // The listener may already be gone; only the stored state matters.
            let _ = reqwest::get(format!(
                "{}?code=4%2F0Ab&state={}",
                start.redirect_uri, state
            ))
            .await;
        });

        assert!(matches!(
            controller.wait_for_login().await,
            Err(AuthError::LoginTimedOut(_))
        ));
        callback.await.unwrap();

        assert!(backend.raw("google-oauth").await.is_none());
        assert_eq!(controller.phase(), LoginPhase::Completed);
    }

    #[tokio::test]
    async fn test_stop_releases_waiter() {
        let (controller, _) = controller_with(MockHttpClient::new(), Duration::from_secs(30));
        let controller = Arc::new(controller);
        controller.start_login().await.unwrap();

        let waiter = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.wait_for_login().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        controller.stop_login().await;
        controller.stop_login().await;

        assert!(matches!(
            waiter.await.unwrap(),
            Err(AuthError::LoginCancelled)
        ));
        assert_eq!(controller.phase(), LoginPhase::Idle);
    }

    #[tokio::test]
    async fn test_wait_without_login() {
        let (controller, _) = controller_with(MockHttpClient::new(), Duration::from_secs(1));
        assert!(matches!(
            controller.wait_for_login().await,
            Err(AuthError::NoLoginInProgress)
        ));
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = blocker.local_addr().unwrap().port();

        let settings = settings(Duration::from_secs(1)).with_callback_port(port);
        let flow = OAuthFlowManager::new(
            OAuthConfig::from_settings(ProviderKind::Google, &settings),
            Arc::new(MockHttpClient::new()),
        );
        let credentials =
            CredentialStore::new(Arc::new(MemorySecureStore::default()), ProviderKind::Google);
        let controller = LoginController::new(Arc::new(flow), credentials, settings);

        assert!(matches!(
            controller.start_login().await,
            Err(AuthError::ListenerBindFailed { .. })
        ));
        assert_eq!(controller.phase(), LoginPhase::Idle);
    }

    /// Plays the browser: follows the consent URL straight to the callback.
    struct ApprovingBrowser;

    impl UrlOpener for ApprovingBrowser {
        fn open_url(&self, url: &str) -> BridgeResult<()> {
            let redirect_uri = query_param(url, "redirect_uri");
            let state = query_param(url, "state");
            tokio::spawn(async move {
                let _ = reqwest::get(format!("{}?code=abc&state={}", redirect_uri, state)).await;
            });
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_login_opens_browser_and_waits() {
        let (controller, _) = controller_with(google_ok(), Duration::from_secs(5));
        let events = EventBus::new(16);
        let mut subscriber = events.subscribe();
        let controller = controller.with_events(events);

        let email = controller.login(&ApprovingBrowser).await.unwrap();
        assert_eq!(email, "someone@example.com");

        assert!(matches!(
            subscriber.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::LoginStarted { .. })
        ));
        assert_eq!(
            subscriber.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::SignedIn {
                email: "someone@example.com".to_string()
            })
        );
    }

    #[test]
    fn test_failure_page_escapes_message() {
        let page = failure_page("<script>alert(1)</script>");
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;"));
    }
}
