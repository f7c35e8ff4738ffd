//! OAuth 2.0 authorization-code flow with PKCE (RFC 6749, RFC 7636).
//!
//! [`OAuthFlowManager`] owns the protocol half of login:
//! - building the consent URL with an S256 challenge and a random state
//! - exchanging the returned code for tokens
//! - refreshing an access token
//! - looking up the signed-in account's email
//!
//! Every call is a single attempt; failures surface to the caller unchanged.
//! Tokens, codes and verifiers are never logged.
//!
//! ```no_run
//! use core_auth::oauth::{OAuthConfig, OAuthFlowManager};
//! use core_auth::ProviderKind;
//! use core_runtime::config::OAuthClientSettings;
//! use std::sync::Arc;
//!
//! # async fn example(http_client: Arc<dyn bridge_traits::HttpClient>) -> core_auth::Result<()> {
//! let settings = OAuthClientSettings::new("client-id.apps.googleusercontent.com");
//! let config = OAuthConfig::from_settings(ProviderKind::Google, &settings);
//! let manager = OAuthFlowManager::new(config, http_client);
//!
//! let redirect_uri = settings.redirect_uri(8080);
//! let (auth_url, verifier) = manager.build_auth_url(&redirect_uri)?;
//! // Send the user to auth_url, then with the code from the callback:
//! let grant = manager.exchange_code("4/0Ab...", &redirect_uri, &verifier).await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::ProviderKind;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use core_runtime::config::OAuthClientSettings;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Provider endpoints plus the registered client.
#[derive(Clone)]
pub struct OAuthConfig {
    pub provider: ProviderKind,
    pub client_id: String,
    /// Absent for public (installed-app) clients.
    pub client_secret: Option<String>,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl OAuthConfig {
    pub fn from_settings(provider: ProviderKind, settings: &OAuthClientSettings) -> Self {
        Self {
            provider,
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            scopes: settings.scopes.clone(),
            auth_url: provider.auth_url().to_string(),
            token_url: provider.token_url().to_string(),
            userinfo_url: provider.userinfo_url().to_string(),
        }
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("provider", &self.provider)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("scopes", &self.scopes)
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// PKCE code verifier and the CSRF state of one authorization request.
///
/// Only the challenge leaves the process before the exchange.
#[derive(Clone)]
pub struct PkceVerifier {
    verifier: String,
    state: String,
}

impl PkceVerifier {
    /// 32 random bytes of verifier and 16 of state, both base64url without padding.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();

        let mut verifier_bytes = [0u8; 32];
        rng.fill(&mut verifier_bytes);
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

        let mut state_bytes = [0u8; 16];
        rng.fill(&mut state_bytes);
        let state = URL_SAFE_NO_PAD.encode(state_bytes);

        Self { verifier, state }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// BASE64URL(SHA256(code_verifier))
    pub fn challenge(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

impl Default for PkceVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PkceVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceVerifier")
            .field("verifier", &"[REDACTED]")
            .field("state", &self.state)
            .finish()
    }
}

/// Tokens returned by the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Google only returns one on consent, or when it rotates the token.
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

pub struct OAuthFlowManager {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
}

impl OAuthFlowManager {
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the consent URL for `redirect_uri`.
    ///
    /// Returns the URL and the verifier that must be presented at exchange
    /// time. Offline access and a forced consent prompt are requested so the
    /// provider issues a refresh token on every login.
    #[instrument(skip(self), fields(provider = %self.config.provider))]
    pub fn build_auth_url(&self, redirect_uri: &str) -> Result<(String, PkceVerifier)> {
        let verifier = PkceVerifier::new();
        let challenge = verifier.challenge();

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::InvalidConfig(format!("Invalid auth URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", verifier.state())
            .append_pair("code_challenge", &challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        debug!("Built authorization URL");

        Ok((url.to_string(), verifier))
    }

    /// Exchange an authorization code for tokens.
    ///
    /// `redirect_uri` must be the one used to build the consent URL.
    #[instrument(skip(self, code, verifier), fields(provider = %self.config.provider))]
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        verifier: &PkceVerifier,
    ) -> Result<TokenGrant> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", verifier.verifier()),
        ];
        if let Some(secret) = &self.config.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        debug!("Exchanging authorization code for tokens");

        let response = self
            .post_token_request(&params)
            .await
            .map_err(AuthError::ExchangeFailed)?;

        let token_response: TokenResponse = response.json().map_err(|e| {
            AuthError::ExchangeFailed(format!("Failed to parse token response: {}", e))
        })?;

        info!(
            expires_in = token_response.expires_in,
            has_refresh_token = token_response.refresh_token.is_some(),
            "Exchanged authorization code for tokens"
        );

        Ok(token_response.into_grant())
    }

    /// Obtain a new access token with `refresh_token`.
    ///
    /// When the provider does not rotate the refresh token, the grant carries
    /// the one that was presented.
    #[instrument(skip(self, refresh_token), fields(provider = %self.config.provider))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(secret) = &self.config.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        debug!("Refreshing access token");

        let response = self
            .post_token_request(&params)
            .await
            .map_err(AuthError::ExchangeFailed)?;

        let token_response: TokenResponse = response.json().map_err(|e| {
            AuthError::ExchangeFailed(format!("Failed to parse refresh response: {}", e))
        })?;

        info!(
            expires_in = token_response.expires_in,
            rotated = token_response.refresh_token.is_some(),
            "Access token refreshed"
        );

        let mut grant = token_response.into_grant();
        if grant.refresh_token.is_none() {
            grant.refresh_token = Some(refresh_token.to_string());
        }
        Ok(grant)
    }

    /// Email of the account that owns `access_token`.
    #[instrument(skip(self, access_token), fields(provider = %self.config.provider))]
    pub async fn fetch_account_email(&self, access_token: &str) -> Result<String> {
        let request = HttpRequest::new(HttpMethod::Get, self.config.userinfo_url.clone())
            .bearer_token(access_token);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::Http(e.to_string()))?;

        if !response.is_success() {
            return Err(AuthError::Http(format!(
                "Userinfo endpoint returned {}",
                response.status
            )));
        }

        let info: UserInfo = response
            .json()
            .map_err(|e| AuthError::Http(format!("Failed to parse userinfo: {}", e)))?;

        info.email
            .filter(|email| !email.is_empty())
            .ok_or_else(|| AuthError::Http("Userinfo response has no email".to_string()))
    }

    /// POST a form to the token endpoint; non-2xx becomes `Err(message)`.
    async fn post_token_request(
        &self,
        params: &[(&str, &str)],
    ) -> std::result::Result<HttpResponse, String> {
        let encoded = serde_urlencoded::to_string(params)
            .map_err(|e| format!("Failed to encode token request: {}", e))?;

        let request =
            HttpRequest::new(HttpMethod::Post, self.config.token_url.clone()).form(encoded);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| e.to_string())?;

        if !response.is_success() {
            let status = response.status;
            let error_body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            warn!(status = status, error = %error_body, "Token endpoint rejected the request");

            return Err(format!("Token endpoint returned {}: {}", status, error_body));
        }

        Ok(response)
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
}

impl TokenResponse {
    fn into_grant(self) -> TokenGrant {
        TokenGrant {
            access_token: self.access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            expires_in: self.expires_in,
        }
    }
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    email: Option<String>,
}
