use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Email recorded when the profile lookup after a successful exchange fails.
pub const UNKNOWN_EMAIL: &str = "unknown";

/// Identity providers the link core can authenticate against.
///
/// # Examples
///
/// ```
/// use core_auth::ProviderKind;
///
/// let provider = ProviderKind::Google;
/// assert_eq!(provider.display_name(), "Google");
/// assert_eq!(provider.credential_alias(), "google-oauth");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    Google,
}

impl ProviderKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Google => "Google",
        }
    }

    /// Identifier used in logs and callback paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
        }
    }

    /// User alias of this provider's entry in the secure store.
    pub fn credential_alias(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google-oauth",
        }
    }

    pub fn auth_url(&self) -> &'static str {
        match self {
            ProviderKind::Google => "https://accounts.google.com/o/oauth2/v2/auth",
        }
    }

    pub fn token_url(&self) -> &'static str {
        match self {
            ProviderKind::Google => "https://oauth2.googleapis.com/token",
        }
    }

    /// Profile endpoint returning the signed-in account's email.
    pub fn userinfo_url(&self) -> &'static str {
        match self {
            ProviderKind::Google => "https://www.googleapis.com/oauth2/v2/userinfo",
        }
    }

    /// Parse a provider kind from a string identifier
    ///
    /// ```
    /// use core_auth::ProviderKind;
    ///
    /// assert_eq!(ProviderKind::parse("Google"), Some(ProviderKind::Google));
    /// assert_eq!(ProviderKind::parse("dropbox"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "google" | "google_drive" => Some(ProviderKind::Google),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// The persisted credential for one provider.
///
/// Serialized as JSON into the secure store. A record whose refresh token is
/// empty is treated exactly like a missing record.
///
/// # Security
///
/// `Debug` redacts both tokens.
///
/// ```
/// use core_auth::CredentialRecord;
///
/// let record = CredentialRecord::new("ya29.a0", "1//0g", "someone@example.com", 3600);
/// assert!(record.is_connected());
/// assert!(!record.is_expired());
/// assert!(!format!("{:?}", record).contains("ya29"));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(rename = "email")]
    pub account_email: String,
    /// Unix seconds at which the access token stops being accepted.
    pub expires_at: i64,
}

impl CredentialRecord {
    /// Seconds before `expires_at` at which a token already counts as expired.
    pub const EXPIRY_BUFFER_SECS: i64 = 60;

    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        account_email: impl Into<String>,
        expires_in: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            account_email: account_email.into(),
            expires_at: Utc::now().timestamp() + expires_in,
        }
    }

    /// True iff the record carries a usable refresh token.
    pub fn is_connected(&self) -> bool {
        !self.refresh_token.trim().is_empty()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_with_buffer(Self::EXPIRY_BUFFER_SECS)
    }

    pub fn is_expired_with_buffer(&self, buffer_seconds: i64) -> bool {
        Utc::now().timestamp() >= self.expires_at - buffer_seconds
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("account_email", &self.account_email)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Observable state of the login controller.
///
/// `Idle → Listening → (CodeReceived | ErrorReceived) → Completed`. Stopping a
/// login returns the controller to `Idle` from any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginPhase {
    Idle,
    Listening,
    /// A code arrived and the exchange ran; the outcome awaits collection.
    CodeReceived,
    /// The callback carried an error or was malformed.
    ErrorReceived,
    /// The listener has stopped and the outcome was handed to the waiter.
    Completed,
}
