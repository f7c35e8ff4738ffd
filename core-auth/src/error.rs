use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("A login is already in progress")]
    AlreadyInProgress,

    #[error("Failed to bind login callback listener on {address}: {reason}")]
    ListenerBindFailed { address: String, reason: String },

    #[error("Authorization denied by provider: {0}")]
    AuthorizationDenied(String),

    #[error("Callback did not include an authorization code")]
    MissingCode,

    #[error("Callback state did not match the login request")]
    StateMismatch,

    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("No account connected")]
    NotConnected,

    #[error("Credential storage failure: {0}")]
    StorageFailure(String),

    #[error("Login was not completed within {0} seconds")]
    LoginTimedOut(u64),

    #[error("Login was cancelled")]
    LoginCancelled,

    #[error("No login in progress")]
    NoLoginInProgress,

    #[error("Invalid OAuth configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl AuthError {
    /// Message shown on the browser failure page.
    pub fn browser_message(&self) -> String {
        match self {
            AuthError::AuthorizationDenied(reason) => format!("Authorization failed: {}", reason),
            AuthError::MissingCode => "No authorization code received".to_string(),
            AuthError::StateMismatch => "Login request could not be verified".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
