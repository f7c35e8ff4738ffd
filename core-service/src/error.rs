use bridge_traits::BridgeError;
use core_auth::AuthError;
use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Authentication error: {0}")]
    Auth(AuthError),

    #[error("Library error: {0}")]
    Library(LibraryError),

    #[error("Provider error: {0}")]
    Provider(#[from] provider_google::GoogleError),

    #[error("Host bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("No account connected")]
    NotConnected,

    /// Neither the reference store nor the pointer file yielded a remote id.
    #[error("Could not resolve a remote document for {0}")]
    UnresolvedReference(String),

    #[error("Remote document creation failed: {0}")]
    RemoteCreateFailed(String),

    /// Credential or reference store I/O failed.
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Path is already linked: {0}")]
    DuplicatePath(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),
}

impl From<AuthError> for CoreError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::NotConnected => CoreError::NotConnected,
            AuthError::StorageFailure(message) => CoreError::StorageFailure(message),
            other => CoreError::Auth(other),
        }
    }
}

impl From<LibraryError> for CoreError {
    fn from(error: LibraryError) -> Self {
        match error {
            LibraryError::DuplicatePath(path) => CoreError::DuplicatePath(path),
            LibraryError::Database(e) => CoreError::StorageFailure(e.to_string()),
            other => CoreError::Library(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
