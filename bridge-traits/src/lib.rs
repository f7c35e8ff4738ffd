//! # Host Bridge Traits
//!
//! Capability traits the link core requires from its host. Each trait is a
//! seam: the desktop crate ships real adapters, tests substitute fakes.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Single-attempt async HTTP
//!
//! ### Storage
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Pointer file I/O
//! - [`SecureStore`](storage::SecureStore) - Credential persistence (Keychain/keyring)
//!
//! ### Cloud collaborators
//! - [`DocumentProvider`](documents::DocumentProvider) - Create and list remote documents
//! - [`MessageSender`](documents::MessageSender) - Send mail with attachments
//!
//! ### Platform Integration
//! - [`UrlOpener`](opener::UrlOpener) - Dispatch a URL to the default handler
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with `CapabilityMissing` when a required bridge was not
//! injected at startup:
//!
//! ```ignore
//! let secure_store = config.secure_store.clone()
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "SecureStore".to_string(),
//!         message: "No secure store implementation provided.".to_string(),
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert platform errors into it and keep paths or keys in the message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so adapters can be shared across
//! async tasks behind `Arc`.

pub mod documents;
pub mod error;
pub mod http;
pub mod opener;
pub mod storage;

pub use error::BridgeError;

pub use documents::{
    Attachment, DocumentProvider, MailMessage, MessageSender, OutgoingMessage, RemoteDocument,
};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use opener::UrlOpener;
pub use storage::{FileSystemAccess, SecureStore};
