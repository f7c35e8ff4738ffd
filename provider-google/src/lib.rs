//! # Google Provider
//!
//! Drive and Gmail implementations of the remote document capabilities.
//!
//! - [`GoogleDriveConnector`] creates and lists Google documents
//! - [`GmailSender`] sends mail with attachments from the signed-in account
//!
//! Neither type holds credentials. Each call takes the HTTP client to use,
//! normally an authorized client from `core-auth`.

pub mod drive;
pub mod error;
pub mod gmail;
pub mod types;

pub use drive::{GoogleDriveConnector, DOCUMENT_MIME_TYPES};
pub use error::{GoogleError, Result};
pub use gmail::{build_raw_message, content_type_for, GmailSender};
