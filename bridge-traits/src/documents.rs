//! Remote Document Capabilities
//!
//! Cloud collaborators consumed by the link subsystem. Each call receives the
//! HTTP client to use, which in practice is an authorized client that already
//! carries the user's credentials.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::http::HttpClient;

/// A document as reported by the remote provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub web_view_link: Option<String>,
}

/// Creates and lists cloud-hosted documents.
#[async_trait]
pub trait DocumentProvider: Send + Sync {
    /// Create an empty document named `name` of the given mime type and
    /// return the provider's record of it.
    async fn create_document(
        &self,
        client: &dyn HttpClient,
        name: &str,
        mime_type: &str,
    ) -> Result<RemoteDocument>;

    /// List documents matching the provider's document mime types.
    async fn list_documents(&self, client: &dyn HttpClient) -> Result<Vec<RemoteDocument>>;
}

/// A file attached to an outgoing message.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// An outgoing email.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    /// Sender address; the mailbox owner when absent.
    pub from: Option<String>,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

/// Summary of a message already in the user's mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub id: String,
    /// Header values; empty when the message carries none.
    pub subject: String,
    pub from: String,
    pub date: String,
    pub snippet: String,
}

/// Sends and lists messages in the user's mailbox.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send `message` and return the provider's message id.
    async fn send_message(
        &self,
        client: &dyn HttpClient,
        message: &OutgoingMessage,
    ) -> Result<String>;

    /// The most recent messages, at most `max_results` of them.
    async fn list_messages(
        &self,
        client: &dyn HttpClient,
        max_results: u32,
    ) -> Result<Vec<MailMessage>>;
}
