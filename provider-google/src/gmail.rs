//! Gmail API message sending and listing
//!
//! Outgoing messages are rendered as `multipart/mixed` RFC 2822 text and
//! posted to `users.messages.send` in the `raw` field. Listing reads message
//! ids from `users.messages.list` and fetches each one's headers.

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use bridge_traits::documents::{MailMessage, MessageSender, OutgoingMessage};
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use chrono::Utc;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::GoogleError;
use crate::types::{
    api_error, GmailMessage, MessagesListResponse, SendMessageRequest, SentMessage,
};

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Fallback for attachments with an unknown extension.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const BASE64_LINE_WIDTH: usize = 76;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const METADATA_HEADERS: &[&str] = &["Subject", "From", "Date"];

/// Sends mail from the signed-in account.
#[derive(Debug, Clone)]
pub struct GmailSender {
    base_url: String,
}

impl GmailSender {
    pub fn new() -> Self {
        Self::with_base_url(GMAIL_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, client: &dyn HttpClient, url: String) -> Result<HttpResponse> {
        let request = HttpRequest::new(HttpMethod::Get, url)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT);

        let response = client.execute(request).await?;
        if !response.is_success() {
            let error = api_error(&response);
            warn!(status = response.status, error = %error, "Gmail request failed");
            return Err(error.into());
        }
        Ok(response)
    }

    async fn fetch_metadata(&self, client: &dyn HttpClient, id: &str) -> Result<MailMessage> {
        let headers: String = METADATA_HEADERS
            .iter()
            .map(|name| format!("&metadataHeaders={}", name))
            .collect();
        let url = format!(
            "{}/users/me/messages/{}?format=metadata{}",
            self.base_url,
            urlencoding::encode(id),
            headers
        );

        let response = self.get(client, url).await?;
        let message: GmailMessage = serde_json::from_slice(&response.body)
            .map_err(|e| GoogleError::ParseError(format!("Invalid message: {}", e)))?;
        Ok(message.into())
    }
}

impl Default for GmailSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSender for GmailSender {
    #[instrument(skip(self, client, message), fields(to = %message.to))]
    async fn send_message(
        &self,
        client: &dyn HttpClient,
        message: &OutgoingMessage,
    ) -> Result<String> {
        let raw = URL_SAFE.encode(build_raw_message(message, &new_boundary()));
        let request = HttpRequest::new(
            HttpMethod::Post,
            format!("{}/users/me/messages/send", self.base_url),
        )
        .header("Accept", "application/json")
        .json(&SendMessageRequest { raw })?
        .timeout(REQUEST_TIMEOUT);

        let response = client.execute(request).await?;
        if !response.is_success() {
            let error = api_error(&response);
            warn!(status = response.status, error = %error, "Gmail send failed");
            return Err(error.into());
        }

        let sent: SentMessage = serde_json::from_slice(&response.body)
            .map_err(|e| GoogleError::ParseError(format!("Invalid send response: {}", e)))?;

        info!(message_id = %sent.id, attachments = message.attachments.len(), "Message sent");
        Ok(sent.id)
    }

    /// Messages whose headers cannot be fetched are left out of the result.
    #[instrument(skip(self, client))]
    async fn list_messages(
        &self,
        client: &dyn HttpClient,
        max_results: u32,
    ) -> Result<Vec<MailMessage>> {
        let url = format!("{}/users/me/messages?maxResults={}", self.base_url, max_results);
        let response = self.get(client, url).await?;
        let listing: MessagesListResponse = serde_json::from_slice(&response.body)
            .map_err(|e| GoogleError::ParseError(format!("Invalid message list: {}", e)))?;

        let mut messages = Vec::with_capacity(listing.messages.len());
        for entry in &listing.messages {
            match self.fetch_metadata(client, &entry.id).await {
                Ok(message) => messages.push(message),
                Err(e) => warn!(message_id = %entry.id, error = %e, "Skipping unreadable message"),
            }
        }

        debug!(count = messages.len(), "Listed Gmail messages");
        Ok(messages)
    }
}

fn new_boundary() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("finder-link-{:x}", nanos)
}

/// Render `message` as RFC 2822 text with a `multipart/mixed` body.
///
/// The first part carries the plain-text body; each attachment follows as a
/// base64 part. The sender header is omitted when `from` is absent so the
/// mailbox owner's address is used.
pub fn build_raw_message(message: &OutgoingMessage, boundary: &str) -> String {
    let mut raw = String::new();

    if let Some(from) = &message.from {
        raw.push_str(&format!("From: {}\r\n", header_value(from)));
    }
    raw.push_str(&format!("To: {}\r\n", header_value(&message.to)));
    raw.push_str(&format!("Subject: {}\r\n", encode_subject(&message.subject)));
    raw.push_str("MIME-Version: 1.0\r\n");
    raw.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{}\"\r\n\r\n",
        boundary
    ));

    raw.push_str(&format!("--{}\r\n", boundary));
    raw.push_str("Content-Type: text/plain; charset=\"UTF-8\"\r\n");
    raw.push_str("Content-Transfer-Encoding: 8bit\r\n\r\n");
    raw.push_str(&message.body);
    raw.push_str("\r\n");

    for attachment in &message.attachments {
        let file_name = header_value(&attachment.file_name).replace('"', "'");
        raw.push_str(&format!("--{}\r\n", boundary));
        raw.push_str(&format!(
            "Content-Type: {}; name=\"{}\"\r\n",
            attachment.content_type, file_name
        ));
        raw.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{}\"\r\n",
            file_name
        ));
        raw.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
        raw.push_str(&wrap_base64(&STANDARD.encode(&attachment.data)));
    }

    raw.push_str(&format!("--{}--\r\n", boundary));
    raw
}

/// Content type for an attachment, by file extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("txt") => "text/plain",
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("ppt") => "application/vnd.ms-powerpoint",
        Some("pptx") => {
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        }
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("zip") => "application/zip",
        Some("mp3") => "audio/mpeg",
        Some("mp4") => "video/mp4",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("csv") => "text/csv",
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("go") => "text/x-go",
        Some("py") => "text/x-python",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

// Header values never span lines.
fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn encode_subject(subject: &str) -> String {
    let subject = header_value(subject);
    if subject.is_ascii() {
        subject
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(subject.as_bytes()))
    }
}

fn wrap_base64(encoded: &str) -> String {
    let capacity = encoded.len() + encoded.len() / BASE64_LINE_WIDTH * 2 + 2;
    let mut wrapped = String::with_capacity(capacity);
    for line in encoded.as_bytes().chunks(BASE64_LINE_WIDTH) {
        // base64 output is ASCII
        wrapped.push_str(&String::from_utf8_lossy(line));
        wrapped.push_str("\r\n");
    }
    wrapped
}
