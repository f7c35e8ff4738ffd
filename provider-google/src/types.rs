//! Google Drive and Gmail API payload types.

use bridge_traits::documents::{MailMessage, RemoteDocument};
use bridge_traits::http::HttpResponse;
use serde::{Deserialize, Serialize};

use crate::error::GoogleError;

/// Drive API v3 file resource, restricted to the requested fields.
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub mime_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
}

impl From<DriveFile> for RemoteDocument {
    fn from(file: DriveFile) -> Self {
        RemoteDocument {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            web_view_link: file.web_view_link,
        }
    }
}

/// files.create metadata body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileRequest<'a> {
    pub name: &'a str,
    pub mime_type: &'a str,
}

/// files.list response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,

    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// users.messages.send body
#[derive(Debug, Serialize)]
pub struct SendMessageRequest {
    /// RFC 2822 message, base64url encoded.
    pub raw: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// users.messages.list response
#[derive(Debug, Deserialize)]
pub struct MessagesListResponse {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
pub struct MessageRef {
    pub id: String,
}

/// users.messages.get in `metadata` format
#[derive(Debug, Deserialize)]
pub struct GmailMessage {
    pub id: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub payload: Option<MessagePayload>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub headers: Vec<MessageHeader>,
}

#[derive(Debug, Deserialize)]
pub struct MessageHeader {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl GmailMessage {
    /// First header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> &str {
        self.payload
            .iter()
            .flat_map(|payload| payload.headers.iter())
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
            .unwrap_or_default()
    }
}

impl From<GmailMessage> for MailMessage {
    fn from(message: GmailMessage) -> Self {
        MailMessage {
            subject: message.header("Subject").to_string(),
            from: message.header("From").to_string(),
            date: message.header("Date").to_string(),
            id: message.id,
            snippet: message.snippet,
        }
    }
}

/// Google's JSON error envelope.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Turn a non-success response into [`GoogleError::ApiError`], preferring the
/// message from Google's error envelope over the raw body.
pub(crate) fn api_error(response: &HttpResponse) -> GoogleError {
    let message = response
        .json::<ErrorEnvelope>()
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.is_empty())
        .or_else(|| response.text().ok())
        .unwrap_or_else(|| "Unable to read error response".to_string());

    GoogleError::ApiError {
        status_code: response.status,
        message,
    }
}
