//! Google Drive API connector
//!
//! Implements [`DocumentProvider`] against Drive API v3. Requests go through
//! the [`HttpClient`] handed to each call, normally an authorized client that
//! attaches the bearer token.

use async_trait::async_trait;
use bridge_traits::documents::{DocumentProvider, RemoteDocument};
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::GoogleError;
use crate::types::{api_error, CreateFileRequest, DriveFile, FilesListResponse};

/// Google Drive API base URL
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Mime types listed as documents.
pub const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/vnd.google-apps.document",
    "application/vnd.google-apps.spreadsheet",
    "application/vnd.google-apps.presentation",
];

const PAGE_SIZE: u32 = 100;

/// Fields requested for a created file
const FILE_FIELDS: &str = "id,name,mimeType,webViewLink";

/// Fields requested for a file listing
const LIST_FIELDS: &str = "files(id, name, mimeType, webViewLink)";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Google Drive API connector
///
/// # Example
///
/// ```ignore
/// use provider_google::GoogleDriveConnector;
/// use bridge_traits::documents::DocumentProvider;
///
/// let drive = GoogleDriveConnector::new();
/// let doc = drive
///     .create_document(&client, "Report", "application/vnd.google-apps.document")
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct GoogleDriveConnector {
    base_url: String,
}

impl GoogleDriveConnector {
    pub fn new() -> Self {
        Self::with_base_url(DRIVE_API_BASE)
    }

    /// Connector talking to another Drive-compatible endpoint.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `q` expression selecting the document mime types.
    fn document_query() -> String {
        DOCUMENT_MIME_TYPES
            .iter()
            .map(|mime| format!("mimeType='{}'", mime))
            .collect::<Vec<_>>()
            .join(" or ")
    }

    async fn send(&self, client: &dyn HttpClient, request: HttpRequest) -> Result<HttpResponse> {
        let response = client.execute(request).await?;

        if !response.is_success() {
            let error = api_error(&response);
            warn!(status = response.status, error = %error, "Drive request failed");
            return Err(error.into());
        }

        Ok(response)
    }
}

impl Default for GoogleDriveConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentProvider for GoogleDriveConnector {
    #[instrument(skip(self, client))]
    async fn create_document(
        &self,
        client: &dyn HttpClient,
        name: &str,
        mime_type: &str,
    ) -> Result<RemoteDocument> {
        let url = format!(
            "{}/files?fields={}",
            self.base_url,
            urlencoding::encode(FILE_FIELDS)
        );
        let request = HttpRequest::new(HttpMethod::Post, url)
            .header("Accept", "application/json")
            .json(&CreateFileRequest { name, mime_type })?
            .timeout(REQUEST_TIMEOUT);

        let response = self.send(client, request).await?;
        let file: DriveFile = serde_json::from_slice(&response.body)
            .map_err(|e| GoogleError::ParseError(format!("Invalid file resource: {}", e)))?;

        info!(file_id = %file.id, "Created Drive document");
        Ok(file.into())
    }

    #[instrument(skip(self, client))]
    async fn list_documents(&self, client: &dyn HttpClient) -> Result<Vec<RemoteDocument>> {
        let url = format!(
            "{}/files?q={}&fields={}&pageSize={}",
            self.base_url,
            urlencoding::encode(&Self::document_query()),
            urlencoding::encode(LIST_FIELDS),
            PAGE_SIZE
        );
        let request = HttpRequest::new(HttpMethod::Get, url)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT);

        let response = self.send(client, request).await?;
        let listing: FilesListResponse = serde_json::from_slice(&response.body)
            .map_err(|e| GoogleError::ParseError(format!("Invalid file list: {}", e)))?;

        debug!(count = listing.files.len(), "Listed Drive documents");
        Ok(listing.files.into_iter().map(RemoteDocument::from).collect())
    }
}
