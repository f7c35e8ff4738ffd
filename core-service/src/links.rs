//! Linked documents: local `.goox` pointer files backed by remote documents.
//!
//! Two stores describe a link. The pointer file holds the remote id and is
//! authoritative; the reference row is a lookup cache. Creation touches them
//! in a fixed order (remote, file, row) so a failed remote call leaves nothing
//! behind, and resolution falls back to the file when the row is missing.

use bridge_traits::documents::{
    Attachment, DocumentProvider, MailMessage, MessageSender, OutgoingMessage, RemoteDocument,
};
use bridge_traits::storage::FileSystemAccess;
use bridge_traits::UrlOpener;
use bytes::Bytes;
use core_auth::{AuthorizedClientFactory, UNKNOWN_EMAIL};
use core_library::{ExternalFileRepository, ExternalReference, ResourceType};
use core_runtime::events::{CoreEvent, EventBus, LinkEvent};
use core_runtime::logging::{redact_if_sensitive, strip_path};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{CoreError, Result};

/// Upper bound on messages returned by a mailbox listing.
pub const MAX_LISTED_MESSAGES: u32 = 50;

/// A pointer file and the remote document it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedDocument {
    pub local_path: PathBuf,
    pub remote_id: String,
    pub resource_type: ResourceType,
    pub url: String,
}

impl LinkedDocument {
    fn new(local_path: PathBuf, resource_type: ResourceType, remote_id: String) -> Self {
        let url = resource_type.url_for(&remote_id);
        Self {
            local_path,
            remote_id,
            resource_type,
            url,
        }
    }
}

/// True if `path` carries a pointer file extension.
pub fn is_pointer_file(path: &Path) -> bool {
    ResourceType::from_path(path).is_some()
}

pub struct LinkOrchestrator {
    clients: AuthorizedClientFactory,
    documents: Arc<dyn DocumentProvider>,
    messages: Arc<dyn MessageSender>,
    references: Arc<dyn ExternalFileRepository>,
    file_system: Arc<dyn FileSystemAccess>,
    url_opener: Arc<dyn UrlOpener>,
    events: Option<EventBus>,
}

impl LinkOrchestrator {
    pub fn new(
        clients: AuthorizedClientFactory,
        documents: Arc<dyn DocumentProvider>,
        messages: Arc<dyn MessageSender>,
        references: Arc<dyn ExternalFileRepository>,
        file_system: Arc<dyn FileSystemAccess>,
        url_opener: Arc<dyn UrlOpener>,
    ) -> Self {
        Self {
            clients,
            documents,
            messages,
            references,
            file_system,
            url_opener,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Create a Google document named `name` and link it as
    /// `directory/name.goox`.
    ///
    /// The remote document is created first; if that fails nothing is written
    /// locally. If the reference row cannot be inserted afterwards, the pointer
    /// file stays in place and still resolves through its content.
    #[instrument(skip(self), fields(directory = %directory.display()))]
    pub async fn create_linked_document(
        &self,
        directory: &Path,
        name: &str,
    ) -> Result<LinkedDocument> {
        let resource_type = ResourceType::GoogleDoc;
        validate_name(name)?;

        let local_path = directory.join(format!("{}.{}", name, resource_type.extension()));
        let path_key = path_key(&local_path);
        if self.file_system.exists(&local_path).await? {
            return Err(CoreError::DuplicatePath(path_key));
        }

        let client = self.clients.get_client().await?;

        let document = self
            .documents
            .create_document(&client, name, resource_type.mime_type())
            .await
            .map_err(|e| {
                warn!(error = %e, "Remote create failed");
                CoreError::RemoteCreateFailed(e.to_string())
            })?;

        self.file_system
            .write_file(&local_path, Bytes::from(document.id.clone()))
            .await?;

        // The pointer did not exist, so any row still keyed by this path is stale.
        let recorded = match self.references.remove(&path_key).await {
            Ok(()) => {
                self.references
                    .add(resource_type, &path_key, &document.id)
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = recorded {
            warn!(
                error = %e,
                path = %path_key,
                "Pointer file written but its mapping was not recorded"
            );
            return Err(e.into());
        }

        info!(
            file = %strip_path(&path_key),
            remote_id = %document.id,
            "Linked document created"
        );
        self.emit(LinkEvent::Created {
            path: path_key,
            remote_id: document.id.clone(),
        });

        Ok(LinkedDocument::new(local_path, resource_type, document.id))
    }

    /// Resolve the remote document behind a pointer file.
    ///
    /// Uses the reference row when present, else the trimmed file content.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn resolve_linked_document(&self, path: &Path) -> Result<LinkedDocument> {
        let key = path_key(path);

        match self.references.get_by_path(&key).await {
            Ok(Some(reference)) => {
                debug!(remote_id = %reference.remote_id, "Resolved from reference store");
                return Ok(LinkedDocument::new(
                    path.to_path_buf(),
                    reference.resource_type,
                    reference.remote_id,
                ));
            }
            Ok(None) => debug!("No mapping; reading pointer file"),
            Err(e) => warn!(error = %e, "Reference lookup failed; reading pointer file"),
        }

        let resource_type = ResourceType::from_path(path).unwrap_or(ResourceType::GoogleDoc);
        match self.file_system.read_file(path).await {
            Ok(content) => {
                let remote_id = String::from_utf8_lossy(&content).trim().to_string();
                if !remote_id.is_empty() {
                    debug!(remote_id = %remote_id, "Resolved from pointer file");
                    return Ok(LinkedDocument::new(
                        path.to_path_buf(),
                        resource_type,
                        remote_id,
                    ));
                }
                debug!("Pointer file is empty");
            }
            Err(e) => debug!(error = %e, "Pointer file unreadable"),
        }

        Err(CoreError::UnresolvedReference(key))
    }

    /// Resolve a pointer file and open its document in the browser.
    pub async fn open_linked_document(&self, path: &Path) -> Result<LinkedDocument> {
        let document = self.resolve_linked_document(path).await?;
        self.url_opener.open_url(&document.url)?;
        info!(url = %document.url, "Opened linked document");
        Ok(document)
    }

    /// Rename or move a pointer file and carry its mapping along.
    #[instrument(skip(self), fields(from = %from.display(), to = %to.display()))]
    pub async fn rename_linked_document(&self, from: &Path, to: &Path) -> Result<()> {
        self.file_system.rename(from, to).await?;

        let (old_key, new_key) = (path_key(from), path_key(to));
        if old_key != new_key {
            // The file at the destination was replaced, so its row is stale.
            self.references.remove(&new_key).await?;
        }
        self.references.update_path(&old_key, &new_key).await?;

        info!(file = %strip_path(&new_key), "Linked document renamed");
        self.emit(LinkEvent::Renamed {
            from: old_key,
            to: new_key,
        });
        Ok(())
    }

    /// Delete a pointer file and its mapping. A file already gone is fine.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn delete_linked_document(&self, path: &Path) -> Result<()> {
        if let Err(e) = self.file_system.delete_file(path).await {
            if !e.is_not_found() {
                return Err(e.into());
            }
            debug!("Pointer file already removed");
        }

        let key = path_key(path);
        self.references.remove(&key).await?;

        info!(file = %strip_path(&key), "Linked document removed");
        self.emit(LinkEvent::Removed { path: key });
        Ok(())
    }

    /// Every recorded mapping, newest first.
    pub async fn list_linked_documents(&self) -> Result<Vec<ExternalReference>> {
        let mut references = Vec::new();
        for resource_type in ResourceType::ALL {
            references.extend(self.references.list_by_type(*resource_type).await?);
        }
        references.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(references)
    }

    /// Number of recorded mappings across every resource type.
    pub async fn linked_document_count(&self) -> Result<i64> {
        let mut total = 0;
        for resource_type in ResourceType::ALL {
            total += self.references.count_by_type(*resource_type).await?;
        }
        Ok(total)
    }

    /// Documents, spreadsheets and presentations in the connected Drive.
    #[instrument(skip(self))]
    pub async fn list_remote_documents(&self) -> Result<Vec<RemoteDocument>> {
        let client = self.clients.get_client().await?;
        Ok(self.documents.list_documents(&client).await?)
    }

    /// Email a local file as an attachment from the connected account.
    ///
    /// Returns the provider's message id.
    #[instrument(skip(self, subject, body), fields(path = %path.display()))]
    pub async fn share_file_by_email(
        &self,
        path: &Path,
        recipient: &str,
        subject: Option<&str>,
        body: Option<&str>,
    ) -> Result<String> {
        if recipient.trim().is_empty() || !recipient.contains('@') {
            return Err(CoreError::InvalidInput(format!(
                "'{}' is not an email address",
                recipient
            )));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                CoreError::InvalidInput(format!("{} does not name a file", path.display()))
            })?;

        let client = self.clients.get_client().await?;
        let data = self.file_system.read_file(path).await?;

        let sender = client.account_email().await;
        let message = OutgoingMessage {
            from: (sender != UNKNOWN_EMAIL).then_some(sender),
            to: recipient.trim().to_string(),
            subject: subject
                .map(str::to_string)
                .unwrap_or_else(|| format!("Shared file: {}", file_name)),
            body: body
                .map(str::to_string)
                .unwrap_or_else(|| format!("I'm sharing the file '{}' with you.", file_name)),
            attachments: vec![Attachment {
                content_type: provider_google::content_type_for(&file_name).to_string(),
                file_name,
                data,
            }],
        };

        let message_id = self.messages.send_message(&client, &message).await?;
        info!(
            message_id = %message_id,
            recipient = %redact_if_sensitive("email", &message.to),
            "File shared by email"
        );
        Ok(message_id)
    }

    /// Recent messages in the connected mailbox, newest first.
    #[instrument(skip(self))]
    pub async fn list_messages(&self) -> Result<Vec<MailMessage>> {
        let client = self.clients.get_client().await?;
        Ok(self
            .messages
            .list_messages(&client, MAX_LISTED_MESSAGES)
            .await?)
    }

    fn emit(&self, event: LinkEvent) {
        if let Some(bus) = &self.events {
            let _ = bus.emit(CoreEvent::Link(event));
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CoreError::InvalidInput(
            "Document name cannot be empty".to_string(),
        ));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(CoreError::InvalidInput(format!(
            "Document name '{}' must not contain path separators",
            name
        )));
    }
    Ok(())
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
