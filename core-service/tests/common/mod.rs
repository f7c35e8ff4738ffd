//! Fakes shared by the service integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::documents::{
    DocumentProvider, MailMessage, MessageSender, OutgoingMessage, RemoteDocument,
};
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::{SecureStore, UrlOpener};
use bytes::Bytes;
use core_auth::{CredentialRecord, CredentialStore, ProviderKind};
use core_runtime::config::{CoreConfig, OAuthClientSettings};
use core_service::LinkService;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct MemorySecureStore {
    values: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Answers the token and userinfo endpoints like Google would.
pub struct FakeGoogleHttp {
    pub email: String,
}

#[async_trait]
impl HttpClient for FakeGoogleHttp {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let body = if request.url.ends_with("/token") {
            r#"{"access_token":"ya29.test","refresh_token":"1//refresh","expires_in":3599,"token_type":"Bearer"}"#.to_string()
        } else if request.url.contains("userinfo") {
            format!(r#"{{"email":"{}"}}"#, self.email)
        } else {
            return Err(BridgeError::NotAvailable(request.url));
        };

        Ok(HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(body),
        })
    }
}

/// Document provider whose create result is scripted per test.
#[derive(Default)]
pub struct ScriptedDrive {
    pub next_id: Mutex<Option<String>>,
    pub created: Mutex<Vec<String>>,
}

impl ScriptedDrive {
    pub fn returning(id: &str) -> Self {
        Self {
            next_id: Mutex::new(Some(id.to_string())),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentProvider for ScriptedDrive {
    async fn create_document(
        &self,
        _client: &dyn HttpClient,
        name: &str,
        mime_type: &str,
    ) -> Result<RemoteDocument> {
        let id = self
            .next_id
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| BridgeError::OperationFailed("connection reset".to_string()))?;
        self.created.lock().unwrap().push(name.to_string());
        Ok(RemoteDocument {
            id,
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            web_view_link: None,
        })
    }

    async fn list_documents(&self, _client: &dyn HttpClient) -> Result<Vec<RemoteDocument>> {
        Ok(Vec::new())
    }
}

pub struct NoMail;

#[async_trait]
impl MessageSender for NoMail {
    async fn send_message(
        &self,
        _client: &dyn HttpClient,
        _message: &OutgoingMessage,
    ) -> Result<String> {
        Err(BridgeError::NotAvailable("mail".to_string()))
    }

    async fn list_messages(
        &self,
        _client: &dyn HttpClient,
        _max_results: u32,
    ) -> Result<Vec<MailMessage>> {
        Err(BridgeError::NotAvailable("mail".to_string()))
    }
}

#[derive(Default)]
pub struct RecordingOpener {
    pub opened: Mutex<Vec<String>>,
}

impl UrlOpener for RecordingOpener {
    fn open_url(&self, url: &str) -> Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

pub struct TestService {
    pub service: LinkService,
    pub secure_store: Arc<MemorySecureStore>,
    pub opener: Arc<RecordingOpener>,
    pub drive: Arc<ScriptedDrive>,
}

/// Service over a database file in `data_dir` with an ephemeral login port.
pub async fn service_in(data_dir: &Path, drive: ScriptedDrive) -> TestService {
    let secure_store = Arc::new(MemorySecureStore::default());
    let opener = Arc::new(RecordingOpener::default());
    let drive = Arc::new(drive);

    let config = CoreConfig::builder()
        .database_path(data_dir.join("state").join("finder.db"))
        .oauth(
            OAuthClientSettings::new("test-client")
                .with_callback_host("127.0.0.1")
                .with_callback_port(0),
        )
        .http_client(Arc::new(FakeGoogleHttp {
            email: "owner@example.com".to_string(),
        }))
        .secure_store(secure_store.clone())
        .file_system(Arc::new(bridge_desktop::TokioFileSystem::new()))
        .url_opener(opener.clone())
        .build()
        .unwrap();

    let service = LinkService::with_providers(config, drive.clone(), Arc::new(NoMail))
        .await
        .unwrap();

    TestService {
        service,
        secure_store,
        opener,
        drive,
    }
}

/// Seed a connected credential without running a login.
pub async fn connect(secure_store: Arc<MemorySecureStore>) {
    CredentialStore::new(secure_store, ProviderKind::Google)
        .save(&CredentialRecord::new(
            "ya29.seeded",
            "1//seeded",
            "owner@example.com",
            3600,
        ))
        .await
        .unwrap();
}
