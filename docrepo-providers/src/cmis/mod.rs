//! CMIS backend
//!
//! Content-management servers expose a tree of typed objects. Folders hand
//! back their children directly, documents carry a content stream. Objects
//! are addressed by opaque ids.

#[cfg(feature = "browser-binding")]
mod browser;
mod file;
mod folder;
#[cfg(test)]
pub(crate) mod memory;

#[cfg(feature = "browser-binding")]
pub use browser::BrowserBindingSession;
pub use file::CmisFileHandler;
pub use folder::CmisFolderHandler;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use docrepo_core::{config::CmisSettings, RepoResult};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Upper bound on the buffer reserved from an announced content length
const MAX_PREALLOCATION: usize = 8 * 1024 * 1024;

/// Byte stream type
pub type ByteStream = Pin<Box<dyn Stream<Item = RepoResult<Bytes>> + Send>>;

/// Base type of a CMIS object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseTypeId {
    Document,
    Folder,
    Relationship,
    Policy,
    Item,
    Other(String),
}

impl BaseTypeId {
    pub fn from_cmis(value: &str) -> Self {
        match value {
            "cmis:document" => BaseTypeId::Document,
            "cmis:folder" => BaseTypeId::Folder,
            "cmis:relationship" => BaseTypeId::Relationship,
            "cmis:policy" => BaseTypeId::Policy,
            "cmis:item" => BaseTypeId::Item,
            other => BaseTypeId::Other(other.to_string()),
        }
    }
}

/// Properties of one repository object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmisObject {
    pub id: String,
    pub name: String,
    pub base_type: BaseTypeId,
    /// Full path, folders only
    pub path: Option<String>,
    pub content_stream_mime_type: Option<String>,
    pub content_stream_length: Option<u64>,
}

impl CmisObject {
    pub fn is_folder(&self) -> bool {
        self.base_type == BaseTypeId::Folder
    }

    pub fn is_document(&self) -> bool {
        self.base_type == BaseTypeId::Document
    }
}

/// Content of a document as delivered by the server
pub struct ContentStream {
    /// Content type the server delivered the stream with
    pub mime_type: Option<String>,
    pub length: Option<u64>,
    pub stream: ByteStream,
}

impl ContentStream {
    /// Drain the whole stream into memory. The announced length is only a
    /// sizing hint.
    pub async fn into_bytes(mut self) -> RepoResult<Bytes> {
        let hint = self
            .length
            .map_or(0, |len| usize::try_from(len).unwrap_or(usize::MAX))
            .min(MAX_PREALLOCATION);
        let mut buffer = BytesMut::with_capacity(hint);
        while let Some(chunk) = self.stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }
}

/// Session with one repository
#[async_trait]
pub trait CmisSession: Send + Sync {
    /// `None` when the id does not resolve
    async fn get_object(&self, id: &str) -> RepoResult<Option<CmisObject>>;

    async fn get_root_folder(&self) -> RepoResult<CmisObject>;

    async fn get_children(&self, folder_id: &str) -> RepoResult<Vec<CmisObject>>;

    /// Full paths under which an object is filed
    async fn get_paths(&self, object_id: &str) -> RepoResult<Vec<String>>;

    /// `None` when the document has no content stream
    async fn get_content_stream(&self, document_id: &str) -> RepoResult<Option<ContentStream>>;
}

/// Creates the session on first use and hands out the same one afterwards
pub struct CmisConnector {
    settings: CmisSettings,
    session: OnceCell<Arc<dyn CmisSession>>,
}

impl CmisConnector {
    pub fn new(settings: CmisSettings) -> Self {
        Self {
            settings,
            session: OnceCell::new(),
        }
    }

    /// Connector around an already established session
    pub fn with_session(session: Arc<dyn CmisSession>) -> Self {
        Self {
            settings: CmisSettings::default(),
            session: OnceCell::new_with(Some(session)),
        }
    }

    pub async fn session(&self) -> RepoResult<Arc<dyn CmisSession>> {
        self.session
            .get_or_try_init(|| self.create_session())
            .await
            .cloned()
    }

    #[cfg(feature = "browser-binding")]
    async fn create_session(&self) -> RepoResult<Arc<dyn CmisSession>> {
        let session = BrowserBindingSession::connect(&self.settings).await?;
        Ok(Arc::new(session))
    }

    #[cfg(not(feature = "browser-binding"))]
    async fn create_session(&self) -> RepoResult<Arc<dyn CmisSession>> {
        Err(docrepo_core::RepoError::BackendUnreachable(format!(
            "no CMIS binding available for {}",
            self.settings.host
        )))
    }
}
