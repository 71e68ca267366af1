//! CMIS file handler

use async_trait::async_trait;
use docrepo_core::{mime, path, Backend, DocumentFile, FileHandler, RepoResult};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{CmisConnector, CmisObject, CmisSession};

/// Document access on a CMIS repository
pub struct CmisFileHandler {
    connector: Arc<CmisConnector>,
}

impl CmisFileHandler {
    pub fn new(connector: Arc<CmisConnector>) -> Self {
        Self { connector }
    }

    /// Resolve `id` to a document. Anything else is logged and yields `None`.
    async fn resolve_document(
        &self,
        session: &dyn CmisSession,
        id: &str,
    ) -> RepoResult<Option<CmisObject>> {
        match session.get_object(id).await {
            Ok(Some(object)) if object.is_document() => Ok(Some(object)),
            Ok(Some(object)) => {
                warn!("CMIS object {} is a {:?}, not a document", id, object.base_type);
                Ok(None)
            }
            Ok(None) => {
                warn!("CMIS document not found: {}", id);
                Ok(None)
            }
            Err(e) if e.is_not_found() => {
                warn!("CMIS document not found: {} ({})", id, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn metadata(&self, session: &dyn CmisSession, object: &CmisObject) -> RepoResult<DocumentFile> {
        let paths = session.get_paths(&object.id).await?;
        let parent = match paths.first() {
            Some(full) => path::split_parent(full).0,
            None => {
                debug!("CMIS document {} is unfiled", object.id);
                path::ROOT_PATH.to_string()
            }
        };
        let mime_type = object
            .content_stream_mime_type
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| mime::DEFAULT_MIME_TYPE.to_string());

        Ok(DocumentFile::new(object.id.clone(), parent, object.name.clone(), mime_type))
    }
}

#[async_trait]
impl FileHandler for CmisFileHandler {
    fn backend(&self) -> Backend {
        Backend::Cmis
    }

    async fn get_document(&self, id: &str) -> RepoResult<DocumentFile> {
        let session = self.connector.session().await?;
        match self.resolve_document(session.as_ref(), id).await? {
            Some(object) => self.metadata(session.as_ref(), &object).await,
            None => Ok(DocumentFile::default()),
        }
    }

    async fn get_document_content(&self, id: &str) -> RepoResult<DocumentFile> {
        let session = self.connector.session().await?;
        let object = match self.resolve_document(session.as_ref(), id).await? {
            Some(object) => object,
            None => return Ok(DocumentFile::default()),
        };
        let mut document = self.metadata(session.as_ref(), &object).await?;

        let content = match session.get_content_stream(id).await {
            Ok(Some(stream)) => {
                let announced = object
                    .content_stream_mime_type
                    .as_deref()
                    .is_some_and(|m| !m.trim().is_empty());
                if !announced {
                    if let Some(mime_type) = stream.mime_type.as_deref().filter(|m| !m.trim().is_empty()) {
                        debug!("CMIS document {} served as {}", id, mime_type);
                        document.mime_type = mime_type.to_string();
                    }
                }
                stream.into_bytes().await
            }
            Ok(None) => {
                warn!("CMIS document {} has no content stream", id);
                return Ok(document);
            }
            Err(e) => Err(e),
        };

        match content {
            Ok(bytes) if bytes.is_empty() => warn!("CMIS document {} has empty content", id),
            Ok(bytes) => document.set_content_bytes(&bytes),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!("Failed to read content of CMIS document {}: {}", id, e),
        }
        Ok(document)
    }

    async fn write_file(
        &self,
        _base64_content: &str,
        path: &str,
        filename: Option<&str>,
    ) -> RepoResult<bool> {
        debug!(
            "CMIS write not supported: {}",
            filename.map_or_else(|| path.to_string(), |name| path::join(path, name))
        );
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmis::memory::{MemoryRepository, ROOT_ID};

    fn handler(repo: MemoryRepository) -> CmisFileHandler {
        CmisFileHandler::new(Arc::new(CmisConnector::with_session(Arc::new(repo))))
    }

    fn repository() -> MemoryRepository {
        MemoryRepository::new()
            .folder(ROOT_ID, "f-orders", "orders")
            .folder("f-orders", "f-2018", "2018")
            .document("f-2018", "d-report", "report.pdf", Some("application/pdf"))
            .content("d-report", b"%PDF-1.4")
            .document("f-2018", "d-notes", "notes.pdf", None)
            .content("d-notes", b"notes")
            .document("f-orders", "d-empty", "empty.txt", Some("text/plain"))
            .content("d-empty", b"")
            .document("f-orders", "d-nocontent", "placeholder.doc", Some("application/msword"))
    }

    #[tokio::test]
    async fn test_get_document_metadata() {
        let handler = handler(repository());
        let doc = handler.get_document("d-report").await.unwrap();
        assert_eq!(doc.id, "d-report");
        assert_eq!(doc.title, "report.pdf");
        assert_eq!(doc.path, "/orders/2018");
        assert_eq!(doc.mime_type, "application/pdf");
        assert!(doc.content.is_none());
        assert_eq!(doc.full_path(), "/orders/2018/report.pdf");
    }

    #[tokio::test]
    async fn test_get_document_is_repeatable() {
        let handler = handler(repository());
        let first = handler.get_document("d-report").await.unwrap();
        let second = handler.get_document("d-report").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_mime_type_defaults_to_plain_text() {
        let handler = handler(repository());
        let doc = handler.get_document("d-notes").await.unwrap();
        assert_eq!(doc.mime_type, "text/plain");
    }

    #[tokio::test]
    async fn test_unknown_id_yields_empty_document() {
        let handler = handler(repository());
        let doc = handler.get_document("nope").await.unwrap();
        assert!(doc.is_empty());
    }

    #[tokio::test]
    async fn test_folder_id_yields_empty_document() {
        let handler = handler(repository());
        assert!(handler.get_document("f-orders").await.unwrap().is_empty());
        assert!(handler.get_document_content("f-orders").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_document_content() {
        let handler = handler(repository());
        let doc = handler.get_document_content("d-report").await.unwrap();
        assert_eq!(doc.title, "report.pdf");
        assert_eq!(doc.content_bytes().unwrap(), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_content_type_of_stream_fills_missing_mime_type() {
        let notes = handler(repository().served_as("d-notes", "application/pdf"));
        let doc = notes.get_document_content("d-notes").await.unwrap();
        assert_eq!(doc.mime_type, "application/pdf");
        assert_eq!(notes.get_document("d-notes").await.unwrap().mime_type, "text/plain");

        let report = handler(repository().served_as("d-report", "application/octet-stream"));
        let doc = report.get_document_content("d-report").await.unwrap();
        assert_eq!(doc.mime_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_empty_or_missing_content_stays_absent() {
        let handler = handler(repository());

        let empty = handler.get_document_content("d-empty").await.unwrap();
        assert_eq!(empty.title, "empty.txt");
        assert!(empty.content.is_none());

        let missing = handler.get_document_content("d-nocontent").await.unwrap();
        assert_eq!(missing.title, "placeholder.doc");
        assert_eq!(missing.path, "/orders");
        assert!(missing.content.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_repository_propagates() {
        let handler = handler(repository().unreachable());
        let err = handler.get_document("d-report").await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_write_is_not_supported() {
        let handler = handler(repository());
        assert!(!handler.write_file("aGVsbG8=", "/orders", Some("x.txt")).await.unwrap());
        assert!(!handler.write_file("aGVsbG8=", "/orders/x.txt", None).await.unwrap());
    }
}
