//! SMB file handler

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use docrepo_core::{mime, path, Backend, DocumentFile, FileHandler, PathConvention, RepoError, RepoResult};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{release, DiskShare, OpenOptions, ShareConnector, ShareFile};

/// Document access on a file share
pub struct SmbFileHandler {
    connector: Arc<dyn ShareConnector>,
}

impl SmbFileHandler {
    pub fn new(connector: Arc<dyn ShareConnector>) -> Self {
        Self { connector }
    }

    fn convention(&self) -> PathConvention {
        self.connector.convention()
    }

    async fn load(&self, id: &str, with_content: bool) -> RepoResult<DocumentFile> {
        let share_path = self.convention().to_share_path(id);
        if share_path.is_empty() {
            warn!("SMB document id {:?} does not name a file", id);
            return Ok(DocumentFile::default());
        }

        let mut share = self.connector.connect().await?;
        let result = self.read_document(share.as_ref(), &share_path, with_content).await;
        let result = release(share.as_mut(), result).await;

        match result {
            Err(e) if e.is_not_found() || matches!(e, RepoError::InvalidPath(_)) => {
                warn!("SMB document not found: {} ({})", id, e);
                Ok(DocumentFile::default())
            }
            other => other,
        }
    }

    async fn read_document(
        &self,
        share: &dyn DiskShare,
        share_path: &str,
        with_content: bool,
    ) -> RepoResult<DocumentFile> {
        let mut file = share.open_file(share_path, OpenOptions::read()).await?;
        let result = self.describe(file.as_mut(), share_path, with_content).await;
        release(file.as_mut(), result).await
    }

    async fn describe(
        &self,
        file: &mut dyn ShareFile,
        share_path: &str,
        with_content: bool,
    ) -> RepoResult<DocumentFile> {
        let name = match self.convention() {
            PathConvention::Windows => share_path.to_string(),
            PathConvention::Unix => file.file_information().await?.name_information,
        };
        let mut document = document_from_share_path(&name);

        if with_content {
            match file.read_all().await {
                Ok(bytes) if bytes.is_empty() => warn!("SMB document {} is empty", share_path),
                Ok(bytes) => document.set_content_bytes(&bytes),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("Failed to read content of {}: {}", share_path, e),
            }
        }
        Ok(document)
    }

    async fn store(&self, share: &dyn DiskShare, share_path: &str, data: &[u8]) -> RepoResult<()> {
        let convention = self.convention();
        let segments: Vec<&str> = share_path
            .split(convention.separator())
            .filter(|s| !s.is_empty())
            .collect();

        if let Some((_, parents)) = segments.split_last() {
            let mut current = String::new();
            for segment in parents {
                current = convention.join(&current, segment);
                if !share.folder_exists(&current).await? {
                    share.mkdir(&current).await?;
                }
            }
        }

        let mut file = share.open_file(share_path, OpenOptions::overwrite()).await?;
        let result = file.write_all(data).await;
        release(file.as_mut(), result).await
    }
}

/// Metadata derived from a share path in either convention
fn document_from_share_path(share_path: &str) -> DocumentFile {
    let id = path::normalize(share_path);
    let (parent, title) = path::split_parent(&id);
    let mime_type = mime::resolve(None, &title);
    DocumentFile::new(id, parent, title, mime_type)
}

#[async_trait]
impl FileHandler for SmbFileHandler {
    fn backend(&self) -> Backend {
        Backend::Smb
    }

    async fn get_document(&self, id: &str) -> RepoResult<DocumentFile> {
        self.load(id, false).await
    }

    async fn get_document_content(&self, id: &str) -> RepoResult<DocumentFile> {
        self.load(id, true).await
    }

    async fn write_file(
        &self,
        base64_content: &str,
        path: &str,
        filename: Option<&str>,
    ) -> RepoResult<bool> {
        let data = STANDARD
            .decode(base64_content.trim())
            .map_err(|e| RepoError::InvalidContent(e.to_string()))?;

        let target = match filename {
            Some(name) => path::join(path, name),
            None => path.to_string(),
        };
        let share_path = self.convention().to_share_path(&target);
        if path::segments(&share_path).next().is_none() {
            return Err(RepoError::InvalidPath(target));
        }

        let mut share = self.connector.connect().await?;
        let result = self.store(share.as_ref(), &share_path, &data).await;
        release(share.as_mut(), result).await?;

        info!("Wrote {} bytes to {}", data.len(), target);
        debug!("Share path {}", share_path);
        Ok(true)
    }
}
