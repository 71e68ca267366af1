//! SMB folder handler

use async_trait::async_trait;
use docrepo_core::{
    mime, path, Backend, DocumentFile, DocumentFolder, FolderHandler, IgnoreList, PathConvention,
    RepoResult, SearchPattern, SearchSettings, Settings,
};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{release, DiskShare, ShareConnector};

/// Pattern matching every directory entry
const ALL_ENTRIES: &str = "*";

/// Tree listing on a file share
pub struct SmbFolderHandler {
    connector: Arc<dyn ShareConnector>,
    settings: Arc<Settings>,
}

impl SmbFolderHandler {
    pub fn new(connector: Arc<dyn ShareConnector>, settings: Arc<Settings>) -> Self {
        Self { connector, settings }
    }

    /// Share path for a folder id; the root id and `/` map to the share root
    fn share_path(&self, id: &str) -> String {
        if id == path::ROOT_ID {
            String::new()
        } else {
            self.connector.convention().to_share_path(id)
        }
    }

    async fn tree_below(&self, share: &dyn DiskShare, share_path: &str) -> RepoResult<Option<DocumentFolder>> {
        if !share_path.is_empty() {
            match share.file_information(share_path).await {
                Ok(info) if info.is_directory() => {}
                Ok(_) => {
                    warn!("SMB entry {} is not a folder", share_path);
                    return Ok(None);
                }
                Err(e) if e.is_not_found() => {
                    warn!("SMB folder not found: {} ({})", share_path, e);
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }

        let ignore = IgnoreList::from_settings(&self.settings.search);
        let convention = self.connector.convention();
        walk(share, convention, share_path.to_string(), &ignore)
            .await
            .map(Some)
    }
}

fn walk<'a>(
    share: &'a dyn DiskShare,
    convention: PathConvention,
    share_path: String,
    ignore: &'a IgnoreList,
) -> BoxFuture<'a, RepoResult<DocumentFolder>> {
    async move {
        let mut folder = DocumentFolder::from_share_path(&share_path);

        for entry in share.list(&share_path, ALL_ENTRIES).await? {
            if entry.is_navigation() {
                continue;
            }
            let child_path = convention.join(&share_path, &entry.file_name);

            let info = match share.file_information(&child_path).await {
                Ok(info) => info,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Skipping unreadable SMB entry {}: {}", child_path, e);
                    continue;
                }
            };

            if info.is_directory() {
                match walk(share, convention, child_path.clone(), ignore).await {
                    Ok(sub) => folder.folder_list.push(sub),
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => warn!("Skipping SMB folder {}: {}", child_path, e),
                }
            } else if ignore.is_file_required(&entry.file_name) {
                let id = path::normalize(&child_path);
                let mime_type = mime::resolve(None, &entry.file_name);
                folder.document_list.push(DocumentFile::new(
                    id,
                    folder.full_path(),
                    entry.file_name,
                    mime_type,
                ));
            } else {
                debug!("Ignoring {}", child_path);
            }
        }

        Ok(folder)
    }
    .boxed()
}

#[async_trait]
impl FolderHandler for SmbFolderHandler {
    fn backend(&self) -> Backend {
        Backend::Smb
    }

    fn search_settings(&self) -> &SearchSettings {
        &self.settings.search
    }

    async fn get_folder_tree(&self, id: &str) -> RepoResult<Option<DocumentFolder>> {
        let share_path = self.share_path(id);
        let mut share = self.connector.connect().await?;
        let result = self.tree_below(share.as_ref(), &share_path).await;
        release(share.as_mut(), result).await
    }

    async fn get_root_tree(&self) -> RepoResult<DocumentFolder> {
        let mut share = self.connector.connect().await?;
        let ignore = IgnoreList::from_settings(&self.settings.search);
        let result = walk(share.as_ref(), self.connector.convention(), String::new(), &ignore).await;
        release(share.as_mut(), result).await
    }
}
