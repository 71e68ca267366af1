//! CMIS folder handler

use async_trait::async_trait;
use docrepo_core::{
    mime, path, Backend, DocumentFile, DocumentFolder, FolderHandler, IgnoreList, RepoResult,
    SearchPattern, SearchSettings, Settings,
};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{BaseTypeId, CmisConnector, CmisObject, CmisSession};

/// Tree listing on a CMIS repository
pub struct CmisFolderHandler {
    connector: Arc<CmisConnector>,
    settings: Arc<Settings>,
}

impl CmisFolderHandler {
    pub fn new(connector: Arc<CmisConnector>, settings: Arc<Settings>) -> Self {
        Self { connector, settings }
    }
}

/// Full path of a folder object, asking the server when the object lacks one
async fn folder_location(session: &dyn CmisSession, object: &CmisObject) -> RepoResult<String> {
    if let Some(full) = &object.path {
        return Ok(full.clone());
    }
    Ok(session
        .get_paths(&object.id)
        .await?
        .into_iter()
        .next()
        .unwrap_or_else(|| path::ROOT_PATH.to_string()))
}

fn convert_folder<'a>(
    session: &'a dyn CmisSession,
    object: CmisObject,
    full_path: String,
    ignore: &'a IgnoreList,
) -> BoxFuture<'a, RepoResult<DocumentFolder>> {
    async move {
        let (parent, title) = path::split_parent(&full_path);
        let mut folder = DocumentFolder::new(object.id.clone(), parent, title);
        let location = folder.full_path();

        for child in session.get_children(&object.id).await? {
            match child.base_type {
                BaseTypeId::Document => {
                    if !ignore.is_file_required(&child.name) {
                        debug!("Ignoring {}", child.name);
                        continue;
                    }
                    let mime_type = child
                        .content_stream_mime_type
                        .clone()
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| mime::DEFAULT_MIME_TYPE.to_string());
                    folder
                        .document_list
                        .push(DocumentFile::new(child.id, location.clone(), child.name, mime_type));
                }
                BaseTypeId::Folder => {
                    let child_path = child
                        .path
                        .clone()
                        .unwrap_or_else(|| path::join(&location, &child.name));
                    let child_id = child.id.clone();
                    match convert_folder(session, child, child_path, ignore).await {
                        Ok(sub) => folder.folder_list.push(sub),
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => warn!("Skipping CMIS folder {}: {}", child_id, e),
                    }
                }
                _ => debug!("Skipping CMIS object {} of type {:?}", child.id, child.base_type),
            }
        }

        Ok(folder)
    }
    .boxed()
}

#[async_trait]
impl FolderHandler for CmisFolderHandler {
    fn backend(&self) -> Backend {
        Backend::Cmis
    }

    fn search_settings(&self) -> &SearchSettings {
        &self.settings.search
    }

    async fn get_folder_tree(&self, id: &str) -> RepoResult<Option<DocumentFolder>> {
        let session = self.connector.session().await?;
        let object = match session.get_object(id).await {
            Ok(Some(object)) if object.is_folder() => object,
            Ok(Some(object)) => {
                warn!("CMIS object {} is a {:?}, not a folder", id, object.base_type);
                return Ok(None);
            }
            Ok(None) => {
                warn!("CMIS folder not found: {}", id);
                return Ok(None);
            }
            Err(e) if e.is_not_found() => {
                warn!("CMIS folder not found: {} ({})", id, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let ignore = IgnoreList::from_settings(&self.settings.search);
        let full_path = folder_location(session.as_ref(), &object).await?;
        convert_folder(session.as_ref(), object, full_path, &ignore)
            .await
            .map(Some)
    }

    async fn get_root_tree(&self) -> RepoResult<DocumentFolder> {
        let session = self.connector.session().await?;
        let root = session.get_root_folder().await?;
        let ignore = IgnoreList::from_settings(&self.settings.search);
        // The root always presents as "/" with an empty title
        convert_folder(session.as_ref(), root, path::ROOT_PATH.to_string(), &ignore).await
    }
}
