//! In-memory repository used by the handler tests

use async_trait::async_trait;
use bytes::Bytes;
use docrepo_core::{path, RepoError, RepoResult};
use std::collections::{HashMap, HashSet};

use super::{BaseTypeId, CmisObject, CmisSession, ContentStream};

pub(crate) const ROOT_ID: &str = "root-folder-id";

struct Node {
    object: CmisObject,
    parent: Option<String>,
    children: Vec<String>,
    content: Option<Bytes>,
    served_as: Option<String>,
}

pub(crate) struct MemoryRepository {
    nodes: HashMap<String, Node>,
    broken_folders: HashSet<String>,
    unreachable: bool,
}

impl MemoryRepository {
    pub(crate) fn new() -> Self {
        let root = CmisObject {
            id: ROOT_ID.to_string(),
            name: "Company Home".to_string(),
            base_type: BaseTypeId::Folder,
            path: Some("/".to_string()),
            content_stream_mime_type: None,
            content_stream_length: None,
        };
        let mut nodes = HashMap::new();
        nodes.insert(
            ROOT_ID.to_string(),
            Node { object: root, parent: None, children: Vec::new(), content: None, served_as: None },
        );
        Self { nodes, broken_folders: HashSet::new(), unreachable: false }
    }

    pub(crate) fn folder(mut self, parent_id: &str, id: &str, name: &str) -> Self {
        let parent_path = self.folder_path(parent_id);
        let object = CmisObject {
            id: id.to_string(),
            name: name.to_string(),
            base_type: BaseTypeId::Folder,
            path: Some(path::join(&parent_path, name)),
            content_stream_mime_type: None,
            content_stream_length: None,
        };
        self.insert(parent_id, object, None);
        self
    }

    pub(crate) fn document(
        mut self,
        parent_id: &str,
        id: &str,
        name: &str,
        mime_type: Option<&str>,
    ) -> Self {
        let object = CmisObject {
            id: id.to_string(),
            name: name.to_string(),
            base_type: BaseTypeId::Document,
            path: None,
            content_stream_mime_type: mime_type.map(String::from),
            content_stream_length: None,
        };
        self.insert(parent_id, object, None);
        self
    }

    /// Attach a content stream to a document
    pub(crate) fn content(mut self, id: &str, bytes: &[u8]) -> Self {
        if let Some(node) = self.nodes.get_mut(id) {
            node.object.content_stream_length = Some(bytes.len() as u64);
            node.content = Some(Bytes::copy_from_slice(bytes));
        }
        self
    }

    /// Content type the stream is delivered with, independent of the properties
    pub(crate) fn served_as(mut self, id: &str, mime_type: &str) -> Self {
        if let Some(node) = self.nodes.get_mut(id) {
            node.served_as = Some(mime_type.to_string());
        }
        self
    }

    /// Listing the children of this folder fails
    pub(crate) fn broken(mut self, folder_id: &str) -> Self {
        self.broken_folders.insert(folder_id.to_string());
        self
    }

    /// Every call fails as if the server were down
    pub(crate) fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    fn folder_path(&self, id: &str) -> String {
        self.nodes
            .get(id)
            .and_then(|n| n.object.path.clone())
            .unwrap_or_else(|| path::ROOT_PATH.to_string())
    }

    fn insert(&mut self, parent_id: &str, object: CmisObject, content: Option<Bytes>) {
        let id = object.id.clone();
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.children.push(id.clone());
        }
        self.nodes.insert(
            id,
            Node {
                object,
                parent: Some(parent_id.to_string()),
                children: Vec::new(),
                content,
                served_as: None,
            },
        );
    }

    fn check_reachable(&self) -> RepoResult<()> {
        if self.unreachable {
            Err(RepoError::BackendUnreachable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CmisSession for MemoryRepository {
    async fn get_object(&self, id: &str) -> RepoResult<Option<CmisObject>> {
        self.check_reachable()?;
        Ok(self.nodes.get(id).map(|n| n.object.clone()))
    }

    async fn get_root_folder(&self) -> RepoResult<CmisObject> {
        self.check_reachable()?;
        self.nodes
            .get(ROOT_ID)
            .map(|n| n.object.clone())
            .ok_or_else(|| RepoError::NotFound(ROOT_ID.into()))
    }

    async fn get_children(&self, folder_id: &str) -> RepoResult<Vec<CmisObject>> {
        self.check_reachable()?;
        if self.broken_folders.contains(folder_id) {
            return Err(RepoError::ProviderApi {
                provider: "cmis".into(),
                message: format!("500: cannot list {}", folder_id),
            });
        }
        let node = self
            .nodes
            .get(folder_id)
            .ok_or_else(|| RepoError::NotFound(folder_id.into()))?;
        Ok(node
            .children
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .map(|n| n.object.clone())
            .collect())
    }

    async fn get_paths(&self, object_id: &str) -> RepoResult<Vec<String>> {
        self.check_reachable()?;
        let node = self
            .nodes
            .get(object_id)
            .ok_or_else(|| RepoError::NotFound(object_id.into()))?;
        if let Some(path) = &node.object.path {
            return Ok(vec![path.clone()]);
        }
        Ok(node
            .parent
            .iter()
            .map(|parent| path::join(&self.folder_path(parent), &node.object.name))
            .collect())
    }

    async fn get_content_stream(&self, document_id: &str) -> RepoResult<Option<ContentStream>> {
        self.check_reachable()?;
        Ok(self.nodes.get(document_id).and_then(|n| {
            n.content.clone().map(|bytes| ContentStream {
                mime_type: n
                    .served_as
                    .clone()
                    .or_else(|| n.object.content_stream_mime_type.clone()),
                length: Some(bytes.len() as u64),
                stream: Box::pin(futures::stream::once(async { Ok(bytes) })),
            })
        }))
    }
}
