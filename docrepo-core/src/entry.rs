//! Document tree model shared by every backend

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::path;

/// Common view over files and folders
pub trait DocumentEntry {
    /// Backend identity: object id or normalized share path
    fn id(&self) -> &str;
    /// Parent location, forward-slash normalized
    fn path(&self) -> &str;
    fn title(&self) -> &str;
}

/// A document and its metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFile {
    pub id: String,
    pub path: String,
    pub title: String,
    pub mime_type: String,
    /// Base64 payload, present only when content was requested and readable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl DocumentFile {
    pub fn new(
        id: impl Into<String>,
        path: impl Into<String>,
        title: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            title: title.into(),
            mime_type: mime_type.into(),
            content: None,
        }
    }

    /// True for the placeholder returned when an id does not resolve
    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.title.is_empty()
    }

    /// Store raw bytes as base64. Empty payloads leave the content absent.
    pub fn set_content_bytes(&mut self, bytes: &[u8]) {
        self.content = if bytes.is_empty() {
            None
        } else {
            Some(STANDARD.encode(bytes))
        };
    }

    /// Decoded content bytes, if any
    pub fn content_bytes(&self) -> Option<Vec<u8>> {
        self.content.as_ref().and_then(|c| STANDARD.decode(c).ok())
    }

    pub fn full_path(&self) -> String {
        path::join(&self.path, &self.title)
    }
}

impl DocumentEntry for DocumentFile {
    fn id(&self) -> &str {
        &self.id
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn title(&self) -> &str {
        &self.title
    }
}

/// A folder owning its documents and subfolders in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFolder {
    pub id: String,
    pub path: String,
    pub title: String,
    #[serde(rename = "document", default)]
    pub document_list: Vec<DocumentFile>,
    #[serde(rename = "folder", default)]
    pub folder_list: Vec<DocumentFolder>,
}

impl DocumentFolder {
    pub fn new(id: impl Into<String>, path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Folder whose id is its own path; path and title come from splitting it.
    /// An empty path yields the synthetic root.
    pub fn from_share_path(share_path: &str) -> Self {
        let normalized = path::normalize(share_path);
        let (parent, title) = path::split_parent(&normalized);
        let id = if normalized.is_empty() {
            path::ROOT_ID.to_string()
        } else {
            normalized
        };
        Self::new(id, parent, title)
    }

    /// Path of this folder including its own title
    pub fn full_path(&self) -> String {
        path::join(&self.path, &self.title)
    }

    /// No files and no subfolders
    pub fn is_empty(&self) -> bool {
        self.document_list.is_empty() && self.folder_list.is_empty()
    }

    /// Files in this folder and every descendant, depth first
    pub fn walk_files(&self) -> Vec<&DocumentFile> {
        let mut files: Vec<&DocumentFile> = self.document_list.iter().collect();
        for folder in &self.folder_list {
            files.extend(folder.walk_files());
        }
        files
    }

    /// Look up a direct child folder by title
    pub fn child(&self, title: &str) -> Option<&DocumentFolder> {
        self.folder_list.iter().find(|f| f.title == title)
    }
}

impl DocumentEntry for DocumentFolder {
    fn id(&self) -> &str {
        &self.id
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn title(&self) -> &str {
        &self.title
    }
}
