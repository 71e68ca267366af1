//! Handler traits implemented by every backend

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

use crate::{
    config::SearchSettings,
    entry::{DocumentFile, DocumentFolder},
    error::{RepoError, RepoResult},
    strategy::{self, MachineAndOrder, SearchPattern, Tool},
};

/// Storage backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Content-management server, addressed by object id
    Cmis,
    /// Network file share, addressed by path
    Smb,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Cmis => "cmis",
            Backend::Smb => "smb",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cmis" => Ok(Backend::Cmis),
            "smb" | "cifs" => Ok(Backend::Smb),
            other => Err(RepoError::UnsupportedBackend(other.to_string())),
        }
    }
}

/// Per-document access
#[async_trait]
pub trait FileHandler: Send + Sync {
    fn backend(&self) -> Backend;

    /// Metadata only. Unresolvable ids yield an empty document.
    async fn get_document(&self, id: &str) -> RepoResult<DocumentFile>;

    /// Metadata plus base64 content. Unreadable content stays absent.
    async fn get_document_content(&self, id: &str) -> RepoResult<DocumentFile>;

    /// Persist base64 content at `path`, or at `path/filename` when a file
    /// name is given. Missing directories are created and existing files
    /// overwritten. `Ok(false)` means the backend does not accept writes.
    async fn write_file(
        &self,
        base64_content: &str,
        path: &str,
        filename: Option<&str>,
    ) -> RepoResult<bool>;
}

/// Tree materialization and strategy-driven subtree extraction
#[async_trait]
pub trait FolderHandler: Send + Sync {
    fn backend(&self) -> Backend;

    /// Settings used to build the machine and tool strategies
    fn search_settings(&self) -> &SearchSettings;

    /// Full subtree below `id`; `None` when `id` is not a folder
    async fn get_folder_tree(&self, id: &str) -> RepoResult<Option<DocumentFolder>>;

    /// Full tree below the repository root
    async fn get_root_tree(&self) -> RepoResult<DocumentFolder>;

    async fn get_folder_by_machine_and_tool(
        &self,
        machine: &str,
        tool: &str,
    ) -> RepoResult<DocumentFolder> {
        let strategy = MachineAndOrder::new(machine, tool, self.search_settings())?;
        let tree = self.get_root_tree().await?;
        Ok(strategy::extract(&tree, &strategy as &dyn SearchPattern))
    }

    async fn get_folder_by_tool(&self, tool: &str) -> RepoResult<DocumentFolder> {
        let strategy = Tool::new(tool, self.search_settings())?;
        let tree = self.get_root_tree().await?;
        Ok(strategy::extract(&tree, &strategy as &dyn SearchPattern))
    }
}
