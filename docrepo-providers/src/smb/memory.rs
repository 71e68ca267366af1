//! In-memory share used by the handler tests

use async_trait::async_trait;
use bytes::Bytes;
use docrepo_core::{path, PathConvention, RepoError, RepoResult};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{
    DirectoryEntry, DiskShare, FileInformation, OpenOptions, ShareConnector, ShareDirectory,
    ShareFile, ShareHandle, SmbFileAttributes,
};

/// Opened and closed handles, shared by every session of one connector
#[derive(Debug, Default)]
pub(crate) struct HandleCounts {
    shares_opened: AtomicUsize,
    shares_closed: AtomicUsize,
    files_opened: AtomicUsize,
    files_closed: AtomicUsize,
}

impl HandleCounts {
    /// `(opened, closed)` share sessions
    pub(crate) fn shares(&self) -> (usize, usize) {
        (
            self.shares_opened.load(Ordering::SeqCst),
            self.shares_closed.load(Ordering::SeqCst),
        )
    }

    /// `(opened, closed)` file handles
    pub(crate) fn files(&self) -> (usize, usize) {
        (
            self.files_opened.load(Ordering::SeqCst),
            self.files_closed.load(Ordering::SeqCst),
        )
    }
}

/// Share contents keyed by forward-slash path, the root being `""`
#[derive(Debug, Clone, Default)]
struct Tree {
    folders: BTreeSet<String>,
    files: BTreeMap<String, Bytes>,
    failing_reads: HashSet<String>,
    failing_information: HashSet<String>,
}

fn parent_of(key: &str) -> &str {
    key.rfind('/').map_or("", |idx| &key[..idx])
}

impl Tree {
    fn is_folder(&self, key: &str) -> bool {
        key.is_empty() || self.folders.contains(key)
    }

    fn information(&self, key: &str) -> RepoResult<FileInformation> {
        if self.failing_information.contains(key) {
            return Err(RepoError::ProviderApi {
                provider: "smb".into(),
                message: format!("STATUS_ACCESS_DENIED: {}", key),
            });
        }
        let (attributes, end_of_file) = if self.is_folder(key) {
            (SmbFileAttributes::DIRECTORY, 0)
        } else if let Some(content) = self.files.get(key) {
            (SmbFileAttributes::NORMAL, content.len() as u64)
        } else {
            return Err(RepoError::NotFound(key.to_string()));
        };
        Ok(FileInformation {
            attributes: SmbFileAttributes::new(attributes),
            end_of_file,
            name_information: format!("\\{}", key.replace('/', "\\")),
        })
    }

    fn children(&self, key: &str) -> Vec<DirectoryEntry> {
        let folders = self
            .folders
            .iter()
            .filter(|f| parent_of(f) == key)
            .map(|f| DirectoryEntry {
                file_name: path::basename(f).to_string(),
                attributes: SmbFileAttributes::new(SmbFileAttributes::DIRECTORY),
                end_of_file: 0,
            });
        let files = self
            .files
            .iter()
            .filter(|(f, _)| parent_of(f) == key)
            .map(|(f, content)| DirectoryEntry {
                file_name: path::basename(f).to_string(),
                attributes: SmbFileAttributes::new(SmbFileAttributes::NORMAL),
                end_of_file: content.len() as u64,
            });
        let mut entries: Vec<DirectoryEntry> = folders.chain(files).collect();
        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        entries
    }
}

fn read_only() -> RepoError {
    RepoError::Other("in-memory share is read-only".into())
}

pub(crate) struct MemoryShareConnector {
    convention: PathConvention,
    tree: Tree,
    counts: Arc<HandleCounts>,
}

impl MemoryShareConnector {
    pub(crate) fn new(convention: PathConvention) -> Self {
        Self {
            convention,
            tree: Tree::default(),
            counts: Arc::new(HandleCounts::default()),
        }
    }

    /// Add a folder and its parents
    pub(crate) fn folder(mut self, key: &str) -> Self {
        let mut current = String::new();
        for segment in path::segments(key) {
            current = if current.is_empty() {
                segment.to_string()
            } else {
                format!("{}/{}", current, segment)
            };
            self.tree.folders.insert(current.clone());
        }
        self
    }

    /// Add a file, creating its parents
    pub(crate) fn file(self, key: &str, content: &[u8]) -> Self {
        let mut connector = self.folder(parent_of(key));
        connector
            .tree
            .files
            .insert(key.to_string(), Bytes::copy_from_slice(content));
        connector
    }

    /// Reading the content of this file fails
    pub(crate) fn failing_read(mut self, key: &str) -> Self {
        self.tree.failing_reads.insert(key.to_string());
        self
    }

    /// Information queries on this entry fail
    pub(crate) fn failing_information(mut self, key: &str) -> Self {
        self.tree.failing_information.insert(key.to_string());
        self
    }

    pub(crate) fn counts(&self) -> Arc<HandleCounts> {
        self.counts.clone()
    }
}

#[async_trait]
impl ShareConnector for MemoryShareConnector {
    fn convention(&self) -> PathConvention {
        self.convention
    }

    async fn connect(&self) -> RepoResult<Box<dyn DiskShare>> {
        self.counts.shares_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryShare {
            tree: Arc::new(self.tree.clone()),
            counts: self.counts.clone(),
        }))
    }
}

struct MemoryShare {
    tree: Arc<Tree>,
    counts: Arc<HandleCounts>,
}

#[async_trait]
impl ShareHandle for MemoryShare {
    async fn close(&mut self) -> RepoResult<()> {
        self.counts.shares_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl DiskShare for MemoryShare {
    async fn open_file(&self, share_path: &str, _options: OpenOptions) -> RepoResult<Box<dyn ShareFile>> {
        let key = path::normalize(share_path);
        if !self.tree.files.contains_key(&key) {
            return Err(RepoError::NotFound(share_path.to_string()));
        }
        self.counts.files_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryFile {
            key,
            tree: self.tree.clone(),
            counts: self.counts.clone(),
        }))
    }

    async fn open_directory(&self, share_path: &str) -> RepoResult<Box<dyn ShareDirectory>> {
        let key = path::normalize(share_path);
        if !self.tree.is_folder(&key) {
            return Err(RepoError::NotFound(share_path.to_string()));
        }
        Ok(Box::new(MemoryDirectory {
            key,
            tree: self.tree.clone(),
        }))
    }

    async fn folder_exists(&self, share_path: &str) -> RepoResult<bool> {
        Ok(self.tree.is_folder(&path::normalize(share_path)))
    }

    async fn mkdir(&self, _share_path: &str) -> RepoResult<()> {
        Err(read_only())
    }

    async fn file_information(&self, share_path: &str) -> RepoResult<FileInformation> {
        self.tree.information(&path::normalize(share_path))
    }
}

struct MemoryFile {
    key: String,
    tree: Arc<Tree>,
    counts: Arc<HandleCounts>,
}

#[async_trait]
impl ShareHandle for MemoryFile {
    async fn close(&mut self) -> RepoResult<()> {
        self.counts.files_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ShareFile for MemoryFile {
    async fn file_information(&self) -> RepoResult<FileInformation> {
        self.tree.information(&self.key)
    }

    async fn read_all(&mut self) -> RepoResult<Bytes> {
        if self.tree.failing_reads.contains(&self.key) {
            return Err(RepoError::ContentUnavailable(format!(
                "STATUS_UNEXPECTED_NETWORK_ERROR: {}",
                self.key
            )));
        }
        self.tree
            .files
            .get(&self.key)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(self.key.clone()))
    }

    async fn write_all(&mut self, _data: &[u8]) -> RepoResult<()> {
        Err(read_only())
    }
}

struct MemoryDirectory {
    key: String,
    tree: Arc<Tree>,
}

#[async_trait]
impl ShareHandle for MemoryDirectory {
    async fn close(&mut self) -> RepoResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ShareDirectory for MemoryDirectory {
    async fn list(&self, pattern: &str) -> RepoResult<Vec<DirectoryEntry>> {
        let pattern = glob::Pattern::new(pattern).map_err(|e| RepoError::InvalidPattern(e.to_string()))?;
        let mut listing: Vec<DirectoryEntry> = [".", ".."]
            .into_iter()
            .map(|name| DirectoryEntry {
                file_name: name.to_string(),
                attributes: SmbFileAttributes::new(SmbFileAttributes::DIRECTORY),
                end_of_file: 0,
            })
            .collect();
        listing.extend(self.tree.children(&self.key));
        listing.retain(|entry| pattern.matches(&entry.file_name));
        Ok(listing)
    }
}
