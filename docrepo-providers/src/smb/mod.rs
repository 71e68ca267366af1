//! SMB/CIFS file-share backend
//!
//! Shares are addressed by path. Every call connects to the share, opens the
//! handles it needs and closes them again before returning. The wire protocol
//! sits behind [`ShareConnector`]; [`MountedShareConnector`] serves a share
//! that the operating system has already mounted.

mod file;
mod folder;
#[cfg(test)]
pub(crate) mod memory;
mod mounted;

pub use file::SmbFileHandler;
pub use folder::SmbFolderHandler;
pub use mounted::{MountedShare, MountedShareConnector};

use async_trait::async_trait;
use bytes::Bytes;
use docrepo_core::{PathConvention, RepoResult};
use tracing::warn;

/// Requested access rights
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessMask(u32);

impl AccessMask {
    pub const FILE_READ_DATA: u32 = 0x0001;
    pub const FILE_WRITE_DATA: u32 = 0x0002;
    pub const FILE_READ_ATTRIBUTES: u32 = 0x0080;
    pub const FILE_WRITE_ATTRIBUTES: u32 = 0x0100;
    pub const GENERIC_ALL: u32 = 0x1000_0000;
    pub const GENERIC_WRITE: u32 = 0x4000_0000;
    pub const GENERIC_READ: u32 = 0x8000_0000;

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn can_read(&self) -> bool {
        self.0 & (Self::GENERIC_READ | Self::GENERIC_ALL | Self::FILE_READ_DATA) != 0
    }

    pub fn can_write(&self) -> bool {
        self.0 & (Self::GENERIC_WRITE | Self::GENERIC_ALL | Self::FILE_WRITE_DATA) != 0
    }
}

/// What to do when the file does or does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateDisposition {
    /// Fail if missing
    Open,
    /// Truncate if present, create otherwise
    OverwriteIf,
}

/// Parameters for opening a file on a share
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    pub access: AccessMask,
    pub disposition: CreateDisposition,
    pub write_through: bool,
}

impl OpenOptions {
    /// Read-only open of an existing file
    pub fn read() -> Self {
        Self {
            access: AccessMask::new(AccessMask::GENERIC_READ | AccessMask::FILE_READ_ATTRIBUTES),
            disposition: CreateDisposition::Open,
            write_through: false,
        }
    }

    /// Open for writing, replacing any previous content
    pub fn overwrite() -> Self {
        Self {
            access: AccessMask::new(AccessMask::GENERIC_ALL),
            disposition: CreateDisposition::OverwriteIf,
            write_through: true,
        }
    }
}

/// SMB file attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmbFileAttributes(u32);

impl SmbFileAttributes {
    pub const READONLY: u32 = 0x0001;
    pub const HIDDEN: u32 = 0x0002;
    pub const SYSTEM: u32 = 0x0004;
    pub const DIRECTORY: u32 = 0x0010;
    pub const ARCHIVE: u32 = 0x0020;
    pub const NORMAL: u32 = 0x0080;

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn is_directory(&self) -> bool {
        self.0 & Self::DIRECTORY != 0
    }
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub file_name: String,
    pub attributes: SmbFileAttributes,
    pub end_of_file: u64,
}

impl DirectoryEntry {
    /// The `.` and `..` entries every listing carries
    pub fn is_navigation(&self) -> bool {
        self.file_name == "." || self.file_name == ".."
    }
}

/// Result of a file-information query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInformation {
    pub attributes: SmbFileAttributes,
    pub end_of_file: u64,
    /// Share-relative name, backslash separated with a leading backslash
    pub name_information: String,
}

impl FileInformation {
    pub fn is_directory(&self) -> bool {
        self.attributes.is_directory()
    }
}

/// Anything that must be closed after use
#[async_trait]
pub trait ShareHandle: Send + Sync {
    async fn close(&mut self) -> RepoResult<()>;
}

/// Open file on a share
#[async_trait]
pub trait ShareFile: ShareHandle {
    async fn file_information(&self) -> RepoResult<FileInformation>;

    async fn read_all(&mut self) -> RepoResult<Bytes>;

    async fn write_all(&mut self, data: &[u8]) -> RepoResult<()>;
}

/// Open directory on a share
#[async_trait]
pub trait ShareDirectory: ShareHandle {
    /// Entries whose name matches a wildcard pattern, `.` and `..` included
    async fn list(&self, pattern: &str) -> RepoResult<Vec<DirectoryEntry>>;
}

/// Connected disk share. Paths are share-relative in the server's convention.
#[async_trait]
pub trait DiskShare: ShareHandle {
    async fn open_file(&self, path: &str, options: OpenOptions) -> RepoResult<Box<dyn ShareFile>>;

    async fn open_directory(&self, path: &str) -> RepoResult<Box<dyn ShareDirectory>>;

    async fn folder_exists(&self, path: &str) -> RepoResult<bool>;

    /// Create one directory level
    async fn mkdir(&self, path: &str) -> RepoResult<()>;

    async fn file_information(&self, path: &str) -> RepoResult<FileInformation>;

    async fn list(&self, path: &str, pattern: &str) -> RepoResult<Vec<DirectoryEntry>> {
        let mut directory = self.open_directory(path).await?;
        let result = directory.list(pattern).await;
        release(directory.as_mut(), result).await
    }
}

/// Opens share sessions
#[async_trait]
pub trait ShareConnector: Send + Sync {
    /// Separator convention of the server behind this connector
    fn convention(&self) -> PathConvention;

    async fn connect(&self) -> RepoResult<Box<dyn DiskShare>>;
}

/// Close a handle, then hand back the result captured while it was open.
/// A failed close is logged and does not mask the result.
pub(crate) async fn release<H, T>(handle: &mut H, result: RepoResult<T>) -> RepoResult<T>
where
    H: ShareHandle + ?Sized,
    T: Send,
{
    if let Err(e) = handle.close().await {
        warn!("Failed to close share handle: {}", e);
    }
    result
}
