// SPDX-License-Identifier: AGPL-3.0-or-later
//! Share served from a local mount point
//!
//! Linux `mount.cifs` and macOS `mount_smbfs` expose the share as a plain
//! directory tree; this connector maps share operations onto `tokio::fs`
//! below that directory.

use async_trait::async_trait;
use bytes::Bytes;
use docrepo_core::{config::SmbSettings, PathConvention, RepoError, RepoResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

use super::{
    CreateDisposition, DirectoryEntry, DiskShare, FileInformation, OpenOptions, ShareConnector,
    ShareDirectory, ShareFile, ShareHandle, SmbFileAttributes,
};

/// Connector for a share mounted by the operating system
#[derive(Debug, Clone)]
pub struct MountedShareConnector {
    mount_point: PathBuf,
    convention: PathConvention,
}

impl MountedShareConnector {
    pub fn new(mount_point: impl AsRef<Path>, convention: PathConvention) -> Self {
        Self {
            mount_point: mount_point.as_ref().to_path_buf(),
            convention,
        }
    }

    pub fn from_settings(settings: &SmbSettings) -> RepoResult<Self> {
        let mount_point = settings.mount_point.as_ref().ok_or_else(|| {
            RepoError::Config(format!(
                "no mount point configured for //{}/{}",
                settings.host, settings.share
            ))
        })?;
        Ok(Self::new(mount_point, settings.system))
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }
}

#[async_trait]
impl ShareConnector for MountedShareConnector {
    fn convention(&self) -> PathConvention {
        self.convention
    }

    async fn connect(&self) -> RepoResult<Box<dyn DiskShare>> {
        match fs::metadata(&self.mount_point).await {
            Ok(meta) if meta.is_dir() => {}
            _ => {
                return Err(RepoError::BackendUnreachable(format!(
                    "share is not mounted at {}",
                    self.mount_point.display()
                )))
            }
        }
        debug!("Connected to share at {}", self.mount_point.display());
        Ok(Box::new(MountedShare {
            root: self.mount_point.clone(),
            convention: self.convention,
        }))
    }
}

/// Connected mounted share
#[derive(Debug)]
pub struct MountedShare {
    root: PathBuf,
    convention: PathConvention,
}

impl MountedShare {
    /// Map a share path onto the mount, refusing to leave it
    fn to_real_path(&self, share_path: &str) -> RepoResult<PathBuf> {
        let mut real = self.root.clone();
        for segment in share_path
            .split(self.convention.separator())
            .filter(|s| !s.is_empty())
        {
            if segment == "." || segment == ".." {
                return Err(RepoError::InvalidPath(share_path.to_string()));
            }
            real.push(segment);
        }
        Ok(real)
    }

    /// Backslash form with a leading backslash, as servers report names
    fn name_information(&self, share_path: &str) -> String {
        let segments: Vec<&str> = share_path
            .split(self.convention.separator())
            .filter(|s| !s.is_empty())
            .collect();
        format!("\\{}", segments.join("\\"))
    }
}

fn attributes_of(name: &str, meta: &std::fs::Metadata) -> SmbFileAttributes {
    let mut bits = if meta.is_dir() {
        SmbFileAttributes::DIRECTORY
    } else {
        SmbFileAttributes::NORMAL
    };
    if name.starts_with('.') && name != "." && name != ".." {
        bits |= SmbFileAttributes::HIDDEN;
    }
    if meta.permissions().readonly() {
        bits |= SmbFileAttributes::READONLY;
    }
    SmbFileAttributes::new(bits)
}

fn navigation_entry(name: &str) -> DirectoryEntry {
    DirectoryEntry {
        file_name: name.to_string(),
        attributes: SmbFileAttributes::new(SmbFileAttributes::DIRECTORY),
        end_of_file: 0,
    }
}

fn compile_pattern(pattern: &str) -> RepoResult<glob::Pattern> {
    glob::Pattern::new(pattern).map_err(|e| RepoError::InvalidPattern(e.to_string()))
}

#[async_trait]
impl ShareHandle for MountedShare {
    async fn close(&mut self) -> RepoResult<()> {
        debug!("Disconnected from share at {}", self.root.display());
        Ok(())
    }
}

#[async_trait]
impl DiskShare for MountedShare {
    async fn open_file(&self, path: &str, options: OpenOptions) -> RepoResult<Box<dyn ShareFile>> {
        let real = self.to_real_path(path)?;
        if let Ok(meta) = fs::metadata(&real).await {
            if meta.is_dir() {
                return Err(RepoError::NotFound(format!("{} is a directory", path)));
            }
        }

        let mut open = fs::OpenOptions::new();
        open.read(options.access.can_read())
            .write(options.access.can_write());
        match options.disposition {
            CreateDisposition::Open => {}
            CreateDisposition::OverwriteIf => {
                open.create(true).truncate(true);
            }
        }

        let file = open.open(&real).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RepoError::NotFound(path.to_string())
            } else {
                RepoError::Io(e)
            }
        })?;
        debug!("Opened {} ({:?})", path, options.disposition);

        Ok(Box::new(MountedFile {
            file: Some(file),
            name_information: self.name_information(path),
            write_through: options.write_through,
        }))
    }

    async fn open_directory(&self, path: &str) -> RepoResult<Box<dyn ShareDirectory>> {
        let real = self.to_real_path(path)?;
        let meta = fs::metadata(&real).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RepoError::NotFound(path.to_string())
            } else {
                RepoError::Io(e)
            }
        })?;
        if !meta.is_dir() {
            return Err(RepoError::InvalidPath(format!("{} is not a directory", path)));
        }
        Ok(Box::new(MountedDirectory { real }))
    }

    async fn folder_exists(&self, path: &str) -> RepoResult<bool> {
        let real = self.to_real_path(path)?;
        match fs::metadata(&real).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn mkdir(&self, path: &str) -> RepoResult<()> {
        let real = self.to_real_path(path)?;
        info!("Creating directory {}", path);
        fs::create_dir(&real).await?;
        Ok(())
    }

    async fn file_information(&self, path: &str) -> RepoResult<FileInformation> {
        let real = self.to_real_path(path)?;
        let meta = fs::metadata(&real).await?;
        let name = docrepo_core::path::basename(path);
        Ok(FileInformation {
            attributes: attributes_of(name, &meta),
            end_of_file: if meta.is_dir() { 0 } else { meta.len() },
            name_information: self.name_information(path),
        })
    }
}

struct MountedFile {
    file: Option<fs::File>,
    name_information: String,
    write_through: bool,
}

impl MountedFile {
    fn handle(&mut self) -> RepoResult<&mut fs::File> {
        self.file
            .as_mut()
            .ok_or_else(|| RepoError::Other(format!("{} is closed", self.name_information)))
    }
}

#[async_trait]
impl ShareHandle for MountedFile {
    async fn close(&mut self) -> RepoResult<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ShareFile for MountedFile {
    async fn file_information(&self) -> RepoResult<FileInformation> {
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| RepoError::Other(format!("{} is closed", self.name_information)))?;
        let meta = file.metadata().await?;
        let name = docrepo_core::path::basename(&self.name_information);
        Ok(FileInformation {
            attributes: attributes_of(name, &meta),
            end_of_file: meta.len(),
            name_information: self.name_information.clone(),
        })
    }

    async fn read_all(&mut self) -> RepoResult<Bytes> {
        let file = self.handle()?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .await
            .map_err(|e| RepoError::ContentUnavailable(e.to_string()))?;
        Ok(Bytes::from(buffer))
    }

    async fn write_all(&mut self, data: &[u8]) -> RepoResult<()> {
        let write_through = self.write_through;
        let file = self.handle()?;
        file.write_all(data).await?;
        if write_through {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(())
    }
}

struct MountedDirectory {
    real: PathBuf,
}

#[async_trait]
impl ShareHandle for MountedDirectory {
    async fn close(&mut self) -> RepoResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ShareDirectory for MountedDirectory {
    async fn list(&self, pattern: &str) -> RepoResult<Vec<DirectoryEntry>> {
        let pattern = compile_pattern(pattern)?;
        let mut entries = Vec::new();
        let mut reader = fs::read_dir(&self.real).await?;
        while let Some(entry) = reader.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !pattern.matches(&file_name) {
                continue;
            }
            let meta = entry.metadata().await?;
            entries.push(DirectoryEntry {
                attributes: attributes_of(&file_name, &meta),
                end_of_file: if meta.is_dir() { 0 } else { meta.len() },
                file_name,
            });
        }
        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        let mut listing = Vec::with_capacity(entries.len() + 2);
        for name in [".", ".."] {
            if pattern.matches(name) {
                listing.push(navigation_entry(name));
            }
        }
        listing.extend(entries);
        Ok(listing)
    }
}
