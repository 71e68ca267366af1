//! Document repository backends
//!
//! CMIS content-management servers and SMB/CIFS file shares behind the
//! `FileHandler` and `FolderHandler` traits of `docrepo-core`.

pub mod cmis;
mod factory;
pub mod smb;

pub use cmis::{CmisConnector, CmisFileHandler, CmisFolderHandler, CmisSession};
#[cfg(feature = "browser-binding")]
pub use cmis::BrowserBindingSession;
pub use factory::{HandlerFactory, HandlerPair};
pub use smb::{
    DiskShare, MountedShare, MountedShareConnector, ShareConnector, SmbFileHandler,
    SmbFolderHandler,
};
