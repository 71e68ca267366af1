//! docrepo core
//!
//! Backend-independent document tree model, handler traits, configuration
//! and search strategies shared by the CMIS and SMB providers.

pub mod config;
pub mod entry;
pub mod error;
pub mod handler;
pub mod mime;
pub mod path;
pub mod strategy;

pub use config::{PatternTable, SearchSettings, Settings, StrategyMode};
pub use entry::{DocumentEntry, DocumentFile, DocumentFolder};
pub use error::{RepoError, RepoResult};
pub use handler::{Backend, FileHandler, FolderHandler};
pub use path::PathConvention;
pub use strategy::{IgnoreList, MachineAndOrder, SearchPattern, Tool};
