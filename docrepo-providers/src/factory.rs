//! Backend selection

use docrepo_core::{Backend, FileHandler, FolderHandler, RepoError, RepoResult, Settings};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cmis::{CmisConnector, CmisFileHandler, CmisFolderHandler};
use crate::smb::{MountedShareConnector, ShareConnector, SmbFileHandler, SmbFolderHandler};

/// File and folder handler of one backend
#[derive(Clone)]
pub struct HandlerPair {
    pub file: Arc<dyn FileHandler>,
    pub folder: Arc<dyn FolderHandler>,
}

/// Hands out the handlers of every registered backend
pub struct HandlerFactory {
    settings: Arc<Settings>,
    handlers: HashMap<Backend, HandlerPair>,
}

impl HandlerFactory {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            handlers: HashMap::new(),
        }
    }

    /// Register every backend the settings describe. Connections are made on
    /// first use, not here.
    pub fn from_settings(settings: Arc<Settings>) -> Self {
        let mut factory = Self::new(settings.clone());

        if settings.cmis.is_configured() {
            info!("Registering CMIS backend at {}", settings.cmis.host);
            factory = factory.with_cmis(Arc::new(CmisConnector::new(settings.cmis.clone())));
        }
        match MountedShareConnector::from_settings(&settings.smb) {
            Ok(connector) => {
                info!("Registering SMB backend at {}", connector.mount_point().display());
                factory = factory.with_smb(Arc::new(connector));
            }
            Err(e) if settings.smb.mount_point.is_none() => {
                debug!("SMB backend not registered: {}", e);
            }
            Err(e) => warn!("SMB backend not registered: {}", e),
        }
        factory
    }

    pub fn with_cmis(mut self, connector: Arc<CmisConnector>) -> Self {
        let pair = HandlerPair {
            file: Arc::new(CmisFileHandler::new(connector.clone())),
            folder: Arc::new(CmisFolderHandler::new(connector, self.settings.clone())),
        };
        self.register(Backend::Cmis, pair);
        self
    }

    pub fn with_smb(mut self, connector: Arc<dyn ShareConnector>) -> Self {
        let pair = HandlerPair {
            file: Arc::new(SmbFileHandler::new(connector.clone())),
            folder: Arc::new(SmbFolderHandler::new(connector, self.settings.clone())),
        };
        self.register(Backend::Smb, pair);
        self
    }

    pub fn register(&mut self, backend: Backend, pair: HandlerPair) {
        debug!("Registered handlers for {}", backend);
        self.handlers.insert(backend, pair);
    }

    fn pair(&self, backend: Backend) -> RepoResult<&HandlerPair> {
        self.handlers
            .get(&backend)
            .ok_or_else(|| RepoError::UnsupportedBackend(backend.to_string()))
    }

    pub fn file_handler_for(&self, backend: Backend) -> RepoResult<Arc<dyn FileHandler>> {
        self.pair(backend).map(|pair| pair.file.clone())
    }

    pub fn folder_handler_for(&self, backend: Backend) -> RepoResult<Arc<dyn FolderHandler>> {
        self.pair(backend).map(|pair| pair.folder.clone())
    }

    /// Resolve a backend by name, e.g. `"cmis"` or `"smb"`
    pub fn file_handler(&self, name: &str) -> RepoResult<Arc<dyn FileHandler>> {
        self.file_handler_for(name.parse()?)
    }

    pub fn folder_handler(&self, name: &str) -> RepoResult<Arc<dyn FolderHandler>> {
        self.folder_handler_for(name.parse()?)
    }

    pub fn backends(&self) -> Vec<Backend> {
        let mut backends: Vec<Backend> = self.handlers.keys().copied().collect();
        backends.sort_by_key(|b| b.as_str());
        backends
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl Default for HandlerFactory {
    fn default() -> Self {
        Self::new(Arc::new(Settings::default()))
    }
}
