//! Builder for creating and configuring Workflow instances.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use log::debug;
use tokio::task;

use super::Workflow;
use crate::{
    config::WorkflowConfig,
    db::Database,
    error::{Result, WorkflowError},
    photo::{
        Connectivity, ConnectivityFlag, Geolocator, LocalDirectoryStorage, NoGeolocation, PhotoPipeline,
        PhotoStorage,
    },
};

const APP_PREFIX: &str = "ppf";

/// Builder for creating and configuring Workflow instances.
#[derive(Default)]
pub struct WorkflowBuilder {
    database_path: Option<PathBuf>,
    config: Option<WorkflowConfig>,
    storage: Option<Arc<dyn PhotoStorage>>,
    connectivity: Option<Arc<dyn Connectivity>>,
    geolocator: Option<Arc<dyn Geolocator>>,
}

impl WorkflowBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a custom database file path.
    ///
    /// If not specified, uses XDG Base Directory specification:
    /// `$XDG_DATA_HOME/ppf/ppf.db` or `~/.local/share/ppf/ppf.db`
    pub fn with_database_path<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        if let Some(path) = path {
            self.database_path = Some(path.as_ref().to_path_buf());
        }
        self
    }

    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Loads the configuration from a JSON file when a path is given.
    pub fn with_config_file<P: AsRef<Path>>(mut self, path: Option<P>) -> Result<Self> {
        if let Some(path) = path {
            self.config = Some(WorkflowConfig::from_json_file(path)?);
        }
        Ok(self)
    }

    /// Photo storage service. Defaults to a local directory under
    /// `$XDG_DATA_HOME/ppf/photos`.
    pub fn with_storage(mut self, storage: Arc<dyn PhotoStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Connectivity probe. Defaults to always online.
    pub fn with_connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Position provider. Defaults to none.
    pub fn with_geolocator(mut self, geolocator: Arc<dyn Geolocator>) -> Self {
        self.geolocator = Some(geolocator);
        self
    }

    /// Builds the configured workflow instance.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Configuration` if the configuration is invalid
    /// Returns `WorkflowError::FileSystem` if the database path is invalid
    /// Returns `WorkflowError::Database` if database initialization fails
    pub async fn build(self) -> Result<Workflow> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let db_path = match self.database_path {
            Some(path) => path,
            None => Self::default_database_path()?,
        };

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| WorkflowError::FileSystem {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let db_path_clone = db_path.clone();
        task::spawn_blocking(move || {
            let _db = Database::new(&db_path_clone)?;
            Ok::<(), WorkflowError>(())
        })
        .await
        .map_err(WorkflowError::join)??;

        let storage = match self.storage {
            Some(storage) => storage,
            None => Arc::new(LocalDirectoryStorage::new(Self::default_photo_dir()?)),
        };
        let connectivity = self
            .connectivity
            .unwrap_or_else(|| Arc::new(ConnectivityFlag::default()));
        let geolocator = self.geolocator.unwrap_or_else(|| Arc::new(NoGeolocation));

        debug!("Workflow database at {}", db_path.display());
        let config = Arc::new(config);
        let photos = PhotoPipeline::new(Arc::clone(&config), storage, connectivity, geolocator);
        Ok(Workflow::new(db_path, config, photos))
    }

    /// Returns the default database path following XDG Base Directory
    /// specification.
    fn default_database_path() -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix(APP_PREFIX)
            .place_data_file("ppf.db")
            .map_err(|e| WorkflowError::XdgDirectory(e.to_string()))
    }

    fn default_photo_dir() -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix(APP_PREFIX)
            .create_data_directory("photos")
            .map_err(|e| WorkflowError::XdgDirectory(e.to_string()))
    }
}
