use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;
use tracing::info;

use crate::lock::DEFAULT_LOCK_DIR;
use crate::types::error::DatastoreError;

/// Global configuration instance
static CONFIG: OnceCell<RwLock<DatastoreConfig>> = OnceCell::new();

/// Datastore configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatastoreConfig {
    /// SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory holding one `<namespace_id>.lock` file per namespace
    #[serde(default = "default_lock_dir")]
    pub lock_dir: PathBuf,

    /// Bounded wait for the namespace lock; absent means block indefinitely
    #[serde(default)]
    pub lock_timeout_ms: Option<u64>,

    /// Maximum pooled connections
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// How long SQLite waits on its own file lock before reporting busy
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("eddie.chat")
        .join("datastore.db")
}

fn default_lock_dir() -> PathBuf {
    PathBuf::from(DEFAULT_LOCK_DIR)
}

fn default_pool_size() -> u32 {
    8
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            lock_dir: default_lock_dir(),
            lock_timeout_ms: None,
            pool_size: default_pool_size(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl DatastoreConfig {
    /// Parse a TOML document, filling in defaults for missing keys.
    pub fn from_toml_str(content: &str) -> Result<Self, DatastoreError> {
        let config: DatastoreConfig = toml::from_str(content)
            .map_err(|e| DatastoreError::Config(format!("Failed to parse config: {}", e)))?;

        if config.pool_size == 0 {
            return Err(DatastoreError::Config("pool_size must be at least 1".into()));
        }

        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn from_path(path: &Path) -> Result<Self, DatastoreError> {
        let content = fs::read_to_string(path).map_err(|e| {
            DatastoreError::Config(format!("Failed to read config {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// The first config file that exists among `candidates`, or defaults.
    pub fn discover<I>(candidates: I) -> Result<Self, DatastoreError>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        match candidates.into_iter().find(|path| path.is_file()) {
            Some(path) => {
                info!("Loading datastore config from {:?}", path);
                Self::from_path(&path)
            }
            None => {
                info!("No datastore config found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Where `init_config` looks, in order: the XDG config dir, `~/.config`,
/// then a dotfile in the home directory.
pub fn default_config_paths() -> Vec<PathBuf> {
    let home = dirs::home_dir();

    dirs::config_dir()
        .into_iter()
        .chain(home.iter().map(|h| h.join(".config")))
        .map(|dir| dir.join("eddie.chat").join("datastore.toml"))
        .chain(home.iter().map(|h| h.join(".eddie-datastore.toml")))
        .collect()
}

/// Load the first config found in `default_config_paths()` and make it global.
pub fn init_config() -> Result<DatastoreConfig, DatastoreError> {
    install(DatastoreConfig::discover(default_config_paths())?)
}

/// Load `path` and make it the global config.
pub fn init_config_from_path(path: &Path) -> Result<DatastoreConfig, DatastoreError> {
    install(DatastoreConfig::from_path(path)?)
}

/// Snapshot of the global configuration (defaults if never initialized)
pub fn get_config() -> Result<DatastoreConfig, DatastoreError> {
    match CONFIG.get() {
        Some(cell) => cell
            .read()
            .map(|config| config.clone())
            .map_err(|e| DatastoreError::Config(format!("Config lock poisoned: {}", e))),
        None => Ok(DatastoreConfig::default()),
    }
}

fn install(config: DatastoreConfig) -> Result<DatastoreConfig, DatastoreError> {
    let cell = CONFIG.get_or_init(|| RwLock::new(config.clone()));
    let mut current = cell
        .write()
        .map_err(|e| DatastoreError::Config(format!("Config lock poisoned: {}", e)))?;
    *current = config.clone();
    Ok(config)
}
