use crate::core::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::utils::get_data_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.json";
pub const DATABASE_FILE: &str = "fireflow.db";

pub const ENV_DB_PATH: &str = "FIREFLOW_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "FIREFLOW_LOG_LEVEL";

/// Application configuration, stored as JSON in the data directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file; `None` means `<data_dir>/fireflow.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// `trace`, `debug`, `info`, `warn` or `error`
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Write logs to `<state_dir>/fireflow.log` instead of stderr
    #[serde(default)]
    pub log_to_file: bool,
    /// How long a writer waits on a locked database before giving up
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_true")]
    pub audit_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: default_log_level(),
            log_to_file: false,
            busy_timeout_ms: default_busy_timeout(),
            default_page_size: default_page_size(),
            audit_enabled: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_busy_timeout() -> u64 {
    5000
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Resolved database location, or `None` if no data directory exists
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(|| get_data_dir().map(|dir| dir.join(DATABASE_FILE)))
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Page size clamped into the accepted `1..=100` window
    pub fn page_size(&self) -> u32 {
        self.default_page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Parsed log level; unknown names fall back to `info`
    pub fn log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }

    /// Applies `FIREFLOW_DB_PATH` and `FIREFLOW_LOG_LEVEL` when set
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_DB_PATH).ok(),
            std::env::var(ENV_LOG_LEVEL).ok(),
        );
    }

    fn apply_overrides(&mut self, db_path: Option<String>, log_level: Option<String>) {
        if let Some(path) = db_path.filter(|p| !p.trim().is_empty()) {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(level) = log_level.filter(|l| !l.trim().is_empty()) {
            self.log_level = level.trim().to_lowercase();
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    get_data_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Saves the app config to disk using an atomic write pattern.
/// 1. Writes to a temporary file.
/// 2. Sets restrictive permissions (0o600).
/// 3. Atomically renames to the target path.
///
/// # Security
///
/// On Unix systems, files are created with mode 0o600 (user read/write only).
/// On Windows, files inherit directory permissions.
pub async fn save_config_to(config: &AppConfig, path: &Path) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    let temp_path = path.with_extension("json.tmp");

    // Create file with restrictive permissions from the start to prevent
    // race condition where file is briefly world-readable
    #[cfg(unix)]
    {
        use tokio::fs::OpenOptions;
        use tokio::io::AsyncWriteExt;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(&temp_path)
            .await?;

        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
    }

    #[cfg(not(unix))]
    {
        use tokio::io::AsyncWriteExt;

        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
    }

    tokio::fs::rename(&temp_path, path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::StorageFull {
            std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                "Disk full: cannot save configuration. Free up space and try again.",
            )
        } else {
            e
        }
    })
}

/// Loads the app config from the data directory, falling back to defaults,
/// then applies environment overrides.
pub async fn load_config() -> AppConfig {
    let mut config = match config_path() {
        Some(path) => load_config_from(&path).await,
        None => AppConfig::default(),
    };
    config.apply_env_overrides();
    config
}

/// Loads a config file; a missing or malformed file yields the defaults.
pub async fn load_config_from(path: &Path) -> AppConfig {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => match serde_json::from_str::<AppConfig>(&json) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring malformed config {}: {}", path.display(), e);
                AppConfig::default()
            }
        },
        Err(_) => AppConfig::default(),
    }
}
