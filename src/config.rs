//! Runtime configuration.
//!
//! Server settings come from environment variables:
//! - `SCHEDULER_PORT` - HTTP port (default `17020`)
//! - `SCHEDULER_DB_PATH` - SQLite file (default: platform data directory)
//! - `SCHEDULER_CORS_ORIGINS` - allowed origins, comma-separated (default: any)
//!
//! Default day parameters for new schedules are read from
//! `<config dir>/presentation-scheduler/schedule.json` when present.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs::config_dir;

use crate::models::ScheduleConfig;

const APP_NAME: &str = "presentation-scheduler";
const SCHEDULE_FILE: &str = "schedule.json";

pub const DEFAULT_PORT: u16 = 17020;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Explicit database file. `None` uses the platform data directory.
    pub db_path: Option<PathBuf>,
    /// Allowed CORS origins. `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("SCHEDULER_PORT")
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let db_path = lookup("SCHEDULER_DB_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let cors_origins = lookup("SCHEDULER_CORS_ORIGINS").map(|s| {
            s.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        Self {
            port,
            db_path,
            cors_origins,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            db_path: None,
            cors_origins: None,
        }
    }
}

/// Load default schedule parameters from the user's config directory.
/// Returns built-in defaults if the file doesn't exist or fails to parse.
pub fn load_schedule_defaults() -> ScheduleConfig {
    let loaded = schedule_config_path().and_then(|path| load_schedule_file(&path));
    match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Failed to load schedule defaults, using built-ins: {:#}", e);
            ScheduleConfig::default()
        }
    }
}

/// Read a schedule configuration file. A missing file yields the defaults.
pub fn load_schedule_file(path: &Path) -> Result<ScheduleConfig> {
    if !path.exists() {
        return Ok(ScheduleConfig::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ScheduleConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(config)
}

/// Write a schedule configuration file, creating parent directories.
pub fn save_schedule_file(path: &Path, config: &ScheduleConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }
    let content = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, content).context("Failed to write config file")?;
    Ok(())
}

pub fn schedule_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(SCHEDULE_FILE);
    Ok(path)
}
