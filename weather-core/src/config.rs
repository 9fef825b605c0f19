use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, fs, path::PathBuf, time::Duration};

use tracing::warn;

use crate::model::City;

/// The database port is fixed; only the host is configurable.
pub const DB_PORT: u16 = 5432;

pub const DEFAULT_API_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DATA_DIR: &str = "data/weather_raw";

/// Settings for the weather HTTP API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Connection settings for the relational sink.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub name: String,
    pub user: String,
    pub password: String,
    pub host: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: "weather".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            host: "localhost".to_string(),
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &DB_PORT)
            .finish()
    }
}

/// Everything a pipeline run needs, passed in explicitly rather than read from globals.
///
/// Example TOML:
/// ```toml
/// data_dir = "data/weather_raw"
///
/// [[cities]]
/// name = "London"
/// latitude = 51.5072
/// longitude = -0.1276
///
/// [database]
/// host = "db.internal"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    /// Fetched in this order; the batch keeps it.
    pub cities: Vec<City>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            api: ApiConfig::default(),
            database: DatabaseConfig::default(),
            cities: default_cities(),
        }
    }
}

pub fn default_cities() -> Vec<City> {
    vec![
        City::new("London", 51.5072, -0.1276),
        City::new("New York", 40.7128, -74.0060),
        City::new("Tokyo", 35.6895, 139.6917),
    ]
}

impl PipelineConfig {
    /// Load config from `path` (or the platform default), then apply environment overrides.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        Self::load_with(path, Self::config_file_path, |key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) with the platform path and environment supplied by the caller.
    ///
    /// An unresolvable platform path falls back to defaults; an explicit path never does.
    pub fn load_with<P, F>(path: Option<PathBuf>, platform_path: P, lookup: F) -> Result<Self>
    where
        P: FnOnce() -> Result<PathBuf>,
        F: Fn(&str) -> Option<String>,
    {
        let path = match path {
            Some(path) => Some(path),
            None => match platform_path() {
                Ok(path) => Some(path),
                Err(err) => {
                    warn!(error = %err, "no config directory; using built-in defaults");
                    None
                }
            },
        };

        let mut cfg = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        cfg.apply_env_overrides(lookup)?;
        cfg.validate()?;

        Ok(cfg)
    }

    /// Read a TOML file, or return defaults if it doesn't exist yet.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: PipelineConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-etl")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Override individual settings from environment-style variables.
    ///
    /// Unset or blank variables leave the current value alone.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(name) = get("DB_NAME") {
            self.database.name = name;
        }
        if let Some(user) = get("DB_USER") {
            self.database.user = user;
        }
        if let Some(password) = get("DB_PASSWORD") {
            self.database.password = password;
        }
        if let Some(host) = get("DB_HOST") {
            self.database.host = host;
        }
        if let Some(dir) = get("WEATHER_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = get("WEATHER_API_URL") {
            self.api.base_url = url;
        }
        if let Some(secs) = get("WEATHER_API_TIMEOUT_SECS") {
            self.api.timeout_secs = secs
                .parse()
                .with_context(|| format!("WEATHER_API_TIMEOUT_SECS is not a number: {secs}"))?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.cities.is_empty() {
            bail!("No cities configured.");
        }
        if self.api.timeout_secs == 0 {
            bail!("API timeout must be at least one second.");
        }

        let mut seen = HashSet::new();
        for city in &self.cities {
            if !seen.insert(city.name.as_str()) {
                bail!("City '{}' is configured more than once.", city.name);
            }
        }

        Ok(())
    }
}
