use std::path::{Path, PathBuf};

use storepilot_common::{Error, Result};
use tracing::{debug, info};

use crate::model::AppConfig;

const ENV_PREFIX: &str = "STOREPILOT_";

/// Loads `AppConfig` from a YAML or TOML file, then applies `STOREPILOT_*`
/// environment overrides.
pub struct ConfigLoader {
    config_dir: PathBuf,
    explicit_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_dir: default_config_dir(),
            explicit_path: None,
        }
    }

    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            explicit_path: None,
        }
    }

    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_dir);
        Self {
            config_dir,
            explicit_path: Some(path),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Default SQLite location when `storage.database_path` is unset.
    pub fn default_database_path(&self) -> PathBuf {
        self.config_dir.join("storepilot.db")
    }

    /// Full load: `.env` file, config file, process environment.
    pub fn load(&self) -> Result<AppConfig> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("loaded environment from {}", path.display());
        }
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with an injectable environment lookup.
    pub fn load_with_env<F>(&self, lookup: F) -> Result<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match self.resolve_path() {
            Some(path) => {
                info!("loading config from {}", path.display());
                read_file(&path)?
            }
            None => {
                if let Some(path) = &self.explicit_path {
                    return Err(Error::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                debug!("no config file in {}, using defaults", self.config_dir.display());
                AppConfig::default()
            }
        };

        apply_env_overrides(&mut config, &lookup)?;

        if config.storage.database_path.is_none() {
            config.storage.database_path = Some(self.default_database_path());
        }

        config.validate()?;
        Ok(config)
    }

    fn resolve_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit_path {
            return path.exists().then(|| path.clone());
        }
        ["config.yml", "config.yaml", "config.toml"]
            .iter()
            .map(|name| self.config_dir.join(name))
            .find(|p| p.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".storepilot")
}

fn read_file(path: &Path) -> Result<AppConfig> {
    let raw = std::fs::read_to_string(path)?;
    let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");
    if is_toml {
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    } else {
        serde_yaml::from_str(&raw)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }
}

fn apply_env_overrides<F>(config: &mut AppConfig, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| {
        lookup(&format!("{ENV_PREFIX}{name}"))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if let Some(v) = read("API_KEY") {
        config.assistant.api_key = Some(v);
    }
    if let Some(v) = read("ASSISTANT_ID") {
        config.assistant.assistant_id = Some(v);
    }
    if let Some(v) = read("ASSISTANT_BASE_URL") {
        config.assistant.base_url = v;
    }
    if let Some(v) = read("STORE_URL") {
        config.store.base_url = Some(v);
    }
    if let Some(v) = read("STORE_CONSUMER_KEY") {
        config.store.consumer_key = Some(v);
    }
    if let Some(v) = read("STORE_CONSUMER_SECRET") {
        config.store.consumer_secret = Some(v);
    }
    if let Some(v) = read("DEBUG") {
        config.debug = parse_bool("DEBUG", &v)?;
    }
    if let Some(v) = read("RUN_POLL_ATTEMPTS") {
        config.polling.run_poll_attempts = parse_num("RUN_POLL_ATTEMPTS", &v)?;
    }
    if let Some(v) = read("RUN_POLL_INTERVAL_MS") {
        config.polling.run_poll_interval_ms = parse_num("RUN_POLL_INTERVAL_MS", &v)?;
    }
    if let Some(v) = read("FOLLOWUP_ATTEMPTS") {
        config.polling.followup_attempts = parse_num("FOLLOWUP_ATTEMPTS", &v)?;
    }
    if let Some(v) = read("FOLLOWUP_INTERVAL_MS") {
        config.polling.followup_interval_ms = parse_num("FOLLOWUP_INTERVAL_MS", &v)?;
    }
    if let Some(v) = read("DATABASE_PATH") {
        config.storage.database_path = Some(PathBuf::from(v));
    }
    if let Some(v) = read("GATEWAY_HOST") {
        config.gateway.host = v;
    }
    if let Some(v) = read("GATEWAY_PORT") {
        config.gateway.port = parse_num("GATEWAY_PORT", &v)?;
    }
    Ok(())
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!(
            "{ENV_PREFIX}{name}: expected a boolean, got '{other}'"
        ))),
    }
}

fn parse_num<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| Error::Config(format!("{ENV_PREFIX}{name}: {e}")))
}
