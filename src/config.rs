use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{MoodsError, MoodsResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub tags: TagsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// GraphQL endpoint, e.g. `http://192.168.1.10:8000/graphql`.
    #[serde(default = "default_api_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:8000/graphql".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    #[serde(default = "default_timeline_page_size")]
    pub page_size: u32,
    /// Background re-fetch period while a scope is active.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            page_size: default_timeline_page_size(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_timeline_page_size() -> u32 {
    20
}

fn default_poll_interval_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagsConfig {
    #[serde(default = "default_tags_page_size")]
    pub page_size: u32,
    /// Number of suggestions fetched by the composer's tag picker.
    #[serde(default = "default_picker_page_size")]
    pub picker_page_size: u32,
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            page_size: default_tags_page_size(),
            picker_page_size: default_picker_page_size(),
        }
    }
}

fn default_tags_page_size() -> u32 {
    30
}

fn default_picker_page_size() -> u32 {
    50
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Overrides the session file location. Defaults to the platform data dir.
    #[serde(default)]
    pub session_file: Option<PathBuf>,
}

impl StorageConfig {
    /// `<data dir>/moods/session.toml`, falling back to the working directory.
    pub fn session_path(&self) -> PathBuf {
        if let Some(path) = &self.session_file {
            return path.clone();
        }
        let base = dirs::data_local_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("moods").join("session.toml")
    }
}

impl AppConfig {
    /// Applies `MOODS_API_URL` from the environment (or `.env`) on top of the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("MOODS_API_URL") {
            if !url.trim().is_empty() {
                tracing::debug!(url = %url, "api url overridden from environment");
                self.api.url = url.trim().to_string();
            }
        }
    }
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Some(candidate);
            }
        }
    }

    let cwd = std::env::current_dir().ok()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Some(candidate);
    }

    None
}

/// Loads `config.toml`, or defaults when no file exists. Environment overrides always apply.
pub fn load_config() -> MoodsResult<AppConfig> {
    let mut config = match resolve_config_path() {
        Some(path) => load_config_from(&path)?,
        None => {
            tracing::info!("no config.toml found; using defaults");
            AppConfig::default()
        }
    };
    config.apply_env_overrides();
    Ok(config)
}

pub fn load_config_from(path: &Path) -> MoodsResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    if config.timeline.page_size == 0 || config.tags.page_size == 0 {
        return Err(MoodsError::Config("page_size must be greater than zero".into()));
    }
    if config.timeline.poll_interval_secs == 0 {
        return Err(MoodsError::Config("poll_interval_secs must be greater than zero".into()));
    }
    tracing::info!(path = %path.display(), api = %config.api.url, "config loaded");
    Ok(config)
}
