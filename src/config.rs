use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_limit() -> u32 {
    10
}

fn default_refresh_secs() -> u32 {
    2
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub page: PageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// SQLite file holding the persisted collections.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PageConfig {
    pub path: Option<PathBuf>,
    /// Auto-refresh interval written into the page; 0 disables it.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u32,
    pub downloads_dir: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            default_limit: default_limit(),
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        PageConfig {
            path: None,
            refresh_secs: default_refresh_secs(),
            downloads_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&Self::get_config_path())
    }

    pub fn load_from(config_path: &Path) -> Self {
        let mut config = if config_path.exists() {
            match fs::read_to_string(config_path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => config,
                    Err(e) => {
                        warn!("Error parsing {}: {}. Using defaults.", config_path.display(), e);
                        Config::default()
                    }
                },
                Err(e) => {
                    warn!("Error reading {}: {}. Using defaults.", config_path.display(), e);
                    Config::default()
                }
            }
        } else {
            Config::default()
        };

        if let Ok(base_url) = std::env::var("ARXIV_CHAT_BACKEND") {
            config.backend.base_url = base_url;
        }

        config
    }

    pub fn storage_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| Self::get_config_dir().join("storage.sqlite"))
    }

    pub fn page_path(&self) -> PathBuf {
        self.page
            .path
            .clone()
            .unwrap_or_else(|| Self::get_config_dir().join("page.html"))
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.page
            .downloads_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.toml")
    }

    pub fn get_config_dir() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/arxiv-chat")
        } else {
            PathBuf::from(".")
        }
    }
}
