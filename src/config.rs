use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use directories_next::ProjectDirs;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub base_url: String,
    pub port: u16,
    pub database: Database,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub ids: Ids,
    #[serde(default)]
    pub sweep: Sweep,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl Database {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Limits {
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: usize,
    #[serde(default = "default_max_title_len")]
    pub max_title_len: usize,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

impl Limits {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_upload_size: default_max_upload_size(),
            max_title_len: default_max_title_len(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

/// Short identifier generation.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Ids {
    #[serde(default = "default_id_length")]
    pub length: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for Ids {
    fn default() -> Self {
        Ids {
            length: default_id_length(),
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Sweep {
    /// Run the expiry sweeper this often while serving. Disabled when unset.
    pub interval_secs: Option<u64>,
}

impl Config {
    /// Load the config from `path`, or from the platform config directory.
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_owned(),
            None => default_path().context("could not determine config directory")?,
        };

        let contents = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read config at {}", path.display()))?;

        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).context("failed to parse config")
    }
}

fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "pastebin").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    10
}

fn default_max_upload_size() -> usize {
    1024 * 1024
}

fn default_max_title_len() -> usize {
    50
}

fn default_query_timeout_secs() -> u64 {
    10
}

fn default_id_length() -> usize {
    7
}

fn default_max_attempts() -> u32 {
    16
}
