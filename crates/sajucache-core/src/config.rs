//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the deployed app origin, the precache manifest location, and an optional
//! override for the bucket root.
//!
//! Configuration is stored at `~/.config/sajucache/config.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "sajucache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default manifest location, relative to the working directory
const DEFAULT_MANIFEST: &str = "precache.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub origin: Option<String>,
    pub manifest_path: Option<PathBuf>,
    pub cache_root: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// The bucket root directory.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref root) = self.cache_root {
            return Ok(root.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Where the per-build precache manifest lives.
    pub fn manifest_path(&self) -> PathBuf {
        self.manifest_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST))
    }

    /// The configured app origin, parsed. Required for every command.
    pub fn origin_url(&self) -> Result<Url> {
        let origin = self
            .origin
            .as_deref()
            .context("No app origin configured; set \"origin\" in config.json")?;
        Url::parse(origin).with_context(|| format!("Invalid app origin: {}", origin))
    }
}
