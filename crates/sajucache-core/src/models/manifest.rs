//! Precache manifest model.
//!
//! The web build emits `precache.json` next to the bundles: a version string
//! and the list of asset paths (HTML shell, hashed JS/CSS bundles, icons,
//! web manifest) to fetch eagerly at install time. Bumping the version is
//! what retires every older cache bucket on the next activation.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Prefix for version-tagged bucket names
const BUCKET_PREFIX: &str = "saju-static";

/// The fixed set of assets to precache for one deployed build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecacheManifest {
    pub version: String,
    pub assets: Vec<String>,
}

impl PrecacheManifest {
    /// Load and validate a manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let manifest: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check manifest shape: a version, at least one asset, absolute paths,
    /// no duplicates.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            bail!("Manifest version is empty");
        }
        if self.assets.is_empty() {
            bail!("Manifest asset list is empty");
        }
        let mut seen = HashSet::new();
        for asset in &self.assets {
            if !asset.starts_with('/') {
                bail!("Asset path must be absolute: {}", asset);
            }
            if !seen.insert(asset.as_str()) {
                bail!("Duplicate asset path: {}", asset);
            }
        }
        Ok(())
    }

    /// The version-tagged bucket name for this build.
    pub fn bucket_name(&self) -> String {
        format!("{}-{}", BUCKET_PREFIX, self.version)
    }

    /// Resolve every asset path against the app origin.
    pub fn asset_urls(&self, origin: &Url) -> Result<Vec<Url>> {
        self.assets
            .iter()
            .map(|asset| {
                origin
                    .join(asset)
                    .with_context(|| format!("Invalid asset path: {}", asset))
            })
            .collect()
    }
}
