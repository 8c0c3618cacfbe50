use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::models::{EntryMeta, StoredResponse};

/// Extension for the metadata half of an entry
const META_EXT: &str = "json";

/// Extension for the body half of an entry
const BODY_EXT: &str = "body";

/// Owns the bucket root directory and the bucket lifecycle.
pub struct CacheManager {
    root: PathBuf,
}

impl CacheManager {
    pub fn new(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create cache root: {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Open a bucket, creating its directory if absent.
    pub fn open_bucket(&self, name: &str) -> Result<CacheBucket> {
        let dir = self.root.join(name);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache bucket: {}", name))?;
        Ok(CacheBucket {
            name: name.to_string(),
            dir,
        })
    }

    pub fn bucket_exists(&self, name: &str) -> bool {
        self.root.join(name).is_dir()
    }

    /// Enumerate bucket names. Stray files in the root are ignored.
    pub fn list_buckets(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read cache root: {}", self.root.display()))?;
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn remove_bucket(&self, name: &str) -> Result<()> {
        let dir = self.root.join(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to remove cache bucket: {}", name))?;
        }
        Ok(())
    }

    /// Delete every bucket whose name differs from `keep`.
    /// Returns the removed names. No rollback.
    pub fn purge_except(&self, keep: &str) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for name in self.list_buckets()? {
            if name != keep {
                self.remove_bucket(&name)?;
                removed.push(name);
            }
        }
        Ok(removed)
    }

    /// Per-bucket status rows for display, active bucket flagged.
    pub fn statuses(&self, active: &str) -> Result<Vec<BucketStatus>> {
        let mut statuses = Vec::new();
        for name in self.list_buckets()? {
            let bucket = CacheBucket {
                dir: self.root.join(&name),
                name: name.clone(),
            };
            statuses.push(BucketStatus {
                entries: bucket.len()?,
                last_stored: bucket.last_stored()?,
                active: name == active,
                name,
            });
        }
        Ok(statuses)
    }
}

/// One version's URL -> response store.
pub struct CacheBucket {
    name: String,
    dir: PathBuf,
}

impl CacheBucket {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable filename for a URL. Hashing sidesteps path-hostile characters
    /// and length limits in asset URLs.
    fn entry_key(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, META_EXT))
    }

    fn body_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, BODY_EXT))
    }

    /// Store an entry, replacing any previous entry for the same URL.
    ///
    /// Body first, metadata second: an entry without metadata reads as
    /// absent, so a write interrupted between the two files degrades to a
    /// miss rather than a corrupt hit.
    pub fn put(&self, response: &StoredResponse) -> Result<()> {
        let key = Self::entry_key(&response.meta.url);
        std::fs::write(self.body_path(&key), &response.body)
            .with_context(|| format!("Failed to write body for {}", response.meta.url))?;
        let contents = serde_json::to_string_pretty(&response.meta)?;
        std::fs::write(self.meta_path(&key), contents)
            .with_context(|| format!("Failed to write metadata for {}", response.meta.url))?;
        Ok(())
    }

    /// Look up an entry by URL. Absent entries are `Ok(None)`; a damaged
    /// entry is an error for the caller to degrade as it sees fit.
    pub fn get(&self, url: &str) -> Result<Option<StoredResponse>> {
        let key = Self::entry_key(url);
        let meta_path = self.meta_path(&key);
        if !meta_path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&meta_path)
            .with_context(|| format!("Failed to read cache metadata for {}", url))?;
        let meta: EntryMeta = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache metadata for {}", url))?;
        let body = std::fs::read(self.body_path(&key))
            .with_context(|| format!("Failed to read cached body for {}", url))?;

        Ok(Some(StoredResponse { meta, body }))
    }

    pub fn contains(&self, url: &str) -> bool {
        self.meta_path(&Self::entry_key(url)).exists()
    }

    /// Number of complete entries.
    pub fn len(&self) -> Result<usize> {
        Ok(self.meta_files()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// URLs of all readable entries. Damaged metadata is logged and skipped.
    pub fn urls(&self) -> Result<Vec<String>> {
        let mut urls = Vec::new();
        for path in self.meta_files()? {
            match self.read_meta(&path) {
                Ok(meta) => urls.push(meta.url),
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "Skipping unreadable cache entry");
                }
            }
        }
        urls.sort();
        Ok(urls)
    }

    /// Most recent `stored_at` across readable entries.
    pub fn last_stored(&self) -> Result<Option<DateTime<Utc>>> {
        let mut latest = None;
        for path in self.meta_files()? {
            match self.read_meta(&path) {
                Ok(meta) => {
                    if latest.map(|t| meta.stored_at > t).unwrap_or(true) {
                        latest = Some(meta.stored_at);
                    }
                }
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "Skipping unreadable cache entry");
                }
            }
        }
        Ok(latest)
    }

    fn meta_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read cache bucket: {}", self.name))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(META_EXT) {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn read_meta(&self, path: &Path) -> Result<EntryMeta> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Display row for one bucket.
#[derive(Debug)]
pub struct BucketStatus {
    pub name: String,
    pub entries: usize,
    pub last_stored: Option<DateTime<Utc>>,
    pub active: bool,
}

impl BucketStatus {
    pub fn age_display(&self) -> String {
        match self.last_stored {
            Some(at) => format_age(at),
            None => "empty".to_string(),
        }
    }
}

/// Coarse human-readable age ("just now", "5m ago", "2h ago", "3d ago").
fn format_age(at: DateTime<Utc>) -> String {
    let minutes = (Utc::now() - at).num_minutes();
    // Covers clock skew (negative ages) as well
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }
    if minutes < 1440 {
        // Round up past the half hour
        let hours = minutes / 60 + i64::from(minutes % 60 >= 30);
        return format!("{}h ago", hours);
    }
    let days = minutes / 1440 + i64::from((minutes % 1440) / 60 >= 12);
    format!("{}d ago", days)
}
