use crate::error::Result;
use crate::models::{CommitFingerprint, RecentCommit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const DEFAULT_CACHE_PATH: &str = ".cache-runtime/stats.json";
pub const CACHE_VERSION: u32 = 1;

/// Contents of the runtime cache file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeCache {
    pub version: u32,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_changed: Option<LinesChangedEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_commits: Option<RecentCommitsEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinesChangedEntry {
    pub additions: u64,
    pub deletions: u64,
    /// Newest commit already counted in the totals
    pub last_commit_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentCommitsEntry {
    pub fingerprints: Vec<CommitFingerprint>,
    #[serde(default)]
    pub commits: Vec<RecentCommit>,
    pub last_checked: DateTime<Utc>,
}

/// JSON file shared by the incremental statistics.
///
/// Writes go through [`CacheStore::update`], which re-reads the file under a
/// lock so concurrent statistics do not clobber each other's entries.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cache. Missing, corrupt or outdated files read as `None`.
    pub async fn load(&self) -> Option<RuntimeCache> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn read(&self) -> Option<RuntimeCache> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No runtime cache");
                return None;
            }
        };

        let cache: RuntimeCache = match serde_json::from_str(&raw) {
            Ok(cache) => cache,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable runtime cache");
                return None;
            }
        };

        if cache.version != CACHE_VERSION {
            warn!(
                found = cache.version,
                expected = CACHE_VERSION,
                "Ignoring runtime cache with a different version"
            );
            return None;
        }

        Some(cache)
    }

    /// Applies `f` to the current contents and writes the result back.
    pub async fn update<F>(&self, f: F) -> Result<RuntimeCache>
    where
        F: FnOnce(&mut RuntimeCache),
    {
        let _guard = self.lock.lock().await;

        let mut cache = self.read().await.unwrap_or_default();
        f(&mut cache);
        cache.version = CACHE_VERSION;
        cache.updated_at = Some(Utc::now());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let payload = serde_json::to_string_pretty(&cache)?;
        tokio::fs::write(&self.path, payload).await?;

        debug!(path = %self.path.display(), "Runtime cache saved");
        Ok(cache)
    }
}
