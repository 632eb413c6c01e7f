use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use xdg::BaseDirectories;

use crate::config::APP_NAME;
use crate::types::MergeProposal;

pub const DEFAULT_TTL_SECS: u64 = 300; // 5 minutes

/// Sanitize a cache key to prevent path traversal.
/// Only allows alphanumeric characters, underscores, hyphens, and single dots (not ".." sequences).
/// Returns a sanitized string with '/' replaced by '_'.
pub fn sanitize_key(key: &str) -> Result<String> {
    if key.is_empty() {
        anyhow::bail!("Invalid cache key: empty");
    }
    if key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
        anyhow::bail!("Invalid cache key: contains path traversal pattern");
    }

    // `~owner/project` style names become `owner_project`
    let sanitized = key.trim_start_matches('~').replace(['/', '~'], "_");

    for c in sanitized.chars() {
        if !c.is_alphanumeric() && c != '_' && c != '-' && c != '.' {
            anyhow::bail!("Invalid cache key: contains invalid character '{}'", c);
        }
    }

    if sanitized.starts_with('.') {
        anyhow::bail!("Invalid cache key: cannot start with a dot");
    }

    Ok(sanitized)
}

pub enum CacheResult<T> {
    Hit(T),
    Stale(T),
    Miss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffTextEntry {
    pub diff_id: u64,
    pub diff_text: String,
    pub created_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingCacheEntry {
    pub merge_proposals: Vec<MergeProposal>,
    pub created_at: u64,
}

/// On-disk cache rooted at one directory (normally `~/.cache/launchpad-mp/`).
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/.cache/launchpad-mp/`
    pub fn default_dir() -> PathBuf {
        BaseDirectories::with_prefix(APP_NAME)
            .map(|dirs| dirs.get_cache_home())
            .unwrap_or_else(|_| PathBuf::from(".cache"))
    }

    fn diff_text_path(&self, diff_id: u64) -> PathBuf {
        self.dir.join("diffs").join(format!("{}.json", diff_id))
    }

    /// `{dir}/listings/{key}.json`
    pub fn listing_path(&self, key: &str) -> Result<PathBuf> {
        let sanitized = sanitize_key(key)?;
        Ok(self.dir.join("listings").join(format!("{}.json", sanitized)))
    }

    /// Checkout directory for a repository branch.
    pub fn repo_dir(&self, repo: &str, branch: &str) -> Result<PathBuf> {
        Ok(self.dir.join("repos").join(format!(
            "{}@{}",
            sanitize_key(repo)?,
            sanitize_key(branch)?
        )))
    }

    /// Preview diffs never change once published, so cached text has no TTL.
    pub fn read_diff_text(&self, diff_id: u64) -> Result<Option<String>> {
        let path = self.diff_text_path(diff_id);
        if !path.exists() {
            return Ok(None);
        }
        let entry: DiffTextEntry = read_json(&path)?;
        debug!(diff_id, "diff text cache hit");
        Ok(Some(entry.diff_text))
    }

    pub fn write_diff_text(&self, diff_id: u64, diff_text: &str) -> Result<()> {
        let entry = DiffTextEntry {
            diff_id,
            diff_text: diff_text.to_string(),
            created_at: now_secs()?,
        };
        write_json(&self.diff_text_path(diff_id), &entry)
    }

    pub fn read_listing(
        &self,
        key: &str,
        ttl_secs: u64,
    ) -> Result<CacheResult<Vec<MergeProposal>>> {
        let path = self.listing_path(key)?;
        if !path.exists() {
            return Ok(CacheResult::Miss);
        }

        let entry: ListingCacheEntry = read_json(&path)?;
        let age = now_secs()?.saturating_sub(entry.created_at);

        if age <= ttl_secs {
            Ok(CacheResult::Hit(entry.merge_proposals))
        } else {
            Ok(CacheResult::Stale(entry.merge_proposals))
        }
    }

    pub fn write_listing(&self, key: &str, merge_proposals: &[MergeProposal]) -> Result<()> {
        let entry = ListingCacheEntry {
            merge_proposals: merge_proposals.to_vec(),
            created_at: now_secs()?,
        };
        write_json(&self.listing_path(key)?, &entry)
    }

    pub fn invalidate_listing(&self, key: &str) -> Result<()> {
        let path = self.listing_path(key)?;
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

fn now_secs() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)?
        .as_secs())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cache file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse cache file {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    Ok(())
}
