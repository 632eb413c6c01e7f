use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use xdg::BaseDirectories;

use crate::comments::ServiceLineBase;
use crate::launchpad::{Credentials, DEFAULT_API_ROOT};

pub const APP_NAME: &str = "launchpad-mp";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub launchpad: LaunchpadConfig,
    pub cache: CacheConfig,
    pub review: ReviewConfig,
    pub diff: DiffConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchpadConfig {
    pub api_root: String,
    pub consumer_key: String,
    pub oauth_token: Option<String>,
    pub oauth_token_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Lifetime of cached merge proposal listings
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub jira_prefixes: Vec<String>,
    pub ci_passed_marker: String,
    pub ci_failed_marker: String,
    /// Votes cast with this tag come from CI bots and are not reviews
    pub ci_vote_tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    pub service_line_base: ServiceLineBase,
}

impl Default for LaunchpadConfig {
    fn default() -> Self {
        Self {
            api_root: DEFAULT_API_ROOT.to_owned(),
            consumer_key: APP_NAME.to_owned(),
            oauth_token: None,
            oauth_token_secret: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: crate::cache::DEFAULT_TTL_SECS,
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            jira_prefixes: Vec::new(),
            ci_passed_marker: "PASSED: Continuous integration".to_owned(),
            ci_failed_marker: "FAILED: Continuous integration".to_owned(),
            ci_vote_tag: "continuous-integration".to_owned(),
        }
    }
}

impl Config {
    /// Load `config.toml` from the XDG config home, then apply environment
    /// overrides. A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// `LP_OAUTH_TOKEN` / `LP_OAUTH_TOKEN_SECRET` take precedence over the file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("LP_OAUTH_TOKEN").filter(|v| !v.is_empty()) {
            self.launchpad.oauth_token = Some(token);
        }
        if let Some(secret) = lookup("LP_OAUTH_TOKEN_SECRET").filter(|v| !v.is_empty()) {
            self.launchpad.oauth_token_secret = Some(secret);
        }
    }

    /// Credentials when both token halves are configured.
    pub fn credentials(&self) -> Option<Credentials> {
        let launchpad = &self.launchpad;
        match (&launchpad.oauth_token, &launchpad.oauth_token_secret) {
            (Some(token), Some(token_secret)) => Some(Credentials {
                consumer_key: launchpad.consumer_key.clone(),
                token: token.clone(),
                token_secret: token_secret.clone(),
            }),
            _ => None,
        }
    }

    fn config_path() -> PathBuf {
        BaseDirectories::with_prefix(APP_NAME)
            .map(|dirs| dirs.get_config_home())
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("config.toml")
    }
}
