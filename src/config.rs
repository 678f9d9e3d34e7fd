// Publish Configuration Module
// Branches, paths, window length and timezone, plus repository/credential detection

use chrono_tz::Tz;
use regex::Regex;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info};

use crate::window::{DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS};

static GITHUB_REMOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com[:/](?P<owner>[^/]+)/(?P<repo>[^/.]+)").expect("static regex")
});

/// Configuration errors. All of them are fatal and raised before any
/// network I/O that depends on them.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not detect owner/repo. Set GITHUB_OWNER and GITHUB_REPO, run inside a git repo with an 'origin' remote, or run on GitHub Actions")]
    RepoUndetected,

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Publish configuration.
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Branch holding the route list
    pub source_branch: String,
    /// Branch the generated site is committed to
    pub output_branch: String,
    /// Route list path on the source branch
    pub route_file_path: String,
    /// Directory for route pages inside the output tree ("" = tree root)
    pub target_dir: String,
    /// Success marker path inside the output tree
    pub state_path: String,
    /// Days after today covered by the window (today is always included)
    pub window_days: u32,
    /// Civil timezone that defines "today"
    pub timezone: Tz,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            source_branch: "main".to_string(),
            output_branch: "gh-pages".to_string(),
            route_file_path: "routes.txt".to_string(),
            target_dir: String::new(),
            state_path: ".run-state/last_success.json".to_string(),
            window_days: DEFAULT_WINDOW_DAYS,
            timezone: chrono_tz::Europe::London,
        }
    }
}

impl PublishConfig {
    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        info!("Config loaded from {}", path.display());
        Ok(config)
    }

    /// Reject values that would produce an unusable tree.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_branch.trim().is_empty() || self.source_branch.trim().is_empty() {
            return Err(ConfigError::Invalid("branch names must not be empty".to_string()));
        }
        if self.state_path.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid("state_path must not be empty".to_string()));
        }
        if self.window_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::Invalid(format!(
                "window_days must be at most {}, got {}",
                MAX_WINDOW_DAYS, self.window_days
            )));
        }
        Ok(())
    }

    /// Output path of a page file, honouring `target_dir`.
    pub fn output_path(&self, file_name: &str) -> String {
        let dir = self.target_dir.trim_matches('/');
        if dir.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", dir, file_name)
        }
    }
}

// ---------------------------------------------------------------------------
// Repository detection
// ---------------------------------------------------------------------------

/// GitHub `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl RepoSlug {
    /// Parse `owner/repo`.
    pub fn parse(value: &str) -> Option<Self> {
        let (owner, repo) = value.split_once('/')?;
        if owner.is_empty() || repo.is_empty() {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Extract the slug from a GitHub remote URL, https or ssh form.
    pub fn from_remote_url(url: &str) -> Option<Self> {
        let caps = GITHUB_REMOTE.captures(url)?;
        Some(Self {
            owner: caps["owner"].to_string(),
            repo: caps["repo"].to_string(),
        })
    }

    /// Resolve from explicit values, in priority order: owner + repo
    /// override, then an `owner/repo` string, then a remote URL.
    pub fn resolve(
        owner: Option<&str>,
        repo: Option<&str>,
        repository: Option<&str>,
        remote_url: Option<&str>,
    ) -> Option<Self> {
        if let (Some(owner), Some(repo)) = (owner, repo) {
            if !owner.is_empty() && !repo.is_empty() {
                return Some(Self {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                });
            }
        }
        repository
            .and_then(Self::parse)
            .or_else(|| remote_url.and_then(Self::from_remote_url))
    }

    /// Detect from `GITHUB_OWNER`/`GITHUB_REPO`, `GITHUB_REPOSITORY` or the
    /// local `origin` remote.
    pub fn detect() -> Result<Self, ConfigError> {
        let owner = std::env::var("GITHUB_OWNER").ok();
        let repo = std::env::var("GITHUB_REPO").ok();
        let repository = std::env::var("GITHUB_REPOSITORY").ok();

        if let Some(slug) =
            Self::resolve(owner.as_deref(), repo.as_deref(), repository.as_deref(), None)
        {
            return Ok(slug);
        }

        let remote = git_origin_url();
        debug!("git origin remote: {:?}", remote);
        Self::resolve(None, None, None, remote.as_deref()).ok_or(ConfigError::RepoUndetected)
    }
}

fn git_origin_url() -> Option<String> {
    let output = std::process::Command::new("git")
        .args(["remote", "get-url", "origin"])
        .stderr(std::process::Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let url = String::from_utf8(output.stdout).ok()?;
    Some(url.trim().to_string())
}

/// API token from `GITHUB_TOKEN` (Actions) or `GH_TOKEN` (local PAT).
pub fn token_from_env() -> Option<SecretString> {
    ["GITHUB_TOKEN", "GH_TOKEN"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
        .map(SecretString::from)
}
