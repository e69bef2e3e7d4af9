//! Configuration management for setupsync
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (SETUPSYNC_*)
//! 3. Config file (~/.config/setupsync/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Shortest poll interval accepted by [`Config::validate`]
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Repository-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Path to the local clone
    pub path: Option<PathBuf>,

    /// Name of the single remote to track
    pub remote: String,

    /// Branches that always exist on the remote, in fallback order
    pub default_branches: Vec<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            remote: "origin".to_string(),
            default_branches: vec!["main".to_string(), "master".to_string()],
        }
    }
}

/// Polling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollConfig {
    /// Time between poll cycles
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Upper bound for a single git command (prune, pull, checkout)
    #[serde(with = "humantime_serde")]
    pub command_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: MIN_POLL_INTERVAL,
            command_timeout: Duration::from_secs(120),
        }
    }
}

/// Which remote branches are exposed as setups
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SetupsConfig {
    /// Branch names that are never treated as setups
    pub ignore: Vec<String>,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Repository configuration
    pub repository: RepositoryConfig,

    /// Polling configuration
    pub poll: PollConfig,

    /// Setup filtering
    pub setups: SetupsConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/setupsync/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("setupsync").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - SETUPSYNC_REPO: Path to the local clone
    /// - SETUPSYNC_POLL_INTERVAL: Poll interval, e.g. `30s` or `2m`
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(path) = std::env::var("SETUPSYNC_REPO") {
            self.repository.path = Some(PathBuf::from(path));
        }

        if let Ok(interval) = std::env::var("SETUPSYNC_POLL_INTERVAL") {
            self.poll.interval = humantime::parse_duration(&interval).map_err(|e| {
                Error::Config(format!("Invalid SETUPSYNC_POLL_INTERVAL '{}': {}", interval, e))
            })?;
        }

        Ok(self)
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, repo: Option<PathBuf>, interval: Option<Duration>) -> Self {
        if let Some(path) = repo {
            self.repository.path = Some(path);
        }

        if let Some(interval) = interval {
            self.poll.interval = interval;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(repo: Option<PathBuf>, interval: Option<Duration>) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides()?
            .with_cli_overrides(repo, interval))
    }

    /// Check that the configuration is usable by the poller and switcher
    pub fn validate(&self) -> Result<()> {
        let path = self.repository_path()?;
        if !path.exists() {
            return Err(Error::Config(format!(
                "Repository path does not exist: {}",
                path.display()
            )));
        }

        if self.poll.interval < MIN_POLL_INTERVAL {
            return Err(Error::Config(format!(
                "Poll interval must be at least {}s, got {}",
                MIN_POLL_INTERVAL.as_secs(),
                humantime::format_duration(self.poll.interval)
            )));
        }

        if self.poll.command_timeout.is_zero() {
            return Err(Error::Config("Command timeout must be non-zero".to_string()));
        }

        if self.repository.remote.trim().is_empty() {
            return Err(Error::Config("Remote name must not be empty".to_string()));
        }

        if self.repository.default_branches.is_empty() {
            return Err(Error::Config(
                "At least one default branch (e.g. main) is required".to_string(),
            ));
        }

        Ok(())
    }

    /// The configured repository path, or an error when none is set
    pub fn repository_path(&self) -> Result<&Path> {
        self.repository.path.as_deref().ok_or_else(|| {
            Error::Config(
                "No repository configured. Set [repository] path, SETUPSYNC_REPO or --repo"
                    .to_string(),
            )
        })
    }
}
