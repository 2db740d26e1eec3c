//! Configuration file support for tally.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `TALLY_`, sections separated by
//!    `__`, e.g. `TALLY_AGGREGATE__CONCURRENCY`)
//! 3. Config file (./tally.toml, then ~/.config/tally/config.toml)
//! 4. Built-in defaults
//!
//! The GitHub token may also come from the plain `GITHUB_TOKEN` variable.
//!
//! Example config file:
//! ```toml
//! [github]
//! token = "ghp_..."  # or use TALLY_GITHUB__TOKEN / GITHUB_TOKEN
//! api_url = "https://api.github.com"  # optional, for GitHub Enterprise
//!
//! [aggregate]
//! page_size = 100
//! concurrency = 20
//! requests_per_second = 10
//! policy = "fail_fast"  # or "skip_and_log"
//!
//! [hackfest]
//! org = "acme"
//! repo = "widget"  # optional, whole org when omitted
//! start = "2024-10-01"
//! end = "2024-10-31"
//! exclude_users = ["dependabot[bot]"]
//! exclude_teams = ["core"]
//! ```

use std::path::PathBuf;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;
use tally::aggregate::{DEFAULT_CONCURRENCY, FailurePolicy, Hackfest, LoginSet};
use tally::api::{DEFAULT_PAGE_SIZE, GITHUB_DEFAULT_RPS};
use tally::target::{Target, parse_day};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub configuration.
    pub github: GitHubConfig,
    /// Default aggregation options.
    pub aggregate: AggregateConfig,
    /// The configured hackfest.
    pub hackfest: HackfestConfig,
}

/// GitHub configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token.
    pub token: Option<String>,
    /// API base URL, for GitHub Enterprise.
    pub api_url: Option<String>,
}

/// Default aggregation options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    /// Items requested per page.
    pub page_size: u32,
    /// Maximum concurrent jobs.
    pub concurrency: usize,
    /// Proactive request pacing.
    pub requests_per_second: u32,
    /// Whether to disable proactive rate limiting.
    pub no_rate_limit: bool,
    /// What to do when one repository fails.
    pub policy: FailurePolicy,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            requests_per_second: GITHUB_DEFAULT_RPS,
            no_rate_limit: false,
            policy: FailurePolicy::default(),
        }
    }
}

/// Hackfest configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HackfestConfig {
    pub org: Option<String>,
    pub repo: Option<String>,
    /// First day, `YYYY-MM-DD`.
    pub start: Option<String>,
    /// Last day (inclusive), `YYYY-MM-DD`.
    pub end: Option<String>,
    /// Logins never counted as hackfest contributors.
    pub exclude_users: Vec<String>,
    /// Team slugs whose members are never counted.
    pub exclude_teams: Vec<String>,
}

impl HackfestConfig {
    /// Validate the configured hackfest.
    pub fn hackfest(&self) -> Result<Hackfest, String> {
        let start = self
            .start
            .as_deref()
            .and_then(|s| parse_day(s).ok())
            .ok_or("Hackfest start date not properly configured (hackfest.start = \"YYYY-MM-DD\")")?;
        let end = self
            .end
            .as_deref()
            .and_then(|s| parse_day(s).ok())
            .ok_or("Hackfest end date not properly configured (hackfest.end = \"YYYY-MM-DD\")")?;
        let org = self
            .org
            .as_deref()
            .filter(|org| !org.is_empty())
            .ok_or("Hackfest organization not configured (hackfest.org)")?;

        let target = match self.repo.as_deref().filter(|repo| !repo.is_empty()) {
            Some(repo) => Target::repository(org, repo),
            None => Target::owner(org),
        };
        Ok(Hackfest { target, start, end })
    }

    /// Excluded logins as a set, ignoring blanks.
    pub fn excluded_users(&self) -> LoginSet {
        self.exclude_users
            .iter()
            .map(|login| login.trim())
            .filter(|login| !login.is_empty())
            .collect()
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/tally/config.toml)
    /// 3. Local config file (./tally.toml)
    /// 4. Environment variables with TALLY_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = Self::default_config_path()
            && path.exists()
        {
            tracing::debug!("Loading config from {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        let local_config = PathBuf::from("tally.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./tally.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., TALLY_AGGREGATE__PAGE_SIZE -> aggregate.page_size
        builder = builder.add_source(Self::environment());

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    fn environment() -> Environment {
        Environment::with_prefix("TALLY")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("hackfest.exclude_users")
            .with_list_parse_key("hackfest.exclude_teams")
    }

    /// Get the GitHub token, falling back to `GITHUB_TOKEN`.
    pub fn github_token(&self) -> Option<String> {
        self.github
            .token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .filter(|token| !token.is_empty())
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "tally").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
