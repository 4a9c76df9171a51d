use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::Category;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub github: GitHubConfig,
    #[serde(default)]
    pub fetch_intervals: FetchIntervals,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    pub organization: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    #[serde(default)]
    pub branches: Vec<String>,
}

impl RepositoryConfig {
    pub fn new(name: impl Into<String>, branches: &[&str]) -> Self {
        Self {
            name: name.into(),
            branches: branches.iter().map(|b| b.to_string()).collect(),
        }
    }
}

/// Polling periods in seconds. `actions` drives the branch-checks category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchIntervals {
    pub issues: u64,
    pub pull_requests: u64,
    pub actions: u64,
}

impl Default for FetchIntervals {
    fn default() -> Self {
        Self {
            issues: 300,
            pull_requests: 120,
            actions: 60,
        }
    }
}

impl FetchIntervals {
    pub fn for_category(&self, category: Category) -> Duration {
        let secs = match category {
            Category::Issues => self.issues,
            Category::PullRequests => self.pull_requests,
            Category::BranchChecks => self.actions,
        };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 50051)),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reports every problem at once rather than stopping at the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errs = Vec::new();

        if self.github.organization.is_empty() {
            errs.push("github.organization is required".to_string());
        }
        if self.github.repositories.is_empty() {
            errs.push("at least one repository is required".to_string());
        }
        for (i, repo) in self.github.repositories.iter().enumerate() {
            if repo.name.is_empty() {
                errs.push(format!("repository[{i}].name is required"));
            }
            if repo.branches.is_empty() {
                errs.push(format!(
                    "repository[{i}] ({}) needs at least one branch",
                    repo.name
                ));
            }
        }

        let intervals = [
            ("issues", self.fetch_intervals.issues),
            ("pull_requests", self.fetch_intervals.pull_requests),
            ("actions", self.fetch_intervals.actions),
        ];
        for (name, secs) in intervals {
            if secs == 0 {
                errs.push(format!("fetch_intervals.{name} must be > 0"));
            }
        }

        if errs.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errs))
        }
    }

    pub fn repo_names(&self) -> Vec<String> {
        self.github
            .repositories
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }
}
