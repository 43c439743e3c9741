use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub review: ReviewConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Deserialize, Clone)]
pub struct GitHubConfig {
    pub token: Option<String>,
    /// REST base URL, only needed for GitHub Enterprise.
    pub api_url: Option<String>,
    #[serde(default = "default_github_timeout")]
    pub timeout_secs: u64,
}

// Manual Debug impl to avoid leaking the token
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: None,
            timeout_secs: default_github_timeout(),
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_timeout")]
    pub timeout_secs: u64,
}

// Manual Debug impl to avoid leaking the API key
impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_openai_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReviewConfig {
    #[serde(default = "default_max_diff_bytes")]
    pub max_diff_bytes: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_diff_bytes: default_max_diff_bytes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RunConfig {
    pub event_path: Option<PathBuf>,
    /// Checkout to diff; see [`AppConfig::repo_path`] for the fallback.
    pub repo_path: Option<PathBuf>,
}

fn default_github_timeout() -> u64 {
    30
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_timeout() -> u64 {
    60
}

fn default_max_diff_bytes() -> usize {
    120_000
}

fn default_repo_path() -> &'static Path {
    Path::new(".")
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("pr-guard").required(false));
        }

        // Environment overrides, e.g. PR_GUARD_OPENAI__MODEL
        builder = builder.add_source(
            config::Environment::with_prefix("PR_GUARD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let mut app: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;

        app.fill_from_ci_env(|key| std::env::var(key).ok());
        Ok(app)
    }

    /// Fill unset values from the variables GitHub Actions exports.
    /// Explicit configuration always wins.
    pub fn fill_from_ci_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if is_unset(&self.github.token) {
            self.github.token = get("GITHUB_TOKEN");
        }
        if is_unset(&self.github.api_url) {
            self.github.api_url = get("GITHUB_API_URL");
        }
        if is_unset(&self.openai.api_key) {
            self.openai.api_key =
                get("PR_GUARD_OPENAI_API_KEY").or_else(|| get("OPENAI_API_KEY"));
        }
        if self.run.event_path.is_none() {
            self.run.event_path = get("GITHUB_EVENT_PATH").map(PathBuf::from);
        }
        if self.run.repo_path.is_none() {
            self.run.repo_path = get("GITHUB_WORKSPACE").map(PathBuf::from);
        }
    }

    pub fn github_token(&self) -> Result<&str> {
        non_empty(&self.github.token).ok_or_else(|| {
            AppError::Config("No GitHub token found. Set GITHUB_TOKEN or github.token.".to_string())
        })
    }

    pub fn openai_api_key(&self) -> Result<&str> {
        non_empty(&self.openai.api_key).ok_or_else(|| {
            AppError::Config(
                "No OpenAI API key found. Set PR_GUARD_OPENAI_API_KEY or OPENAI_API_KEY."
                    .to_string(),
            )
        })
    }

    /// Configured checkout, else the current directory.
    pub fn repo_path(&self) -> &Path {
        self.run.repo_path.as_deref().unwrap_or(default_repo_path())
    }

    pub fn event_path(&self) -> Result<&Path> {
        self.run.event_path.as_deref().ok_or_else(|| {
            AppError::Config(
                "No event context found. Set GITHUB_EVENT_PATH or pass --event-path.".to_string(),
            )
        })
    }
}

fn is_unset(value: &Option<String>) -> bool {
    non_empty(value).is_none()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
