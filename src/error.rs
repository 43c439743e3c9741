use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    #[error("Git operation failed: {0}")]
    Git(String),

    #[error("Model API error: {0}")]
    ModelApi(String),

    #[error("Model refused to answer: {0}")]
    ModelRefusal(String),

    #[error("Malformed pr-guard comment: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AppError {
    /// True for failures that happen before any network call and will not
    /// go away by re-running the check.
    pub fn is_configuration(&self) -> bool {
        matches!(self, AppError::Config(_))
    }
}

impl From<octocrab::Error> for AppError {
    fn from(e: octocrab::Error) -> Self {
        AppError::GitHubApi(e.to_string())
    }
}

impl From<git2::Error> for AppError {
    fn from(e: git2::Error) -> Self {
        AppError::Git(e.message().to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
