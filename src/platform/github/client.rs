use std::time::Duration;

use async_trait::async_trait;
use octocrab::models::CommentId;
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::Octocrab;

use crate::config::GitHubConfig;
use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::CommentStore;

use super::mapper;

pub struct GitHubPlatform {
    client: Octocrab,
}

impl GitHubPlatform {
    /// Build a client authenticated with a bearer token. Failed requests are
    /// not retried; the CI system re-runs the whole check instead.
    pub fn new(config: &GitHubConfig, token: &str) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let mut builder = Octocrab::builder()
            .personal_token(token.to_string())
            .add_retry_config(RetryConfig::None)
            .set_connect_timeout(Some(timeout))
            .set_read_timeout(Some(timeout));

        if let Some(api_url) = config.api_url.as_deref() {
            builder = builder
                .base_uri(api_url)
                .map_err(|e| AppError::Config(format!("Invalid GitHub API URL {api_url}: {e}")))?;
        }

        let client = builder
            .build()
            .map_err(|e| AppError::GitHubApi(format!("Failed to build octocrab client: {e}")))?;

        Ok(Self { client })
    }

    fn parse_repo(repo_full_name: &str) -> Result<(&str, &str)> {
        match repo_full_name.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => Ok((owner, repo)),
            _ => Err(AppError::GitHubApi(format!(
                "Invalid repo name: {repo_full_name}"
            ))),
        }
    }
}

#[async_trait]
impl CommentStore for GitHubPlatform {
    async fn list_comments(&self, repo_full_name: &str, pr_number: u64) -> Result<Vec<Comment>> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;

        let first_page = self
            .client
            .issues(owner, repo)
            .list_comments(pr_number)
            .per_page(100)
            .send()
            .await?;

        let comments = self.client.all_pages(first_page).await?;

        tracing::debug!(
            repo = repo_full_name,
            pr = pr_number,
            count = comments.len(),
            "Fetched PR comments"
        );

        Ok(mapper::map_comments(comments))
    }

    async fn create_comment(
        &self,
        repo_full_name: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<Comment> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;

        let created = self
            .client
            .issues(owner, repo)
            .create_comment(pr_number, body)
            .await?;

        Ok(mapper::map_comment(created))
    }

    async fn update_comment(
        &self,
        repo_full_name: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<()> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;

        self.client
            .issues(owner, repo)
            .update_comment(CommentId::from(comment_id), body)
            .await?;

        Ok(())
    }
}
