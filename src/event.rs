use serde::Deserialize;
use std::path::Path;

use crate::error::{AppError, Result};

/// Identity of the pull request under review, built once per run from the
/// trigger event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestContext {
    /// `owner/name`
    pub repo_full_name: String,
    pub pr_number: u64,
    pub base_sha: String,
    pub head_sha: String,
}

/// The subset of a GitHub Actions `pull_request` event we read.
#[derive(Debug, Deserialize)]
pub struct PullRequestEvent {
    pub pull_request: Option<PullRequestPayload>,
    pub repository: RepositoryPayload,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestPayload {
    pub number: u64,
    pub head: PullRequestRef,
    pub base: PullRequestRef,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestRef {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryPayload {
    pub full_name: String,
}

/// Read the event file written by the CI runner.
pub async fn load_context(event_path: &Path) -> Result<PullRequestContext> {
    let raw = tokio::fs::read(event_path).await.map_err(|e| {
        AppError::Config(format!(
            "Failed to read event file at {}: {e}",
            event_path.display()
        ))
    })?;
    parse_context(&raw)
}

pub fn parse_context(payload: &[u8]) -> Result<PullRequestContext> {
    let event: PullRequestEvent = serde_json::from_slice(payload)
        .map_err(|e| AppError::Config(format!("Invalid event payload: {e}")))?;
    from_event(event)
}

fn from_event(event: PullRequestEvent) -> Result<PullRequestContext> {
    let pr = event.pull_request.ok_or_else(|| {
        AppError::Config(
            "Event has no pull_request section; pr-guard must run on pull_request events"
                .to_string(),
        )
    })?;

    let repo_full_name = event.repository.full_name;
    match repo_full_name.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {}
        _ => {
            return Err(AppError::Config(format!(
                "Invalid repository name in event: {repo_full_name}"
            )))
        }
    }

    Ok(PullRequestContext {
        repo_full_name,
        pr_number: pr.number,
        base_sha: pr.base.sha,
        head_sha: pr.head.sha,
    })
}
