pub mod github;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::*;

/// The pull request comment thread, which holds all of pr-guard's state.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// All top-level comments on a PR, oldest first.
    async fn list_comments(&self, repo_full_name: &str, pr_number: u64) -> Result<Vec<Comment>>;

    /// Post a new comment on a PR.
    async fn create_comment(
        &self,
        repo_full_name: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<Comment>;

    /// Replace the body of an existing comment.
    async fn update_comment(&self, repo_full_name: &str, comment_id: u64, body: &str)
        -> Result<()>;
}
