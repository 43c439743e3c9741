use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::{DiffFormat, Oid, Repository};

use crate::error::{AppError, Result};

/// Produces the unified diff of a pull request.
#[async_trait]
pub trait DiffProvider: Send + Sync {
    async fn diff(&self, base: &str, head: &str) -> Result<String>;
}

/// Diffs revisions of a local checkout. Both revisions must be present, so CI
/// checkouts need full history (`fetch-depth: 0`).
pub struct GitDiff {
    repo_path: PathBuf,
}

impl GitDiff {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }
}

#[async_trait]
impl DiffProvider for GitDiff {
    async fn diff(&self, base: &str, head: &str) -> Result<String> {
        let dir = self.repo_path.clone();
        let base = base.to_string();
        let head = head.to_string();

        tokio::task::spawn_blocking(move || unified_diff(&dir, &base, &head))
            .await
            .map_err(|e| AppError::Git(format!("Diff task panicked: {e}")))?
    }
}

fn resolve(repo: &Repository, rev: &str) -> Result<Oid> {
    repo.revparse_single(rev)
        .and_then(|obj| obj.peel_to_commit())
        .map(|commit| commit.id())
        .map_err(|e| {
            AppError::Git(format!(
                "Revision {rev} not found ({}); is the checkout shallow?",
                e.message()
            ))
        })
}

/// Diff `head` against its merge base with `base`, which is what the pull
/// request page shows. Falls back to `base` itself for unrelated histories.
fn unified_diff(repo_path: &Path, base: &str, head: &str) -> Result<String> {
    let repo = Repository::open(repo_path)?;

    let base_oid = resolve(&repo, base)?;
    let head_oid = resolve(&repo, head)?;
    let from_oid = repo.merge_base(base_oid, head_oid).unwrap_or(base_oid);

    let from_tree = repo.find_commit(from_oid)?.tree()?;
    let head_tree = repo.find_commit(head_oid)?.tree()?;

    let diff = repo.diff_tree_to_tree(Some(&from_tree), Some(&head_tree), None)?;

    let mut patch = Vec::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        if matches!(line.origin(), '+' | '-' | ' ') {
            patch.push(line.origin() as u8);
        }
        patch.extend_from_slice(line.content());
        true
    })?;

    Ok(String::from_utf8_lossy(&patch).into_owned())
}
