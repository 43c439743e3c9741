use crate::platform::types;

/// Map octocrab comments to ours, ordered by creation time. The sort is
/// stable, so comments created in the same second keep the API order.
pub fn map_comments(comments: Vec<octocrab::models::issues::Comment>) -> Vec<types::Comment> {
    let mut mapped: Vec<types::Comment> = comments.into_iter().map(map_comment).collect();
    mapped.sort_by_key(|c| c.created_at);
    mapped
}

pub fn map_comment(comment: octocrab::models::issues::Comment) -> types::Comment {
    types::Comment {
        id: comment.id.into_inner(),
        author: comment.user.login,
        body: comment.body.unwrap_or_default(),
        created_at: comment.created_at,
    }
}
