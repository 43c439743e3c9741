use chrono::{DateTime, Utc};

/// A top-level pull request comment, as the hosting API returned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: u64,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
