pub mod git;

pub use git::{DiffProvider, GitDiff};
