//! Error types for autocommit modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

use crate::history::CommitRecord;

/// Errors from git subprocess operations.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("git not found. Install git and make sure it is on your PATH")]
    NotInstalled,

    #[error("Not a git repository: {0}")]
    NotARepository(String),

    #[error("Failed to run git {operation}: {source}")]
    SpawnFailed {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git add failed: {0}")]
    StageFailed(String),

    #[error("git commit failed: {0}")]
    CommitFailed(String),

    #[error("Nothing to commit")]
    NothingToCommit,

    #[error("git push failed: {0}")]
    PushFailed(String),

    #[error("HEAD is detached; no branch to push")]
    DetachedHead,

    #[error("git {operation} failed: {stderr}")]
    CommandFailed { operation: String, stderr: String },
}

/// Errors surfaced at the commit orchestrator boundary.
///
/// Every variant aborts only the commit attempt that produced it.
#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Not a git repository: {0}")]
    NotARepository(#[source] GitError),

    #[error("Failed to read working tree status: {0}")]
    Status(#[source] GitError),

    #[error("Failed to stage {paths}: {source}")]
    Stage {
        paths: String,
        #[source]
        source: GitError,
    },

    #[error("Failed to commit: {0}")]
    Commit(#[source] GitError),

    #[error("Committed, but could not determine the branch to push: {source}")]
    Branch {
        #[source]
        source: GitError,
        committed: Vec<CommitRecord>,
    },

    #[error("Committed, but push of '{branch}' failed: {source}")]
    Push {
        branch: String,
        #[source]
        source: GitError,
        committed: Vec<CommitRecord>,
    },
}

impl CommitError {
    /// Commits that were made before the error. Only push-stage errors
    /// carry any; every other variant means nothing was recorded.
    pub fn committed(&self) -> &[CommitRecord] {
        match self {
            CommitError::Branch { committed, .. } | CommitError::Push { committed, .. } => committed,
            _ => &[],
        }
    }
}

/// Errors from loading `.autocommit.toml`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// Errors from the filesystem watcher and ignore rules.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to watch {path}: {source}")]
    WatchFailed {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Failed to load ignore rules from {path}: {source}")]
    IgnoreRules {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },
}

/// Errors from talking to a running session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session is no longer running")]
    Closed,

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Commit(#[from] CommitError),
}
