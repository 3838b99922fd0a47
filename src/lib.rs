//! autocommit - watches a git working tree and commits changes automatically.
//!
//! # Overview
//!
//! Changed files are classified by path into a commit category, a message is
//! rendered from the category's template, and the commit goes through the
//! system `git`. Single-file commits fire after a per-path quiet period; a
//! batch commit groups every pending change by category.

pub mod commit;
pub mod config;
pub mod error;
pub mod git;
pub mod history;
pub mod session;
pub mod watch;

// Re-export commonly used types
pub use commit::{BatchOutcome, CommitCategory, Orchestrator, PlannedCommit, TemplateTable, classify};
pub use config::Config;
pub use error::{CommitError, ConfigError, GitError, SessionError, WatchError};
pub use git::{GitExecutor, SystemGit};
pub use history::{CommitLedger, CommitRecord};
pub use session::{Session, SessionHandle};
