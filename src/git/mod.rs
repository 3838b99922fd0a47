//! Git operations via the system `git` binary.

pub mod executor;
pub mod status;

pub use executor::{DEFAULT_REMOTE, GitExecutor, SystemGit, check_git_installed};
pub use status::{PendingChange, parse_porcelain};
