//! Git operations used by the commit orchestrator.
//!
//! `SystemGit` shells out to the system `git` binary with explicit argument
//! lists (never a shell string), inheriting the user's git config, SSH agent
//! and credential store.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::GitError;
use crate::git::status::{PendingChange, parse_porcelain};

/// Remote pushed to when none is configured.
pub const DEFAULT_REMOTE: &str = "origin";

/// Trait for executing git operations against one working tree.
///
/// This abstraction allows replacing the git subprocess in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitExecutor: Send + Sync {
    /// Stage exactly these paths, including deletions.
    async fn stage(&self, paths: &[String]) -> Result<(), GitError>;

    /// Commit exactly `paths` with `message`. Anything else already staged
    /// stays in the index, uncommitted.
    ///
    /// Returns `GitError::NothingToCommit` when none of `paths` differ from
    /// `HEAD`.
    async fn commit(&self, message: &str, paths: &[String]) -> Result<(), GitError>;

    /// Push `branch` to the configured remote.
    async fn push(&self, branch: &str) -> Result<(), GitError>;

    /// Paths with pending changes, in git's listing order.
    async fn status_porcelain(&self) -> Result<Vec<PendingChange>, GitError>;

    /// Name of the checked-out branch.
    async fn current_branch(&self) -> Result<String, GitError>;

    /// Absolute path of the working tree root.
    async fn repo_root(&self) -> Result<PathBuf, GitError>;
}

/// Check that a `git` executable is on PATH.
///
/// Uses the `which` crate for cross-platform executable detection.
pub fn check_git_installed() -> Result<(), GitError> {
    which::which("git").map(|_| ()).map_err(|_| GitError::NotInstalled)
}

/// Git executor backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct SystemGit {
    workdir: PathBuf,
    remote: String,
}

impl SystemGit {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            remote: DEFAULT_REMOTE.to_string(),
        }
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Root of the repository containing the working directory, or the
    /// working directory itself outside a repository.
    pub async fn root_or_workdir(&self) -> PathBuf {
        match self.repo_root().await {
            Ok(root) => root,
            Err(e) => {
                debug!("Using {} as root: {}", self.workdir.display(), e);
                self.workdir.clone()
            }
        }
    }

    /// Run git and capture its output, whatever the exit status.
    async fn run_git(&self, args: &[&str], operation: &str) -> Result<Output, GitError> {
        debug!("git {}", args.join(" "));

        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| GitError::SpawnFailed {
                operation: operation.to_string(),
                source,
            })
    }

    /// Run git and return trimmed stdout, or `CommandFailed` on non-zero exit.
    async fn query_git(&self, args: &[&str], operation: &str) -> Result<String, GitError> {
        let output = self.run_git(args, operation).await?;

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                operation: operation.to_string(),
                stderr: diagnostic(&output),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl GitExecutor for SystemGit {
    async fn stage(&self, paths: &[String]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Err(GitError::StageFailed("No files to stage".into()));
        }

        let mut args = vec!["add", "--all", "--"];
        args.extend(paths.iter().map(String::as_str));

        let output = self.run_git(&args, "stage files").await?;
        if !output.status.success() {
            return Err(GitError::StageFailed(diagnostic(&output)));
        }

        Ok(())
    }

    async fn commit(&self, message: &str, paths: &[String]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Err(GitError::CommitFailed("No files to commit".into()));
        }

        let mut args = vec!["commit", "--only", "-m", message, "--"];
        args.extend(paths.iter().map(String::as_str));

        let output = self.run_git(&args, "commit").await?;

        if !output.status.success() {
            if reports_nothing_to_commit(&output) {
                return Err(GitError::NothingToCommit);
            }
            return Err(GitError::CommitFailed(diagnostic(&output)));
        }

        Ok(())
    }

    async fn push(&self, branch: &str) -> Result<(), GitError> {
        let output = self.run_git(&["push", &self.remote, branch], "push").await?;

        if !output.status.success() {
            return Err(GitError::PushFailed(diagnostic(&output)));
        }

        Ok(())
    }

    async fn status_porcelain(&self) -> Result<Vec<PendingChange>, GitError> {
        let stdout = self
            .query_git(
                &[
                    "-c",
                    "core.quotePath=false",
                    "status",
                    "--porcelain=v1",
                    "--untracked-files=all",
                ],
                "status",
            )
            .await?;

        Ok(parse_porcelain(&stdout))
    }

    async fn current_branch(&self) -> Result<String, GitError> {
        let output = self
            .run_git(&["symbolic-ref", "--quiet", "--short", "HEAD"], "branch")
            .await?;

        if !output.status.success() {
            return Err(GitError::DetachedHead);
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn repo_root(&self) -> Result<PathBuf, GitError> {
        match self.query_git(&["rev-parse", "--show-toplevel"], "repo root").await {
            Ok(root) => Ok(PathBuf::from(root)),
            Err(GitError::CommandFailed { stderr, .. }) => Err(GitError::NotARepository(stderr)),
            Err(e) => Err(e),
        }
    }
}

/// Best diagnostic text from a failed git invocation.
///
/// git prints some failures (e.g. "nothing to commit") on stdout.
fn diagnostic(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_string();
    }

    match output.status.code() {
        Some(code) => format!("exited with code {}", code),
        None => "terminated by signal".to_string(),
    }
}

fn reports_nothing_to_commit(output: &Output) -> bool {
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout.contains("nothing to commit")
        || stdout.contains("nothing added to commit")
        || stdout.contains("no changes added to commit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_git_installed() {
        // git is a hard requirement for the whole test suite
        assert!(check_git_installed().is_ok());
    }

    #[tokio::test]
    async fn test_run_git_version_succeeds() {
        let git = SystemGit::new(".");
        let version = git.query_git(&["--version"], "version check").await.unwrap();
        assert!(version.starts_with("git version"));
    }

    #[tokio::test]
    async fn test_query_git_invalid_command_fails() {
        let git = SystemGit::new(".");
        let result = git.query_git(&["not-a-real-command"], "invalid").await;
        assert!(matches!(
            result,
            Err(GitError::CommandFailed { ref operation, .. }) if operation == "invalid"
        ));
    }

    #[tokio::test]
    async fn test_stage_rejects_empty_path_list() {
        let git = SystemGit::new(".");
        let result = git.stage(&[]).await;
        assert!(matches!(result, Err(GitError::StageFailed(_))));
    }

    #[tokio::test]
    async fn test_commit_rejects_empty_path_list() {
        let git = SystemGit::new(".");
        let result = git.commit("chore: nothing", &[]).await;
        assert!(matches!(result, Err(GitError::CommitFailed(_))));
    }

    #[tokio::test]
    async fn test_root_or_workdir_outside_repository() {
        let dir = tempfile::tempdir().unwrap();
        let git = SystemGit::new(dir.path());
        assert_eq!(git.root_or_workdir().await, dir.path());
    }

    #[tokio::test]
    async fn test_repo_root_outside_repository() {
        let dir = tempfile::tempdir().unwrap();
        let git = SystemGit::new(dir.path());
        let result = git.repo_root().await;
        assert!(matches!(result, Err(GitError::NotARepository(_))));
    }

    #[tokio::test]
    async fn test_spawn_failure_in_missing_workdir() {
        let git = SystemGit::new("/definitely/not/a/real/dir/for/autocommit");
        let result = git.status_porcelain().await;
        assert!(matches!(result, Err(GitError::SpawnFailed { .. })));
    }

    #[test]
    fn test_with_remote() {
        let git = SystemGit::new(".").with_remote("upstream");
        assert_eq!(git.remote(), "upstream");
        assert_eq!(SystemGit::new(".").remote(), DEFAULT_REMOTE);
    }
}
