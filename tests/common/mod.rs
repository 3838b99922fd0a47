//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use git2::{Repository, Signature};
use parking_lot::Mutex;

use autocommit::error::GitError;
use autocommit::git::{GitExecutor, PendingChange};

/// Which git operation a `FakeGit` should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Stage,
    /// Fail the commit whose message starts with this prefix.
    CommitStartingWith(String),
    Push,
    NothingToCommit,
}

#[derive(Default)]
struct FakeState {
    ops: Vec<String>,
    messages: Vec<String>,
    committed_paths: Vec<Vec<String>>,
    status: Vec<PendingChange>,
    failures: Vec<Failure>,
}

/// In-memory `GitExecutor` that records every call.
///
/// Clones share state, so a test can keep one clone while the orchestrator
/// owns the other.
#[derive(Clone)]
pub struct FakeGit {
    root: PathBuf,
    state: Arc<Mutex<FakeState>>,
    op_delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl FakeGit {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/fake/repo"),
            state: Arc::new(Mutex::new(FakeState::default())),
            op_delay: Duration::ZERO,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Sleep this long inside stage and commit.
    pub fn with_op_delay(mut self, delay: Duration) -> Self {
        self.op_delay = delay;
        self
    }

    pub fn set_status(&self, paths: &[&str]) {
        self.state.lock().status = paths.iter().map(|p| PendingChange::new(*p)).collect();
    }

    pub fn set_status_changes(&self, changes: Vec<PendingChange>) {
        self.state.lock().status = changes;
    }

    pub fn fail(&self, failure: Failure) {
        self.state.lock().failures.push(failure);
    }

    /// Every call so far, e.g. `stage a.md`, `commit`, `push main`.
    pub fn ops(&self) -> Vec<String> {
        self.state.lock().ops.clone()
    }

    /// Messages of successful commits, in commit order.
    pub fn messages(&self) -> Vec<String> {
        self.state.lock().messages.clone()
    }

    /// Paths given to each successful commit, in commit order.
    pub fn committed_paths(&self) -> Vec<Vec<String>> {
        self.state.lock().committed_paths.clone()
    }

    /// Most stage-to-commit sequences ever running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, op: String) {
        self.state.lock().ops.push(op);
    }

    fn fails(&self, failure: &Failure) -> bool {
        self.state.lock().failures.contains(failure)
    }

    fn finish_sequence(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for FakeGit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitExecutor for FakeGit {
    async fn stage(&self, paths: &[String]) -> Result<(), GitError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.record(format!("stage {}", paths.join(" ")));
        if !self.op_delay.is_zero() {
            tokio::time::sleep(self.op_delay).await;
        }

        if self.fails(&Failure::Stage) {
            self.finish_sequence();
            return Err(GitError::StageFailed("pathspec did not match".to_string()));
        }
        Ok(())
    }

    async fn commit(&self, message: &str, paths: &[String]) -> Result<(), GitError> {
        self.record("commit".to_string());
        if !self.op_delay.is_zero() {
            tokio::time::sleep(self.op_delay).await;
        }
        self.finish_sequence();

        if self.fails(&Failure::NothingToCommit) {
            return Err(GitError::NothingToCommit);
        }

        let failing = self.state.lock().failures.iter().any(|f| match f {
            Failure::CommitStartingWith(prefix) => message.starts_with(prefix.as_str()),
            _ => false,
        });
        if failing {
            return Err(GitError::CommitFailed("hook rejected commit".to_string()));
        }

        let mut state = self.state.lock();
        state.messages.push(message.to_string());
        state.committed_paths.push(paths.to_vec());
        Ok(())
    }

    async fn push(&self, branch: &str) -> Result<(), GitError> {
        self.record(format!("push {}", branch));
        if self.fails(&Failure::Push) {
            return Err(GitError::PushFailed("remote rejected".to_string()));
        }
        Ok(())
    }

    async fn status_porcelain(&self) -> Result<Vec<PendingChange>, GitError> {
        self.record("status".to_string());
        Ok(self.state.lock().status.clone())
    }

    async fn current_branch(&self) -> Result<String, GitError> {
        Ok("main".to_string())
    }

    async fn repo_root(&self) -> Result<PathBuf, GitError> {
        Ok(self.root.clone())
    }
}

/// A real git repository in a temp directory, for end-to-end tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a repository with one initial commit and a local identity.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");

        {
            let mut config = repo.config().expect("Failed to open repo config");
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
            config.set_bool("commit.gpgsign", false).unwrap();
        }

        let test_repo = Self { dir, repo };
        test_repo.initial_commit();
        test_repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the repository root, creating parent dirs.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Stage a path in the index, as `git add` would.
    pub fn stage(&self, relative: &str) {
        let mut index = self.repo.index().expect("Failed to get index");
        index.add_path(Path::new(relative)).expect("Failed to stage file");
        index.write().expect("Failed to write index");
    }

    /// Rename a tracked file on disk and in the index, as `git mv` would.
    pub fn rename(&self, from: &str, to: &str) {
        std::fs::rename(self.dir.path().join(from), self.dir.path().join(to))
            .expect("Failed to rename file");
        let mut index = self.repo.index().expect("Failed to get index");
        index.remove_path(Path::new(from)).expect("Failed to unstage old path");
        index.add_path(Path::new(to)).expect("Failed to stage new path");
        index.write().expect("Failed to write index");
    }

    /// Paths staged but not yet committed.
    pub fn staged_files(&self) -> Vec<String> {
        let head = self.repo.head().unwrap().peel_to_tree().unwrap();
        let diff = self.repo.diff_tree_to_index(Some(&head), None, None).unwrap();
        diff.deltas()
            .filter_map(|d| d.new_file().path().map(|p| p.to_string_lossy().replace('\\', "/")))
            .collect()
    }

    /// Whether HEAD's tree contains `relative`.
    pub fn head_contains(&self, relative: &str) -> bool {
        let head = self.repo.head().unwrap().peel_to_tree().unwrap();
        head.get_path(Path::new(relative)).is_ok()
    }

    /// Commit messages from HEAD backwards.
    pub fn log(&self) -> Vec<String> {
        let mut walk = self.repo.revwalk().expect("Failed to create revwalk");
        walk.push_head().expect("Failed to push HEAD");
        walk.map(|oid| {
            let commit = self.repo.find_commit(oid.unwrap()).unwrap();
            commit.message().unwrap_or_default().trim_end().to_string()
        })
        .collect()
    }

    /// Paths touched by the HEAD commit.
    pub fn head_files(&self) -> Vec<String> {
        let head = self.repo.head().unwrap().peel_to_commit().unwrap();
        let parent = head.parent(0).ok().map(|p| p.tree().unwrap());
        let diff = self
            .repo
            .diff_tree_to_tree(parent.as_ref(), Some(&head.tree().unwrap()), None)
            .unwrap();
        diff.deltas()
            .filter_map(|d| d.new_file().path().map(|p| p.to_string_lossy().replace('\\', "/")))
            .collect()
    }

    fn initial_commit(&self) {
        let sig = Signature::now("Test User", "test@example.com").expect("Failed to create signature");
        let mut index = self.repo.index().expect("Failed to get index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");
        self.repo
            .commit(Some("HEAD"), &sig, &sig, "chore: initial commit", &tree, &[])
            .expect("Failed to create commit");
    }
}
