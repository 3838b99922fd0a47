//! Commit orchestration: turns a debounced path or a batch trigger into
//! git commits and ledger records.
//!
//! Every stage/commit/push sequence runs under one process-wide gate, since
//! all of them share the same index and `HEAD`. The gate is a fair tokio
//! mutex, so contending operations run in the order they asked for it.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::commit::batch::{PlannedCommit, plan_commits};
use crate::commit::category::classify;
use crate::commit::template::TemplateTable;
use crate::error::{CommitError, GitError};
use crate::git::GitExecutor;
use crate::history::{CommitLedger, CommitRecord};

/// Result of a batch commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The working tree had no pending changes.
    NothingToCommit,
    /// One record per committed group, in commit order.
    Committed(Vec<CommitRecord>),
}

pub struct Orchestrator<E: GitExecutor> {
    executor: E,
    ledger: Arc<CommitLedger>,
    templates: TemplateTable,
    auto_push: bool,
    gate: Mutex<()>,
}

impl<E: GitExecutor> Orchestrator<E> {
    pub fn new(executor: E, ledger: Arc<CommitLedger>) -> Self {
        Self {
            executor,
            ledger,
            templates: TemplateTable::default(),
            auto_push: false,
            gate: Mutex::new(()),
        }
    }

    pub fn with_templates(mut self, templates: TemplateTable) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_auto_push(mut self, auto_push: bool) -> Self {
        self.auto_push = auto_push;
        self
    }

    pub fn ledger(&self) -> &Arc<CommitLedger> {
        &self.ledger
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn templates(&self) -> &TemplateTable {
        &self.templates
    }

    /// Resolve the working tree root, failing if this is not a repository.
    pub async fn verify_repository(&self) -> Result<PathBuf, CommitError> {
        self.executor
            .repo_root()
            .await
            .map_err(CommitError::NotARepository)
    }

    /// The message a single-file commit of `path` would get.
    pub fn message_for(&self, path: &str) -> String {
        self.templates.render(&classify(path), path, None)
    }

    /// Stage and commit exactly one path.
    ///
    /// Returns `Ok(None)` when git had nothing to commit for the path. A
    /// failed stage or commit is not retried and leaves the ledger untouched.
    pub async fn commit_file(&self, path: &str) -> Result<Option<CommitRecord>, CommitError> {
        let message = self.message_for(path);
        let files = vec![path.to_string()];

        let _gate = self.gate.lock().await;

        self.executor
            .stage(&files)
            .await
            .map_err(|source| CommitError::Stage {
                paths: path.to_string(),
                source,
            })?;

        match self.executor.commit(&message, &files).await {
            Ok(()) => {}
            Err(GitError::NothingToCommit) => {
                debug!("Nothing to commit for {}", path);
                return Ok(None);
            }
            Err(e) => return Err(CommitError::Commit(e)),
        }

        let record = self.ledger.append(message, files);
        info!("Committed {}: {}", path, record.summary());

        if self.auto_push {
            self.push_current_branch(vec![record.clone()]).await?;
        }

        Ok(Some(record))
    }

    /// Plan the batch commit for the current working tree without touching
    /// the index.
    pub async fn plan_batch(&self) -> Result<Vec<PlannedCommit>, CommitError> {
        let pending = self
            .executor
            .status_porcelain()
            .await
            .map_err(CommitError::Status)?;

        Ok(plan_commits(&pending, &self.templates))
    }

    /// Commit every pending change, one commit per category.
    ///
    /// Groups are committed strictly one after another while holding the
    /// gate for the whole batch. Each commit contains only its own group's
    /// paths, whatever else is staged. A failing group aborts the remaining
    /// groups; groups already committed stay in the ledger.
    pub async fn commit_batch(&self) -> Result<BatchOutcome, CommitError> {
        let _gate = self.gate.lock().await;

        let plan = self.plan_batch().await?;
        if plan.is_empty() {
            debug!("Batch commit: no pending changes");
            return Ok(BatchOutcome::NothingToCommit);
        }

        let mut records = Vec::with_capacity(plan.len());

        for planned in plan {
            // A staged rename's source is already gone from the index, so it
            // is only named at commit time.
            self.executor
                .stage(&planned.files)
                .await
                .map_err(|source| CommitError::Stage {
                    paths: planned.files.join(", "),
                    source,
                })?;

            match self
                .executor
                .commit(&planned.message, &planned.pathspecs)
                .await
            {
                Ok(()) => {}
                Err(GitError::NothingToCommit) => {
                    debug!("Nothing to commit for {} group", planned.category);
                    continue;
                }
                Err(e) => {
                    if !records.is_empty() {
                        warn!(
                            "Batch aborted after {} of its commits succeeded",
                            records.len()
                        );
                    }
                    return Err(CommitError::Commit(e));
                }
            }

            let record = self.ledger.append(planned.message, planned.files);
            info!(
                "Committed {} {} file(s): {}",
                record.files.len(),
                planned.category,
                record.summary()
            );
            records.push(record);
        }

        if records.is_empty() {
            return Ok(BatchOutcome::NothingToCommit);
        }

        if self.auto_push {
            return self
                .push_current_branch(records)
                .await
                .map(BatchOutcome::Committed);
        }

        Ok(BatchOutcome::Committed(records))
    }

    /// Push the checked-out branch after `committed` were made. Caller must
    /// hold the gate. On failure the records travel with the error.
    async fn push_current_branch(
        &self,
        committed: Vec<CommitRecord>,
    ) -> Result<Vec<CommitRecord>, CommitError> {
        let branch = match self.executor.current_branch().await {
            Ok(branch) => branch,
            Err(source) => return Err(CommitError::Branch { source, committed }),
        };

        match self.executor.push(&branch).await {
            Ok(()) => {
                info!("Pushed {}", branch);
                Ok(committed)
            }
            Err(source) => {
                warn!("Push of {} failed: {}", branch, source);
                Err(CommitError::Push {
                    branch,
                    source,
                    committed,
                })
            }
        }
    }
}
