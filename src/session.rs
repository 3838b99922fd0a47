//! A watching session: routes filesystem events through the debouncer into
//! the orchestrator, and exposes the outward command surface through
//! [`SessionHandle`].
//!
//! The session loop owns the watcher, the debouncer and the set of in-flight
//! commit tasks. Commits run as separate tasks so one slow commit never delays
//! debouncing of unrelated files; the orchestrator's gate serializes them.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::commit::{BatchOutcome, Orchestrator};
use crate::config::Config;
use crate::error::{CommitError, SessionError, WatchError};
use crate::git::GitExecutor;
use crate::history::{CommitLedger, CommitRecord};
use crate::watch::filter::GITIGNORE_FILE_NAME;
use crate::watch::{ChangeEvent, Debouncer, FsWatcher, PathFilter};

enum Command {
    Enable(oneshot::Sender<Result<(), WatchError>>),
    Disable(oneshot::Sender<usize>),
    BatchCommit(oneshot::Sender<Result<BatchOutcome, CommitError>>),
    Shutdown,
}

/// Cloneable handle for driving a running [`Session`].
#[derive(Clone)]
pub struct SessionHandle {
    commands: UnboundedSender<Command>,
    events: UnboundedSender<ChangeEvent>,
    ledger: Arc<CommitLedger>,
}

impl SessionHandle {
    /// Start watching. Enabling an already enabled session is a no-op.
    pub async fn enable(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Enable(reply))?;
        Ok(rx.await.map_err(|_| SessionError::Closed)??)
    }

    /// Stop watching and cancel pending changes, including ones whose quiet
    /// period ended but whose commit has not started. Commits already running
    /// are left to finish. Returns the number of cancelled changes.
    pub async fn disable(&self) -> Result<usize, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Disable(reply))?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Commit all pending changes, one commit per category.
    pub async fn batch_commit(&self) -> Result<BatchOutcome, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::BatchCommit(reply))?;
        Ok(rx.await.map_err(|_| SessionError::Closed)??)
    }

    /// Inject a change event, as the filesystem watcher would.
    pub fn notify_change(&self, path: impl Into<PathBuf>) -> Result<(), SessionError> {
        self.events
            .send(ChangeEvent::new(path))
            .map_err(|_| SessionError::Closed)
    }

    /// Up to `limit` commits made by this session, newest first.
    pub fn history(&self, limit: usize) -> Vec<CommitRecord> {
        self.ledger.recent(limit)
    }

    pub fn clear_history(&self) {
        self.ledger.clear();
    }

    /// Ask the session to stop. `Session::run` returns once in-flight
    /// commits have finished.
    pub fn shutdown(&self) -> Result<(), SessionError> {
        self.send(Command::Shutdown)
    }

    fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands.send(command).map_err(|_| SessionError::Closed)
    }
}

pub struct Session<E: GitExecutor + 'static> {
    orchestrator: Arc<Orchestrator<E>>,
    root: PathBuf,
    delay: Duration,
    filter: PathFilter,
    extra_patterns: Vec<String>,
    start_enabled: bool,
    watch_filesystem: bool,
    commands: UnboundedReceiver<Command>,
    events_tx: UnboundedSender<ChangeEvent>,
    events: UnboundedReceiver<ChangeEvent>,
    fired_tx: UnboundedSender<String>,
    fired: UnboundedReceiver<String>,
    debouncer: Option<Debouncer>,
    watcher: Option<FsWatcher>,
    in_flight: JoinSet<()>,
}

impl<E: GitExecutor + 'static> Session<E> {
    /// Create a session for the working tree at `root`.
    ///
    /// The session starts enabled when `config.enabled` is set.
    pub fn new(
        orchestrator: Arc<Orchestrator<E>>,
        root: &Path,
        config: &Config,
    ) -> Result<(Self, SessionHandle), WatchError> {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let filter = PathFilter::load(&root, &config.ignore)?;

        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let (fired_tx, fired) = mpsc::unbounded_channel();

        let handle = SessionHandle {
            commands: commands_tx,
            events: events_tx.clone(),
            ledger: Arc::clone(orchestrator.ledger()),
        };

        let session = Self {
            orchestrator,
            root,
            delay: config.delay(),
            filter,
            extra_patterns: config.ignore.clone(),
            start_enabled: config.enabled,
            watch_filesystem: true,
            commands,
            events_tx,
            events,
            fired_tx,
            fired,
            debouncer: None,
            watcher: None,
            in_flight: JoinSet::new(),
        };

        Ok((session, handle))
    }

    /// Take change events only from [`SessionHandle::notify_change`].
    pub fn without_filesystem_watch(mut self) -> Self {
        self.watch_filesystem = false;
        self
    }

    /// Run until shut down or until every handle is dropped.
    pub async fn run(mut self) {
        if self.start_enabled {
            if let Err(e) = self.enable() {
                warn!("Could not start watching: {}", e);
            }
        }

        loop {
            // Commands first, so a queued disable wins over a queued fire.
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(event) = self.events.recv() => self.handle_event(event),
                Some(path) = self.fired.recv() => {
                    if self.debouncer.is_some() {
                        self.spawn_commit(path);
                    } else {
                        debug!("Dropping {}: auto-commit is disabled", path);
                    }
                }
                Some(joined) = self.in_flight.join_next() => {
                    if let Err(e) = joined {
                        warn!("Commit task failed: {}", e);
                    }
                }
            }
        }

        // Timers that fired before shutdown still get their commit.
        if self.debouncer.is_some() {
            while let Ok(path) = self.fired.try_recv() {
                self.spawn_commit(path);
            }
        }
        self.disable();

        while let Some(joined) = self.in_flight.join_next().await {
            if let Err(e) = joined {
                warn!("Commit task failed: {}", e);
            }
        }

        debug!("Session stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Enable(reply) => {
                let _ = reply.send(self.enable());
            }
            Command::Disable(reply) => {
                let _ = reply.send(self.disable());
            }
            Command::BatchCommit(reply) => {
                let orchestrator = Arc::clone(&self.orchestrator);
                self.in_flight.spawn(async move {
                    let _ = reply.send(orchestrator.commit_batch().await);
                });
            }
            Command::Shutdown => {}
        }
    }

    fn enable(&mut self) -> Result<(), WatchError> {
        if self.debouncer.is_some() {
            return Ok(());
        }

        if self.watch_filesystem {
            self.watcher = Some(FsWatcher::start(&self.root, self.events_tx.clone())?);
        }

        let fired = self.fired_tx.clone();
        self.debouncer = Some(Debouncer::new(self.delay, move |path| {
            // Only fails once the session loop is gone.
            let _ = fired.send(path);
        }));

        info!(
            "Auto-commit enabled for {} ({}s delay)",
            self.root.display(),
            self.delay.as_secs()
        );
        Ok(())
    }

    fn disable(&mut self) -> usize {
        self.watcher = None;
        let mut cancelled = self
            .debouncer
            .take()
            .map(|debouncer| debouncer.cancel_all())
            .unwrap_or(0);

        while let Ok(path) = self.fired.try_recv() {
            debug!("Dropping fired change to {}", path);
            cancelled += 1;
        }

        if cancelled > 0 {
            info!("Auto-commit disabled, {} pending change(s) dropped", cancelled);
        }
        cancelled
    }

    fn handle_event(&mut self, event: ChangeEvent) {
        if self.debouncer.is_none() {
            return;
        }

        let Some(relative) = self.relative_path(&event.path) else {
            debug!("Ignoring event outside the working tree: {}", event.path.display());
            return;
        };

        if relative.file_name().is_some_and(|name| name == GITIGNORE_FILE_NAME) {
            self.reload_filter();
        }

        let is_dir = self.root.join(&relative).is_dir();
        if is_dir || self.filter.is_ignored(&relative, is_dir) {
            return;
        }

        if let Some(debouncer) = &self.debouncer {
            debouncer.on_change(to_slash(&relative));
        }
    }

    fn reload_filter(&mut self) {
        match PathFilter::load(&self.root, &self.extra_patterns) {
            Ok(filter) => {
                debug!("Reloaded ignore rules");
                self.filter = filter;
            }
            Err(e) => warn!("Keeping previous ignore rules: {}", e),
        }
    }

    fn relative_path(&self, path: &Path) -> Option<PathBuf> {
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.root).ok()?.to_path_buf()
        } else {
            path.to_path_buf()
        };

        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative.as_os_str().is_empty() {
            return None;
        }

        Some(relative)
    }

    fn spawn_commit(&mut self, path: String) {
        let orchestrator = Arc::clone(&self.orchestrator);
        self.in_flight.spawn(async move {
            if let Err(e) = orchestrator.commit_file(&path).await {
                warn!("Auto-commit of {} failed: {}", path, e);
            }
        });
    }
}

/// Repository-relative path with `/` separators, as git expects in pathspecs.
fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
