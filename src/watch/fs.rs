//! Filesystem watching backed by `notify`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use notify::event::{EventKind, ModifyKind};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::error::WatchError;

/// A raw change notification, before debouncing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub observed_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            observed_at: Utc::now(),
        }
    }
}

/// Recursive watcher over a directory. Dropping it stops watching.
pub struct FsWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
}

impl FsWatcher {
    /// Start watching `root`, forwarding content changes to `events`.
    pub fn start(root: &Path, events: UnboundedSender<ChangeEvent>) -> Result<Self, WatchError> {
        let watch_failed = |source: notify::Error| WatchError::WatchFailed {
            path: root.to_path_buf(),
            source,
        };

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => forward(event, &events),
                Err(e) => warn!("Filesystem watch error: {}", e),
            }
        })
        .map_err(watch_failed)?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(watch_failed)?;

        debug!("Watching {}", root.display());

        Ok(Self {
            root: root.to_path_buf(),
            _watcher: watcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn forward(event: Event, events: &UnboundedSender<ChangeEvent>) {
    if !is_content_change(&event.kind) {
        return;
    }

    for path in event.paths {
        // The receiver is gone once the session shuts down.
        if events.send(ChangeEvent::new(path)).is_err() {
            return;
        }
    }
}

/// Creates, removes, renames and data writes count; access and
/// metadata-only events do not.
fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => false,
    }
}
