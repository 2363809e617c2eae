//! File watching for task reruns.

use std::path::PathBuf;
use std::sync::mpsc;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// File was created or modified
    Changed(PathBuf),

    /// File was deleted
    Removed(PathBuf),
}

impl WatchEvent {
    /// Path the event is about.
    pub fn path(&self) -> &PathBuf {
        match self {
            WatchEvent::Changed(path) | WatchEvent::Removed(path) => path,
        }
    }
}

/// File watcher for detecting source changes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Create a new file watcher for the given paths.
    ///
    /// Returns the watcher and a channel to receive events. Events stop when
    /// the watcher is dropped.
    pub fn new(
        paths: &[PathBuf],
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        for path in paths {
            if path.exists() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .map_err(std::io::Error::other)?;
            } else {
                tracing::warn!("Not watching missing directory: {}", path.display());
            }
        }

        // Forward every event; reruns are coalesced per task downstream.
        std::thread::spawn(move || {
            while let Ok(event) = sync_rx.recv() {
                for path in event.paths {
                    if let Some(e) = classify_event(path, &event.kind) {
                        if async_tx.blocking_send(e).is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Classify a notify event into a WatchEvent.
fn classify_event(path: PathBuf, kind: &EventKind) -> Option<WatchEvent> {
    match kind {
        EventKind::Create(_) | EventKind::Modify(_) => Some(WatchEvent::Changed(path)),
        EventKind::Remove(_) => Some(WatchEvent::Removed(path)),
        _ => None,
    }
}
