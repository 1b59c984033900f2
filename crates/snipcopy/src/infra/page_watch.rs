//! Watching a saved page on disk.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};

/// Quiet period used to coalesce the burst of events a single save produces.
const SETTLE: Duration = Duration::from_millis(100);

/// Invoke `on_change` once up front and again after every settled change to `path`.
///
/// The parent directory is watched rather than the file, so editors that save by
/// replacing the file keep triggering. Errors from `on_change` are logged, not fatal.
pub fn watch_page(path: &Path, mut on_change: impl FnMut(&Path) -> Result<()>) -> Result<()> {
    let target = path.to_path_buf();
    let directory = watched_directory(path);

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    })
    .context("failed to create file watcher")?;
    watcher
        .watch(&directory, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", directory.display()))?;

    on_change(&target)?;

    while let Ok(res) = rx.recv() {
        match res {
            Ok(event) if is_relevant(&event, &target) => {
                while rx.recv_timeout(SETTLE).is_ok() {}
                if let Err(err) = on_change(&target) {
                    tracing::warn!(path = %target.display(), error = %err, "reload failed");
                }
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "file watch error"),
        }
    }
    Ok(())
}

fn watched_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn is_relevant(event: &Event, target: &Path) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|changed| changed.file_name() == target.file_name())
}
