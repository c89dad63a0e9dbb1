//! Hot-reload stream: watches the config file and re-parses it on change.

use futures::stream::{self, Stream};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use sweeper_core::{Error, GlobalConfig, Result};
use tokio::sync::mpsc;

/// Watches `path` for modify/create events using the `notify` crate's
/// recommended watcher, running inside a blocking task, and yields a freshly
/// re-parsed and re-validated `GlobalConfig` each time the file changes.
///
/// The Scheduler swaps its held config pointer only between cycles; this
/// stream never interrupts an in-flight cycle (spec.md §10.2).
pub fn watch(path: &Path) -> impl Stream<Item = Result<GlobalConfig>> {
    let (tx, rx) = mpsc::channel::<Result<GlobalConfig>>(16);
    let watch_path = path.to_path_buf();

    tokio::task::spawn_blocking(move || run_watcher(watch_path, tx));

    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) })
}

fn run_watcher(config_path: PathBuf, tx: mpsc::Sender<Result<GlobalConfig>>) {
    let (notify_tx, notify_rx) = std::sync::mpsc::channel();

    let mut watcher = match RecommendedWatcher::new(
        move |res: std::result::Result<Event, notify::Error>| {
            if let Err(e) = notify_tx.send(res) {
                tracing::error!(error = %e, "failed to forward file watch event");
            }
        },
        notify::Config::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            tracing::error!(error = %e, "failed to create config file watcher");
            return;
        }
    };

    if let Err(e) = watcher.watch(&config_path, RecursiveMode::NonRecursive) {
        tracing::error!(error = %e, path = %config_path.display(), "failed to watch config file");
        return;
    }

    tracing::info!(path = %config_path.display(), "watching configuration file for changes");

    while let Ok(event_result) = notify_rx.recv() {
        match event_result {
            Ok(event) if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) => {
                let reloaded = crate::loader::load(&config_path);
                if tx.blocking_send(reloaded).is_err() {
                    tracing::debug!("config reload stream closed, stopping watcher");
                    break;
                }
            }
            Ok(_) => continue,
            Err(e) => {
                if tx.blocking_send(Err(Error::Config(format!("file watch error: {e}")))).is_err() {
                    break;
                }
            }
        }
    }
}
