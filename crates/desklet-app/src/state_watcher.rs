//! Watches the state file for edits made by other processes.
//!
//! Editors and other tools save by write-and-rename, which produces bursts
//! of events; they are coalesced with a 500ms debounce before one reload
//! signal is sent.

use std::path::PathBuf;
use std::time::Duration;

use desklet_common::ConfigError;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

pub const DEBOUNCE: Duration = Duration::from_millis(500);

pub struct StateWatcher {
    path: PathBuf,
    debounce: Duration,
}

impl StateWatcher {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            debounce: DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Send `()` on `tx` after each debounced burst of changes to the file.
    ///
    /// Runs until `tx` is closed. The parent directory is watched so the
    /// file may be created or replaced after the watch starts.
    pub async fn watch(&self, tx: mpsc::Sender<()>) -> Result<(), ConfigError> {
        let watch_path = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();

        std::fs::create_dir_all(&watch_path).map_err(|e| {
            ConfigError::WatchError(format!("failed to create {}: {e}", watch_path.display()))
        })?;

        let (event_tx, mut event_rx) = mpsc::channel::<()>(16);
        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        return;
                    }
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().is_some_and(|n| n == file_name));
                    if ours {
                        let _ = event_tx.try_send(());
                    }
                }
                Err(e) => error!("state watcher error: {e}"),
            },
            notify::Config::default(),
        )
        .map_err(|e| ConfigError::WatchError(format!("failed to create watcher: {e}")))?;

        watcher
            .watch(&watch_path, RecursiveMode::NonRecursive)
            .map_err(|e| {
                ConfigError::WatchError(format!("failed to watch {}: {e}", watch_path.display()))
            })?;
        info!(path = %self.path.display(), "Watching state file");

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                first = event_rx.recv() => {
                    if first.is_none() {
                        break;
                    }
                }
            }

            let debounce = tokio::time::sleep(self.debounce);
            tokio::pin!(debounce);
            loop {
                tokio::select! {
                    _ = &mut debounce => break,
                    more = event_rx.recv() => {
                        if more.is_none() {
                            return Ok(());
                        }
                    }
                }
            }

            debug!("State file changed on disk");
            if tx.send(()).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_of_writes_yields_one_signal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let watcher = StateWatcher::new(path.clone()).with_debounce(Duration::from_millis(150));
        let (tx, mut rx) = mpsc::channel(4);
        let task = tokio::spawn(async move { watcher.watch(tx).await });

        // Give the backend a moment to register the watch.
        tokio::time::sleep(Duration::from_millis(200)).await;
        for n in 0..3 {
            std::fs::write(&path, format!("{{\"n\":{n}}}")).unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no reload signal")
            .expect("watcher stopped");
        assert!(
            tokio::time::timeout(Duration::from_millis(400), rx.recv())
                .await
                .is_err(),
            "burst should coalesce into one signal"
        );

        drop(rx);
        let result = tokio::time::timeout(Duration::from_secs(5), task).await;
        assert!(matches!(result, Ok(Ok(Ok(())))));
    }

    #[tokio::test]
    async fn other_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = StateWatcher::new(dir.path().join("state.json"))
            .with_debounce(Duration::from_millis(50));
        let (tx, mut rx) = mpsc::channel(4);
        tokio::spawn(async move { watcher.watch(tx).await });

        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(dir.path().join("other.json"), "{}").unwrap();
        assert!(tokio::time::timeout(Duration::from_millis(400), rx.recv())
            .await
            .is_err());
    }
}
