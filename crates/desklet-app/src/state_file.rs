//! JSON state file with debounced, atomic writes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use desklet_common::StateError;
use desklet_manager::persistence::parse_state;
use desklet_manager::StateStore;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Default)]
struct Inner {
    pending: Option<JoinHandle<()>>,
    /// Bumped by every save; a scheduled write only lands if still current.
    generation: u64,
    /// Text of the last successful write, to recognize our own changes.
    last_written: Option<String>,
}

/// [`StateStore`] backed by one JSON file.
///
/// `schedule_save` replaces any pending write and waits `debounce` before
/// writing; `save_now` cancels the pending write and writes synchronously.
#[derive(Clone)]
pub struct FileStateStore {
    path: PathBuf,
    debounce: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>, debounce: Duration) -> Self {
        Self {
            path: path.into(),
            debounce,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Read and parse the file. `None` when it does not exist yet.
    pub fn read(&self) -> Result<Option<Value>, StateError> {
        match self.read_text()? {
            Some(text) => parse_state(&text).map(Some),
            None => Ok(None),
        }
    }

    pub fn read_text(&self) -> Result<Option<String>, StateError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StateError::Read(format!("{}: {e}", self.path.display()))),
        }
    }

    /// Whether `text` is exactly what this store last wrote.
    pub fn is_own_write(&self, text: &str) -> bool {
        self.lock().last_written.as_deref() == Some(text)
    }

    pub fn has_pending(&self) -> bool {
        self.lock()
            .pending
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn cancel_pending(inner: &mut Inner) {
        if let Some(task) = inner.pending.take() {
            task.abort();
        }
    }
}

fn render(state: &Value) -> Result<String, StateError> {
    let mut text = serde_json::to_string_pretty(state)
        .map_err(|e| StateError::Write(format!("failed to serialize state: {e}")))?;
    text.push('\n');
    Ok(text)
}

/// Write `.tmp` next to `path`, then rename over it.
fn write_atomic(path: &Path, text: &str) -> Result<(), StateError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            StateError::Write(format!("failed to create {}: {e}", parent.display()))
        })?;
    }
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, text)
        .map_err(|e| StateError::Write(format!("failed to write {}: {e}", tmp_path.display())))?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        StateError::Write(format!(
            "failed to rename {} to {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })?;
    debug!(path = %path.display(), bytes = text.len(), "State written");
    Ok(())
}

fn write_and_record(path: &Path, inner: &mut Inner, text: String) -> Result<(), StateError> {
    write_atomic(path, &text)?;
    inner.last_written = Some(text);
    Ok(())
}

impl StateStore for FileStateStore {
    fn schedule_save(&self, state: Value) {
        let text = match render(&state) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Dropping state save");
                return;
            }
        };

        let mut inner = self.lock();
        Self::cancel_pending(&mut inner);
        inner.generation += 1;
        let generation = inner.generation;

        let Ok(handle) = Handle::try_current() else {
            if let Err(e) = write_and_record(&self.path, &mut inner, text) {
                warn!(error = %e, "State save failed");
            }
            return;
        };

        let path = self.path.clone();
        let shared = Arc::clone(&self.inner);
        let debounce = self.debounce;
        inner.pending = Some(handle.spawn(async move {
            tokio::time::sleep(debounce).await;
            let mut inner = shared.lock().unwrap_or_else(|e| e.into_inner());
            if inner.generation != generation {
                return;
            }
            if let Err(e) = write_and_record(&path, &mut inner, text) {
                warn!(error = %e, "State save failed");
            }
        }));
    }

    fn save_now(&self, state: Value) -> Result<(), StateError> {
        let text = render(&state)?;
        let mut inner = self.lock();
        Self::cancel_pending(&mut inner);
        inner.generation += 1;
        write_and_record(&self.path, &mut inner, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(dir: &Path, debounce_ms: u64) -> FileStateStore {
        FileStateStore::new(dir.join("state.json"), Duration::from_millis(debounce_ms))
    }

    #[tokio::test]
    async fn scheduled_saves_coalesce() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 50);

        for n in 0..5 {
            store.schedule_save(json!({ "version": 2, "n": n }));
        }
        assert!(store.has_pending());
        assert!(store.read().unwrap().is_none());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.read().unwrap().unwrap()["n"], json!(4));
        assert!(!store.has_pending());
    }

    #[tokio::test]
    async fn save_now_cancels_pending_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 50);

        store.schedule_save(json!({ "which": "scheduled" }));
        store.save_now(json!({ "which": "immediate" })).unwrap();
        assert_eq!(store.read().unwrap().unwrap()["which"], json!("immediate"));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.read().unwrap().unwrap()["which"], json!("immediate"));
    }

    #[test]
    fn without_runtime_schedule_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 50);
        store.schedule_save(json!({ "version": 2 }));
        assert_eq!(store.read().unwrap().unwrap()["version"], json!(2));
    }

    #[test]
    fn own_writes_are_recognized() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 0);
        store.save_now(json!({ "version": 2, "instances": [] })).unwrap();

        let text = store.read_text().unwrap().unwrap();
        assert!(store.is_own_write(&text));
        assert!(!store.is_own_write("{}"));
    }

    #[test]
    fn creates_parent_dirs_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("nested/deeper/state.json"), Duration::ZERO);
        store.save_now(json!({ "version": 2 })).unwrap();
        assert!(store.path().exists());
        assert!(!dir.path().join("nested/deeper/state.json.tmp").exists());
    }

    #[test]
    fn garbage_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 0);
        std::fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.read(), Err(StateError::Parse(_))));
    }
}
