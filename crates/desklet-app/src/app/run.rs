//! The `run` daemon loop and its orderly shutdown.

use std::future::Future;

use desklet_common::DeskletError;
use desklet_manager::{ManagerEvent, StateStore, WidgetManager};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::core::DeskletApp;
use crate::state_watcher::StateWatcher;

impl DeskletApp {
    /// Materialize every placed instance and relay backend traffic until
    /// `shutdown` resolves.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<(), DeskletError> {
        let (manager, mut host_rx) = self.open(true, true).await?;
        info!(
            instances = manager.instances().len(),
            surfaces = manager.surfaces().len(),
            "Desklet running"
        );

        let mut reload_rx = if self.config.state.watch {
            let (tx, rx) = mpsc::channel(4);
            let watcher = StateWatcher::new(self.store.path().to_path_buf());
            tokio::spawn(async move {
                if let Err(e) = watcher.watch(tx).await {
                    warn!(error = %e, "State watcher stopped");
                }
            });
            Some(rx)
        } else {
            None
        };

        let mut events = manager.subscribe();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(output) = host_rx.recv() => manager.handle_host_output(output),
                Some(()) = next_reload(&mut reload_rx) => {
                    self.reload(&manager).await;
                }
                event = events.recv() => log_event(event),
            }
        }

        self.shutdown(&manager);
        Ok(())
    }

    /// Re-read the state file after an external edit. Returns whether the
    /// manager reloaded it.
    pub(super) async fn reload(&self, manager: &WidgetManager) -> bool {
        let text = match self.store.read_text() {
            Ok(Some(text)) => text,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "Could not read changed state file");
                return false;
            }
        };
        if self.store.is_own_write(&text) {
            debug!("Ignoring our own state write");
            return false;
        }
        let blob = match desklet_manager::persistence::parse_state(&text) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "Changed state file is not valid; keeping current state");
                return false;
            }
        };
        match manager.load_state(blob).await {
            Ok(report) => {
                info!(
                    created = report.created,
                    updated = report.updated,
                    removed = report.removed,
                    "State reloaded from disk"
                );
                true
            }
            Err(e) => {
                warn!(error = %e, "State reload failed");
                false
            }
        }
    }

    /// Flush the final state while actors still report their stacking,
    /// then tear down every actor and backend.
    pub(super) fn shutdown(&self, manager: &WidgetManager) {
        info!("Initiating graceful shutdown");
        if let Err(e) = self.store.save_now(manager.export_state()) {
            warn!(error = %e, "Final state write failed");
        }
        manager.teardown();
        info!("Graceful shutdown complete");
    }
}

async fn next_reload(rx: &mut Option<mpsc::Receiver<()>>) -> Option<()> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn log_event(event: Result<ManagerEvent, broadcast::error::RecvError>) {
    match event {
        Ok(ManagerEvent::BackendResponse {
            instance_id,
            request_id,
            result,
        }) => match result {
            Ok(_) => debug!(%instance_id, request_id, "Backend response"),
            Err(e) => warn!(%instance_id, request_id, error = %e, "Backend request failed"),
        },
        Ok(ManagerEvent::BackendEvent {
            instance_id, name, ..
        }) => debug!(%instance_id, name, "Backend event"),
        Ok(event) => debug!(?event, "Manager event"),
        Err(broadcast::error::RecvError::Lagged(n)) => debug!(skipped = n, "Event log lagged"),
        Err(broadcast::error::RecvError::Closed) => {}
    }
}
