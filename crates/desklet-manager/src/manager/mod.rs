//! The `WidgetManager` façade.
//!
//! Owns the instance table and the surface table, and orchestrates the
//! renderer, registry, state store and consent prompter in response to
//! layout changes and UI actions. All methods take `&self`; the tables sit
//! behind one mutex that is never held across an await, so concurrent
//! callers interleave only at suspension points (descriptor resolution,
//! consent prompts, migration).

mod attach;
mod backend;
mod consent;
mod host_state;
mod instances;
mod state;


pub use host_state::ADD_WIDGET_CHROME;
pub use instances::CreateOptions;
pub use state::LoadReport;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use desklet_backend::{HostOptions, HostOutput};
use desklet_common::{EventBus, InstanceId, MonitorIndex};
use desklet_config::schema::HostConfig;
use desklet_config::DeskletConfig;
use desklet_layout::{Surface, SurfaceTable};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::consent::{ConsentGate, ConsentPrompter};
use crate::events::ManagerEvent;
use crate::instance::{InstanceRecord, WidgetInstance};
use crate::persistence::{StateBlob, StateStore};
use crate::registry::DescriptorRegistry;
use crate::render::{ActorHandle, RenderBackend};
use crate::store::InstanceStore;

/// External collaborators the manager drives.
#[derive(Clone)]
pub struct Collaborators {
    pub registry: Arc<dyn DescriptorRegistry>,
    pub renderer: Arc<dyn RenderBackend>,
    pub store: Arc<dyn StateStore>,
    pub prompter: Arc<dyn ConsentPrompter>,
}

#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub host: HostConfig,
    pub backend: HostOptions,
    /// Start backend processes as soon as an instance materializes.
    /// When off, a host starts on its first request.
    pub autostart_backends: bool,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            host: HostConfig::default(),
            backend: HostOptions::default(),
            autostart_backends: true,
        }
    }
}

impl ManagerOptions {
    pub fn from_config(config: &DeskletConfig) -> Self {
        Self {
            host: config.host.clone(),
            backend: HostOptions {
                shutdown_grace: std::time::Duration::from_millis(config.backend.shutdown_grace_ms),
                kill_grace: std::time::Duration::from_millis(config.backend.kill_grace_ms),
                inherit_env: config.backend.inherit_env,
                ..Default::default()
            },
            autostart_backends: true,
        }
    }
}

pub(crate) struct ManagerState {
    pub(crate) instances: InstanceStore,
    pub(crate) surfaces: SurfaceTable,
    pub(crate) edit_mode: bool,
    pub(crate) host: HostConfig,
    /// Depth of nested suppressed sections (state loads).
    pub(crate) suppress: u32,
    /// A save was requested while suppressed.
    pub(crate) dirty: bool,
    pub(crate) torn_down: bool,
}

pub struct WidgetManager {
    state: Mutex<ManagerState>,
    registry: Arc<dyn DescriptorRegistry>,
    renderer: Arc<dyn RenderBackend>,
    store: Arc<dyn StateStore>,
    prompter: Arc<dyn ConsentPrompter>,
    gate: ConsentGate,
    events: EventBus<ManagerEvent>,
    host_tx: mpsc::UnboundedSender<HostOutput>,
    backend_options: HostOptions,
    autostart_backends: bool,
}

impl WidgetManager {
    /// Build a manager. Backend host output arrives on the returned
    /// receiver and must be fed back through
    /// [`handle_host_output`](Self::handle_host_output).
    pub fn new(
        collaborators: Collaborators,
        options: ManagerOptions,
    ) -> (Self, mpsc::UnboundedReceiver<HostOutput>) {
        let (host_tx, host_rx) = mpsc::unbounded_channel();
        let manager = Self {
            state: Mutex::new(ManagerState {
                instances: InstanceStore::new(),
                surfaces: SurfaceTable::new(),
                edit_mode: false,
                host: options.host,
                suppress: 0,
                dirty: false,
                torn_down: false,
            }),
            registry: collaborators.registry,
            renderer: collaborators.renderer,
            store: collaborators.store,
            prompter: collaborators.prompter,
            gate: ConsentGate::new(),
            events: EventBus::default(),
            host_tx,
            backend_options: options.backend,
            autostart_backends: options.autostart_backends,
        };
        (manager, host_rx)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn instance(&self, id: &InstanceId) -> Option<InstanceRecord> {
        self.lock().instances.get(id).map(|i| i.record.clone())
    }

    /// Persistable records in table order.
    pub fn instances(&self) -> Vec<InstanceRecord> {
        self.lock()
            .instances
            .iter()
            .filter(|i| !i.record.is_chrome())
            .map(|i| i.record.clone())
            .collect()
    }

    /// Chrome records currently shown (edit mode only).
    pub fn chrome_records(&self) -> Vec<InstanceRecord> {
        self.lock()
            .instances
            .iter()
            .filter(|i| i.record.is_chrome())
            .map(|i| i.record.clone())
            .collect()
    }

    pub fn actor(&self, id: &InstanceId) -> Option<ActorHandle> {
        self.lock().instances.get(id).and_then(|i| i.actor)
    }

    pub fn has_host(&self, id: &InstanceId) -> bool {
        self.lock()
            .instances
            .get(id)
            .is_some_and(|i| i.host.is_some())
    }

    pub fn selected(&self) -> Option<InstanceId> {
        self.lock().instances.selected().cloned()
    }

    pub fn surfaces(&self) -> Vec<Surface> {
        self.lock().surfaces.iter().cloned().collect()
    }

    pub fn is_edit_mode(&self) -> bool {
        self.lock().edit_mode
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    /// Destroy every actor and backend host and forget the surfaces.
    /// Records survive so state can still be exported. Idempotent.
    pub fn teardown(&self) {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.torn_down {
            return;
        }
        state.torn_down = true;

        for id in state.instances.chrome_ids() {
            if let Some(mut chrome) = state.instances.remove(&id) {
                self.release(&mut chrome);
            }
        }
        for instance in state.instances.iter_mut() {
            self.release(instance);
        }
        state.instances.select(None);
        state.surfaces.clear();
        debug!(instances = state.instances.len(), "Widget manager torn down");
    }

    // =========================================================================
    // SHARED HELPERS
    // =========================================================================

    /// Destroy an instance's actor and backend host, keeping the record.
    pub(crate) fn release(&self, instance: &mut WidgetInstance) {
        if let Some(actor) = instance.actor.take() {
            self.renderer.destroy_actor(actor);
        }
        if let Some(host) = instance.host.take() {
            host.destroy();
        }
    }

    /// Publish unless a load is suppressing notifications.
    pub(crate) fn notify(&self, state: &ManagerState, event: ManagerEvent) {
        if state.suppress == 0 {
            self.events.publish(event);
        }
    }

    /// Schedule a save of the current table, or defer it while suppressed.
    pub(crate) fn persist(&self, state: &mut ManagerState) {
        if state.suppress > 0 {
            state.dirty = true;
            return;
        }
        self.store.schedule_save(self.export_locked(state));
        self.events.publish(ManagerEvent::StateChanged);
    }

    /// Write the current table immediately, bypassing suppression.
    pub(crate) fn flush(&self, state: &ManagerState) {
        if let Err(e) = self.store.save_now(self.export_locked(state)) {
            warn!(error = %e, "Immediate state write failed");
        }
    }

    /// Canonical blob: non-chrome records in [`stacked_ids`](Self::stacked_ids) order.
    pub(crate) fn export_locked(&self, state: &ManagerState) -> Value {
        let records = self
            .stacked_ids(state)
            .iter()
            .filter_map(|id| state.instances.get(id))
            .map(|i| i.record.clone())
            .collect();
        StateBlob::new(records).to_value()
    }

    /// Non-chrome ids ordered by monitor, then by the renderer's stacking
    /// order (bottom to top). Detached records follow in table order.
    pub(crate) fn stacked_ids(&self, state: &ManagerState) -> Vec<InstanceId> {
        let mut stacks: HashMap<MonitorIndex, Vec<ActorHandle>> = HashMap::new();
        let mut keyed: Vec<(MonitorIndex, usize, InstanceId)> = Vec::new();
        for instance in state.instances.iter().filter(|i| !i.record.is_chrome()) {
            let monitor = instance.record.monitor_index;
            let rank = instance
                .actor
                .and_then(|actor| {
                    stacks
                        .entry(monitor)
                        .or_insert_with(|| self.renderer.stacking_order(monitor))
                        .iter()
                        .position(|h| *h == actor)
                })
                .unwrap_or(usize::MAX);
            keyed.push((monitor, rank, instance.id().clone()));
        }
        keyed.sort_by_key(|(monitor, rank, _)| (*monitor, *rank));
        keyed.into_iter().map(|(_, _, id)| id).collect()
    }
}

impl Drop for WidgetManager {
    fn drop(&mut self) {
        self.teardown();
    }
}
