//! Host state snapshots, edit mode and the "add widget" chrome.

use desklet_common::{InstanceId, MonitorIndex, WidgetKind};
use desklet_config::schema::HostConfig;
use tracing::debug;

use super::{ManagerState, WidgetManager};
use crate::instance::{InstanceRecord, WidgetInstance};
use crate::render::{ActorMessage, HostStateSnapshot};

/// Widget id carried by the "add widget" chrome records.
pub const ADD_WIDGET_CHROME: &str = "desklet.add-widget";
const CHROME_SIZE: f64 = 48.0;

impl WidgetManager {
    pub fn set_edit_mode(&self, enabled: bool) {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.edit_mode == enabled || state.torn_down {
            return;
        }
        state.edit_mode = enabled;
        debug!(enabled, "Edit mode changed");

        if enabled {
            self.add_chrome_locked(state);
        } else {
            for id in state.instances.chrome_ids() {
                if let Some(mut chrome) = state.instances.remove(&id) {
                    self.release(&mut chrome);
                }
            }
        }
        self.push_host_state_locked(state);
    }

    pub fn set_host_state(&self, host: HostConfig) {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.host = host;
        self.push_host_state_locked(state);
    }

    pub(crate) fn snapshot_for(&self, state: &ManagerState, id: &InstanceId) -> HostStateSnapshot {
        HostStateSnapshot {
            edit_mode: state.edit_mode,
            selected: state.instances.selected() == Some(id),
            theme: state.host.theme.clone(),
            reduced_motion: state.host.reduced_motion,
            direction: state.host.direction,
            locale: state.host.locale.clone(),
        }
    }

    /// Send a fresh snapshot to every materialized content-bearing instance.
    pub(crate) fn push_host_state_locked(&self, state: &ManagerState) {
        for instance in state.instances.iter() {
            let Some(actor) = instance.actor else { continue };
            if !instance.record.kind.is_content_bearing() {
                continue;
            }
            let snapshot = self.snapshot_for(state, instance.id());
            self.renderer.deliver(actor, ActorMessage::HostState(snapshot));
        }
    }

    /// One chrome record per surface, materialized immediately.
    pub(crate) fn add_chrome_locked(&self, state: &mut ManagerState) {
        let monitors: Vec<MonitorIndex> = state.surfaces.monitors();
        for monitor in monitors {
            let mut record = InstanceRecord::new(ADD_WIDGET_CHROME, WidgetKind::Chrome);
            record.monitor_index = monitor;
            record.norm_x = 1.0;
            record.norm_y = 1.0;
            record.width = CHROME_SIZE;
            record.height = CHROME_SIZE;
            let id = record.instance_id.clone();
            state.instances.insert(WidgetInstance::new(record));
            self.attach_locked(state, &id);
        }
    }
}
