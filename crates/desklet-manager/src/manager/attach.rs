//! Materializing instances onto surfaces and reacting to layout changes.

use std::sync::Arc;

use desklet_backend::{BackendHost, HostIdentity};
use desklet_common::InstanceId;
use desklet_layout::{instance_frame, LayoutSnapshot};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::backend::RegistrySource;
use super::{ManagerState, WidgetManager};
use crate::consent::ConsentOutcome;
use crate::instance::InstanceRecord;

impl WidgetManager {
    /// Give an instance an actor (and a backend host when it has one),
    /// asking for any missing consent first. Returns whether the instance
    /// ends up materialized.
    pub async fn materialize(&self, id: &InstanceId) -> bool {
        let is_chrome = {
            let state = self.lock();
            let Some(instance) = state.instances.get(id) else {
                return false;
            };
            if instance.is_materialized() {
                return true;
            }
            if state.surfaces.get(instance.record.monitor_index).is_none() {
                return false;
            }
            instance.record.is_chrome()
        };

        if !is_chrome && self.check_consent(id).await != ConsentOutcome::Granted {
            return false;
        }

        let mut guard = self.lock();
        self.attach_locked(&mut guard, id)
    }

    /// Create the actor (and host) for an instance whose consents are in
    /// place. A second call for a materialized instance is a no-op.
    pub(crate) fn attach_locked(&self, state: &mut ManagerState, id: &InstanceId) -> bool {
        let snapshot = self.snapshot_for(state, id);
        let Some(instance) = state.instances.get_mut(id) else {
            return false;
        };
        if instance.is_materialized() {
            return true;
        }
        let record = &instance.record;
        let Some(surface) = state.surfaces.get(record.monitor_index) else {
            return false;
        };

        let frame = instance_frame(surface, record.norm_x, record.norm_y, record.width, record.height);
        let Some(actor) = self.renderer.create_actor(record, surface, frame, &snapshot) else {
            warn!(instance_id = %id, widget_id = %record.widget_id, "Renderer declined to create actor");
            return false;
        };
        instance.actor = Some(actor);

        if instance.record.has_backend && instance.host.is_none() {
            instance.host = Some(self.spawn_host(&instance.record));
        }
        debug!(instance_id = %id, actor = actor.0, "Instance materialized");
        true
    }

    /// Build the backend host for `record` and start it in the background.
    fn spawn_host(&self, record: &InstanceRecord) -> BackendHost {
        let identity = HostIdentity::new(record.instance_id.clone(), record.widget_id.clone());
        let source = Arc::new(RegistrySource::new(Arc::clone(&self.registry), record.clone()));
        let host = BackendHost::new(
            identity,
            self.backend_options.clone(),
            source,
            self.host_tx.clone(),
        );
        host.set_config(record.config.clone());

        if !self.autostart_backends {
            return host;
        }
        match Handle::try_current() {
            Ok(handle) => {
                let starter = host.clone();
                handle.spawn(async move {
                    if let Err(e) = starter.ensure_started().await {
                        warn!(
                            instance_id = %starter.identity().instance_id,
                            error = %e,
                            "Backend did not start"
                        );
                    }
                });
            }
            Err(_) => debug!(instance_id = %record.instance_id, "No runtime; backend starts on first request"),
        }
        host
    }

    /// Apply an external layout notification. Only `redisplay` rebuilds the
    /// surfaces; every actor is then recreated on the new containers in its
    /// previous stacking order. Instances whose monitor vanished are
    /// detached (actor and host destroyed) but keep their records.
    pub async fn handle_layout_change(&self, snapshot: &LayoutSnapshot) {
        if !snapshot.change.redisplay {
            debug!(?snapshot.change, "Layout change without redisplay ignored");
            return;
        }

        let to_attach = {
            let mut guard = self.lock();
            let state = &mut *guard;
            if state.torn_down {
                return;
            }

            // Capture stacking before the actors go away.
            let order = self.stacked_ids(state);

            for id in state.instances.chrome_ids() {
                if let Some(mut chrome) = state.instances.remove(&id) {
                    self.release(&mut chrome);
                }
            }
            for instance in state.instances.iter_mut() {
                if let Some(actor) = instance.actor.take() {
                    self.renderer.destroy_actor(actor);
                }
            }

            state.surfaces.rebuild(&snapshot.surfaces);

            let mut attach = Vec::new();
            for id in order {
                let Some(instance) = state.instances.get_mut(&id) else {
                    continue;
                };
                if state.surfaces.get(instance.record.monitor_index).is_some() {
                    attach.push(id);
                } else if let Some(host) = instance.host.take() {
                    info!(instance_id = %id, monitor = instance.record.monitor_index, "Detaching instance from vanished monitor");
                    host.destroy();
                }
            }

            if state.edit_mode {
                self.add_chrome_locked(state);
            }
            attach
        };

        for id in to_attach {
            self.materialize(&id).await;
        }
    }
}
