//! Instance CRUD, selection, geometry and config updates.

use desklet_common::{InstanceId, MonitorIndex, Rect, RegistryError, WidgetKind};
use desklet_layout::{default_placement, instance_frame, placement_changed};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{ManagerState, WidgetManager};
use crate::events::ManagerEvent;
use crate::instance::{InstanceRecord, WidgetInstance};
use crate::registry::WidgetDescriptor;
use crate::render::ActorMessage;

/// Optional overrides for [`WidgetManager::create_instance`].
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Target monitor; the first surface when unset.
    pub monitor: Option<MonitorIndex>,
    /// Absolute position on the surface; centered-ish when unset.
    pub x: Option<f64>,
    pub y: Option<f64>,
    /// Merged over the descriptor's default config.
    pub config: Option<Map<String, Value>>,
}

impl WidgetManager {
    /// Create, register and materialize a new instance of `widget_id`.
    ///
    /// Returns `None` (after logging) when there is no suitable surface,
    /// when the registry fails for a reason other than an unknown widget,
    /// or when a consent was refused.
    pub async fn create_instance(
        &self,
        widget_id: &str,
        options: CreateOptions,
    ) -> Option<InstanceId> {
        let surface = {
            let state = self.lock();
            if state.torn_down {
                return None;
            }
            if state.surfaces.is_empty() {
                warn!(widget_id, "Cannot add widget: no surfaces");
                return None;
            }
            let surface = match options.monitor {
                Some(monitor) => state.surfaces.get(monitor),
                None => state.surfaces.first(),
            };
            match surface {
                Some(surface) => surface.clone(),
                None => {
                    warn!(widget_id, monitor = ?options.monitor, "Cannot add widget: no such monitor");
                    return None;
                }
            }
        };

        let descriptor = match self.registry.get_descriptor(widget_id).await {
            Ok(descriptor) => descriptor,
            Err(RegistryError::NotFound(_)) => {
                warn!(widget_id, "Unknown widget; falling back to an html instance");
                WidgetDescriptor::fallback(widget_id)
            }
            Err(e) => {
                warn!(widget_id, error = %e, "Cannot add widget: descriptor resolution failed");
                return None;
            }
        };
        if descriptor.kind == WidgetKind::Chrome {
            warn!(widget_id, "Refusing to create an internal chrome widget");
            return None;
        }

        let (width, height) = (descriptor.default_width, descriptor.default_height);
        let (default_x, default_y) = default_placement(surface.extent, width, height);
        let x = options.x.unwrap_or(default_x);
        let y = options.y.unwrap_or(default_y);
        let (norm_x, norm_y) = surface.to_normalized(x, y);

        let mut record = InstanceRecord::new(widget_id, descriptor.kind);
        record.monitor_index = surface.monitor_index;
        record.norm_x = norm_x;
        record.norm_y = norm_y;
        record.width = width;
        record.height = height;
        record.config = descriptor.default_config.clone();
        if let Some(overrides) = options.config {
            record.config.extend(overrides);
        }
        record.has_backend = descriptor.has_backend();
        record.has_preferences = descriptor.prefs_uri.is_some();
        record.prefs_uri = descriptor.prefs_uri.clone();
        let id = record.instance_id.clone();

        {
            let mut guard = self.lock();
            let state = &mut *guard;
            if state.torn_down {
                return None;
            }
            state.instances.insert(WidgetInstance::new(record));
            info!(instance_id = %id, widget_id, norm_x, norm_y, "Instance created");
            self.notify(
                state,
                ManagerEvent::InstanceAdded {
                    instance_id: id.clone(),
                    widget_id: widget_id.to_string(),
                },
            );
            self.persist(state);
        }

        self.materialize(&id).await;
        self.lock().instances.contains(&id).then_some(id)
    }

    /// Detach and delete an instance. Unknown ids are ignored.
    pub fn remove_instance(&self, id: &InstanceId) -> bool {
        let mut guard = self.lock();
        let state = &mut *guard;
        if !self.remove_locked(state, id) {
            return false;
        }
        self.persist(state);
        true
    }

    /// Remove without persisting. Emits the removal notifications.
    pub(crate) fn remove_locked(&self, state: &mut ManagerState, id: &InstanceId) -> bool {
        let was_selected = state.instances.selected() == Some(id);
        let Some(mut instance) = state.instances.remove(id) else {
            debug!(instance_id = %id, "Remove ignored: unknown instance");
            return false;
        };
        self.release(&mut instance);
        info!(instance_id = %id, widget_id = %instance.record.widget_id, "Instance removed");
        self.notify(
            state,
            ManagerEvent::InstanceRemoved {
                instance_id: id.clone(),
            },
        );
        if was_selected {
            self.notify(state, ManagerEvent::SelectionChanged { selected: None });
        }
        true
    }

    /// Select one instance, or nothing. Unknown ids and chrome records
    /// clear the selection.
    pub fn select_instance(&self, id: Option<&InstanceId>) -> Option<InstanceId> {
        let mut guard = self.lock();
        let state = &mut *guard;
        self.select_locked(state, id);
        state.instances.selected().cloned()
    }

    pub(crate) fn select_locked(&self, state: &mut ManagerState, id: Option<&InstanceId>) {
        let Some(change) = state.instances.select(id) else {
            return;
        };

        // Previous selection chrome goes first.
        for (target, selected) in [(&change.previous, false), (&change.current, true)] {
            let Some(target) = target else { continue };
            if let Some(actor) = state.instances.get(target).and_then(|i| i.actor) {
                self.renderer.set_selected(actor, selected);
                let snapshot = self.snapshot_for(state, target);
                self.renderer.deliver(actor, ActorMessage::HostState(snapshot));
            }
        }
        self.notify(
            state,
            ManagerEvent::SelectionChanged {
                selected: change.current,
            },
        );
    }

    /// Current absolute frame, clamped inside the owning surface.
    pub fn instance_frame(&self, id: &InstanceId) -> Option<Rect> {
        let state = self.lock();
        let record = &state.instances.get(id)?.record;
        let surface = state.surfaces.get(record.monitor_index)?;
        Some(instance_frame(
            surface,
            record.norm_x,
            record.norm_y,
            record.width,
            record.height,
        ))
    }

    /// Move and/or resize an instance from an absolute rect on its surface.
    ///
    /// Returns `false` without persisting when nothing changed beyond the
    /// normalization epsilon, or when the instance is detached.
    pub fn set_instance_frame(&self, id: &InstanceId, frame: Rect) -> bool {
        let mut guard = self.lock();
        let state = &mut *guard;

        let Some(instance) = state.instances.get_mut(id) else {
            return false;
        };
        if instance.record.is_chrome() {
            return false;
        }
        let Some(surface) = state.surfaces.get(instance.record.monitor_index) else {
            debug!(instance_id = %id, "Frame change ignored: instance is detached");
            return false;
        };

        let record = &mut instance.record;
        let new_norm = surface.to_normalized(frame.x, frame.y);
        if !placement_changed(
            (record.norm_x, record.norm_y),
            new_norm,
            (record.width, record.height),
            (frame.width, frame.height),
        ) {
            return false;
        }

        let resized = (record.width, record.height) != (frame.width, frame.height);
        (record.norm_x, record.norm_y) = new_norm;
        record.width = frame.width;
        record.height = frame.height;

        if let Some(actor) = instance.actor {
            let clamped = instance_frame(surface, new_norm.0, new_norm.1, frame.width, frame.height);
            self.renderer.move_actor(actor, clamped.x, clamped.y);
            if resized {
                self.renderer.resize_actor(actor, frame.width, frame.height);
            }
        }

        self.notify(
            state,
            ManagerEvent::InstanceUpdated {
                instance_id: id.clone(),
            },
        );
        self.persist(state);
        true
    }

    /// Shallow-merge `patch` into the instance's config, persist it, and
    /// tell a running backend.
    pub fn update_instance_config(&self, id: &InstanceId, patch: Map<String, Value>) -> bool {
        let mut guard = self.lock();
        let state = &mut *guard;

        let Some(instance) = state.instances.get_mut(id) else {
            return false;
        };
        if instance.record.is_chrome() {
            return false;
        }
        instance.record.config.extend(patch);

        if let Some(host) = &instance.host {
            let config = instance.record.config.clone();
            host.set_config(config.clone());
            host.send_event("config-changed", Value::Object(config));
        }

        self.notify(
            state,
            ManagerEvent::InstanceUpdated {
                instance_id: id.clone(),
            },
        );
        self.persist(state);
        true
    }
}
