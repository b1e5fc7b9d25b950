//! Loading and exporting the persisted instance table.

use std::collections::HashSet;

use desklet_common::{InstanceId, StateError};
use desklet_layout::instance_frame;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::WidgetManager;
use crate::events::ManagerEvent;
use crate::instance::{InstanceRecord, WidgetInstance};
use crate::migration::migrate;
use crate::persistence::parse_records;

/// What a [`WidgetManager::load_state`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Schema version found in the blob.
    pub from_version: u32,
    /// The blob was migrated and the result written back.
    pub migrated: bool,
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

/// Suppresses notifications and defers saves until the outermost guard
/// drops, which then performs one deferred save if anything asked for it.
struct Suppression<'a> {
    manager: &'a WidgetManager,
}

impl<'a> Suppression<'a> {
    fn enter(manager: &'a WidgetManager) -> Self {
        manager.lock().suppress += 1;
        Self { manager }
    }
}

impl Drop for Suppression<'_> {
    fn drop(&mut self) {
        let mut guard = self.manager.lock();
        let state = &mut *guard;
        state.suppress = state.suppress.saturating_sub(1);
        if state.suppress == 0 && state.dirty {
            state.dirty = false;
            self.manager.persist(state);
        }
    }
}

impl WidgetManager {
    /// Apply a persisted blob: migrate it, update matching records in
    /// place, create missing ones, and prune records the blob no longer
    /// lists (chrome records excepted). Records are then materialized in
    /// blob order and the previous selection restored when it survived.
    ///
    /// Only a blob that is not a JSON object or cannot be migrated fails
    /// the whole load; malformed records are skipped.
    pub async fn load_state(&self, raw: Value) -> Result<LoadReport, StateError> {
        let _suppression = Suppression::enter(self);

        let migrated = migrate(raw, self.registry.as_ref()).await?;
        let mut report = LoadReport {
            from_version: migrated.from,
            migrated: migrated.changed(),
            ..Default::default()
        };
        if migrated.changed() {
            info!(from = migrated.from, to = migrated.to, "State migrated; writing it back");
            if let Err(e) = self.store.save_now(migrated.state.clone()) {
                warn!(error = %e, "Could not persist migrated state");
            }
        }

        let records: Vec<InstanceRecord> = parse_records(&migrated.state)
            .into_iter()
            .filter(|r| !r.is_chrome())
            .collect();

        let (order, previous) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let previous = state.instances.selected().cloned();

            let incoming: HashSet<InstanceId> =
                records.iter().map(|r| r.instance_id.clone()).collect();
            for id in state.instances.ids() {
                let stale = state
                    .instances
                    .get(&id)
                    .is_some_and(|i| !i.record.is_chrome() && !incoming.contains(&id));
                if stale && self.remove_locked(state, &id) {
                    report.removed += 1;
                }
            }

            let mut order = Vec::with_capacity(records.len());
            for record in records {
                let id = record.instance_id.clone();
                match state.instances.get_mut(&id) {
                    Some(instance) => {
                        let moved_monitor = instance.record.monitor_index != record.monitor_index;
                        instance.record.update_from(record);
                        if moved_monitor {
                            // Detached until materialized on its new surface below.
                            self.release(instance);
                        } else if let (Some(actor), Some(surface)) = (
                            instance.actor,
                            state.surfaces.get(instance.record.monitor_index),
                        ) {
                            let record = &instance.record;
                            let frame = instance_frame(
                                surface,
                                record.norm_x,
                                record.norm_y,
                                record.width,
                                record.height,
                            );
                            self.renderer.move_actor(actor, frame.x, frame.y);
                            self.renderer.resize_actor(actor, frame.width, frame.height);
                        }
                        if let Some(host) = &instance.host {
                            host.set_config(instance.record.config.clone());
                        }
                        report.updated += 1;
                    }
                    None => {
                        let widget_id = record.widget_id.clone();
                        state.instances.insert(WidgetInstance::new(record));
                        self.notify(
                            state,
                            ManagerEvent::InstanceAdded {
                                instance_id: id.clone(),
                                widget_id,
                            },
                        );
                        report.created += 1;
                    }
                }
                if !order.contains(&id) {
                    order.push(id);
                }
            }
            state.instances.reorder(&order);
            (order, previous)
        };

        for id in &order {
            self.materialize(id).await;
        }

        {
            let mut guard = self.lock();
            let state = &mut *guard;
            let keep = previous.filter(|id| state.instances.contains(id));
            self.select_locked(state, keep.as_ref());
        }

        debug!(?report, "State loaded");
        Ok(report)
    }

    /// The canonical versioned blob for the current table.
    pub fn export_state(&self) -> Value {
        let state = self.lock();
        self.export_locked(&state)
    }
}
