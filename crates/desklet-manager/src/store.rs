//! The in-memory instance table.

use std::collections::HashMap;

use desklet_common::InstanceId;

use crate::instance::WidgetInstance;

/// Instances keyed by id, plus insertion order and the single selection.
#[derive(Debug, Default)]
pub struct InstanceStore {
    instances: HashMap<InstanceId, WidgetInstance>,
    order: Vec<InstanceId>,
    selected: Option<InstanceId>,
}

impl InstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced instance keeps its position.
    pub fn insert(&mut self, instance: WidgetInstance) -> Option<WidgetInstance> {
        let id = instance.id().clone();
        let previous = self.instances.insert(id.clone(), instance);
        if previous.is_none() {
            self.order.push(id);
        }
        previous
    }

    pub fn remove(&mut self, id: &InstanceId) -> Option<WidgetInstance> {
        let removed = self.instances.remove(id)?;
        self.order.retain(|i| i != id);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        Some(removed)
    }

    pub fn get(&self, id: &InstanceId) -> Option<&WidgetInstance> {
        self.instances.get(id)
    }

    pub fn get_mut(&mut self, id: &InstanceId) -> Option<&mut WidgetInstance> {
        self.instances.get_mut(id)
    }

    pub fn contains(&self, id: &InstanceId) -> bool {
        self.instances.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> Vec<InstanceId> {
        self.order.clone()
    }

    /// Instances in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &WidgetInstance> {
        self.order.iter().filter_map(|id| self.instances.get(id))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut WidgetInstance> {
        self.instances.values_mut()
    }

    /// Ids of internal chrome records.
    pub fn chrome_ids(&self) -> Vec<InstanceId> {
        self.iter()
            .filter(|i| i.record.is_chrome())
            .map(|i| i.id().clone())
            .collect()
    }

    /// Move the listed ids to the front, in the given order.
    pub fn reorder(&mut self, front: &[InstanceId]) {
        let mut order: Vec<InstanceId> = front
            .iter()
            .filter(|id| self.instances.contains_key(*id))
            .cloned()
            .collect();
        for id in &self.order {
            if !order.contains(id) {
                order.push(id.clone());
            }
        }
        self.order = order;
    }

    pub fn selected(&self) -> Option<&InstanceId> {
        self.selected.as_ref()
    }

    /// Apply the selection rule: unknown ids and chrome records select
    /// nothing. `None` when the selection did not change.
    pub fn select(&mut self, id: Option<&InstanceId>) -> Option<SelectionChange> {
        let target = id
            .filter(|id| self.get(id).is_some_and(|i| !i.record.is_chrome()))
            .cloned();
        if target == self.selected {
            return None;
        }
        let previous = std::mem::replace(&mut self.selected, target.clone());
        Some(SelectionChange {
            previous,
            current: target,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub previous: Option<InstanceId>,
    pub current: Option<InstanceId>,
}
