//! Rendering boundary.
//!
//! The manager never draws anything itself. It asks a [`RenderBackend`] to
//! create, move and destroy actors, pushes host state and backend traffic
//! to them, and reads the stacking order back when exporting state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use desklet_backend::BackendError;
use desklet_common::{InstanceId, MonitorIndex, Rect};
use desklet_config::schema::TextDirection;
use desklet_layout::Surface;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::instance::InstanceRecord;

/// Opaque handle to a materialized widget surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ActorHandle(pub u64);

/// Host state pushed to content-bearing widgets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostStateSnapshot {
    pub edit_mode: bool,
    pub selected: bool,
    pub theme: String,
    pub reduced_motion: bool,
    pub direction: TextDirection,
    pub locale: String,
}

/// Messages delivered to an actor's content.
#[derive(Debug, Clone, PartialEq)]
pub enum ActorMessage {
    HostState(HostStateSnapshot),
    BackendResponse {
        request_id: String,
        result: Result<Value, BackendError>,
    },
    BackendEvent {
        name: String,
        payload: Value,
    },
}

pub trait RenderBackend: Send + Sync {
    /// Materialize `record` inside `surface` at `frame`. `None` means the
    /// renderer declined; the record stays detached.
    fn create_actor(
        &self,
        record: &InstanceRecord,
        surface: &Surface,
        frame: Rect,
        host_state: &HostStateSnapshot,
    ) -> Option<ActorHandle>;

    fn destroy_actor(&self, actor: ActorHandle);

    fn move_actor(&self, actor: ActorHandle, x: f64, y: f64);

    fn resize_actor(&self, actor: ActorHandle, width: f64, height: f64);

    /// Attach or detach selection chrome.
    fn set_selected(&self, actor: ActorHandle, selected: bool);

    fn deliver(&self, actor: ActorHandle, message: ActorMessage);

    /// Actors on `monitor`, bottom to top.
    fn stacking_order(&self, monitor: MonitorIndex) -> Vec<ActorHandle>;
}

// =============================================================================
// HEADLESS RENDERER
// =============================================================================

#[derive(Debug, Clone)]
pub struct HeadlessActor {
    pub instance_id: InstanceId,
    pub widget_id: String,
    pub monitor: MonitorIndex,
    pub frame: Rect,
    pub selected: bool,
    pub inbox: Vec<ActorMessage>,
}

#[derive(Default)]
struct HeadlessState {
    next_handle: u64,
    actors: BTreeMap<ActorHandle, HeadlessActor>,
    stacks: HashMap<MonitorIndex, Vec<ActorHandle>>,
}

/// In-memory renderer for the daemon and tests. New actors stack on top.
#[derive(Default)]
pub struct HeadlessRenderer {
    state: Mutex<HeadlessState>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn actor(&self, handle: ActorHandle) -> Option<HeadlessActor> {
        self.lock().actors.get(&handle).cloned()
    }

    pub fn actor_for(&self, instance_id: &InstanceId) -> Option<ActorHandle> {
        self.lock()
            .actors
            .iter()
            .find(|(_, a)| &a.instance_id == instance_id)
            .map(|(h, _)| *h)
    }

    pub fn live_count(&self) -> usize {
        self.lock().actors.len()
    }

    /// Move `handle` to the top of its monitor's stack.
    pub fn raise(&self, handle: ActorHandle) {
        let mut state = self.lock();
        let Some(monitor) = state.actors.get(&handle).map(|a| a.monitor) else {
            return;
        };
        if let Some(stack) = state.stacks.get_mut(&monitor) {
            stack.retain(|h| *h != handle);
            stack.push(handle);
        }
    }

    /// Take every message delivered to `handle` so far.
    pub fn take_inbox(&self, handle: ActorHandle) -> Vec<ActorMessage> {
        self.lock()
            .actors
            .get_mut(&handle)
            .map(|a| std::mem::take(&mut a.inbox))
            .unwrap_or_default()
    }
}

impl RenderBackend for HeadlessRenderer {
    fn create_actor(
        &self,
        record: &InstanceRecord,
        surface: &Surface,
        frame: Rect,
        host_state: &HostStateSnapshot,
    ) -> Option<ActorHandle> {
        let mut state = self.lock();
        state.next_handle += 1;
        let handle = ActorHandle(state.next_handle);
        let mut inbox = Vec::new();
        if record.kind.is_content_bearing() {
            inbox.push(ActorMessage::HostState(host_state.clone()));
        }
        state.actors.insert(
            handle,
            HeadlessActor {
                instance_id: record.instance_id.clone(),
                widget_id: record.widget_id.clone(),
                monitor: surface.monitor_index,
                frame,
                selected: host_state.selected,
                inbox,
            },
        );
        state
            .stacks
            .entry(surface.monitor_index)
            .or_default()
            .push(handle);
        debug!(
            actor = handle.0,
            instance_id = %record.instance_id,
            x = frame.x,
            y = frame.y,
            "Actor created"
        );
        Some(handle)
    }

    fn destroy_actor(&self, actor: ActorHandle) {
        let mut state = self.lock();
        if let Some(removed) = state.actors.remove(&actor) {
            if let Some(stack) = state.stacks.get_mut(&removed.monitor) {
                stack.retain(|h| *h != actor);
            }
            debug!(actor = actor.0, instance_id = %removed.instance_id, "Actor destroyed");
        }
    }

    fn move_actor(&self, actor: ActorHandle, x: f64, y: f64) {
        if let Some(a) = self.lock().actors.get_mut(&actor) {
            a.frame.x = x;
            a.frame.y = y;
        }
    }

    fn resize_actor(&self, actor: ActorHandle, width: f64, height: f64) {
        if let Some(a) = self.lock().actors.get_mut(&actor) {
            a.frame.width = width;
            a.frame.height = height;
        }
    }

    fn set_selected(&self, actor: ActorHandle, selected: bool) {
        if let Some(a) = self.lock().actors.get_mut(&actor) {
            a.selected = selected;
        }
    }

    fn deliver(&self, actor: ActorHandle, message: ActorMessage) {
        if let Some(a) = self.lock().actors.get_mut(&actor) {
            a.inbox.push(message);
        }
    }

    fn stacking_order(&self, monitor: MonitorIndex) -> Vec<ActorHandle> {
        self.lock().stacks.get(&monitor).cloned().unwrap_or_default()
    }
}
