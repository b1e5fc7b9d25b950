//! Outward notifications published by the manager.

use desklet_backend::BackendError;
use desklet_common::InstanceId;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ManagerEvent {
    InstanceAdded {
        instance_id: InstanceId,
        widget_id: String,
    },
    InstanceRemoved {
        instance_id: InstanceId,
    },
    /// Geometry, config or consent of an instance changed.
    InstanceUpdated {
        instance_id: InstanceId,
    },
    SelectionChanged {
        selected: Option<InstanceId>,
    },
    /// The persisted table changed; a save has been scheduled.
    StateChanged,
    BackendResponse {
        instance_id: InstanceId,
        request_id: String,
        result: Result<Value, BackendError>,
    },
    BackendEvent {
        instance_id: InstanceId,
        name: String,
        payload: Value,
    },
}
