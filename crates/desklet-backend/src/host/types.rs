use std::time::Duration;

use desklet_common::InstanceId;
use serde_json::Value;

use crate::error::BackendError;
use crate::protocol::HostMode;

/// Which instance and widget a host serves. Sent in `hello`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub instance_id: InstanceId,
    pub widget_id: String,
}

impl HostIdentity {
    pub fn new(instance_id: InstanceId, widget_id: impl Into<String>) -> Self {
        Self {
            instance_id,
            widget_id: widget_id.into(),
        }
    }
}

/// Process supervision knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct HostOptions {
    /// How long a backend gets to exit on its own after `shutdown`.
    pub shutdown_grace: Duration,
    /// How long a backend gets after SIGTERM before it is killed.
    pub kill_grace: Duration,
    pub mode: HostMode,
    /// Pass the full host environment instead of the allowlist.
    pub inherit_env: bool,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            shutdown_grace: Duration::from_millis(500),
            kill_grace: Duration::from_millis(1500),
            mode: HostMode::Widget,
            inherit_env: false,
        }
    }
}

/// Everything a host reports back to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum HostOutput {
    /// Exactly one per accepted request id.
    Response {
        instance_id: InstanceId,
        request_id: String,
        result: Result<Value, BackendError>,
    },
    Event {
        instance_id: InstanceId,
        name: String,
        payload: Value,
    },
    Exited {
        instance_id: InstanceId,
        code: Option<i32>,
    },
}

impl HostOutput {
    pub fn instance_id(&self) -> &InstanceId {
        match self {
            HostOutput::Response { instance_id, .. }
            | HostOutput::Event { instance_id, .. }
            | HostOutput::Exited { instance_id, .. } => instance_id,
        }
    }
}

/// Observable lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPhase {
    NotStarted,
    Starting,
    Running,
    Exited,
}
