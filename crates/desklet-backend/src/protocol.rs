//! Wire protocol between the host and a widget backend.
//!
//! One JSON object per line, tagged by `type`. Unknown inbound tags decode
//! to [`InboundMessage::Unknown`] so the reader can log and move on.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BackendError, ErrorCode};

/// Which surface of the widget the backend is serving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostMode {
    #[default]
    Widget,
    Preferences,
}

/// Messages written to the backend's stdin.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    #[serde(rename_all = "camelCase")]
    Hello {
        instance_id: String,
        widget_id: String,
        mode: HostMode,
        config: Map<String, Value>,
    },
    Request {
        id: String,
        method: String,
        params: Value,
    },
    Event {
        name: String,
        payload: Value,
    },
    Shutdown,
}

impl OutboundMessage {
    /// Serialize to a single protocol line (without the trailing newline).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Error payload of a `response` with `ok: false`. Backends may send a bare
/// string or a `{code, message}` object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RemoteError {
    Text(String),
    Structured {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
}

impl From<RemoteError> for BackendError {
    fn from(value: RemoteError) -> Self {
        match value {
            RemoteError::Text(message) => BackendError::failure(message),
            RemoteError::Structured { code, message } => BackendError::new(
                code.map(ErrorCode::Remote)
                    .unwrap_or(ErrorCode::BackendFailure),
                message.unwrap_or_else(|| "backend reported an error".to_string()),
            ),
        }
    }
}

/// Messages read from the backend's stdout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    Response {
        id: String,
        #[serde(default)]
        ok: bool,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<RemoteError>,
    },
    Event {
        name: String,
        #[serde(default)]
        payload: Value,
    },
    Log {
        #[serde(default)]
        level: String,
        message: String,
    },
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Collapse a `response` into the value delivered to the caller.
pub(crate) fn response_outcome(
    ok: bool,
    result: Option<Value>,
    error: Option<RemoteError>,
) -> Result<Value, BackendError> {
    if ok {
        Ok(result.unwrap_or(Value::Null))
    } else {
        Err(error
            .map(BackendError::from)
            .unwrap_or_else(|| BackendError::failure("backend reported an error")))
    }
}
