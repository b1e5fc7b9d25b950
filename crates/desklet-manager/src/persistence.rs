//! Persisted state: the versioned blob, the store seam, and record parsing.

use std::sync::Mutex;

use desklet_common::StateError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::instance::InstanceRecord;

/// Schema version written by this build.
pub const CURRENT_VERSION: u32 = 2;

/// Canonical exported state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateBlob {
    pub version: u32,
    pub instances: Vec<InstanceRecord>,
}

impl StateBlob {
    pub fn new(instances: Vec<InstanceRecord>) -> Self {
        Self {
            version: CURRENT_VERSION,
            instances,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to encode state blob");
            Value::Null
        })
    }
}

/// Where exported state goes.
///
/// `schedule_save` may coalesce writes; `save_now` must not.
pub trait StateStore: Send + Sync {
    fn schedule_save(&self, state: Value);

    fn save_now(&self, state: Value) -> Result<(), StateError>;
}

/// Version of a raw blob. Missing, zero or malformed versions count as 1.
pub fn schema_version(raw: &Value) -> u32 {
    raw.get("version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .filter(|&v| v >= 1)
        .unwrap_or(1)
}

/// Decode every well-formed record, skipping and logging the rest.
pub fn parse_records(raw: &Value) -> Vec<InstanceRecord> {
    let Some(entries) = raw.get("instances").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            match serde_json::from_value::<InstanceRecord>(entry.clone()) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(index, error = %e, "Skipping malformed instance record");
                    None
                }
            }
        })
        .collect()
}

/// Parse state file text, treating empty content as an empty table.
pub fn parse_state(text: &str) -> Result<Value, StateError> {
    if text.trim().is_empty() {
        return Ok(serde_json::json!({ "version": CURRENT_VERSION, "instances": [] }));
    }
    serde_json::from_str(text).map_err(|e| StateError::Parse(e.to_string()))
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Scheduled,
    Immediate,
}

/// Records every write instead of touching disk.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    writes: Mutex<Vec<(WriteKind, Value)>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(WriteKind, Value)>> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn write_count(&self) -> usize {
        self.lock().len()
    }

    pub fn writes(&self) -> Vec<(WriteKind, Value)> {
        self.lock().clone()
    }

    pub fn last(&self) -> Option<Value> {
        self.lock().last().map(|(_, v)| v.clone())
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl StateStore for MemoryStateStore {
    fn schedule_save(&self, state: Value) {
        self.lock().push((WriteKind::Scheduled, state));
    }

    fn save_now(&self, state: Value) -> Result<(), StateError> {
        self.lock().push((WriteKind::Immediate, state));
        Ok(())
    }
}
