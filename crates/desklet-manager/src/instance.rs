//! Widget instance records.
//!
//! [`InstanceRecord`] is the persisted part of an instance and serializes
//! with the camelCase field names of the state file. [`WidgetInstance`]
//! adds the transient rendering and backend handles.

use desklet_backend::BackendHost;
use desklet_common::{InstanceId, MonitorIndex, WidgetKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::render::ActorHandle;

/// Size used when a record or descriptor carries none.
pub const DEFAULT_WIDTH: f64 = 200.0;
pub const DEFAULT_HEIGHT: f64 = 150.0;

fn default_width() -> f64 {
    DEFAULT_WIDTH
}

fn default_height() -> f64 {
    DEFAULT_HEIGHT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    pub instance_id: InstanceId,
    pub widget_id: String,
    #[serde(default)]
    pub kind: WidgetKind,
    #[serde(default)]
    pub monitor_index: MonitorIndex,
    #[serde(default)]
    pub norm_x: f64,
    #[serde(default)]
    pub norm_y: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    /// Author-defined, passed through untouched.
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Snapshot taken at creation or migration; never re-resolved.
    #[serde(default)]
    pub has_backend: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefs_uri: Option<String>,
    #[serde(default)]
    pub has_preferences: bool,
    /// `false` means not yet granted. Refusal deletes the record.
    #[serde(default)]
    pub web_consent: bool,
    #[serde(default)]
    pub backend_consent: bool,
}

impl InstanceRecord {
    pub fn new(widget_id: impl Into<String>, kind: WidgetKind) -> Self {
        Self {
            instance_id: InstanceId::new(),
            widget_id: widget_id.into(),
            kind,
            monitor_index: 0,
            norm_x: 0.0,
            norm_y: 0.0,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            config: Map::new(),
            has_backend: false,
            prefs_uri: None,
            has_preferences: false,
            web_consent: false,
            backend_consent: false,
        }
    }

    /// Chrome records are shell affordances: never persisted or selected.
    pub fn is_chrome(&self) -> bool {
        self.kind == WidgetKind::Chrome
    }

    pub fn needs_web_consent(&self) -> bool {
        self.kind.is_content_bearing() && !self.web_consent
    }

    pub fn needs_backend_consent(&self) -> bool {
        self.has_backend && !self.backend_consent
    }

    /// Replace the persisted attributes with `incoming`, keeping identity.
    pub(crate) fn update_from(&mut self, incoming: InstanceRecord) {
        let id = std::mem::take(&mut self.instance_id);
        *self = incoming;
        self.instance_id = id;
    }
}

/// A record plus its live handles.
#[derive(Debug)]
pub struct WidgetInstance {
    pub record: InstanceRecord,
    pub actor: Option<ActorHandle>,
    pub host: Option<BackendHost>,
}

impl WidgetInstance {
    pub fn new(record: InstanceRecord) -> Self {
        Self {
            record,
            actor: None,
            host: None,
        }
    }

    pub fn id(&self) -> &InstanceId {
        &self.record.instance_id
    }

    pub fn is_materialized(&self) -> bool {
        self.actor.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_camel_case_fields() {
        let mut record = InstanceRecord::new("clock", WidgetKind::Html);
        record.norm_x = 0.25;
        record.prefs_uri = Some("prefs.html".into());
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["widgetId"], "clock");
        assert_eq!(v["monitorIndex"], 0);
        assert_eq!(v["normX"], 0.25);
        assert_eq!(v["hasBackend"], false);
        assert_eq!(v["prefsUri"], "prefs.html");
        assert_eq!(v["webConsent"], false);
        assert!(v.get("actor").is_none());
    }

    #[test]
    fn sparse_record_gets_defaults() {
        let record: InstanceRecord =
            serde_json::from_value(json!({"instanceId": "i-1", "widgetId": "notes"})).unwrap();
        assert_eq!(record.kind, WidgetKind::Html);
        assert_eq!(record.width, DEFAULT_WIDTH);
        assert_eq!(record.height, DEFAULT_HEIGHT);
        assert!(!record.has_backend);
        assert!(record.config.is_empty());
    }

    #[test]
    fn consent_needs_follow_kind_and_backend() {
        let mut record = InstanceRecord::new("w", WidgetKind::Html);
        assert!(record.needs_web_consent());
        assert!(!record.needs_backend_consent());

        record.has_backend = true;
        assert!(record.needs_backend_consent());
        record.backend_consent = true;
        assert!(!record.needs_backend_consent());

        let gtk = InstanceRecord::new("w", WidgetKind::Gtk);
        assert!(!gtk.needs_web_consent());
    }

    #[test]
    fn update_keeps_identity() {
        let mut record = InstanceRecord::new("a", WidgetKind::Html);
        let id = record.instance_id.clone();
        let mut incoming = InstanceRecord::new("a", WidgetKind::Html);
        incoming.norm_x = 0.75;
        record.update_from(incoming);
        assert_eq!(record.instance_id, id);
        assert_eq!(record.norm_x, 0.75);
    }
}
