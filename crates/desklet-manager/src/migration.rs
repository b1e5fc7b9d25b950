//! Forward migration of persisted state.
//!
//! Each step rewrites the raw JSON blob from version `n` to `n + 1`.
//! Migration runs on the raw blob so fields that older schemas lack can be
//! stamped in before records are decoded.

use desklet_common::StateError;
use serde_json::Value;
use tracing::{info, warn};

use crate::persistence::{schema_version, CURRENT_VERSION};
use crate::registry::DescriptorRegistry;

/// Outcome of [`migrate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Migrated {
    pub state: Value,
    pub from: u32,
    pub to: u32,
}

impl Migrated {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Bring `raw` up to [`CURRENT_VERSION`].
///
/// Blobs newer than this build are returned untouched.
pub async fn migrate(
    mut raw: Value,
    registry: &dyn DescriptorRegistry,
) -> Result<Migrated, StateError> {
    if !raw.is_object() {
        return Err(StateError::Migration("state is not a JSON object".into()));
    }

    let from = schema_version(&raw);
    if from > CURRENT_VERSION {
        warn!(
            version = from,
            supported = CURRENT_VERSION,
            "State file is newer than this build; loading without migration"
        );
        return Ok(Migrated {
            state: raw,
            from,
            to: from,
        });
    }

    let mut version = from;
    while version < CURRENT_VERSION {
        match version {
            1 => v1_to_v2(&mut raw, registry).await,
            other => {
                return Err(StateError::Migration(format!(
                    "no migration step from version {other}"
                )))
            }
        }
        version += 1;
        raw["version"] = Value::from(version);
        info!(from = version - 1, to = version, "State migrated");
    }

    Ok(Migrated {
        state: raw,
        from,
        to: version,
    })
}

/// Stamp `hasBackend` on every record lacking it, resolving each widget once.
async fn v1_to_v2(raw: &mut Value, registry: &dyn DescriptorRegistry) {
    let Some(entries) = raw.get_mut("instances").and_then(Value::as_array_mut) else {
        return;
    };

    for entry in entries.iter_mut() {
        let Some(record) = entry.as_object_mut() else {
            continue;
        };
        if record.contains_key("hasBackend") {
            continue;
        }
        let widget_id = record
            .get("widgetId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let has_backend = match registry.get_descriptor(&widget_id).await {
            Ok(descriptor) => descriptor.has_backend(),
            Err(e) => {
                warn!(widget_id = %widget_id, error = %e, "Descriptor lookup failed during migration");
                false
            }
        };
        record.insert("hasBackend".into(), Value::Bool(has_backend));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BackendSpec, StaticRegistry, WidgetDescriptor};
    use desklet_common::WidgetKind;
    use serde_json::json;

    fn registry() -> StaticRegistry {
        StaticRegistry::new()
            .with(WidgetDescriptor::new("clock", WidgetKind::Html))
            .with(
                WidgetDescriptor::new("weather", WidgetKind::Html).with_backend(BackendSpec {
                    command: vec!["node".into(), "main.js".into()],
                    ..Default::default()
                }),
            )
    }

    #[tokio::test]
    async fn version_zero_migrates_like_v1() {
        let raw = json!({
            "version": 0,
            "instances": [{"instanceId": "b", "widgetId": "weather"}]
        });
        let migrated = migrate(raw, &registry()).await.unwrap();
        assert_eq!((migrated.from, migrated.to), (1, 2));
        assert_eq!(migrated.state["version"], 2);
        assert_eq!(migrated.state["instances"][0]["hasBackend"], true);
    }

    #[tokio::test]
    async fn v1_gets_has_backend_from_registry() {
        let raw = json!({
            "instances": [
                {"instanceId": "a", "widgetId": "clock"},
                {"instanceId": "b", "widgetId": "weather"},
                {"instanceId": "c", "widgetId": "gone"},
                {"instanceId": "d", "widgetId": "weather", "hasBackend": false}
            ]
        });
        let migrated = migrate(raw, &registry()).await.unwrap();
        assert!(migrated.changed());
        assert_eq!((migrated.from, migrated.to), (1, 2));

        let state = migrated.state;
        assert_eq!(state["version"], 2);
        assert_eq!(state["instances"][0]["hasBackend"], false);
        assert_eq!(state["instances"][1]["hasBackend"], true);
        assert_eq!(state["instances"][2]["hasBackend"], false);
        // Existing snapshots are never re-resolved.
        assert_eq!(state["instances"][3]["hasBackend"], false);
    }

    #[tokio::test]
    async fn current_version_is_untouched() {
        let raw = json!({"version": 2, "instances": [{"instanceId": "a", "widgetId": "weather"}]});
        let migrated = migrate(raw.clone(), &registry()).await.unwrap();
        assert!(!migrated.changed());
        assert_eq!(migrated.state, raw);
    }

    #[tokio::test]
    async fn future_version_passes_through() {
        let raw = json!({"version": 9, "instances": []});
        let migrated = migrate(raw.clone(), &registry()).await.unwrap();
        assert_eq!(migrated.to, 9);
        assert_eq!(migrated.state, raw);
    }

    #[tokio::test]
    async fn non_object_is_rejected() {
        let err = migrate(json!([1, 2]), &registry()).await.unwrap_err();
        assert!(matches!(err, StateError::Migration(_)));
    }
}
