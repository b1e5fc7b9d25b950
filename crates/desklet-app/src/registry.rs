//! Widget manifests on disk.
//!
//! Each widget lives in `<root>/<widget-id>/widget.toml`:
//!
//! ```toml
//! name = "Weather"
//! kind = "html"
//! default_width = 320
//! default_height = 180
//! prefs = "prefs.html"
//!
//! [default_config]
//! units = "metric"
//!
//! [backend]
//! command = ["./backend.sh", "--poll"]
//! env = { API_HOST = "example.org" }
//! ```
//!
//! Manifests are read on every lookup so edits are picked up without a
//! restart. Earlier roots shadow later ones.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use desklet_common::{RegistryError, WidgetKind};
use desklet_manager::{BackendSpec, DescriptorRegistry, WidgetDescriptor};
use regex::Regex;
use serde::Deserialize;
use serde_json::Map;
use tracing::{debug, warn};

pub const MANIFEST_FILE: &str = "widget.toml";

static WIDGET_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap());

pub fn is_valid_widget_id(id: &str) -> bool {
    WIDGET_ID_RE.is_match(id)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Manifest {
    name: Option<String>,
    kind: WidgetKind,
    default_width: Option<f64>,
    default_height: Option<f64>,
    default_config: toml::Table,
    prefs: Option<String>,
    backend: Option<BackendSpec>,
}

/// Registry backed by manifest directories.
#[derive(Debug, Clone)]
pub struct ManifestRegistry {
    roots: Vec<PathBuf>,
}

impl ManifestRegistry {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    async fn load(&self, widget_id: &str, dir: &Path) -> Result<WidgetDescriptor, RegistryError> {
        let path = dir.join(MANIFEST_FILE);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| RegistryError::Io(format!("{}: {e}", path.display())))?;
        let manifest: Manifest = toml::from_str(&text).map_err(|e| RegistryError::InvalidManifest {
            widget_id: widget_id.to_string(),
            reason: e.to_string(),
        })?;
        descriptor_from(widget_id, dir, manifest)
    }
}

fn descriptor_from(
    widget_id: &str,
    dir: &Path,
    manifest: Manifest,
) -> Result<WidgetDescriptor, RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidManifest {
        widget_id: widget_id.to_string(),
        reason,
    };

    if manifest.kind == WidgetKind::Chrome {
        return Err(invalid("kind \"chrome\" is reserved".into()));
    }
    if let Some(backend) = &manifest.backend {
        if backend.command.is_empty() {
            return Err(invalid("[backend] command is empty".into()));
        }
    }

    let mut descriptor = WidgetDescriptor::new(widget_id, manifest.kind);
    if let Some(name) = manifest.name {
        descriptor.name = name;
    }
    if let Some(width) = manifest.default_width {
        descriptor.default_width = width;
    }
    if let Some(height) = manifest.default_height {
        descriptor.default_height = height;
    }
    if descriptor.default_width <= 0.0 || descriptor.default_height <= 0.0 {
        return Err(invalid("default size must be positive".into()));
    }
    descriptor.default_config = match serde_json::to_value(&manifest.default_config)
        .map_err(|e| invalid(format!("default_config: {e}")))?
    {
        serde_json::Value::Object(map) => map,
        _ => Map::new(),
    };
    descriptor.prefs_uri = manifest.prefs;
    descriptor.backend = manifest.backend;
    descriptor.dir = Some(dir.to_path_buf());
    Ok(descriptor)
}

#[async_trait]
impl DescriptorRegistry for ManifestRegistry {
    async fn get_descriptor(&self, widget_id: &str) -> Result<WidgetDescriptor, RegistryError> {
        if !is_valid_widget_id(widget_id) {
            return Err(RegistryError::NotFound(widget_id.to_string()));
        }
        for root in &self.roots {
            let dir = root.join(widget_id);
            if tokio::fs::try_exists(dir.join(MANIFEST_FILE))
                .await
                .unwrap_or(false)
            {
                return self.load(widget_id, &dir).await;
            }
        }
        Err(RegistryError::NotFound(widget_id.to_string()))
    }

    async fn list_widgets(&self) -> Result<Vec<WidgetDescriptor>, RegistryError> {
        let mut found: Vec<WidgetDescriptor> = Vec::new();
        for root in &self.roots {
            let mut entries = match tokio::fs::read_dir(root).await {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(root = %root.display(), error = %e, "Widget root not readable");
                    continue;
                }
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| RegistryError::Io(format!("{}: {e}", root.display())))?
            {
                let Some(widget_id) = entry.file_name().to_str().map(str::to_owned) else {
                    continue;
                };
                if !is_valid_widget_id(&widget_id) || found.iter().any(|d| d.widget_id == widget_id) {
                    continue;
                }
                let dir = entry.path();
                if !dir.join(MANIFEST_FILE).is_file() {
                    continue;
                }
                match self.load(&widget_id, &dir).await {
                    Ok(descriptor) => found.push(descriptor),
                    Err(e) => warn!(widget_id, error = %e, "Skipping widget"),
                }
            }
        }
        found.sort_by(|a, b| a.widget_id.cmp(&b.widget_id));
        Ok(found)
    }
}
