//! Widget descriptors and the registry seam that resolves them.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use desklet_backend::BackendCommand;
use desklet_common::{RegistryError, WidgetKind};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::instance::{InstanceRecord, DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Backend command line as declared by a widget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackendSpec {
    pub command: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

/// A widget's manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetDescriptor {
    pub widget_id: String,
    pub name: String,
    pub kind: WidgetKind,
    pub default_width: f64,
    pub default_height: f64,
    pub default_config: Map<String, Value>,
    pub backend: Option<BackendSpec>,
    pub prefs_uri: Option<String>,
    /// Directory the manifest was loaded from; relative paths resolve here.
    pub dir: Option<PathBuf>,
}

impl WidgetDescriptor {
    pub fn new(widget_id: impl Into<String>, kind: WidgetKind) -> Self {
        let widget_id = widget_id.into();
        Self {
            name: widget_id.clone(),
            widget_id,
            kind,
            default_width: DEFAULT_WIDTH,
            default_height: DEFAULT_HEIGHT,
            default_config: Map::new(),
            backend: None,
            prefs_uri: None,
            dir: None,
        }
    }

    /// Stand-in for a widget the registry cannot resolve.
    pub fn fallback(widget_id: &str) -> Self {
        Self::new(widget_id, WidgetKind::Html)
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.default_width = width;
        self.default_height = height;
        self
    }

    pub fn with_backend(mut self, spec: BackendSpec) -> Self {
        self.backend = Some(spec);
        self
    }
}

#[async_trait]
pub trait DescriptorRegistry: Send + Sync {
    async fn get_descriptor(&self, widget_id: &str) -> Result<WidgetDescriptor, RegistryError>;

    async fn list_widgets(&self) -> Result<Vec<WidgetDescriptor>, RegistryError>;

    /// Turn a descriptor's backend spec into a command for one instance.
    fn normalize_backend_spec(
        &self,
        descriptor: &WidgetDescriptor,
        record: &InstanceRecord,
    ) -> Result<BackendCommand, RegistryError> {
        normalize_backend_spec(descriptor, record)
    }
}

/// Resolve relative paths against the widget directory, default the
/// working directory to it, and tag the environment with the instance.
pub fn normalize_backend_spec(
    descriptor: &WidgetDescriptor,
    record: &InstanceRecord,
) -> Result<BackendCommand, RegistryError> {
    let spec = descriptor
        .backend
        .as_ref()
        .ok_or_else(|| invalid(descriptor, "widget declares no backend"))?;
    let (program, args) = spec
        .command
        .split_first()
        .ok_or_else(|| invalid(descriptor, "backend command is empty"))?;

    let dir = descriptor.dir.as_deref();
    let program = match dir {
        Some(dir) if is_relative_path(program) => dir.join(program).to_string_lossy().into_owned(),
        _ => program.clone(),
    };
    let cwd = match (&spec.cwd, dir) {
        (Some(cwd), Some(dir)) if cwd.is_relative() => Some(dir.join(cwd)),
        (Some(cwd), _) => Some(cwd.clone()),
        (None, dir) => dir.map(Path::to_path_buf),
    };

    let mut command = BackendCommand::new(std::iter::once(program).chain(args.iter().cloned()));
    command.cwd = cwd;
    command.env = spec.env.clone();
    command
        .env
        .insert("DESKLET_INSTANCE_ID".into(), record.instance_id.to_string());
    command
        .env
        .insert("DESKLET_WIDGET_ID".into(), descriptor.widget_id.clone());
    if let Some(dir) = dir {
        command
            .env
            .insert("DESKLET_WIDGET_DIR".into(), dir.to_string_lossy().into_owned());
    }
    Ok(command)
}

/// `./run.sh` and `bin/server` are relative; bare `node` is looked up on PATH.
fn is_relative_path(program: &str) -> bool {
    program.contains('/') && Path::new(program).is_relative()
}

fn invalid(descriptor: &WidgetDescriptor, reason: &str) -> RegistryError {
    RegistryError::InvalidManifest {
        widget_id: descriptor.widget_id.clone(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// STATIC REGISTRY
// =============================================================================

/// Fixed in-memory registry.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    descriptors: HashMap<String, WidgetDescriptor>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, descriptor: WidgetDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    pub fn insert(&mut self, descriptor: WidgetDescriptor) {
        self.descriptors
            .insert(descriptor.widget_id.clone(), descriptor);
    }
}

#[async_trait]
impl DescriptorRegistry for StaticRegistry {
    async fn get_descriptor(&self, widget_id: &str) -> Result<WidgetDescriptor, RegistryError> {
        self.descriptors
            .get(widget_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(widget_id.to_string()))
    }

    async fn list_widgets(&self) -> Result<Vec<WidgetDescriptor>, RegistryError> {
        let mut all: Vec<_> = self.descriptors.values().cloned().collect();
        all.sort_by(|a, b| a.widget_id.cmp(&b.widget_id));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather() -> WidgetDescriptor {
        let mut d = WidgetDescriptor::new("weather", WidgetKind::Html).with_backend(BackendSpec {
            command: vec!["./bin/server".into(), "--port".into(), "0".into()],
            cwd: None,
            env: BTreeMap::from([("MODE".to_string(), "live".to_string())]),
        });
        d.dir = Some(PathBuf::from("/widgets/weather"));
        d
    }

    #[test]
    fn relative_program_and_default_cwd_resolve_to_widget_dir() {
        let record = InstanceRecord::new("weather", WidgetKind::Html);
        let cmd = normalize_backend_spec(&weather(), &record).unwrap();
        assert_eq!(cmd.argv[0], "/widgets/weather/./bin/server");
        assert_eq!(&cmd.argv[1..], ["--port", "0"]);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/widgets/weather")));
    }

    #[test]
    fn bare_program_is_left_for_path_lookup() {
        let mut d = weather();
        d.backend.as_mut().unwrap().command = vec!["python3".into(), "main.py".into()];
        let cmd = normalize_backend_spec(&d, &InstanceRecord::new("weather", WidgetKind::Html))
            .unwrap();
        assert_eq!(cmd.argv[0], "python3");
    }

    #[test]
    fn relative_cwd_joins_widget_dir() {
        let mut d = weather();
        d.backend.as_mut().unwrap().cwd = Some(PathBuf::from("data"));
        let cmd = normalize_backend_spec(&d, &InstanceRecord::new("weather", WidgetKind::Html))
            .unwrap();
        assert_eq!(cmd.cwd, Some(PathBuf::from("/widgets/weather/data")));
    }

    #[test]
    fn env_carries_instance_identity() {
        let record = InstanceRecord::new("weather", WidgetKind::Html);
        let cmd = normalize_backend_spec(&weather(), &record).unwrap();
        assert_eq!(cmd.env["MODE"], "live");
        assert_eq!(cmd.env["DESKLET_INSTANCE_ID"], record.instance_id.to_string());
        assert_eq!(cmd.env["DESKLET_WIDGET_ID"], "weather");
        assert_eq!(cmd.env["DESKLET_WIDGET_DIR"], "/widgets/weather");
    }

    #[test]
    fn missing_or_empty_backend_is_invalid() {
        let record = InstanceRecord::new("clock", WidgetKind::Html);
        let plain = WidgetDescriptor::new("clock", WidgetKind::Html);
        assert!(matches!(
            normalize_backend_spec(&plain, &record),
            Err(RegistryError::InvalidManifest { .. })
        ));

        let empty = plain.with_backend(BackendSpec::default());
        assert!(normalize_backend_spec(&empty, &record).is_err());
    }

    #[tokio::test]
    async fn static_registry_lookup() {
        let registry = StaticRegistry::new()
            .with(WidgetDescriptor::new("clock", WidgetKind::Html).with_size(200.0, 150.0))
            .with(weather());

        let clock = registry.get_descriptor("clock").await.unwrap();
        assert!(!clock.has_backend());
        assert_eq!(clock.default_width, 200.0);

        assert!(matches!(
            registry.get_descriptor("nope").await,
            Err(RegistryError::NotFound(_))
        ));

        let ids: Vec<_> = registry
            .list_widgets()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.widget_id)
            .collect();
        assert_eq!(ids, vec!["clock", "weather"]);
    }
}
