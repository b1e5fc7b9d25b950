//! DeskletApp struct definition and constructor.

use std::sync::Arc;
use std::time::Duration;

use desklet_backend::HostOutput;
use desklet_common::DeskletError;
use desklet_config::{paths, DeskletConfig};
use desklet_layout::{LayoutChange, LayoutSnapshot, SurfaceSpec};
use desklet_manager::{
    Collaborators, ConsentPrompter, HeadlessRenderer, ManagerOptions, WidgetManager,
};
use tokio::sync::mpsc;
use tracing::info;

use crate::prompter::prompter_for;
use crate::registry::ManifestRegistry;
use crate::state_file::FileStateStore;

/// Top-level application state shared by every subcommand.
pub struct DeskletApp {
    pub(super) config: DeskletConfig,
    pub(super) surfaces: Vec<SurfaceSpec>,
    pub(super) registry: Arc<ManifestRegistry>,
    pub(super) store: Arc<FileStateStore>,
    pub(super) prompter: Arc<dyn ConsentPrompter>,
    pub(super) renderer: Arc<HeadlessRenderer>,
}

impl DeskletApp {
    /// Resolve widget roots and the state file from `config`.
    pub fn new(config: DeskletConfig, surfaces: Vec<SurfaceSpec>) -> Result<Self, DeskletError> {
        let registry = ManifestRegistry::new(paths::widget_dirs(&config)?);
        let store = FileStateStore::new(
            paths::state_file(&config)?,
            Duration::from_millis(config.state.save_debounce_ms),
        );
        let prompter = prompter_for(config.consent.policy);
        Ok(Self::from_parts(config, surfaces, registry, store, prompter))
    }

    pub fn from_parts(
        config: DeskletConfig,
        surfaces: Vec<SurfaceSpec>,
        registry: ManifestRegistry,
        store: FileStateStore,
        prompter: Arc<dyn ConsentPrompter>,
    ) -> Self {
        Self {
            config,
            surfaces,
            registry: Arc::new(registry),
            store: Arc::new(store),
            prompter,
            renderer: Arc::new(HeadlessRenderer::new()),
        }
    }

    pub(super) fn layout(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            change: LayoutChange::redisplay(),
            surfaces: self.surfaces.clone(),
        }
    }

    /// Build a manager over this app's collaborators and load the state
    /// file into it. With `attach`, surfaces are installed first so loaded
    /// instances materialize; otherwise records load detached.
    pub(super) async fn open(
        &self,
        attach: bool,
        autostart_backends: bool,
    ) -> Result<(WidgetManager, mpsc::UnboundedReceiver<HostOutput>), DeskletError> {
        let options = ManagerOptions {
            autostart_backends,
            ..ManagerOptions::from_config(&self.config)
        };
        let (manager, host_rx) = WidgetManager::new(
            Collaborators {
                registry: self.registry.clone(),
                renderer: self.renderer.clone(),
                store: self.store.clone(),
                prompter: self.prompter.clone(),
            },
            options,
        );

        if attach {
            manager.handle_layout_change(&self.layout()).await;
        }

        match self.store.read()? {
            Some(blob) => {
                let report = manager.load_state(blob).await?;
                info!(
                    path = %self.store.path().display(),
                    created = report.created,
                    migrated = report.migrated,
                    "State loaded"
                );
            }
            None => info!(path = %self.store.path().display(), "No state file yet"),
        }
        Ok((manager, host_rx))
    }
}
