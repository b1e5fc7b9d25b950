//! One-shot subcommands that edit or inspect the state file.

use std::io::Write;

use desklet_common::{DeskletError, InstanceId};
use desklet_manager::{CreateOptions, DescriptorRegistry, StateStore};
use tracing::info;

use super::core::DeskletApp;

impl DeskletApp {
    pub async fn list_widgets(&self, out: &mut dyn Write) -> Result<(), DeskletError> {
        let widgets = self.registry.list_widgets().await?;
        if widgets.is_empty() {
            writeln!(out, "No widgets installed in:")?;
            for root in self.registry.roots() {
                writeln!(out, "  {}", root.display())?;
            }
            return Ok(());
        }
        writeln!(out, "{:<24} {:<24} {:<6} BACKEND", "ID", "NAME", "KIND")?;
        for w in widgets {
            writeln!(
                out,
                "{:<24} {:<24} {:<6} {}",
                w.widget_id,
                w.name,
                w.kind.to_string(),
                if w.has_backend() { "yes" } else { "no" }
            )?;
        }
        Ok(())
    }

    /// Print the placed instances without materializing them.
    pub async fn list(&self, out: &mut dyn Write) -> Result<(), DeskletError> {
        let (manager, _host_rx) = self.open(false, false).await?;
        let instances = manager.instances();
        if instances.is_empty() {
            writeln!(out, "No widgets placed")?;
            return Ok(());
        }
        writeln!(
            out,
            "{:<36} {:<20} {:>3} {:>7} {:>7} SIZE",
            "INSTANCE", "WIDGET", "MON", "X", "Y"
        )?;
        for r in instances {
            writeln!(
                out,
                "{:<36} {:<20} {:>3} {:>7.4} {:>7.4} {}x{}",
                r.instance_id.as_str(),
                r.widget_id,
                r.monitor_index,
                r.norm_x,
                r.norm_y,
                r.width,
                r.height
            )?;
        }
        Ok(())
    }

    /// Place a new instance and write the state file immediately.
    pub async fn add(
        &self,
        widget_id: &str,
        options: CreateOptions,
    ) -> Result<InstanceId, DeskletError> {
        let (manager, _host_rx) = self.open(true, false).await?;
        let id = manager
            .create_instance(widget_id, options)
            .await
            .ok_or_else(|| DeskletError::Other(format!("could not add widget '{widget_id}'")))?;
        let saved = self.store.save_now(manager.export_state());
        manager.teardown();
        saved?;
        info!(instance_id = %id, widget_id, "Widget added");
        Ok(id)
    }

    /// Remove a placed instance and write the state file immediately.
    pub async fn remove(&self, instance_id: &str) -> Result<(), DeskletError> {
        let (manager, _host_rx) = self.open(false, false).await?;
        let id = InstanceId::from(instance_id);
        if !manager.remove_instance(&id) {
            return Err(DeskletError::Other(format!("no instance '{instance_id}'")));
        }
        self.store.save_now(manager.export_state())?;
        info!(instance_id, "Widget removed");
        Ok(())
    }
}
