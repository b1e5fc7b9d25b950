//! Backend request relay and host output routing.

use std::sync::Arc;

use async_trait::async_trait;
use desklet_backend::{BackendCommand, BackendError, CommandSource, HostIdentity, HostOutput};
use desklet_common::{InstanceId, RegistryError};
use serde_json::Value;
use tracing::{debug, info};

use super::WidgetManager;
use crate::events::ManagerEvent;
use crate::instance::InstanceRecord;
use crate::registry::DescriptorRegistry;
use crate::render::ActorMessage;

/// Resolves a host's command from the registry at spawn time.
pub(crate) struct RegistrySource {
    registry: Arc<dyn DescriptorRegistry>,
    record: InstanceRecord,
}

impl RegistrySource {
    pub(crate) fn new(registry: Arc<dyn DescriptorRegistry>, record: InstanceRecord) -> Self {
        Self { registry, record }
    }
}

#[async_trait]
impl CommandSource for RegistrySource {
    async fn resolve(&self, identity: &HostIdentity) -> Result<BackendCommand, BackendError> {
        if !self.record.has_backend {
            return Err(BackendError::no_backend(format!(
                "{} has no backend",
                identity.widget_id
            )));
        }
        let descriptor = match self.registry.get_descriptor(&identity.widget_id).await {
            Ok(descriptor) => descriptor,
            Err(RegistryError::NotFound(id)) => {
                return Err(BackendError::no_backend(format!("widget {id} is not installed")))
            }
            Err(e) => return Err(BackendError::start(e.to_string())),
        };
        if !descriptor.has_backend() {
            return Err(BackendError::no_backend(format!(
                "{} no longer declares a backend",
                identity.widget_id
            )));
        }
        self.registry
            .normalize_backend_spec(&descriptor, &self.record)
            .map_err(|e| BackendError::start(e.to_string()))
    }
}

impl WidgetManager {
    /// Relay a request from an instance's content to its backend. The
    /// answer, success or failure, arrives as a
    /// [`ManagerEvent::BackendResponse`] carrying `request_id`.
    pub fn backend_request(
        &self,
        id: &InstanceId,
        request_id: impl Into<String>,
        method: impl Into<String>,
        params: Value,
    ) {
        let request_id = request_id.into();
        let host = {
            let state = self.lock();
            match state.instances.get(id) {
                None => Err(BackendError::failure(format!("unknown instance {id}"))),
                Some(instance) if !instance.record.has_backend => Err(BackendError::no_backend(
                    format!("{} has no backend", instance.record.widget_id),
                )),
                Some(instance) => instance
                    .host
                    .clone()
                    .ok_or_else(|| BackendError::failure("instance is not attached")),
            }
        };

        match host {
            Ok(host) => host.request(request_id, method, params),
            Err(e) => {
                debug!(instance_id = %id, request_id, code = %e.code.as_str(), "Backend request answered locally");
                self.route_response(id, request_id, Err(e));
            }
        }
    }

    /// Forward a fire-and-forget event to an instance's backend.
    pub fn backend_event(&self, id: &InstanceId, name: impl Into<String>, payload: Value) {
        let host = self.lock().instances.get(id).and_then(|i| i.host.clone());
        match host {
            Some(host) => host.send_event(name, payload),
            None => debug!(instance_id = %id, "Backend event dropped: no host"),
        }
    }

    /// Route one item from the host output channel returned by
    /// [`WidgetManager::new`].
    pub fn handle_host_output(&self, output: HostOutput) {
        match output {
            HostOutput::Response {
                instance_id,
                request_id,
                result,
            } => self.route_response(&instance_id, request_id, result),
            HostOutput::Event {
                instance_id,
                name,
                payload,
            } => {
                {
                    let state = self.lock();
                    let Some(instance) = state.instances.get(&instance_id) else {
                        debug!(%instance_id, name, "Backend event for a removed instance");
                        return;
                    };
                    if let Some(actor) = instance.actor {
                        self.renderer.deliver(
                            actor,
                            ActorMessage::BackendEvent {
                                name: name.clone(),
                                payload: payload.clone(),
                            },
                        );
                    }
                }
                self.events.publish(ManagerEvent::BackendEvent {
                    instance_id,
                    name,
                    payload,
                });
            }
            HostOutput::Exited { instance_id, code } => {
                info!(%instance_id, ?code, "Backend process ended");
            }
        }
    }

    fn route_response(
        &self,
        id: &InstanceId,
        request_id: String,
        result: Result<Value, BackendError>,
    ) {
        let actor = self.lock().instances.get(id).and_then(|i| i.actor);
        if let Some(actor) = actor {
            self.renderer.deliver(
                actor,
                ActorMessage::BackendResponse {
                    request_id: request_id.clone(),
                    result: result.clone(),
                },
            );
        }
        self.events.publish(ManagerEvent::BackendResponse {
            instance_id: id.clone(),
            request_id,
            result,
        });
    }
}
