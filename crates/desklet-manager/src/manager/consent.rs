//! Consent checks for materialization.

use desklet_common::InstanceId;
use tracing::{debug, info};

use super::WidgetManager;
use crate::consent::{follow, Admission, ConsentKind, ConsentOutcome, ConsentRequest};
use crate::events::ManagerEvent;

impl WidgetManager {
    /// Ask for every consent `id` still lacks. Concurrent callers for the
    /// same instance share one check and see the same outcome.
    pub async fn check_consent(&self, id: &InstanceId) -> ConsentOutcome {
        loop {
            match self.gate.admit(id) {
                Admission::Follower(signal) => {
                    debug!(instance_id = %id, "Joining in-flight consent check");
                    if let Some(outcome) = follow(signal).await {
                        return outcome;
                    }
                    // Leader vanished without an answer; try again.
                }
                Admission::Leader(ticket) => {
                    let outcome = self.run_consent(id).await;
                    ticket.finish(outcome);
                    return outcome;
                }
            }
        }
    }

    async fn run_consent(&self, id: &InstanceId) -> ConsentOutcome {
        for kind in [ConsentKind::Web, ConsentKind::Backend] {
            let request = {
                let state = self.lock();
                let Some(instance) = state.instances.get(id) else {
                    return ConsentOutcome::Gone;
                };
                let record = &instance.record;
                let needed = match kind {
                    ConsentKind::Web => record.needs_web_consent(),
                    ConsentKind::Backend => record.needs_backend_consent(),
                };
                if !needed {
                    continue;
                }
                ConsentRequest {
                    instance_id: id.clone(),
                    widget_id: record.widget_id.clone(),
                    kind,
                }
            };

            let granted = self.prompter.ask(&request).await;

            let mut guard = self.lock();
            let state = &mut *guard;
            let Some(instance) = state.instances.get_mut(id) else {
                return ConsentOutcome::Gone;
            };
            if !granted {
                info!(instance_id = %id, widget_id = %request.widget_id, %kind, "Consent refused; removing instance");
                self.remove_locked(state, id);
                // Must reach disk even inside a suppressed load.
                self.flush(state);
                return ConsentOutcome::Refused;
            }

            match kind {
                ConsentKind::Web => instance.record.web_consent = true,
                ConsentKind::Backend => instance.record.backend_consent = true,
            }
            self.notify(
                state,
                ManagerEvent::InstanceUpdated {
                    instance_id: id.clone(),
                },
            );
            self.persist(state);
        }
        ConsentOutcome::Granted
    }
}
