//! Consent prompting and per-instance check coalescing.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use desklet_common::InstanceId;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsentKind {
    /// Loading network content into a content-bearing widget.
    Web,
    /// Running the widget's backend process.
    Backend,
}

impl fmt::Display for ConsentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsentKind::Web => f.write_str("web content"),
            ConsentKind::Backend => f.write_str("backend execution"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentRequest {
    pub instance_id: InstanceId,
    pub widget_id: String,
    pub kind: ConsentKind,
}

/// Presents one consent question and returns the user's decision.
#[async_trait]
pub trait ConsentPrompter: Send + Sync {
    async fn ask(&self, request: &ConsentRequest) -> bool;
}

/// Answers every question the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompter {
    pub grant: bool,
}

#[async_trait]
impl ConsentPrompter for FixedPrompter {
    async fn ask(&self, request: &ConsentRequest) -> bool {
        tracing::info!(
            instance_id = %request.instance_id,
            widget_id = %request.widget_id,
            kind = %request.kind,
            granted = self.grant,
            "Consent answered by policy"
        );
        self.grant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentOutcome {
    Granted,
    /// A consent was refused and the instance removed.
    Refused,
    /// The instance disappeared while the check was running.
    Gone,
}

type OutcomeSignal = watch::Receiver<Option<ConsentOutcome>>;

/// Guarantees a single in-flight consent check per instance.
#[derive(Debug, Default)]
pub struct ConsentGate {
    in_flight: Mutex<HashMap<InstanceId, OutcomeSignal>>,
}

/// Result of trying to enter the gate.
pub enum Admission<'a> {
    /// No check is running; the caller runs it and must `finish` the ticket.
    Leader(ConsentTicket<'a>),
    /// A check is already running; wait on it.
    Follower(OutcomeSignal),
}

impl ConsentGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&self, instance_id: &InstanceId) -> Admission<'_> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(signal) = in_flight.get(instance_id) {
            return Admission::Follower(signal.clone());
        }
        let (tx, rx) = watch::channel(None);
        in_flight.insert(instance_id.clone(), rx);
        Admission::Leader(ConsentTicket {
            gate: self,
            instance_id: instance_id.clone(),
            tx,
        })
    }

    pub fn is_checking(&self, instance_id: &InstanceId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(instance_id)
    }
}

/// Wait for a running check. `None` if its leader was dropped unfinished.
pub async fn follow(mut signal: OutcomeSignal) -> Option<ConsentOutcome> {
    match signal.wait_for(Option::is_some).await {
        Ok(outcome) => *outcome,
        Err(_) => None,
    }
}

/// Held by the caller running a check. Dropping it reopens the gate.
pub struct ConsentTicket<'a> {
    gate: &'a ConsentGate,
    instance_id: InstanceId,
    tx: watch::Sender<Option<ConsentOutcome>>,
}

impl ConsentTicket<'_> {
    pub fn finish(self, outcome: ConsentOutcome) {
        self.tx.send_replace(Some(outcome));
    }
}

impl Drop for ConsentTicket<'_> {
    fn drop(&mut self) {
        self.gate
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.instance_id);
    }
}
