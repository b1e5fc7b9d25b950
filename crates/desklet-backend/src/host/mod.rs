//! Per-instance backend process host.
//!
//! State machine: `NotStarted -> Starting -> Running -> Exited`. A failed
//! start returns to `NotStarted`; an exited host may be started again.
//! All concurrent starts for one host share a single launch task, so a host
//! never has two processes.

mod process;
mod types;


pub use types::{HostIdentity, HostOptions, HostOutput, HostPhase};

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};

use crate::command::CommandSource;
use crate::error::BackendError;
use crate::protocol::OutboundMessage;

type StartOutcome = Option<Result<(), BackendError>>;
type StartSignal = watch::Receiver<StartOutcome>;

pub(crate) enum Phase {
    NotStarted,
    Starting(StartSignal),
    Running(RunningProcess),
    Exited,
}

/// Channels into a live process. Dropping this ends the writer and asks
/// the supervisor to terminate the child.
pub(crate) struct RunningProcess {
    pub(crate) generation: u64,
    pub(crate) stdin: mpsc::UnboundedSender<String>,
    pub(crate) _terminate: oneshot::Sender<()>,
    pub(crate) pid: Option<u32>,
}

pub(crate) struct HostState {
    pub(crate) phase: Phase,
    pub(crate) destroyed: bool,
    pub(crate) generation: u64,
    /// Outbound lines accepted before the process was running, in order.
    pub(crate) queue: VecDeque<String>,
    /// Request ids accepted and not yet answered, queued or dispatched.
    pub(crate) pending: HashSet<String>,
    pub(crate) config: Map<String, Value>,
}

pub(crate) struct Shared {
    pub(crate) identity: HostIdentity,
    pub(crate) options: HostOptions,
    pub(crate) source: Arc<dyn CommandSource>,
    pub(crate) output: mpsc::UnboundedSender<HostOutput>,
    pub(crate) state: Mutex<HostState>,
}

impl Shared {
    pub(crate) fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn emit(&self, output: HostOutput) {
        // The owner may already be gone during shutdown.
        let _ = self.output.send(output);
    }

    pub(crate) fn respond(&self, request_id: String, result: Result<Value, BackendError>) {
        self.emit(HostOutput::Response {
            instance_id: self.identity.instance_id.clone(),
            request_id,
            result,
        });
    }

    /// Answer every accepted request with `err` and drop queued lines.
    pub(crate) fn fail_pending(&self, state: &mut HostState, err: &BackendError) {
        state.queue.clear();
        let mut ids: Vec<String> = state.pending.drain().collect();
        ids.sort();
        for id in ids {
            self.respond(id, Err(err.clone()));
        }
    }
}

/// Handle to one instance's backend process. Cheap to clone.
#[derive(Clone)]
pub struct BackendHost {
    shared: Arc<Shared>,
}

impl BackendHost {
    pub fn new(
        identity: HostIdentity,
        options: HostOptions,
        source: Arc<dyn CommandSource>,
        output: mpsc::UnboundedSender<HostOutput>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                identity,
                options,
                source,
                output,
                state: Mutex::new(HostState {
                    phase: Phase::NotStarted,
                    destroyed: false,
                    generation: 0,
                    queue: VecDeque::new(),
                    pending: HashSet::new(),
                    config: Map::new(),
                }),
            }),
        }
    }

    pub fn identity(&self) -> &HostIdentity {
        &self.shared.identity
    }

    pub fn phase(&self) -> HostPhase {
        match self.shared.lock().phase {
            Phase::NotStarted => HostPhase::NotStarted,
            Phase::Starting(_) => HostPhase::Starting,
            Phase::Running(_) => HostPhase::Running,
            Phase::Exited => HostPhase::Exited,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.lock().destroyed
    }

    pub fn pid(&self) -> Option<u32> {
        match &self.shared.lock().phase {
            Phase::Running(running) => running.pid,
            _ => None,
        }
    }

    /// Number of requests accepted and not yet answered.
    pub fn pending_requests(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Config sent in the next `hello`.
    pub fn set_config(&self, config: Map<String, Value>) {
        self.shared.lock().config = config;
    }

    /// Start the backend if it is not running, joining any start already
    /// in progress.
    pub async fn ensure_started(&self) -> Result<(), BackendError> {
        let mut signal = {
            let mut state = self.shared.lock();
            if state.destroyed {
                return Err(destroyed_error());
            }
            let existing = match &state.phase {
                Phase::Running(_) => return Ok(()),
                Phase::Starting(signal) => Some(signal.clone()),
                Phase::NotStarted | Phase::Exited => None,
            };
            match existing {
                Some(signal) => signal,
                None => process::begin_start(&self.shared, &mut state, &Handle::current()),
            }
        };

        let outcome = match signal.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| Err(BackendError::failure("backend start was abandoned")))
    }

    /// Dispatch a request, queueing it (and kicking off a start) when the
    /// process is not running. The answer arrives as
    /// [`HostOutput::Response`] with the same id.
    pub fn request(&self, request_id: impl Into<String>, method: impl Into<String>, params: Value) {
        let request_id = request_id.into();
        let mut state = self.shared.lock();

        if state.destroyed {
            drop(state);
            self.shared.respond(request_id, Err(destroyed_error()));
            return;
        }
        if state.pending.contains(&request_id) {
            drop(state);
            tracing::warn!(
                instance = %self.shared.identity.instance_id,
                request_id = %request_id,
                "Duplicate backend request id"
            );
            self.shared.respond(
                request_id,
                Err(BackendError::failure("duplicate request id")),
            );
            return;
        }

        let line = match (OutboundMessage::Request {
            id: request_id.clone(),
            method: method.into(),
            params,
        })
        .to_line()
        {
            Ok(line) => line,
            Err(e) => {
                drop(state);
                self.shared.respond(
                    request_id,
                    Err(BackendError::failure(format!("unencodable request: {e}"))),
                );
                return;
            }
        };

        state.pending.insert(request_id);
        self.enqueue(&mut state, line, true);
    }

    /// Fire-and-forget event. Queued until the process runs; never starts
    /// one by itself. Dropped after [`destroy`](Self::destroy).
    pub fn send_event(&self, name: impl Into<String>, payload: Value) {
        let mut state = self.shared.lock();
        if state.destroyed {
            return;
        }
        let line = match (OutboundMessage::Event {
            name: name.into(),
            payload,
        })
        .to_line()
        {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping unencodable backend event");
                return;
            }
        };
        self.enqueue(&mut state, line, false);
    }

    fn enqueue(&self, state: &mut HostState, line: String, start: bool) {
        if let Phase::Running(running) = &state.phase {
            if running.stdin.send(line).is_err() {
                tracing::debug!(
                    instance = %self.shared.identity.instance_id,
                    "Backend stdin closed; exit handling will settle requests"
                );
            }
            return;
        }

        state.queue.push_back(line);
        if start && matches!(state.phase, Phase::NotStarted | Phase::Exited) {
            match Handle::try_current() {
                Ok(handle) => {
                    process::begin_start(&self.shared, state, &handle);
                }
                Err(_) => tracing::warn!(
                    instance = %self.shared.identity.instance_id,
                    "No async runtime; request stays queued until ensure_started"
                ),
            }
        }
    }

    /// Tear the host down: fail outstanding requests, send `shutdown`, then
    /// escalate to SIGTERM and kill in the background. Idempotent, and safe
    /// mid-start.
    pub fn destroy(&self) {
        let mut state = self.shared.lock();
        if state.destroyed {
            return;
        }
        state.destroyed = true;
        self.shared.fail_pending(&mut state, &destroyed_error());

        if let Phase::Running(running) = std::mem::replace(&mut state.phase, Phase::Exited) {
            if let Ok(line) = OutboundMessage::Shutdown.to_line() {
                let _ = running.stdin.send(line);
            }
            tracing::info!(
                instance = %self.shared.identity.instance_id,
                pid = ?running.pid,
                "Stopping backend"
            );
        }
    }
}

impl std::fmt::Debug for BackendHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHost")
            .field("identity", &self.shared.identity)
            .field("phase", &self.phase())
            .finish()
    }
}

fn destroyed_error() -> BackendError {
    BackendError::exit("backend host destroyed")
}
