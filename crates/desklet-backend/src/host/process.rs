//! Launching, feeding, reading and reaping the backend child process.

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

use super::{HostOutput, HostState, Phase, RunningProcess, Shared, StartOutcome, StartSignal};
use crate::error::BackendError;
use crate::protocol::{response_outcome, InboundMessage, OutboundMessage};

/// Longest protocol line accepted from a backend.
const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// How long exit handling waits for stdout to drain after the child is reaped.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

// =============================================================================
// START
// =============================================================================

/// Move to `Starting` and spawn the one launch task for this attempt.
pub(super) fn begin_start(
    shared: &Arc<Shared>,
    state: &mut HostState,
    handle: &Handle,
) -> StartSignal {
    let (tx, rx) = watch::channel(None);
    state.phase = Phase::Starting(rx.clone());
    handle.spawn(launch(Arc::clone(shared), tx));
    rx
}

struct Spawned {
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
    stderr: tokio::process::ChildStderr,
}

async fn launch(shared: Arc<Shared>, signal: watch::Sender<StartOutcome>) {
    let outcome = match spawn(&shared).await {
        Ok(spawned) => install(&shared, spawned),
        Err(err) => Err(err),
    };

    if let Err(err) = &outcome {
        fail_start(&shared, err);
    }
    signal.send_replace(Some(outcome));
}

async fn spawn(shared: &Shared) -> Result<Spawned, BackendError> {
    let command = shared.source.resolve(&shared.identity).await?;

    // Destroyed while resolving: do not create a process at all.
    if shared.lock().destroyed {
        return Err(BackendError::exit("backend host destroyed"));
    }

    let program = command.argv.first().cloned().unwrap_or_default();
    let mut child = command
        .to_command(shared.options.inherit_env)?
        .spawn()
        .map_err(|e| BackendError::start(format!("failed to spawn {program}: {e}")))?;

    let missing = || BackendError::start("backend stdio was not captured");
    let stdin = child.stdin.take().ok_or_else(missing)?;
    let stdout = child.stdout.take().ok_or_else(missing)?;
    let stderr = child.stderr.take().ok_or_else(missing)?;

    tracing::info!(
        instance = %shared.identity.instance_id,
        widget = %shared.identity.widget_id,
        pid = ?child.id(),
        program = %program,
        "Backend spawned"
    );

    Ok(Spawned {
        child,
        stdin,
        stdout,
        stderr,
    })
}

/// Wire up a freshly spawned child, send `hello`, and flush the queue.
fn install(shared: &Arc<Shared>, spawned: Spawned) -> Result<(), BackendError> {
    let mut state = shared.lock();
    if state.destroyed {
        // Dropping the child kills it.
        return Err(BackendError::exit("backend host destroyed"));
    }

    let hello = OutboundMessage::Hello {
        instance_id: shared.identity.instance_id.to_string(),
        widget_id: shared.identity.widget_id.clone(),
        mode: shared.options.mode,
        config: state.config.clone(),
    }
    .to_line()
    .map_err(|e| BackendError::start(format!("unencodable hello: {e}")))?;

    state.generation += 1;
    let generation = state.generation;
    let pid = spawned.child.id();

    let (stdin_tx, stdin_rx) = mpsc::unbounded_channel();
    let (terminate_tx, terminate_rx) = oneshot::channel();

    tokio::spawn(write_lines(spawned.stdin, stdin_rx));
    tokio::spawn(log_stderr(
        shared.identity.instance_id.to_string(),
        spawned.stderr,
    ));
    tokio::spawn(supervise(
        Arc::clone(shared),
        generation,
        spawned.child,
        spawned.stdout,
        terminate_rx,
    ));

    // Receiver is alive: the writer task was just spawned with it.
    let _ = stdin_tx.send(hello);
    for line in state.queue.drain(..) {
        let _ = stdin_tx.send(line);
    }

    state.phase = Phase::Running(RunningProcess {
        generation,
        stdin: stdin_tx,
        _terminate: terminate_tx,
        pid,
    });
    Ok(())
}

fn fail_start(shared: &Shared, err: &BackendError) {
    let mut state = shared.lock();
    tracing::warn!(
        instance = %shared.identity.instance_id,
        widget = %shared.identity.widget_id,
        error = %err,
        "Backend failed to start"
    );
    shared.fail_pending(&mut state, err);
    if !state.destroyed {
        state.phase = Phase::NotStarted;
    }
}

// =============================================================================
// STREAMS
// =============================================================================

async fn write_lines<W>(stdin: W, mut rx: mpsc::UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(stdin, LinesCodec::new());
    while let Some(line) = rx.recv().await {
        if let Err(e) = sink.send(line).await {
            tracing::debug!(error = %e, "Backend stdin write failed");
            break;
        }
    }
    // Dropping the sink closes the child's stdin.
}

async fn log_stderr<R>(instance: String, stderr: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(stderr, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    while let Some(line) = lines.next().await {
        match line {
            Ok(line) => {
                tracing::debug!(target: "desklet::backend::stderr", instance = %instance, "{line}")
            }
            Err(LinesCodecError::MaxLineLengthExceeded) => continue,
            Err(LinesCodecError::Io(_)) => break,
        }
    }
}

async fn read_stdout<R>(shared: Arc<Shared>, generation: u64, stdout: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(stdout, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    while let Some(line) = lines.next().await {
        match line {
            Ok(line) => handle_line(&shared, generation, &line),
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                tracing::warn!(
                    instance = %shared.identity.instance_id,
                    "Discarding oversized backend line"
                );
            }
            Err(LinesCodecError::Io(e)) => {
                tracing::warn!(
                    instance = %shared.identity.instance_id,
                    error = %e,
                    "Backend stdout read failed"
                );
                break;
            }
        }
    }
}

fn handle_line(shared: &Shared, generation: u64, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    let instance = &shared.identity.instance_id;

    let message = match InboundMessage::parse(line) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(instance = %instance, error = %e, "Malformed backend message");
            return;
        }
    };

    match message {
        InboundMessage::Response {
            id,
            ok,
            result,
            error,
        } => {
            let mut state = shared.lock();
            if !is_current(&state, generation) || !state.pending.remove(&id) {
                tracing::warn!(instance = %instance, request_id = %id, "Response for unknown request");
                return;
            }
            drop(state);
            shared.respond(id, response_outcome(ok, result, error));
        }
        InboundMessage::Event { name, payload } => {
            if !is_current(&shared.lock(), generation) {
                return;
            }
            shared.emit(HostOutput::Event {
                instance_id: instance.clone(),
                name,
                payload,
            });
        }
        InboundMessage::Log { level, message } => log_backend(instance, &level, &message),
        InboundMessage::Unknown => {
            tracing::warn!(instance = %instance, line = %line, "Unknown backend message type");
        }
    }
}

fn log_backend(instance: &desklet_common::InstanceId, level: &str, message: &str) {
    const TARGET: &str = "desklet::backend";
    match level.to_ascii_lowercase().as_str() {
        "error" => tracing::error!(target: TARGET, instance = %instance, "{message}"),
        "warn" | "warning" => tracing::warn!(target: TARGET, instance = %instance, "{message}"),
        "debug" => tracing::debug!(target: TARGET, instance = %instance, "{message}"),
        "trace" => tracing::trace!(target: TARGET, instance = %instance, "{message}"),
        _ => tracing::info!(target: TARGET, instance = %instance, "{message}"),
    }
}

fn is_current(state: &HostState, generation: u64) -> bool {
    matches!(&state.phase, Phase::Running(running) if running.generation == generation)
}

// =============================================================================
// SUPERVISION
// =============================================================================

/// Own the child until it is gone, then settle the host.
///
/// Termination begins when the host drops its terminate sender (destroy)
/// or when stdout closes while the process lingers.
async fn supervise(
    shared: Arc<Shared>,
    generation: u64,
    mut child: Child,
    stdout: ChildStdout,
    mut terminate: oneshot::Receiver<()>,
) {
    let mut reader = tokio::spawn(read_stdout(Arc::clone(&shared), generation, stdout));
    let mut reader_done = false;

    let status = tokio::select! {
        status = child.wait() => status.ok(),
        _ = &mut terminate => terminate_child(&mut child, &shared).await,
        _ = &mut reader => {
            reader_done = true;
            terminate_child(&mut child, &shared).await
        }
    };

    if !reader_done && tokio::time::timeout(DRAIN_TIMEOUT, &mut reader).await.is_err() {
        reader.abort();
    }

    tracing::info!(
        instance = %shared.identity.instance_id,
        status = %describe(status),
        "Backend exited"
    );
    handle_exit(&shared, generation, status);
}

/// Wait out the shutdown grace, then SIGTERM, then kill.
async fn terminate_child(child: &mut Child, shared: &Shared) -> Option<ExitStatus> {
    let options = &shared.options;
    if let Ok(status) = tokio::time::timeout(options.shutdown_grace, child.wait()).await {
        return status.ok();
    }

    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        tracing::debug!(instance = %shared.identity.instance_id, pid, "Sending SIGTERM to backend");
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            tracing::debug!(error = %e, "SIGTERM failed");
        }
        if let Ok(status) = tokio::time::timeout(options.kill_grace, child.wait()).await {
            return status.ok();
        }
    }

    tracing::warn!(instance = %shared.identity.instance_id, "Killing unresponsive backend");
    if let Err(e) = child.kill().await {
        tracing::warn!(error = %e, "Failed to kill backend");
    }
    child.wait().await.ok()
}

fn handle_exit(shared: &Shared, generation: u64, status: Option<ExitStatus>) {
    let mut state = shared.lock();
    if !is_current(&state, generation) {
        return;
    }
    state.phase = Phase::Exited;
    let err = BackendError::exit(format!("backend exited ({})", describe(status)));
    shared.fail_pending(&mut state, &err);
    drop(state);

    shared.emit(HostOutput::Exited {
        instance_id: shared.identity.instance_id.clone(),
        code: status.and_then(|s| s.code()),
    });
}

fn describe(status: Option<ExitStatus>) -> String {
    match status {
        Some(status) => status.to_string(),
        None => "unknown status".to_string(),
    }
}
