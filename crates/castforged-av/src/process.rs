//! Encoder process supervision.
//!
//! [`start`] launches an encoder with its standard output piped back to the
//! caller as a byte stream. Two background tasks run per process:
//!
//! - a stderr reader that forwards each diagnostic line to a
//!   [`DiagnosticsSink`];
//! - a supervisor that owns the child, waits for it to exit, and sends a
//!   single interrupt when the request is cancelled.
//!
//! The supervisor is joined by [`EncoderProcess::wait`] and
//! [`EncoderProcess::shutdown`]. Dropping an [`EncoderProcess`] cancels it;
//! the supervisor still reaps the child in the background.

use crate::{Error, ProcessError, Result};
use std::io;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, ReadBuf};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

/// Exit code ffmpeg uses after finishing on a received signal.
const EXIT_CODE_TERMINATED: i32 = 255;

/// Shell convention for a process killed by SIGINT (128 + 2).
const EXIT_CODE_SIGINT: i32 = 130;

/// Receiver of encoder diagnostics.
///
/// Injected into [`start`]; the process layer never logs to a global on its
/// own behalf beyond tracing events.
pub trait DiagnosticsSink: Send + Sync {
    /// One line of the encoder's standard error.
    fn encoder_output(&self, program: &str, line: &str);

    /// The encoder exited in a way that is neither success nor cancellation.
    fn encoder_failed(&self, error: &ProcessError);
}

/// Sink that forwards diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn encoder_output(&self, program: &str, line: &str) {
        tracing::debug!(target: "castforged::encoder", "{}: {}", program, line);
    }

    fn encoder_failed(&self, error: &ProcessError) {
        tracing::warn!("{}", error);
    }
}

/// How an encoder process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exited successfully after producing all of its output.
    Completed,
    /// Stopped early by an interrupt. Not an error.
    Cancelled,
    /// Any other exit. Already reported to the diagnostics sink.
    Failed(ProcessError),
}

impl ExitOutcome {
    /// Whether the outcome should be treated as an error.
    pub fn is_failure(&self) -> bool {
        matches!(self, ExitOutcome::Failed(_))
    }
}

/// Final report of a supervised process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Termination {
    /// Classified exit.
    pub outcome: ExitOutcome,
    /// Whether the supervisor delivered an interrupt.
    pub interrupted: bool,
}

/// A running encoder whose standard output is readable.
///
/// Implements [`AsyncRead`]; reading reaches EOF once the encoder closes its
/// output, whether it completed or was interrupted.
#[derive(Debug)]
pub struct EncoderProcess {
    program: String,
    pid: Option<u32>,
    stdout: ChildStdout,
    cancel: CancellationToken,
    supervisor: Option<JoinHandle<Termination>>,
    termination: Option<Termination>,
}

/// Launch `argv` with standard output piped back.
///
/// `cancel` is the request's cancellation token. The process gets a child
/// token, so cancelling the request interrupts the encoder while dropping the
/// process never cancels the caller.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// - [`Error::Launch`] if `argv` is empty or the executable cannot start.
/// - [`Error::Pipe`] if the output streams cannot be attached.
pub fn start(
    argv: &[String],
    sink: Arc<dyn DiagnosticsSink>,
    cancel: &CancellationToken,
) -> Result<EncoderProcess> {
    let Some((program, args)) = argv.split_first() else {
        return Err(Error::launch(
            "<empty>",
            io::Error::new(io::ErrorKind::InvalidInput, "empty command line"),
        ));
    };

    tracing::info!("transcode command: {:?}", argv);

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // Own process group: only the supervisor delivers interrupts, never the
    // controlling terminal.
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command
        .spawn()
        .map_err(|e| Error::launch(program.clone(), e))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::pipe(program.clone(), "standard output not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::pipe(program.clone(), "standard error not captured"))?;

    let pid = child.id();
    tracing::debug!("Started {} (pid {:?})", program, pid);

    let cancel = cancel.child_token();
    let diagnostics = tokio::spawn(forward_diagnostics(
        stderr,
        program.clone(),
        Arc::clone(&sink),
    ));
    let supervisor = tokio::spawn(supervise(
        child,
        program.clone(),
        cancel.clone(),
        sink,
        diagnostics,
    ));

    Ok(EncoderProcess {
        program: program.clone(),
        pid,
        stdout,
        cancel,
        supervisor: Some(supervisor),
        termination: None,
    })
}

impl EncoderProcess {
    /// Program name as given in the command line.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// OS process id, if the process was still running when started.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Request an interrupt. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The token controlling this process.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Wait for the encoder to exit and return how it ended.
    ///
    /// Does not cancel. Call after draining the output, or the encoder may
    /// block on a full pipe.
    pub async fn wait(&mut self) -> Termination {
        if let Some(termination) = &self.termination {
            return termination.clone();
        }

        let termination = match self.supervisor.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| Termination {
                outcome: ExitOutcome::Failed(ProcessError::wait_failed(
                    self.program.clone(),
                    format!("supervisor task failed: {e}"),
                )),
                interrupted: false,
            }),
            None => Termination {
                outcome: ExitOutcome::Failed(ProcessError::wait_failed(
                    self.program.clone(),
                    "supervisor already joined",
                )),
                interrupted: false,
            },
        };

        self.termination = Some(termination.clone());
        termination
    }

    /// Cancel the encoder and wait for it to exit.
    pub async fn shutdown(mut self) -> Termination {
        self.cancel();
        self.wait().await
    }

    /// Convert into a stream of output chunks for an HTTP body.
    pub fn into_stream(self) -> ReaderStream<Self> {
        ReaderStream::new(self)
    }
}

impl AsyncRead for EncoderProcess {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stdout).poll_read(cx, buf)
    }
}

impl Drop for EncoderProcess {
    fn drop(&mut self) {
        if self.supervisor.is_some() {
            self.cancel.cancel();
        }
    }
}

async fn forward_diagnostics(stderr: ChildStderr, program: String, sink: Arc<dyn DiagnosticsSink>) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => sink.encoder_output(&program, &line),
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Stopped reading {} diagnostics: {}", program, e);
                break;
            }
        }
    }
}

async fn supervise(
    mut child: Child,
    program: String,
    cancel: CancellationToken,
    sink: Arc<dyn DiagnosticsSink>,
    diagnostics: JoinHandle<()>,
) -> Termination {
    let mut interrupted = false;

    let status = tokio::select! {
        status = child.wait() => status,
        _ = cancel.cancelled() => {
            interrupted = interrupt(&mut child, &program);
            child.wait().await
        }
    };

    // Flush remaining diagnostics before classifying.
    let _ = diagnostics.await;

    let outcome = match status {
        Ok(status) => classify(&program, status, interrupted),
        Err(e) => ExitOutcome::Failed(ProcessError::wait_failed(
            program.clone(),
            format!("failed to wait: {e}"),
        )),
    };

    match &outcome {
        ExitOutcome::Completed => tracing::debug!("{} completed", program),
        ExitOutcome::Cancelled => tracing::debug!("{} cancelled", program),
        ExitOutcome::Failed(err) => sink.encoder_failed(err),
    }

    Termination {
        outcome,
        interrupted,
    }
}

/// Deliver one interrupt. Returns whether it was sent.
#[cfg(unix)]
fn interrupt(child: &mut Child, program: &str) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        // Already reaped.
        return false;
    };
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };

    tracing::debug!("Interrupting {} (pid {})", program, pid);
    match kill(Pid::from_raw(raw), Signal::SIGINT) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Failed to interrupt {}: {}", program, e);
            false
        }
    }
}

#[cfg(not(unix))]
fn interrupt(child: &mut Child, program: &str) -> bool {
    tracing::debug!("Terminating {}", program);
    match child.start_kill() {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Failed to terminate {}: {}", program, e);
            false
        }
    }
}

fn classify(program: &str, status: ExitStatus, interrupted: bool) -> ExitOutcome {
    if status.success() {
        return if interrupted {
            ExitOutcome::Cancelled
        } else {
            ExitOutcome::Completed
        };
    }

    if terminated_early(status) || (interrupted && !cfg!(unix)) {
        return ExitOutcome::Cancelled;
    }

    ExitOutcome::Failed(ProcessError::exited(program, status))
}

#[cfg(unix)]
fn terminated_early(status: ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;

    status.signal() == Some(nix::sys::signal::Signal::SIGINT as i32)
        || matches!(status.code(), Some(EXIT_CODE_TERMINATED | EXIT_CODE_SIGINT))
}

#[cfg(not(unix))]
fn terminated_early(status: ExitStatus) -> bool {
    matches!(status.code(), Some(EXIT_CODE_TERMINATED | EXIT_CODE_SIGINT))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::io::AsyncReadExt;

    #[derive(Default)]
    struct RecordingSink {
        lines: Mutex<Vec<String>>,
        failures: Mutex<Vec<ProcessError>>,
    }

    impl DiagnosticsSink for RecordingSink {
        fn encoder_output(&self, _program: &str, line: &str) {
            self.lines.lock().unwrap().push(line.to_string());
        }

        fn encoder_failed(&self, error: &ProcessError) {
            self.failures.lock().unwrap().push(error.clone());
        }
    }

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_completed_process_streams_output() {
        let sink = Arc::new(RecordingSink::default());
        let mut process = start(
            &argv(&["printf", "hello"]),
            sink.clone(),
            &CancellationToken::new(),
        )
        .unwrap();

        let mut out = String::new();
        process.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello");

        let termination = process.wait().await;
        assert_eq!(termination.outcome, ExitOutcome::Completed);
        assert!(!termination.interrupted);
        assert!(sink.failures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_sends_interrupt_and_ends_stream() {
        let sink = Arc::new(RecordingSink::default());
        let mut process = start(
            &argv(&["sleep", "30"]),
            sink.clone(),
            &CancellationToken::new(),
        )
        .unwrap();

        process.cancel();
        process.cancel();

        let mut out = Vec::new();
        process.read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());

        let termination = process.wait().await;
        assert_eq!(termination.outcome, ExitOutcome::Cancelled);
        assert!(termination.interrupted);
        assert!(sink.failures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_request_cancellation_reaches_process() {
        let request = CancellationToken::new();
        let process = start(
            &argv(&["sleep", "30"]),
            Arc::new(RecordingSink::default()),
            &request,
        )
        .unwrap();

        request.cancel();
        let termination = process.shutdown().await;
        assert_eq!(termination.outcome, ExitOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_dropping_process_does_not_cancel_request() {
        let request = CancellationToken::new();
        let process = start(
            &argv(&["sleep", "30"]),
            Arc::new(RecordingSink::default()),
            &request,
        )
        .unwrap();
        let token = process.cancellation_token().clone();

        drop(process);
        assert!(token.is_cancelled());
        assert!(!request.is_cancelled());
    }

    #[tokio::test]
    async fn test_failure_is_reported_to_sink() {
        let sink = Arc::new(RecordingSink::default());
        let mut process = start(
            &argv(&["sh", "-c", "echo oops >&2; exit 3"]),
            sink.clone(),
            &CancellationToken::new(),
        )
        .unwrap();

        let mut out = Vec::new();
        process.read_to_end(&mut out).await.unwrap();

        let termination = process.wait().await;
        match termination.outcome {
            ExitOutcome::Failed(err) => {
                assert_eq!(err.program, "sh");
                assert_eq!(err.status.and_then(|s| s.code()), Some(3));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(sink.failures.lock().unwrap().len(), 1);
        assert_eq!(*sink.lines.lock().unwrap(), ["oops"]);
    }

    #[tokio::test]
    async fn test_terminated_early_exit_code_is_cancellation() {
        let sink = Arc::new(RecordingSink::default());
        let mut process = start(
            &argv(&["sh", "-c", "exit 255"]),
            sink.clone(),
            &CancellationToken::new(),
        )
        .unwrap();

        let termination = process.wait().await;
        assert_eq!(termination.outcome, ExitOutcome::Cancelled);
        assert!(!termination.interrupted);
        assert!(sink.failures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wait_is_repeatable() {
        let mut process = start(
            &argv(&["true"]),
            Arc::new(TracingSink),
            &CancellationToken::new(),
        )
        .unwrap();

        let first = process.wait().await;
        let second = process.wait().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_executable_is_launch_error() {
        let result = start(
            &argv(&["nonexistent_encoder_12345"]),
            Arc::new(TracingSink),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(Error::Launch { .. })));
    }

    #[tokio::test]
    async fn test_empty_command_is_launch_error() {
        let result = start(&[], Arc::new(TracingSink), &CancellationToken::new());
        assert!(matches!(result, Err(Error::Launch { .. })));
    }
}
