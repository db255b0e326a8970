//! Decision-engine subprocess lifecycle.
//!
//! One child process, two byte streams, one thread per stream. The UI thread
//! never touches the pipes: encoded requests are handed to a writer thread over
//! a bounded channel, and a reader thread decodes stdout into another, so both
//! directions can be waited on with a deadline. Correlation is positional: with
//! at most one request in flight, the next frame read is that request's reply.

use super::error::RouterError;
use crate::ipc::{encode, FrameError, FrameReader, Message};
use crate::{log_debug, log_debug_content};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Frames buffered between the reader thread and the UI thread.
const INBOUND_CHANNEL_CAPACITY: usize = 64;

/// Encoded requests queued for the writer thread. A stalled engine fills this
/// quickly, after which sends time out instead of blocking.
const OUTBOUND_CHANNEL_CAPACITY: usize = 4;

/// How long a closing engine gets to exit on its own before it is killed.
const EXIT_GRACE: Duration = Duration::from_millis(100);
const EXIT_POLL: Duration = Duration::from_millis(5);

/// Program + argv used to launch the decision engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl EngineCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        shell_words::join(parts)
    }
}

/// Lifecycle of the engine process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Running,
    Exited(Option<i32>),
}

enum Inbound {
    Frame(Message),
    Malformed(String),
    Closed(String),
}

/// Owns one live engine process and its streams. Dead handles are never revived.
pub struct RouterProcessHandle {
    child: Child,
    /// Dropping this ends the writer thread, which closes the child's stdin.
    outbound: Option<Sender<Vec<u8>>>,
    inbound: Receiver<Inbound>,
    state: ProcessState,
}

impl RouterProcessHandle {
    fn spawn(command: &EngineCommand) -> Result<Self, RouterError> {
        let spawn_failure = |source| RouterError::SpawnFailure {
            program: command.program.clone(),
            source,
        };
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_failure)?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (Some(stdin), Some(stdout)) = (stdin, stdout) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(spawn_failure(std::io::Error::other(
                "failed to capture engine stdio",
            )));
        };

        let (tx, rx) = bounded(INBOUND_CHANNEL_CAPACITY);
        let (outbound_tx, outbound_rx) = bounded(OUTBOUND_CHANNEL_CAPACITY);
        spawn_frame_writer(stdin, outbound_rx, tx.clone());
        spawn_frame_reader(BufReader::new(stdout), tx);
        if let Some(stderr) = stderr {
            spawn_stderr_logger(BufReader::new(stderr));
        }

        Ok(Self {
            child,
            outbound: Some(outbound_tx),
            inbound: rx,
            state: ProcessState::Running,
        })
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Refresh the state from the OS without blocking.
    fn poll(&mut self) -> ProcessState {
        if self.state == ProcessState::Running {
            if let Ok(Some(status)) = self.child.try_wait() {
                self.state = ProcessState::Exited(status.code());
            }
        }
        self.state
    }

    /// Close stdin, give the engine a short grace period, then kill it.
    fn shutdown(&mut self) -> Option<i32> {
        if let ProcessState::Exited(code) = self.state {
            return code;
        }
        drop(self.outbound.take());
        let deadline = Instant::now() + EXIT_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    self.state = ProcessState::Exited(status.code());
                    return status.code();
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL),
                _ => break,
            }
        }
        let _ = self.child.kill();
        let code = self.child.wait().ok().and_then(|status| status.code());
        self.state = ProcessState::Exited(code);
        code
    }
}

impl Drop for RouterProcessHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_frame_writer(
    mut stdin: ChildStdin,
    frames: Receiver<Vec<u8>>,
    events: Sender<Inbound>,
) {
    thread::spawn(move || {
        for frame in frames.iter() {
            if let Err(err) = stdin.write_all(&frame).and_then(|()| stdin.flush()) {
                log_debug(&format!("engine write failed: {err}"));
                let _ = events.try_send(Inbound::Closed(format!("engine stdin closed: {err}")));
                break;
            }
        }
        log_debug("engine stdin writer exiting");
    });
}

fn spawn_frame_reader<R: BufRead + Send + 'static>(stdout: R, tx: Sender<Inbound>) {
    thread::spawn(move || {
        let mut reader = FrameReader::new(stdout);
        loop {
            let inbound = match reader.read_frame() {
                Ok(Some(message)) => Inbound::Frame(message),
                Ok(None) => Inbound::Closed("end of stream".to_string()),
                Err(FrameError::Malformed(detail)) => Inbound::Malformed(detail),
                Err(FrameError::Unrecoverable(detail)) => Inbound::Closed(detail),
            };
            let closing = matches!(inbound, Inbound::Closed(_));
            if tx.send(inbound).is_err() || closing {
                break;
            }
        }
        log_debug("engine stdout reader exiting");
    });
}

fn spawn_stderr_logger<R: BufRead + Send + 'static>(stderr: R) {
    thread::spawn(move || {
        for line in stderr.lines().map_while(Result::ok) {
            if !line.trim().is_empty() {
                log_debug(&format!("[engine] {line}"));
            }
        }
    });
}

/// Proof that a request was sent; consumed by [`RouterSupervisor::receive`].
#[must_use = "a sent request must be received before the next send"]
#[derive(Debug)]
pub struct PendingToken {
    pub(super) seq: u64,
    pub(super) sent_at: Instant,
}

struct PendingRequest {
    seq: u64,
}

enum WaitOutcome {
    Reply(Message),
    Malformed(String),
    Closed(String),
    TimedOut,
}

/// Spawns, feeds and reaps the decision engine. Enforces one request in flight.
pub struct RouterSupervisor {
    command: EngineCommand,
    handle: Option<RouterProcessHandle>,
    state: ProcessState,
    in_flight: Option<PendingRequest>,
    next_seq: u64,
    /// Replies still owed to requests that timed out; they are read and dropped.
    orphaned_replies: usize,
}

impl RouterSupervisor {
    pub fn new(command: EngineCommand) -> Self {
        Self {
            command,
            handle: None,
            state: ProcessState::NotStarted,
            in_flight: None,
            next_seq: 0,
            orphaned_replies: 0,
        }
    }

    pub fn command(&self) -> &EngineCommand {
        &self.command
    }

    pub fn state(&mut self) -> ProcessState {
        if let Some(handle) = self.handle.as_mut() {
            if let ProcessState::Exited(code) = handle.poll() {
                tracing::warn!(?code, "engine exited");
                self.retire();
            }
        }
        self.state
    }

    pub fn is_running(&mut self) -> bool {
        self.state() == ProcessState::Running
    }

    pub fn pid(&self) -> Option<u32> {
        self.handle.as_ref().map(RouterProcessHandle::pid)
    }

    /// Launch the engine. A handle that is still running is kept as is.
    pub fn start(&mut self) -> Result<u32, RouterError> {
        if self.is_running() {
            if let Some(pid) = self.pid() {
                return Ok(pid);
            }
        }
        self.in_flight = None;
        self.orphaned_replies = 0;
        let handle = RouterProcessHandle::spawn(&self.command).inspect_err(|err| {
            tracing::warn!(program = %self.command.program, error = %err, "engine spawn failed");
            log_debug(&format!("engine spawn failed: {err}"));
        })?;
        let pid = handle.pid();
        tracing::info!(pid, command = %self.command.display(), "engine started");
        log_debug(&format!("engine started (pid {pid})"));
        self.state = handle.state();
        self.handle = Some(handle);
        Ok(pid)
    }

    /// Encode a request and hand it to the writer thread.
    ///
    /// Fails with `RouterBusy` while a reply is pending, and with `Timeout` when
    /// the writer is still stuck on earlier frames after `timeout`. The returned
    /// token's deadline starts before the hand-off, so a later
    /// [`receive`](Self::receive) with the same `timeout` bounds the whole call.
    pub fn send(
        &mut self,
        message: &Message,
        timeout: Duration,
    ) -> Result<PendingToken, RouterError> {
        if self.in_flight.is_some() {
            return Err(RouterError::RouterBusy);
        }
        if !self.is_running() {
            return Err(RouterError::NotRunning);
        }
        let Some(outbound) = self.handle.as_ref().and_then(|h| h.outbound.as_ref()) else {
            return Err(RouterError::NotRunning);
        };
        let sent_at = Instant::now();
        match outbound.send_timeout(encode(message), timeout) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => {
                tracing::warn!(timeout_ms = millis(timeout), "engine stdin backed up");
                return Err(RouterError::Timeout(timeout));
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                let code = self.retire();
                tracing::warn!(?code, "engine exited during write");
                return Err(RouterError::ProcessExited { code });
            }
        }
        log_debug_content(&format!("router request: {message:?}"));
        self.next_seq += 1;
        self.in_flight = Some(PendingRequest { seq: self.next_seq });
        Ok(PendingToken {
            seq: self.next_seq,
            sent_at,
        })
    }

    /// Block until the reply for `token` arrives, `timeout` elapses, or the engine dies.
    ///
    /// Every outcome resolves the in-flight slot. A timed-out request leaves its reply
    /// owed; that late frame is discarded before the next reply is accepted.
    pub fn receive(
        &mut self,
        token: PendingToken,
        timeout: Duration,
    ) -> Result<Message, RouterError> {
        match &self.in_flight {
            Some(pending) if pending.seq == token.seq => {}
            _ => return Err(RouterError::StaleToken),
        }
        let Some(handle) = self.handle.as_ref() else {
            self.in_flight = None;
            return Err(RouterError::NotRunning);
        };

        let deadline = token.sent_at + timeout;
        let outcome = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let inbound = match handle.inbound.recv_timeout(remaining) {
                Ok(inbound) => inbound,
                Err(RecvTimeoutError::Timeout) => break WaitOutcome::TimedOut,
                Err(RecvTimeoutError::Disconnected) => {
                    break WaitOutcome::Closed("reader disconnected".to_string())
                }
            };
            match inbound {
                Inbound::Closed(reason) => break WaitOutcome::Closed(reason),
                Inbound::Frame(_) | Inbound::Malformed(_) if self.orphaned_replies > 0 => {
                    self.orphaned_replies -= 1;
                    log_debug("discarded late reply to a timed-out request");
                }
                Inbound::Frame(message) => break WaitOutcome::Reply(message),
                Inbound::Malformed(detail) => break WaitOutcome::Malformed(detail),
            }
        };
        self.in_flight = None;

        match outcome {
            WaitOutcome::Reply(message) => {
                log_debug_content(&format!(
                    "router reply after {:?}: {message:?}",
                    token.sent_at.elapsed()
                ));
                Ok(message)
            }
            WaitOutcome::Malformed(detail) => {
                log_debug(&format!("dropped malformed frame: {detail}"));
                Err(RouterError::MalformedMessage(detail))
            }
            WaitOutcome::Closed(reason) => {
                log_debug(&format!("engine stream closed: {reason}"));
                let code = self.retire();
                tracing::warn!(?code, reason, "engine exited mid-request");
                Err(RouterError::ProcessExited { code })
            }
            WaitOutcome::TimedOut => {
                self.orphaned_replies += 1;
                tracing::warn!(timeout_ms = millis(timeout), "engine reply timed out");
                Err(RouterError::Timeout(timeout))
            }
        }
    }

    /// Terminate the engine and release its streams. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.handle.is_some() {
            let code = self.retire();
            tracing::info!(?code, "engine stopped");
        }
    }

    /// Drop the current handle and record how it ended.
    fn retire(&mut self) -> Option<i32> {
        self.in_flight = None;
        self.orphaned_replies = 0;
        let code = match self.handle.take() {
            Some(mut handle) => handle.shutdown(),
            None => match self.state {
                ProcessState::Exited(code) => code,
                _ => None,
            },
        };
        self.state = ProcessState::Exited(code);
        code
    }
}

impl Drop for RouterSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
