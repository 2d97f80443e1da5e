//! Runner client abstraction and the child-process implementation.
//!
//! The [`RunnerClient`] trait decouples step validation from the actual worker
//! process. Tests use scripted runners that answer from a table without
//! spawning anything.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use wait_timeout::ChildExt;

use crate::core::outcome::{ErrorKind, Outcome};
use crate::io::protocol::{Message, MessageType, decode_line, encode_line};

/// Failure to get any usable answer from the runner.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("Connection to runner closed")]
    ConnectionClosed,
    #[error("Failed to send request to runner: {0}")]
    Send(#[source] std::io::Error),
    #[error("Failed to read from runner: {0}")]
    Receive(#[source] std::io::Error),
    #[error("Malformed message from runner: {0}")]
    Malformed(String),
}

/// Request/response channel to a runner.
pub trait RunnerClient {
    /// Send `message` and wait at most `timeout` for its response.
    fn request(&mut self, message: Message, timeout: Duration) -> Result<Message, TransportError>;

    /// Stop the runner. Further requests fail.
    fn kill(&mut self) -> Result<()>;
}

impl<R: RunnerClient + ?Sized> RunnerClient for &mut R {
    fn request(&mut self, message: Message, timeout: Duration) -> Result<Message, TransportError> {
        (**self).request(message, timeout)
    }

    fn kill(&mut self) -> Result<()> {
        (**self).kill()
    }
}

/// Ask the runner whether `step_text` with `number_of_parameters` is implemented.
#[instrument(skip(runner, timeout), level = "debug")]
pub fn validate_step<R: RunnerClient + ?Sized>(
    runner: &mut R,
    step_text: &str,
    number_of_parameters: usize,
    timeout: Duration,
) -> Result<Outcome, TransportError> {
    let response = runner.request(
        Message::step_validate_request(step_text, number_of_parameters),
        timeout,
    )?;
    Ok(classify_response(&response))
}

/// Turn a runner reply into an outcome. A reply of the wrong type is itself a failure.
pub fn classify_response(response: &Message) -> Outcome {
    match (&response.message_type, &response.step_validate_response) {
        (MessageType::StepValidateResponse, Some(res)) if res.is_valid => Outcome::Valid,
        (MessageType::StepValidateResponse, Some(res)) => {
            Outcome::invalid(ErrorKind::from_wire(res.error_type.as_deref().unwrap_or("")))
        }
        _ => {
            warn!(message_type = ?response.message_type, "unexpected response to step validation");
            Outcome::invalid_response()
        }
    }
}

/// Kills the runner on drop unless [`RunnerGuard::release`] ran first.
pub struct RunnerGuard<R: RunnerClient> {
    runner: R,
    released: bool,
}

impl<R: RunnerClient> RunnerGuard<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            released: false,
        }
    }

    pub fn runner_mut(&mut self) -> &mut R {
        &mut self.runner
    }

    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.runner.kill()
    }
}

impl<R: RunnerClient> Drop for RunnerGuard<R> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.runner.kill() {
            warn!(err = %err, "failed to stop runner");
        }
    }
}

/// Runner spawned as a child process speaking JSON lines over stdio.
pub struct ProcessRunner {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<std::io::Result<Vec<u8>>>,
    next_id: u64,
    /// Timed-out requests whose reply may still arrive.
    outstanding: usize,
    kill_timeout: Duration,
    killed: bool,
}

impl ProcessRunner {
    /// Spawn `command` (program + args) in `workdir`.
    #[instrument(skip_all, fields(command = ?command))]
    pub fn spawn(command: &[String], workdir: &Path, kill_timeout: Duration) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| anyhow!("runner command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                error!(err = %e, "failed to spawn runner");
                return Err(e).with_context(|| format!("spawn runner '{program}'"));
            }
        };
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin was not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("stdout was not piped"))?;

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || forward_lines(stdout, tx));

        info!(pid = child.id(), "runner started");
        Ok(Self {
            child,
            stdin: Some(stdin),
            lines: rx,
            next_id: 0,
            outstanding: 0,
            kill_timeout,
            killed: false,
        })
    }

    fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let line =
            encode_line(message).map_err(|err| TransportError::Malformed(format!("{err:#}")))?;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or(TransportError::ConnectionClosed)?;
        stdin
            .write_all(line.as_bytes())
            .and_then(|()| stdin.flush())
            .map_err(TransportError::Send)
    }
}

impl RunnerClient for ProcessRunner {
    /// Replies to earlier, timed-out requests are skipped: by id when the
    /// runner echoes ids, otherwise by counting the id-less replies still owed.
    fn request(&mut self, message: Message, timeout: Duration) -> Result<Message, TransportError> {
        self.next_id += 1;
        let id = self.next_id;
        self.send(&message.with_id(id))?;

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let bytes = match self.lines.recv_timeout(remaining) {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(err)) => return Err(TransportError::Receive(err)),
                Err(RecvTimeoutError::Timeout) => {
                    self.outstanding += 1;
                    warn!(
                        message_id = id,
                        timeout_ms = timeout.as_millis() as u64,
                        "runner request timed out"
                    );
                    return Err(TransportError::Timeout(timeout));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(TransportError::ConnectionClosed);
                }
            };
            if bytes.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let response = match decode_reply(&bytes) {
                Ok(response) => response,
                Err(err) if self.outstanding > 0 => {
                    self.outstanding -= 1;
                    debug!(err = %err, "discarding unreadable reply to a timed-out request");
                    continue;
                }
                Err(err) => return Err(err),
            };
            if response.message_id == id {
                return Ok(response);
            }
            if response.message_id != 0 {
                self.outstanding = self.outstanding.saturating_sub(1);
                debug!(
                    expected = id,
                    got = response.message_id,
                    "discarding stale runner message"
                );
                continue;
            }
            if self.outstanding > 0 {
                self.outstanding -= 1;
                debug!(expected = id, "discarding id-less reply to a timed-out request");
                continue;
            }
            return Ok(response);
        }
    }

    fn kill(&mut self) -> Result<()> {
        if self.killed {
            return Ok(());
        }
        self.killed = true;

        if let Some(mut stdin) = self.stdin.take() {
            let line = encode_line(&Message::kill_process_request())?;
            if let Err(err) = stdin.write_all(line.as_bytes()).and_then(|()| stdin.flush()) {
                debug!(err = %err, "runner stdin already closed");
            }
        }

        match self
            .child
            .wait_timeout(self.kill_timeout)
            .context("wait for runner exit")?
        {
            Some(status) => debug!(exit_code = ?status.code(), "runner exited"),
            None => {
                warn!(
                    kill_timeout_ms = self.kill_timeout.as_millis() as u64,
                    "runner did not exit, killing"
                );
                self.child.kill().context("kill runner")?;
                self.child.wait().context("wait runner after kill")?;
            }
        }
        Ok(())
    }
}

impl Drop for ProcessRunner {
    fn drop(&mut self) {
        if let Err(err) = self.kill() {
            warn!(err = %err, "failed to stop runner");
        }
    }
}

fn decode_reply(bytes: &[u8]) -> Result<Message, TransportError> {
    let line = std::str::from_utf8(bytes)
        .map_err(|err| TransportError::Malformed(format!("invalid UTF-8: {err}")))?;
    decode_line(line).map_err(|err| TransportError::Malformed(format!("{err:#}")))
}

/// Forward raw stdout lines (newline stripped) until EOF or a read error.
fn forward_lines<R: Read>(reader: R, tx: Sender<std::io::Result<Vec<u8>>>) {
    let mut reader = BufReader::new(reader);
    loop {
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                if tx.send(Ok(buf)).is_err() {
                    break;
                }
            }
            Err(err) => {
                let _ = tx.send(Err(err));
                break;
            }
        }
    }
}
