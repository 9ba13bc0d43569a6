//! The tracer subprocess.
//!
//! A [`Tracer`] owns one running tracer attached to a target. Its stdout
//! and stderr share a single pipe that is read without blocking, one line
//! at a time. The subprocess is terminated (SIGTERM, grace period, then
//! SIGKILL) by [`Tracer::terminate`] or, failing that, when the handle is
//! dropped, so no exit path can leak it.

use crate::collect::tool_runner::{kill_with_grace, try_read_nonblocking};
use std::io::{self, PipeReader};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};

/// Placeholder in argument templates replaced by the target pid.
pub const PID_PLACEHOLDER: &str = "{pid}";

/// Default tracer program.
pub const DEFAULT_TRACER: &str = "strace";

/// Longest line buffered before it is flushed without a newline.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// How to launch the tracer for a pid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerCommand {
    program: String,
    args: Vec<String>,
}

impl Default for TracerCommand {
    fn default() -> Self {
        Self::new(DEFAULT_TRACER)
    }
}

impl TracerCommand {
    /// Trace `write` calls of `pid` and its threads, with 1024-byte strings.
    pub fn new(program: impl Into<String>) -> Self {
        let args = ["-p", PID_PLACEHOLDER, "-f", "-e", "trace=write", "-s", "1024"];
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Replace the argument template. `{pid}` is substituted at launch.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Short name for status messages (`strace` for `/usr/bin/strace`).
    pub fn display_name(&self) -> &str {
        self.program.rsplit('/').next().unwrap_or(&self.program)
    }

    /// Arguments for a concrete pid.
    pub fn args_for(&self, pid: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(PID_PLACEHOLDER, pid))
            .collect()
    }
}

/// A running tracer with a merged, non-blocking output stream.
#[derive(Debug)]
pub struct Tracer {
    child: Child,
    output: PipeReader,
    buffer: Vec<u8>,
    grace: Duration,
    terminated: bool,
}

impl Tracer {
    /// Launch `command` against `pid`.
    pub fn spawn(command: &TracerCommand, pid: &str, grace: Duration) -> io::Result<Self> {
        let (output, writer) = io::pipe()?;
        let stderr_writer = writer.try_clone()?;
        let args = command.args_for(pid);

        // The Command (and with it the parent's write ends) is dropped at
        // the end of this statement, so EOF arrives when the tracer exits.
        let child = Command::new(command.program())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer)
            .spawn()?;

        debug!(tracer_pid = child.id(), program = command.program(), ?args, "tracer spawned");
        Ok(Self {
            child,
            output,
            buffer: Vec::new(),
            grace,
            terminated: false,
        })
    }

    /// OS pid of the tracer itself.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Next complete output line, if one is available right now.
    ///
    /// Never blocks. The returned line keeps its trailing newline.
    pub fn poll_line(&mut self) -> io::Result<Option<String>> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }
        if self.terminated {
            return Ok(None);
        }
        let mut chunk = [0u8; 8192];
        let n = try_read_nonblocking(&mut self.output, &mut chunk)?;
        self.buffer.extend_from_slice(&chunk[..n]);
        Ok(self.take_line())
    }

    /// Whatever is buffered without a trailing newline.
    pub fn take_partial(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }

    fn take_line(&mut self) -> Option<String> {
        let end = match self.buffer.iter().position(|b| *b == b'\n') {
            Some(pos) => pos + 1,
            None if self.buffer.len() >= MAX_LINE_BYTES => self.buffer.len(),
            None => return None,
        };
        let line: Vec<u8> = self.buffer.drain(..end).collect();
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Whether the tracer process has exited on its own.
    pub fn has_exited(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(?status, "tracer exited");
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "failed to poll tracer status");
                true
            }
        }
    }

    /// Stop the tracer: SIGTERM, grace period, SIGKILL. Idempotent.
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        kill_with_grace(&mut self.child, self.grace);
        self.terminated = true;
    }

    /// True once the tracer has been stopped and reaped.
    pub fn is_terminated(&mut self) -> bool {
        self.terminated && matches!(self.child.try_wait(), Ok(Some(_)))
    }
}

impl Drop for Tracer {
    fn drop(&mut self) {
        self.terminate();
    }
}
