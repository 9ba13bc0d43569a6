//! Tool runner with timeout and output cap.
//!
//! External utilities (`ps`, `tasklist`, the tracer) are never trusted to
//! finish on their own. This module provides:
//!
//! - Per-command timeout with SIGTERM → SIGKILL escalation
//! - Output size caps to prevent memory exhaustion
//! - A PATH probe so a missing utility is detected before launch
//! - The non-blocking read primitive the monitor loop is built on
//!
//! # Example
//!
//! ```ignore
//! use pscope_core::collect::tool_runner::{ToolRunner, ToolConfig};
//!
//! let runner = ToolRunner::new(ToolConfig::default());
//! let output = runner.run_tool("ps", &["aux"])?;
//! println!("Output: {}", output.stdout_str());
//! ```

use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, instrument, trace, warn};

/// Default timeout per command in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default maximum output size in bytes (16MB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

/// Default grace period between SIGTERM and SIGKILL in milliseconds.
pub const DEFAULT_GRACE_MS: u64 = 500;

/// Errors that can occur during tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("command failed to spawn: {0}")]
    SpawnFailed(String),

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid command path: {0}")]
    InvalidPath(String),
}

impl From<ToolError> for pscope_common::Error {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::CommandNotFound(tool) => pscope_common::Error::ExternalToolMissing { tool },
            ToolError::Io(e) => pscope_common::Error::Io(e),
            other => pscope_common::Error::Collection(other.to_string()),
        }
    }
}

/// Output from a tool execution.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutput {
    /// Command that was executed.
    pub command: String,

    /// Standard output (may be truncated).
    pub stdout: Vec<u8>,

    /// Standard error (may be truncated).
    pub stderr: Vec<u8>,

    /// Exit code (if available).
    pub exit_code: Option<i32>,

    /// Whether output was truncated.
    pub truncated: bool,

    /// Execution duration.
    pub duration: Duration,

    /// Whether the command timed out.
    pub timed_out: bool,
}

impl ToolOutput {
    /// Get stdout as string (lossy UTF-8 conversion).
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as string (lossy UTF-8 conversion).
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Check if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Configuration for the tool runner.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolConfig {
    /// Timeout per command.
    pub timeout: Duration,

    /// Maximum output size per stream in bytes.
    pub max_output_bytes: usize,

    /// Grace period between SIGTERM and SIGKILL.
    pub grace: Duration,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            grace: Duration::from_millis(DEFAULT_GRACE_MS),
        }
    }
}

/// Runs external commands under a [`ToolConfig`].
#[derive(Debug, Clone, Default)]
pub struct ToolRunner {
    config: ToolConfig,
}

impl ToolRunner {
    /// Create a new tool runner with the given configuration.
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    /// The runner's configuration.
    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Run `cmd` with `args`, capturing both output streams.
    ///
    /// A timeout is not an error: the child is killed and whatever was
    /// captured is returned with `timed_out` set.
    #[instrument(skip(self, args), fields(cmd = %cmd))]
    pub fn run_tool(&self, cmd: &str, args: &[&str]) -> Result<ToolOutput, ToolError> {
        validate_command(cmd)?;
        if find_in_path(cmd).is_none() {
            return Err(ToolError::CommandNotFound(cmd.to_string()));
        }

        debug!(
            command = %cmd,
            args = ?args,
            timeout_ms = self.config.timeout.as_millis() as u64,
            "running tool"
        );

        let start = Instant::now();
        let mut child = Command::new(cmd)
            .args(args)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                error!(command = %cmd, error = %e, "failed to spawn");
                match e.kind() {
                    std::io::ErrorKind::NotFound => ToolError::CommandNotFound(cmd.to_string()),
                    _ => ToolError::SpawnFailed(e.to_string()),
                }
            })?;

        let (stdout, stderr, exit_code, truncated, timed_out) = self.execute_with_timeout(&mut child)?;
        let duration = start.elapsed();

        debug!(
            command = %cmd,
            duration_ms = duration.as_millis() as u64,
            exit_code = ?exit_code,
            timed_out,
            "tool execution complete"
        );

        Ok(ToolOutput {
            command: cmd.to_string(),
            stdout,
            stderr,
            exit_code,
            truncated,
            duration,
            timed_out,
        })
    }

    /// Execute a child process with timeout and output capture.
    #[allow(clippy::type_complexity)]
    fn execute_with_timeout(
        &self,
        child: &mut Child,
    ) -> Result<(Vec<u8>, Vec<u8>, Option<i32>, bool, bool), ToolError> {
        let max_output = self.config.max_output_bytes;
        let deadline = Instant::now() + self.config.timeout;
        let mut stdout_buf = Vec::with_capacity(max_output.min(65536));
        let mut stderr_buf = Vec::with_capacity(max_output.min(65536));
        let mut truncated = false;

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let mut chunk = vec![0u8; 8192];

        loop {
            if Instant::now() >= deadline {
                warn!(timeout = ?self.config.timeout, "command timed out, sending SIGTERM");
                kill_with_grace(child, self.config.grace);
                let exit_code = child.wait().ok().and_then(|s| s.code());
                return Ok((stdout_buf, stderr_buf, exit_code, truncated, true));
            }

            let mut did_read = false;
            if let Some(ref mut out) = stdout {
                if let Ok(n) = try_read_nonblocking(out, &mut chunk) {
                    did_read |= n > 0;
                    append_capped(&mut stdout_buf, &chunk[..n], max_output, &mut truncated);
                }
            }
            if let Some(ref mut err) = stderr {
                if let Ok(n) = try_read_nonblocking(err, &mut chunk) {
                    did_read |= n > 0;
                    append_capped(&mut stderr_buf, &chunk[..n], max_output, &mut truncated);
                }
            }

            match child.try_wait() {
                Ok(Some(status)) => {
                    if let Some(ref mut out) = stdout {
                        let _ = drain_to_limit(out, &mut stdout_buf, max_output, &mut truncated);
                    }
                    if let Some(ref mut err) = stderr {
                        let _ = drain_to_limit(err, &mut stderr_buf, max_output, &mut truncated);
                    }
                    let exit_code = status.code();
                    trace!(exit_code = ?exit_code, "process exited");
                    return Ok((stdout_buf, stderr_buf, exit_code, truncated, false));
                }
                Ok(None) => {
                    if !did_read {
                        thread::sleep(Duration::from_millis(10));
                    }
                }
                Err(e) => {
                    error!(error = %e, "failed to wait for child");
                    return Err(ToolError::Io(e));
                }
            }
        }
    }
}

fn append_capped(buf: &mut Vec<u8>, data: &[u8], max: usize, truncated: &mut bool) {
    if data.is_empty() {
        return;
    }
    let space = max.saturating_sub(buf.len());
    let to_copy = data.len().min(space);
    buf.extend_from_slice(&data[..to_copy]);
    if data.len() > space {
        *truncated = true;
    }
}

/// Drain remaining data from a stream up to the limit.
///
/// Uses non-blocking reads so a grandchild still holding the pipe open
/// cannot hang the caller.
fn drain_to_limit<R: Read + NonBlockingSource>(
    stream: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
    truncated: &mut bool,
) -> std::io::Result<()> {
    let mut chunk = vec![0u8; 8192];
    while !*truncated {
        match try_read_nonblocking(stream, &mut chunk) {
            Ok(0) => break,
            Ok(n) => append_capped(buf, &chunk[..n], max, truncated),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Reject command names carrying shell metacharacters.
pub fn validate_command(cmd: &str) -> Result<(), ToolError> {
    if cmd.is_empty() {
        return Err(ToolError::InvalidPath("empty command".to_string()));
    }
    if cmd.contains(['|', '&', ';', '$', '`', '\n', '\r']) {
        return Err(ToolError::InvalidPath(format!(
            "command contains shell metacharacters: {}",
            cmd
        )));
    }
    Ok(())
}

/// Locate an executable the way the shell would.
///
/// Names containing a path separator are checked directly; bare names are
/// searched for along `PATH`.
pub fn find_in_path(cmd: &str) -> Option<PathBuf> {
    let direct = Path::new(cmd);
    if direct.components().count() > 1 {
        return is_executable(direct).then(|| direct.to_path_buf());
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .flat_map(|dir| candidate_names(cmd).map(move |name| dir.join(name)))
        .find(|candidate| is_executable(candidate))
}

#[cfg(windows)]
fn candidate_names(cmd: &str) -> impl Iterator<Item = String> + '_ {
    [String::new(), ".exe".to_string(), ".cmd".to_string()]
        .into_iter()
        .map(move |ext| format!("{cmd}{ext}"))
}

#[cfg(not(windows))]
fn candidate_names(cmd: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(cmd.to_string())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Kill a process with SIGTERM, then SIGKILL after the grace period.
///
/// The child is always reaped before this returns.
#[cfg(unix)]
pub fn kill_with_grace(child: &mut Child, grace: Duration) {
    let pid = child.id() as i32;

    if let Ok(Some(_)) = child.try_wait() {
        trace!(pid, "process already exited");
        return;
    }

    // SAFETY: pid belongs to a child we have not yet reaped.
    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }
    debug!(pid, "sent SIGTERM");

    let deadline = Instant::now() + grace;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => {
                trace!(pid, "process exited after SIGTERM");
                return;
            }
            Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(20)),
            Ok(None) => break,
            Err(e) => {
                error!(pid, error = %e, "failed to check process status");
                break;
            }
        }
    }

    warn!(pid, "process did not exit after SIGTERM, sending SIGKILL");
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(not(unix))]
pub fn kill_with_grace(child: &mut Child, _grace: Duration) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Streams that expose a raw descriptor for non-blocking reads.
#[cfg(unix)]
pub trait NonBlockingSource: std::os::unix::io::AsRawFd {}

#[cfg(unix)]
impl<T: std::os::unix::io::AsRawFd> NonBlockingSource for T {}

/// Streams that expose a raw descriptor for non-blocking reads.
#[cfg(not(unix))]
pub trait NonBlockingSource {}

#[cfg(not(unix))]
impl<T> NonBlockingSource for T {}

/// Try to read from a stream without blocking.
///
/// On Unix, this uses fcntl to set O_NONBLOCK on the file descriptor,
/// performs a read, then restores the original flags.
/// Returns Ok(0) if no data is available (EAGAIN/EWOULDBLOCK).
#[cfg(unix)]
pub fn try_read_nonblocking<R: Read + NonBlockingSource>(
    stream: &mut R,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    let fd = stream.as_raw_fd();

    // SAFETY: fd is owned by `stream` and stays open for this call.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }

    let was_nonblocking = (flags & libc::O_NONBLOCK) != 0;
    if !was_nonblocking {
        let result = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        if result < 0 {
            return Err(std::io::Error::last_os_error());
        }
    }

    let result = stream.read(buf);

    if !was_nonblocking {
        unsafe {
            libc::fcntl(fd, libc::F_SETFL, flags);
        }
    }

    match result {
        Ok(n) => Ok(n),
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
        Err(e) => Err(e),
    }
}

/// Non-blocking read fallback for non-Unix platforms.
/// Falls back to blocking read.
#[cfg(not(unix))]
pub fn try_read_nonblocking<R: Read>(stream: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    stream.read(buf)
}
