//! Live output monitor session.
//!
//! State machine:
//!
//! ```text
//! Idle → Attaching → Streaming → Detached   (target exited)
//!                              → Stopped    (operator interrupt, tracer exit)
//!                  → Failed                 (tool missing, target gone, launch error)
//! ```
//!
//! Streaming is one cooperative loop. Each cycle checks the target is
//! alive, decodes at most one tracer line, then waits on operator input.
//! The wait is bounded by the poll interval and skipped entirely while
//! tracer output is backlogged. The tracer is terminated on every exit
//! path.

use super::trace_parser::{parse_line, TraceEvent};
use super::tracer::{Tracer, TracerCommand};
use crate::collect::snapshot::LINUX_ONLY;
use crate::collect::tool_runner::find_in_path;
use crate::collect::ProcFs;
use crate::logging::{event_names, truncate_for_log, Stage};
use std::fmt;
use std::io::{self, Write};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

/// Default wait on operator input per cycle.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default grace period between SIGTERM and SIGKILL for the tracer.
pub const DEFAULT_TRACER_GRACE: Duration = Duration::from_millis(2000);

/// Why a session could not stream, or stopped streaming abnormally.
///
/// Display strings are the operator-facing messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("{}", LINUX_ONLY)]
    UnsupportedPlatform,

    #[error("Error: {tool} is not installed. Please install it")]
    ToolMissing { tool: String },

    #[error("Process {pid} does not exist.")]
    TargetMissing { pid: String },

    #[error("Error starting {tool}: {reason}")]
    Launch { tool: String, reason: String },

    #[error("Error during monitoring: {0}")]
    Console(String),
}

impl From<MonitorError> for pscope_common::Error {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::UnsupportedPlatform => {
                pscope_common::Error::UnsupportedPlatform(LINUX_ONLY.to_string())
            }
            MonitorError::ToolMissing { tool } => pscope_common::Error::ExternalToolMissing { tool },
            MonitorError::TargetMissing { pid } => pscope_common::Error::not_found(pid),
            other => pscope_common::Error::Collection(other.to_string()),
        }
    }
}

/// Where a monitor session stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Attaching,
    Streaming,
    /// The target process exited.
    Detached,
    /// The operator interrupted, or the tracer exited.
    Stopped,
    /// The session could not start; carries the operator-facing reason.
    Failed(String),
}

impl MonitorState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MonitorState::Detached | MonitorState::Stopped | MonitorState::Failed(_)
        )
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorState::Idle => f.write_str("idle"),
            MonitorState::Attaching => f.write_str("attaching"),
            MonitorState::Streaming => f.write_str("streaming"),
            MonitorState::Detached => f.write_str("detached"),
            MonitorState::Stopped => f.write_str("stopped"),
            MonitorState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// What the operator did during one input wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorInput {
    /// A complete line, without its newline.
    Line(String),
    /// Nothing within the wait.
    Idle,
    /// Stop monitoring.
    Interrupt,
}

/// The operator side of a session: an output sink and a line source.
pub trait OperatorConsole {
    /// Show bytes the target wrote, exactly as written.
    fn emit_payload(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Show one status line.
    fn status(&mut self, line: &str) -> io::Result<()>;

    /// Wait up to `timeout` for operator input.
    fn poll_input(&mut self, timeout: Duration) -> io::Result<OperatorInput>;

    /// Block until the operator acknowledges `prompt`.
    fn acknowledge(&mut self, prompt: &str) -> io::Result<()>;
}

/// Session parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub tracer: TracerCommand,
    pub poll_interval: Duration,
    pub grace: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tracer: TracerCommand::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            grace: DEFAULT_TRACER_GRACE,
        }
    }
}

/// Outcome of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorReport {
    pub final_state: MonitorState,
    /// Whether a tracer was launched and has since been terminated and reaped.
    /// `None` when no tracer was ever launched.
    pub tracer_terminated: Option<bool>,
    pub payload_bytes: usize,
    pub lines_sent: usize,
    /// Set when the session ended in `Failed`.
    pub failure: Option<MonitorError>,
}

/// One monitoring session against one pid.
pub struct MonitorSession<'a> {
    procfs: &'a ProcFs,
    config: MonitorConfig,
    pid: String,
    state: MonitorState,
    tracer: Option<Tracer>,
    payload_bytes: usize,
    lines_sent: usize,
}

impl<'a> MonitorSession<'a> {
    pub fn new(procfs: &'a ProcFs, pid: impl Into<String>, config: MonitorConfig) -> Self {
        Self {
            procfs,
            config,
            pid: pid.into(),
            state: MonitorState::Idle,
            tracer: None,
            payload_bytes: 0,
            lines_sent: 0,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn pid(&self) -> &str {
        &self.pid
    }

    /// Run the session to completion.
    ///
    /// The tracer is terminated before this returns, whichever way the
    /// session ended.
    pub fn run(mut self, console: &mut dyn OperatorConsole) -> MonitorReport {
        let span = info_span!("monitor", stage = %Stage::Monitor, pid = %self.pid);
        let _guard = span.enter();

        self.state = MonitorState::Attaching;
        info!(event = event_names::MONITOR_ATTACHING, tracer = self.config.tracer.program(), "attaching");

        let mut failure = None;
        match self.attach(console) {
            Err(err) => {
                warn!(event = event_names::MONITOR_FAILED, error = %err, "monitor failed to start");
                if let Err(e) = console.status(&err.to_string()) {
                    warn!(event = event_names::MONITOR_CONSOLE_FAILED, error = %e, "failure not shown");
                }
                self.state = MonitorState::Failed(err.to_string());
                failure = Some(err);
            }
            Ok(()) => {
                self.state = MonitorState::Streaming;
                info!(event = event_names::MONITOR_STREAMING, "streaming");
                self.state = match self.stream(console) {
                    Ok(state) => state,
                    Err(e) => {
                        let err = MonitorError::Console(e.to_string());
                        warn!(event = event_names::MONITOR_FAILED, error = %err, "monitor aborted");
                        let state = MonitorState::Failed(err.to_string());
                        failure = Some(err);
                        state
                    }
                };
            }
        }

        let tracer_terminated = self.tracer.as_mut().map(|tracer| {
            tracer.terminate();
            tracer.is_terminated()
        });
        debug!(event = event_names::MONITOR_CLEANUP, ?tracer_terminated, "tracer cleaned up");

        let target_gone = !self.procfs.exists(&self.pid);
        let prompt = match &self.state {
            MonitorState::Detached => Some("Press Enter to return..."),
            MonitorState::Failed(_) => Some("Press Enter to continue..."),
            _ if target_gone => Some("Press Enter to return..."),
            _ => None,
        };
        if let Some(prompt) = prompt {
            if let Err(e) = console.acknowledge(prompt) {
                warn!(event = event_names::MONITOR_CONSOLE_FAILED, error = %e, "acknowledgment not read");
            }
        }

        info!(
            event = event_names::MONITOR_FINISHED,
            state = %self.state,
            payload_bytes = self.payload_bytes as u64,
            lines_sent = self.lines_sent as u64,
            "monitor finished"
        );
        MonitorReport {
            final_state: self.state.clone(),
            tracer_terminated,
            payload_bytes: self.payload_bytes,
            lines_sent: self.lines_sent,
            failure,
        }
    }

    /// Probe the environment and launch the tracer.
    fn attach(&mut self, console: &mut dyn OperatorConsole) -> Result<(), MonitorError> {
        if !self.procfs.is_supported() {
            return Err(MonitorError::UnsupportedPlatform);
        }
        let tracer_name = self.config.tracer.display_name().to_string();
        if find_in_path(self.config.tracer.program()).is_none() {
            return Err(MonitorError::ToolMissing { tool: tracer_name });
        }
        if !self.procfs.exists(&self.pid) {
            return Err(MonitorError::TargetMissing {
                pid: self.pid.clone(),
            });
        }

        let tracer = Tracer::spawn(&self.config.tracer, &self.pid, self.config.grace).map_err(
            |e| MonitorError::Launch {
                tool: tracer_name.clone(),
                reason: e.to_string(),
            },
        )?;
        self.tracer = Some(tracer);

        let intro = [
            format!(
                "Monitoring stdout for process {} using {tracer_name}...",
                self.pid
            ),
            "Type text and press Enter to send to the process's stdin (may not work for all processes)"
                .to_string(),
            "Press Ctrl+C to stop monitoring.".to_string(),
        ];
        for line in &intro {
            console
                .status(line)
                .map_err(|e| MonitorError::Console(e.to_string()))?;
        }
        Ok(())
    }

    fn stream(&mut self, console: &mut dyn OperatorConsole) -> io::Result<MonitorState> {
        let Some(tracer) = self.tracer.as_mut() else {
            return Ok(MonitorState::Stopped);
        };

        loop {
            if !self.procfs.exists(&self.pid) {
                console.status("[!] The monitored process has exited.")?;
                return Ok(MonitorState::Detached);
            }

            let got_line = match tracer.poll_line()? {
                Some(line) => {
                    self.payload_bytes += relay_line(&line, console)?;
                    true
                }
                None if tracer.has_exited() => {
                    while let Some(line) = tracer.poll_line()? {
                        self.payload_bytes += relay_line(&line, console)?;
                    }
                    if let Some(rest) = tracer.take_partial() {
                        self.payload_bytes += relay_line(&rest, console)?;
                    }
                    console.status("[strace] tracer exited")?;
                    return Ok(MonitorState::Stopped);
                }
                None => false,
            };

            let wait = if got_line {
                Duration::ZERO
            } else {
                self.config.poll_interval
            };
            match console.poll_input(wait)? {
                OperatorInput::Idle => {}
                OperatorInput::Interrupt => {
                    console.status("Monitoring stopped.")?;
                    return Ok(MonitorState::Stopped);
                }
                OperatorInput::Line(text) => {
                    if !text.is_empty() {
                        let report = match send_to_stdin(self.procfs, &self.pid, &text) {
                            Ok(()) => {
                                self.lines_sent += 1;
                                format!("[Sent to stdin: {text}]")
                            }
                            Err(e) => format!("[Error writing to stdin: {e}]"),
                        };
                        debug!(
                            event = event_names::MONITOR_STDIN,
                            text = %truncate_for_log(&text, 80),
                            %report,
                            "stdin forwarded"
                        );
                        console.status(&report)?;
                    }
                }
            }
        }
    }
}

/// Write one line to the target's standard input descriptor.
fn send_to_stdin(procfs: &ProcFs, pid: &str, text: &str) -> io::Result<()> {
    let path = procfs
        .source(pid, "fd/0")
        .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
    let mut stdin = std::fs::OpenOptions::new().append(true).open(path)?;
    stdin.write_all(text.as_bytes())?;
    stdin.write_all(b"\n")?;
    stdin.flush()
}

/// Decode one tracer line and pass it on; returns payload bytes emitted.
fn relay_line(line: &str, console: &mut dyn OperatorConsole) -> io::Result<usize> {
    match parse_line(line) {
        TraceEvent::Payload(bytes) => {
            console.emit_payload(&bytes)?;
            Ok(bytes.len())
        }
        TraceEvent::Status(_, text) => {
            console.status(&format!("[strace] {text}"))?;
            Ok(0)
        }
        TraceEvent::Unrecognized => Ok(0),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_utils::{fake_tracer, ProcFixture, ScriptedConsole};

    fn fast_config(tracer: TracerCommand) -> MonitorConfig {
        MonitorConfig {
            tracer,
            poll_interval: Duration::from_millis(20),
            grace: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_missing_tool_fails_before_launch() {
        let fixture = ProcFixture::new().process("42").done();
        let procfs = fixture.procfs();
        let config = fast_config(TracerCommand::new("definitely-not-a-tracer-xyz"));
        let mut console = ScriptedConsole::new();

        let report = MonitorSession::new(&procfs, "42", config).run(&mut console);
        assert_eq!(
            report.final_state,
            MonitorState::Failed(
                "Error: definitely-not-a-tracer-xyz is not installed. Please install it".into()
            )
        );
        assert_eq!(report.tracer_terminated, None);
        let err: pscope_common::Error = report.failure.unwrap().into();
        assert!(matches!(err, pscope_common::Error::ExternalToolMissing { .. }));
        assert_eq!(console.acknowledgements(), 1);
    }

    /// A console whose terminal has gone away.
    struct ClosedConsole;

    impl OperatorConsole for ClosedConsole {
        fn emit_payload(&mut self, _: &[u8]) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
        fn status(&mut self, _: &str) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
        fn poll_input(&mut self, _: Duration) -> io::Result<OperatorInput> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
        fn acknowledge(&mut self, _: &str) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn test_closed_console_still_reports_failure() {
        let fixture = ProcFixture::new().process("42").done();
        let procfs = fixture.procfs();
        let config = fast_config(TracerCommand::new("definitely-not-a-tracer-xyz"));
        let report = MonitorSession::new(&procfs, "42", config).run(&mut ClosedConsole);
        assert!(matches!(report.final_state, MonitorState::Failed(_)));
        assert!(report.failure.is_some());
    }

    #[test]
    fn test_closed_console_still_terminates_tracer() {
        let fixture = ProcFixture::new().process("42").done();
        let procfs = fixture.procfs();
        let report = MonitorSession::new(&procfs, "42", fast_config(fake_tracer(&[])))
            .run(&mut ClosedConsole);
        assert!(matches!(report.final_state, MonitorState::Failed(_)));
        assert_eq!(report.tracer_terminated, Some(true));
    }

    #[test]
    fn test_missing_target_fails() {
        let fixture = ProcFixture::new().done();
        let procfs = fixture.procfs();
        let mut console = ScriptedConsole::new();
        let report =
            MonitorSession::new(&procfs, "42", fast_config(fake_tracer(&[]))).run(&mut console);
        assert_eq!(
            report.final_state,
            MonitorState::Failed("Process 42 does not exist.".to_string())
        );
    }

    #[test]
    fn test_interrupt_stops_and_terminates_tracer() {
        let fixture = ProcFixture::new().process("42").done();
        let procfs = fixture.procfs();
        let tracer = fake_tracer(&["write(1, \"hello\\n\", 6) = 6"]);
        let mut console = ScriptedConsole::new()
            .then_idle_until_payload()
            .then(OperatorInput::Interrupt);

        let report = MonitorSession::new(&procfs, "42", fast_config(tracer)).run(&mut console);
        assert_eq!(report.final_state, MonitorState::Stopped);
        assert_eq!(report.tracer_terminated, Some(true));
        assert_eq!(console.payload(), b"hello\n");
        assert_eq!(report.payload_bytes, 6);
        assert!(console.status_lines().iter().any(|l| l == "Monitoring stopped."));
        assert_eq!(console.acknowledgements(), 0);
    }

    #[test]
    fn test_target_exit_detaches_and_waits_for_ack() {
        let fixture = ProcFixture::new().process("42").done();
        let procfs = fixture.procfs();
        let root = fixture.pid_dir("42");
        let mut console = ScriptedConsole::new().on_first_poll(move || {
            std::fs::remove_dir_all(&root).unwrap();
        });

        let report =
            MonitorSession::new(&procfs, "42", fast_config(fake_tracer(&[]))).run(&mut console);
        assert_eq!(report.final_state, MonitorState::Detached);
        assert_eq!(report.tracer_terminated, Some(true));
        assert_eq!(console.acknowledgements(), 1);
        assert!(console
            .status_lines()
            .iter()
            .any(|l| l.contains("The monitored process has exited")));
    }

    #[test]
    fn test_tracer_exit_stops() {
        let fixture = ProcFixture::new().process("42").done();
        let procfs = fixture.procfs();
        let tracer = TracerCommand::new("sh").with_args([
            "-c",
            "echo 'strace: Process {pid} attached'; echo 'write(1, \"bye\", 3) = 3'",
        ]);
        let mut console = ScriptedConsole::new();

        let report = MonitorSession::new(&procfs, "42", fast_config(tracer)).run(&mut console);
        assert_eq!(report.final_state, MonitorState::Stopped);
        assert_eq!(report.tracer_terminated, Some(true));
        assert_eq!(console.payload(), b"bye");
        assert!(console
            .status_lines()
            .iter()
            .any(|l| l == "[strace] strace: Process 42 attached"));
    }

    #[test]
    fn test_stdin_forwarding_reports_inline() {
        let fixture = ProcFixture::new().process("42").file("fd/0", "").done();
        let procfs = fixture.procfs();
        let stdin_path = fixture.pid_dir("42").join("fd/0");
        let mut console = ScriptedConsole::new()
            .then(OperatorInput::Line("ping".into()))
            .then(OperatorInput::Line(String::new()))
            .then(OperatorInput::Interrupt);

        let report =
            MonitorSession::new(&procfs, "42", fast_config(fake_tracer(&[]))).run(&mut console);
        assert_eq!(report.lines_sent, 1);
        assert_eq!(std::fs::read_to_string(stdin_path).unwrap(), "ping\n");
        assert!(console
            .status_lines()
            .iter()
            .any(|l| l == "[Sent to stdin: ping]"));
    }

    #[test]
    fn test_stdin_failure_does_not_stop_session() {
        let fixture = ProcFixture::new().process("42").done();
        let procfs = fixture.procfs();
        let mut console = ScriptedConsole::new()
            .then(OperatorInput::Line("ping".into()))
            .then(OperatorInput::Interrupt);

        let report =
            MonitorSession::new(&procfs, "42", fast_config(fake_tracer(&[]))).run(&mut console);
        assert_eq!(report.final_state, MonitorState::Stopped);
        assert_eq!(report.lines_sent, 0);
        assert!(console
            .status_lines()
            .iter()
            .any(|l| l.starts_with("[Error writing to stdin: ")));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(MonitorState::Detached.to_string(), "detached");
        assert_eq!(MonitorState::Failed("x".into()).to_string(), "failed: x");
        assert!(MonitorState::Stopped.is_terminal());
        assert!(!MonitorState::Streaming.is_terminal());
    }
}
