//! Test utilities for pscope-core.
//!
//! This module provides test infrastructure including:
//! - Fabricated proc trees ([`ProcFixture`])
//! - A scripted operator console for monitor sessions
//! - A stand-in tracer command
//! - Real process spawning for end-to-end checks
//! - Common assertions

use crate::collect::ProcFs;
use crate::monitor::{OperatorConsole, OperatorInput, TracerCommand};
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

// ============================================================================
// Macros
// ============================================================================

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($expr:expr, $msg:expr) => {
        match $expr {
            Ok(val) => val,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Assert that a Result is Err.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(val) => panic!("Expected Err, got Ok: {:?}", val),
            Err(_) => {}
        }
    };
}

// ============================================================================
// Fabricated proc trees
// ============================================================================

/// A temporary directory laid out like `/proc`.
///
/// ```ignore
/// let fixture = ProcFixture::new()
///     .uptime("1000.00 4000.00")
///     .process("42")
///     .status("Name:\tdemo\n")
///     .fd_link("0", "/dev/null")
///     .done();
/// let procfs = fixture.procfs();
/// ```
#[derive(Debug)]
pub struct ProcFixture {
    dir: tempfile::TempDir,
}

impl ProcFixture {
    /// Start building a tree. Panics if the temp dir cannot be created.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> ProcFixtureBuilder {
        ProcFixtureBuilder {
            dir: tempfile::tempdir().expect("create proc fixture dir"),
            current: None,
        }
    }

    /// A handle on this tree with 4 KiB pages and 100 ticks per second.
    pub fn procfs(&self) -> ProcFs {
        ProcFs::new(self.dir.path())
            .with_page_size(4096)
            .with_clock_ticks(100)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn pid_dir(&self, pid: &str) -> PathBuf {
        self.dir.path().join(pid)
    }

    /// Simulate process exit.
    pub fn remove_process(&self, pid: &str) {
        fs::remove_dir_all(self.pid_dir(pid)).expect("remove fabricated process");
    }
}

/// Builder for [`ProcFixture`]. Source setters apply to the last `process`.
#[derive(Debug)]
pub struct ProcFixtureBuilder {
    dir: tempfile::TempDir,
    current: Option<PathBuf>,
}

impl ProcFixtureBuilder {
    /// Write the system uptime scalar.
    pub fn uptime(self, content: &str) -> Self {
        fs::write(self.dir.path().join("uptime"), content).expect("write uptime");
        self
    }

    /// Create a process directory; following setters target it.
    pub fn process(mut self, pid: &str) -> Self {
        let path = self.dir.path().join(pid);
        fs::create_dir_all(&path).expect("create pid dir");
        self.current = Some(path);
        self
    }

    fn current(&self) -> &Path {
        self.current
            .as_deref()
            .expect("call process() before adding sources")
    }

    /// Write an arbitrary file under the process directory.
    pub fn file(self, name: &str, content: impl AsRef<[u8]>) -> Self {
        let path = self.current().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create source parent");
        }
        fs::write(&path, content).expect("write source");
        self
    }

    /// Create a directory where a file would normally be.
    pub fn dir(self, name: &str) -> Self {
        fs::create_dir_all(self.current().join(name)).expect("create source dir");
        self
    }

    pub fn status(self, content: &str) -> Self {
        self.file("status", content)
    }

    pub fn cmdline(self, content: &[u8]) -> Self {
        self.file("cmdline", content)
    }

    pub fn statm(self, content: &str) -> Self {
        self.file("statm", content)
    }

    pub fn stat(self, content: &str) -> Self {
        self.file("stat", content)
    }

    pub fn io(self, content: &str) -> Self {
        self.file("io", content)
    }

    pub fn maps(self, content: &str) -> Self {
        self.file("maps", content)
    }

    pub fn limits(self, content: &str) -> Self {
        self.file("limits", content)
    }

    /// Add a descriptor symlink under `fd/`.
    #[cfg(unix)]
    pub fn fd_link(self, name: &str, target: &str) -> Self {
        let fd_dir = self.current().join("fd");
        fs::create_dir_all(&fd_dir).expect("create fd dir");
        std::os::unix::fs::symlink(target, fd_dir.join(name)).expect("create fd link");
        self
    }

    /// Add a regular file under `fd/`, so reading it as a link fails.
    pub fn fd_file(self, name: &str, content: &str) -> Self {
        self.file(&format!("fd/{name}"), content)
    }

    #[cfg(unix)]
    pub fn cwd(self, target: &str) -> Self {
        std::os::unix::fs::symlink(target, self.current().join("cwd")).expect("create cwd link");
        self
    }

    #[cfg(unix)]
    pub fn exe(self, target: &str) -> Self {
        std::os::unix::fs::symlink(target, self.current().join("exe")).expect("create exe link");
        self
    }

    pub fn done(self) -> ProcFixture {
        ProcFixture { dir: self.dir }
    }
}

// ============================================================================
// Monitor doubles
// ============================================================================

/// Tracer stand-in: prints `lines` verbatim, then idles until killed.
pub fn fake_tracer(lines: &[&str]) -> TracerCommand {
    let mut script = String::new();
    for line in lines {
        script.push_str("printf '%s\\n' '");
        script.push_str(&line.replace('\'', "'\\''"));
        script.push_str("'; ");
    }
    script.push_str("exec sleep 30");
    TracerCommand::new("sh").with_args(["-c".to_string(), script])
}

enum Step {
    Input(OperatorInput),
    IdleUntilPayload,
}

/// Upper bound on how long a script may sit idle before interrupting.
const SCRIPT_IDLE_LIMIT: Duration = Duration::from_secs(10);

/// An [`OperatorConsole`] that plays back scripted input and records output.
///
/// Once the script runs out it answers `Idle`, and after a generous limit
/// `Interrupt`, so a broken session cannot hang a test.
pub struct ScriptedConsole {
    steps: VecDeque<Step>,
    first_poll: Option<Box<dyn FnOnce()>>,
    payload: Vec<u8>,
    status: Vec<String>,
    acknowledgements: usize,
    started: Instant,
}

impl Default for ScriptedConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
            first_poll: None,
            payload: Vec::new(),
            status: Vec::new(),
            acknowledgements: 0,
            started: Instant::now(),
        }
    }

    /// Queue one input.
    pub fn then(mut self, input: OperatorInput) -> Self {
        self.steps.push_back(Step::Input(input));
        self
    }

    /// Answer `Idle` until some payload has been emitted.
    pub fn then_idle_until_payload(mut self) -> Self {
        self.steps.push_back(Step::IdleUntilPayload);
        self
    }

    /// Run `hook` at the start of the first input wait.
    pub fn on_first_poll(mut self, hook: impl FnOnce() + 'static) -> Self {
        self.first_poll = Some(Box::new(hook));
        self
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn status_lines(&self) -> &[String] {
        &self.status
    }

    pub fn acknowledgements(&self) -> usize {
        self.acknowledgements
    }

    fn idle(&self, timeout: Duration) -> OperatorInput {
        if self.started.elapsed() > SCRIPT_IDLE_LIMIT {
            return OperatorInput::Interrupt;
        }
        std::thread::sleep(timeout.min(Duration::from_millis(20)));
        OperatorInput::Idle
    }
}

impl OperatorConsole for ScriptedConsole {
    fn emit_payload(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.payload.extend_from_slice(bytes);
        Ok(())
    }

    fn status(&mut self, line: &str) -> io::Result<()> {
        self.status.push(line.to_string());
        Ok(())
    }

    fn poll_input(&mut self, timeout: Duration) -> io::Result<OperatorInput> {
        if let Some(hook) = self.first_poll.take() {
            hook();
        }
        loop {
            match self.steps.front() {
                None => return Ok(self.idle(timeout)),
                Some(Step::IdleUntilPayload) if self.payload.is_empty() => {
                    return Ok(self.idle(timeout));
                }
                Some(Step::IdleUntilPayload) => {
                    self.steps.pop_front();
                }
                Some(Step::Input(_)) => {
                    if let Some(Step::Input(input)) = self.steps.pop_front() {
                        return Ok(input);
                    }
                }
            }
        }
    }

    fn acknowledge(&mut self, prompt: &str) -> io::Result<()> {
        self.status.push(prompt.to_string());
        self.acknowledgements += 1;
        Ok(())
    }
}

// ============================================================================
// Process Harness (no-mock integration tests)
// ============================================================================

/// Spawns real processes so collection can be checked against the host `/proc`.
#[derive(Debug, Default)]
pub struct ProcessHarness;

impl ProcessHarness {
    /// True on hosts with a readable `/proc` and a working `sh`.
    pub fn is_available() -> bool {
        cfg!(target_os = "linux")
            && Path::new("/proc/self/status").exists()
            && std::process::Command::new("sh")
                .args(["-c", "true"])
                .status()
                .map(|s| s.success())
                .unwrap_or(false)
    }

    pub fn spawn_shell(&self, cmd: &str) -> io::Result<ProcessHandle> {
        let child = std::process::Command::new("sh")
            .args(["-c", cmd])
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .spawn()?;
        Ok(ProcessHandle { child })
    }

    pub fn spawn_sleep(&self, seconds: u64) -> io::Result<ProcessHandle> {
        self.spawn_shell(&format!("exec sleep {}", seconds.max(1)))
    }
}

/// A spawned process, killed and reaped on drop.
#[derive(Debug)]
pub struct ProcessHandle {
    child: std::process::Child,
}

impl ProcessHandle {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn pid_string(&self) -> String {
        self.child.id().to_string()
    }

    /// Kill the process and wait for it.
    pub fn kill(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layout() {
        let fixture = ProcFixture::new()
            .uptime("1.0 2.0")
            .process("12")
            .status("Name:\tx\n")
            .file("fd/0", "")
            .done();
        assert!(fixture.root().join("uptime").is_file());
        assert!(fixture.pid_dir("12").join("status").is_file());
        assert!(fixture.pid_dir("12").join("fd/0").is_file());
        assert!(fixture.procfs().exists("12"));

        fixture.remove_process("12");
        assert!(!fixture.procfs().exists("12"));
    }

    #[test]
    fn test_scripted_console_order() {
        let mut console = ScriptedConsole::new()
            .then(OperatorInput::Line("a".into()))
            .then(OperatorInput::Interrupt);
        assert_eq!(
            console.poll_input(Duration::ZERO).unwrap(),
            OperatorInput::Line("a".into())
        );
        assert_eq!(
            console.poll_input(Duration::ZERO).unwrap(),
            OperatorInput::Interrupt
        );
        assert_eq!(
            console.poll_input(Duration::ZERO).unwrap(),
            OperatorInput::Idle
        );
    }

    #[test]
    fn test_idle_until_payload() {
        let mut console = ScriptedConsole::new()
            .then_idle_until_payload()
            .then(OperatorInput::Interrupt);
        assert_eq!(
            console.poll_input(Duration::ZERO).unwrap(),
            OperatorInput::Idle
        );
        console.emit_payload(b"x").unwrap();
        assert_eq!(
            console.poll_input(Duration::ZERO).unwrap(),
            OperatorInput::Interrupt
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_fake_tracer_quotes_lines() {
        let cmd = fake_tracer(&["it's"]);
        let args = cmd.args_for("1");
        assert_eq!(args[0], "-c");
        assert!(args[1].contains("'it'\\''s'"));
        assert!(args[1].ends_with("exec sleep 30"));
    }
}
