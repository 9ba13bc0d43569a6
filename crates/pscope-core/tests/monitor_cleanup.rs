//! Live output monitor against real processes.
//!
//! The target is a real child process read through the host `/proc`; the
//! tracer is a shell stand-in that records its own pid, so the tests can
//! check it is gone once the session returns.

#![cfg(target_os = "linux")]

use pscope_core::collect::ProcFs;
use pscope_core::monitor::{MonitorConfig, MonitorSession, MonitorState, OperatorInput, TracerCommand};
use pscope_core::test_utils::{ProcessHarness, ScriptedConsole};
use std::path::Path;
use std::time::Duration;

/// A tracer that writes its pid to `pid_file`, prints `lines`, then idles.
fn recording_tracer(pid_file: &Path, lines: &[&str]) -> TracerCommand {
    let mut script = format!("echo $$ > '{}'; ", pid_file.display());
    for line in lines {
        script.push_str(&format!("printf '%s\\n' '{line}'; "));
    }
    script.push_str("exec sleep 30");
    TracerCommand::new("sh").with_args(["-c".to_string(), script])
}

fn config(tracer: TracerCommand) -> MonitorConfig {
    MonitorConfig {
        tracer,
        poll_interval: Duration::from_millis(20),
        grace: Duration::from_millis(500),
    }
}

fn tracer_pid(pid_file: &Path) -> String {
    std::fs::read_to_string(pid_file)
        .expect("tracer wrote its pid")
        .trim()
        .to_string()
}

#[test]
fn interrupt_leaves_no_tracer_behind() {
    if !ProcessHarness::is_available() {
        eprintln!("skipping: no /proc on this host");
        return;
    }
    let target = ProcessHarness.spawn_sleep(30).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("tracer.pid");
    let procfs = ProcFs::default();

    let tracer = recording_tracer(&pid_file, &["write(1, \"tick\\n\", 5) = 5"]);
    let mut console = ScriptedConsole::new()
        .then_idle_until_payload()
        .then(OperatorInput::Interrupt);
    let report = MonitorSession::new(&procfs, target.pid_string(), config(tracer)).run(&mut console);

    assert_eq!(report.final_state, MonitorState::Stopped);
    assert_eq!(report.tracer_terminated, Some(true));
    assert_eq!(console.payload(), b"tick\n");
    assert!(!procfs.exists(&tracer_pid(&pid_file)), "tracer still running");
    // The target is left alone.
    assert!(procfs.exists(&target.pid_string()));
}

#[test]
fn target_exit_detaches_and_cleans_up() {
    if !ProcessHarness::is_available() {
        eprintln!("skipping: no /proc on this host");
        return;
    }
    let mut target = ProcessHarness.spawn_sleep(30).unwrap();
    let pid = target.pid_string();
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("tracer.pid");
    let procfs = ProcFs::default();

    let written = pid_file.clone();
    let mut console = ScriptedConsole::new().on_first_poll(move || {
        // Let the tracer record its pid before the target goes away.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !written.exists() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        target.kill();
    });
    let report =
        MonitorSession::new(&procfs, pid, config(recording_tracer(&pid_file, &[]))).run(&mut console);

    assert_eq!(report.final_state, MonitorState::Detached);
    assert_eq!(report.tracer_terminated, Some(true));
    assert_eq!(console.acknowledgements(), 1);
    assert!(!procfs.exists(&tracer_pid(&pid_file)));
}

#[test]
fn tracer_exit_on_its_own_is_reported() {
    if !ProcessHarness::is_available() {
        eprintln!("skipping: no /proc on this host");
        return;
    }
    let target = ProcessHarness.spawn_sleep(30).unwrap();
    let procfs = ProcFs::default();
    let tracer = TracerCommand::new("sh").with_args(["-c", "echo 'strace: attach: ptrace(PTRACE_SEIZE, 1): Operation not permitted' >&2"]);

    let mut console = ScriptedConsole::new();
    let report = MonitorSession::new(&procfs, target.pid_string(), config(tracer)).run(&mut console);

    assert_eq!(report.final_state, MonitorState::Stopped);
    assert!(console
        .status_lines()
        .iter()
        .any(|l| l.contains("Operation not permitted")));
    assert!(console.status_lines().iter().any(|l| l == "[strace] tracer exited"));
}
