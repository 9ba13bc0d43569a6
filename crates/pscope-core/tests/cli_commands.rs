//! One-shot subcommands of the pscope binary.
//!
//! Collection commands run against fabricated proc trees via
//! `--proc-root`, so output is deterministic.

#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use pscope_core::test_utils::ProcFixture;

/// Get a Command for the pscope binary.
fn pscope() -> Command {
    let mut cmd = Command::cargo_bin("pscope").expect("pscope binary should exist");
    cmd.env_remove("PSCOPE_PROC_ROOT")
        .env_remove("PSCOPE_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn fixture() -> ProcFixture {
    ProcFixture::new()
        .uptime("50.0 0.0")
        .process("321")
        .status("Name:\tcli-demo\nState:\tR (running)\nThreads:\t1\n")
        .cmdline(b"cli-demo\0-v\0")
        .statm("10 5 1 1 0 2 0")
        .maps("00400000-00401000 r-xp 00000000 08:01 1 /bin/cli-demo\n")
        .fd_link("0", "/dev/null")
        .done()
}

mod show {
    use super::*;

    #[test]
    fn human_report_uses_detail_layout() {
        let fixture = fixture();
        pscope()
            .arg("--proc-root")
            .arg(fixture.root())
            .args(["show", "321"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with(
                "=== Process Details for PID 321 ===\nCommand: cli-demo -v\n",
            ))
            .stdout(predicate::str::contains("  Name: cli-demo"))
            .stdout(predicate::str::contains("  fd 0: /dev/null"));
    }

    #[test]
    fn json_dump_is_parseable() {
        let fixture = fixture();
        let output = pscope()
            .arg("--proc-root")
            .arg(fixture.root())
            .args(["show", "321", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(value["pid"], "321");
        assert_eq!(value["fields"]["Name"], "cli-demo");
        assert_eq!(value["fields"]["fd_count"], 1);
    }

    #[test]
    fn missing_pid_exits_not_found() {
        let fixture = fixture();
        pscope()
            .arg("--proc-root")
            .arg(fixture.root())
            .args(["show", "999"])
            .assert()
            .code(11)
            .stderr(predicate::str::contains("Process Not Found"));
    }
}

mod sections {
    use super::*;

    #[test]
    fn single_category() {
        let fixture = fixture();
        pscope()
            .arg("--proc-root")
            .arg(fixture.root())
            .args(["sections", "321", "--category", "maps"])
            .assert()
            .success()
            .stdout("=== Memory Maps ===\n00400000-00401000 r-xp 00000000 08:01 1 /bin/cli-demo\n");
    }

    #[test]
    fn all_categories_with_placeholders() {
        let fixture = fixture();
        pscope()
            .arg("--proc-root")
            .arg(fixture.root())
            .args(["sections", "321"])
            .assert()
            .success()
            .stdout(predicate::str::contains("=== Open Files/Sockets ===\nfd 0: /dev/null\n"))
            .stdout(predicate::str::contains("=== Executable Path ===\nexe not available\n"))
            .stdout(predicate::str::contains("=== Resource Limits ===\nlimits not available\n"));
    }

    #[test]
    fn bad_category_is_an_argument_error() {
        pscope()
            .args(["sections", "1", "--category", "stack"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid category"));
    }

    #[test]
    fn missing_pid_exits_not_found() {
        let fixture = fixture();
        pscope()
            .arg("--proc-root")
            .arg(fixture.root())
            .args(["sections", "4000"])
            .assert()
            .code(11);
    }
}

mod arguments {
    use super::*;

    #[test]
    fn unknown_command_fails() {
        pscope()
            .arg("nonexistent-command")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }

    #[test]
    fn zero_page_size_rejected() {
        pscope()
            .args(["--page-size", "0", "list"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("page size must be at least 1"));
    }

    #[test]
    fn help_lists_subcommands() {
        pscope()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("list"))
            .stdout(predicate::str::contains("show"))
            .stdout(predicate::str::contains("sections"))
            .stdout(predicate::str::contains("monitor"));
    }
}

#[cfg(target_os = "linux")]
mod list {
    use super::*;

    #[test]
    fn header_then_rows() {
        if Command::new("ps").arg("aux").ok().is_err() {
            eprintln!("skipping: ps unavailable");
            return;
        }
        pscope()
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::starts_with("    PID  COMMAND\n"));
    }
}
