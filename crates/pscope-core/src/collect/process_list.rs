//! Process directory: enumerates `(pid, command)` pairs.
//!
//! OS differences are isolated here. The listing utility is chosen by a
//! pure branch on the OS name, run under the tool runner's timeout, and
//! its output parsed by pure functions that tests drive directly.
//!
//! # Platform Support
//! - Linux, macOS: `ps aux` (pid in column 2, command from column 11)
//! - Windows: `tasklist /fo csv /nh` (image name, pid)
//! - Anything else: empty listing plus a diagnostic
//!
//! Enumeration never fails: a missing utility, a timeout, or an unknown OS
//! all degrade to an empty listing carrying a diagnostic message.

use super::tool_runner::{ToolConfig, ToolRunner};
use crate::logging::event_names;
use pscope_common::ProcessRef;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, span, warn, Level};

/// How processes are enumerated on a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    /// BSD-style `ps aux` (Linux, macOS).
    Unix,
    /// `tasklist` CSV output.
    Windows,
    /// No known listing utility; carries the OS name.
    Unsupported(String),
}

impl Platform {
    /// Platform of the running host.
    pub fn detect() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an OS name (as in `std::env::consts::OS`) to a platform.
    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" | "macos" => Platform::Unix,
            "windows" => Platform::Windows,
            other => Platform::Unsupported(other.to_string()),
        }
    }

    /// The listing command for this platform.
    pub fn listing_command(&self) -> Option<(&'static str, &'static [&'static str])> {
        match self {
            Platform::Unix => Some(("ps", &["aux"])),
            Platform::Windows => Some(("tasklist", &["/fo", "csv", "/nh"])),
            Platform::Unsupported(_) => None,
        }
    }

    /// Parse raw listing output for this platform.
    pub fn parse_listing(&self, output: &str) -> Vec<ProcessRef> {
        match self {
            Platform::Unix => parse_ps_aux(output),
            Platform::Windows => parse_tasklist_csv(output),
            Platform::Unsupported(_) => Vec::new(),
        }
    }
}

/// Result of one enumeration cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessListing {
    pub processes: Vec<ProcessRef>,
    /// Why the listing is empty or partial, when something went wrong.
    pub diagnostic: Option<String>,
}

impl ProcessListing {
    fn failed(diagnostic: String) -> Self {
        Self {
            processes: Vec::new(),
            diagnostic: Some(diagnostic),
        }
    }
}

/// Enumerates processes on one platform.
#[derive(Debug, Clone)]
pub struct ProcessDirectory {
    platform: Platform,
    runner: ToolRunner,
}

impl ProcessDirectory {
    /// Directory for the host platform with the given listing timeout.
    pub fn new(timeout: Duration) -> Self {
        Self::for_platform(Platform::detect(), timeout)
    }

    pub fn for_platform(platform: Platform, timeout: Duration) -> Self {
        Self {
            platform,
            runner: ToolRunner::new(ToolConfig {
                timeout,
                ..ToolConfig::default()
            }),
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Enumerate running processes.
    pub fn list_processes(&self) -> ProcessListing {
        let _span = span!(Level::DEBUG, "list_processes").entered();

        let Some((cmd, args)) = self.platform.listing_command() else {
            let os = match &self.platform {
                Platform::Unsupported(os) => os.as_str(),
                _ => std::env::consts::OS,
            };
            warn!(event = event_names::SCAN_UNSUPPORTED, os, "no listing utility");
            return ProcessListing::failed(format!("Unsupported operating system: {os}"));
        };

        debug!(event = event_names::SCAN_STARTED, command = cmd, "listing processes");

        let output = match self.runner.run_tool(cmd, args) {
            Ok(output) => output,
            Err(e) => {
                warn!(event = event_names::SCAN_FAILED, command = cmd, error = %e, "listing failed");
                return ProcessListing::failed(format!("Error getting process list: {e}"));
            }
        };

        if output.timed_out {
            warn!(event = event_names::SCAN_FAILED, command = cmd, "listing timed out");
            return ProcessListing::failed(format!(
                "Error getting process list: {cmd} timed out after {:?}",
                self.runner.config().timeout
            ));
        }

        if !output.success() {
            let stderr = output.stderr_str();
            warn!(
                event = event_names::SCAN_FAILED,
                command = cmd,
                exit_code = ?output.exit_code,
                "listing exited with failure"
            );
            return ProcessListing::failed(format!(
                "Error getting process list: {cmd} exited with {}: {}",
                output
                    .exit_code
                    .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                stderr.trim()
            ));
        }

        let processes = self.platform.parse_listing(&output.stdout_str());
        debug!(
            event = event_names::SCAN_FINISHED,
            process_count = processes.len(),
            duration_ms = output.duration.as_millis() as u64,
            "listing complete"
        );

        ProcessListing {
            processes,
            diagnostic: None,
        }
    }
}

/// Anything that can produce a process listing on demand.
pub trait ProcessSource {
    fn list(&self) -> ProcessListing;
}

impl ProcessSource for ProcessDirectory {
    fn list(&self) -> ProcessListing {
        self.list_processes()
    }
}

/// A fixed listing, returned unchanged on every call.
impl ProcessSource for ProcessListing {
    fn list(&self) -> ProcessListing {
        self.clone()
    }
}

/// Case-insensitive substring filter over pid and command.
///
/// Returns a filtered copy; the input is left untouched.
pub fn search(processes: &[ProcessRef], term: &str) -> Vec<ProcessRef> {
    let needle = term.to_lowercase();
    processes
        .iter()
        .filter(|p| p.matches_lowercase(&needle))
        .cloned()
        .collect()
}

/// Parse `ps aux` output.
///
/// The header line is skipped. Lines with fewer than 11 columns are
/// ignored; the command keeps its internal spacing.
pub fn parse_ps_aux(output: &str) -> Vec<ProcessRef> {
    output
        .trim()
        .lines()
        .skip(1)
        .filter_map(|line| {
            let columns = split_columns(line, 11);
            (columns.len() >= 11).then(|| ProcessRef::new(columns[1], columns[10]))
        })
        .collect()
}

/// Parse `tasklist /fo csv /nh` output.
///
/// Each row is `"image","pid","session","#","mem"`.
pub fn parse_tasklist_csv(output: &str) -> Vec<ProcessRef> {
    output
        .trim()
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.trim().trim_matches('"').split("\",\"").collect();
            (fields.len() >= 2).then(|| ProcessRef::new(fields[1], fields[0]))
        })
        .collect()
}

/// Split on runs of whitespace into at most `max` columns; the last column
/// keeps the rest of the line.
fn split_columns(line: &str, max: usize) -> Vec<&str> {
    let mut columns = Vec::with_capacity(max);
    let mut rest = line.trim();
    while !rest.is_empty() {
        if columns.len() + 1 == max {
            columns.push(rest);
            break;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        columns.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    const PS_AUX: &str = "\
USER         PID %CPU %MEM    VSZ   RSS TTY      STAT START   TIME COMMAND
root           1  0.0  0.1 167744 11800 ?        Ss   Oct01   0:09 /sbin/init splash
alice       4242  1.5  2.0 812345 99000 pts/1    Sl+  10:02   1:23 python3  server.py --port  8080
short line
";

    #[test]
    fn test_parse_ps_aux() {
        let procs = parse_ps_aux(PS_AUX);
        assert_eq!(procs.len(), 2);
        assert_eq!(procs[0], ProcessRef::new("1", "/sbin/init splash"));
        assert_eq!(procs[1].pid, "4242");
        assert_eq!(procs[1].command, "python3  server.py --port  8080");
    }

    #[test]
    fn test_parse_ps_aux_header_only() {
        assert!(parse_ps_aux("USER PID %CPU %MEM VSZ RSS TTY STAT START TIME COMMAND\n").is_empty());
        assert!(parse_ps_aux("").is_empty());
    }

    #[test]
    fn test_parse_tasklist_csv() {
        let output = "\"System Idle Process\",\"0\",\"Services\",\"0\",\"8 K\"\r\n\"explorer.exe\",\"5120\",\"Console\",\"1\",\"120,344 K\"\r\n";
        let procs = parse_tasklist_csv(output);
        assert_eq!(procs.len(), 2);
        assert_eq!(procs[0], ProcessRef::new("0", "System Idle Process"));
        assert_eq!(procs[1], ProcessRef::new("5120", "explorer.exe"));
    }

    #[test]
    fn test_platform_dispatch() {
        assert_eq!(Platform::from_os("linux"), Platform::Unix);
        assert_eq!(Platform::from_os("macos"), Platform::Unix);
        assert_eq!(Platform::from_os("windows"), Platform::Windows);
        assert_eq!(
            Platform::from_os("plan9"),
            Platform::Unsupported("plan9".to_string())
        );
        assert!(Platform::from_os("plan9").listing_command().is_none());
    }

    #[test]
    fn test_unsupported_platform_degrades() {
        let dir = ProcessDirectory::for_platform(
            Platform::Unsupported("plan9".to_string()),
            Duration::from_secs(1),
        );
        let listing = dir.list_processes();
        assert!(listing.processes.is_empty());
        assert_eq!(
            listing.diagnostic.as_deref(),
            Some("Unsupported operating system: plan9")
        );
    }

    #[test]
    fn test_search_non_destructive() {
        let procs = vec![
            ProcessRef::new("1", "/sbin/init"),
            ProcessRef::new("4242", "Python3 app.py"),
            ProcessRef::new("4300", "bash"),
        ];
        let hits = search(&procs, "PYTHON");
        assert_eq!(hits, vec![ProcessRef::new("4242", "Python3 app.py")]);
        assert_eq!(procs.len(), 3);

        let by_pid = search(&procs, "42");
        assert_eq!(by_pid.len(), 1);
        assert_eq!(search(&procs, "").len(), 3);
        assert!(search(&procs, "nginx").is_empty());
    }

    #[test]
    fn test_split_columns() {
        assert_eq!(split_columns("a  b   c d", 3), vec!["a", "b", "c d"]);
        assert_eq!(split_columns("  a b ", 5), vec!["a", "b"]);
        assert!(split_columns("   ", 3).is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_list_processes_host() {
        if super::super::tool_runner::find_in_path("ps").is_none() {
            return;
        }
        let listing = ProcessDirectory::new(Duration::from_secs(10)).list_processes();
        assert!(listing.diagnostic.is_none(), "{:?}", listing.diagnostic);
        let me = std::process::id().to_string();
        assert!(listing.processes.iter().any(|p| p.pid == me));
    }
}
