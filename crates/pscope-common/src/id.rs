//! Process identity types.
//!
//! A process is identified by its pid in the OS-native string form, so a
//! listing from `ps` and one from `tasklist` round-trip without
//! reformatting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A `(pid, command)` pair produced by a process listing.
///
/// The pid names the process; the command is what the listing saw at the
/// time. Equality compares both fields, so two listings of one process
/// with a changed command line are not equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessRef {
    /// Process id, formatted the way the OS reported it.
    pub pid: String,
    /// Command string (full command line on Unix, image name on Windows).
    pub command: String,
}

impl ProcessRef {
    /// Create a new process reference.
    pub fn new(pid: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            pid: pid.into(),
            command: command.into(),
        }
    }

    /// Case-insensitive substring match against the pid or the command.
    ///
    /// `needle` must already be lowercased.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.pid.to_lowercase().contains(needle) || self.command.to_lowercase().contains(needle)
    }

    /// Case-insensitive substring match against the pid or the command.
    pub fn matches(&self, term: &str) -> bool {
        self.matches_lowercase(&term.to_lowercase())
    }
}

impl fmt::Display for ProcessRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.pid, self.command)
    }
}

/// Returns true when `pid` looks like a numeric process id.
///
/// Used to keep arbitrary strings (`..`, `self`, paths) out of `/proc`
/// lookups.
pub fn is_numeric_pid(pid: &str) -> bool {
    !pid.is_empty() && pid.bytes().all(|b| b.is_ascii_digit())
}
