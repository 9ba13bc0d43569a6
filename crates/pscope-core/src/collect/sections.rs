//! Section content resolver.
//!
//! Each advanced-detail category maps to exactly one per-process source and
//! resolves to a sequence of display lines. The result is never empty:
//! a missing source yields a `"<name> not available"` placeholder and a
//! read failure yields an inline error line.

use super::procfs::ProcFs;
use crate::logging::event_names;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, trace};

/// Named detail categories shown on the advanced screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionCategory {
    Maps,
    Fd,
    Cwd,
    Exe,
    Limits,
}

impl SectionCategory {
    /// All categories in display order.
    pub const ALL: [SectionCategory; 5] = [
        SectionCategory::Maps,
        SectionCategory::Fd,
        SectionCategory::Cwd,
        SectionCategory::Exe,
        SectionCategory::Limits,
    ];

    /// Source name under the process directory; doubles as the category id.
    pub fn id(self) -> &'static str {
        match self {
            SectionCategory::Maps => "maps",
            SectionCategory::Fd => "fd",
            SectionCategory::Cwd => "cwd",
            SectionCategory::Exe => "exe",
            SectionCategory::Limits => "limits",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            SectionCategory::Maps => "Memory Maps",
            SectionCategory::Fd => "Open Files/Sockets",
            SectionCategory::Cwd => "Current Working Directory",
            SectionCategory::Exe => "Executable Path",
            SectionCategory::Limits => "Resource Limits",
        }
    }
}

impl fmt::Display for SectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SectionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionCategory::ALL
            .into_iter()
            .find(|c| c.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("invalid category '{s}': expected maps, fd, cwd, exe, or limits")
            })
    }
}

/// Resolve the display lines for one category of one process.
pub fn resolve(procfs: &ProcFs, pid: &str, category: SectionCategory) -> Vec<String> {
    let name = category.id();
    let lines = match procfs.source(pid, name) {
        None => vec![not_available(name)],
        Some(path) => match category {
            SectionCategory::Maps | SectionCategory::Limits => read_table(&path, name),
            SectionCategory::Fd => read_descriptors(&path),
            SectionCategory::Cwd | SectionCategory::Exe => read_link_line(&path, name),
        },
    };
    debug!(
        event = event_names::RESOLVE_FINISHED,
        pid,
        category = name,
        line_count = lines.len(),
        "section resolved"
    );
    lines
}

fn not_available(name: &str) -> String {
    format!("{name} not available")
}

fn no_entries(name: &str) -> String {
    format!("{name}: no entries")
}

/// Verbatim lines of a table-like source, trailing whitespace trimmed.
fn read_table(path: &Path, name: &str) -> Vec<String> {
    if !path.exists() {
        return vec![not_available(name)];
    }
    match std::fs::read(path) {
        Ok(raw) => {
            let lines: Vec<String> = String::from_utf8_lossy(&raw)
                .lines()
                .map(|l| l.trim_end().to_string())
                .collect();
            if lines.is_empty() {
                vec![no_entries(name)]
            } else {
                lines
            }
        }
        Err(e) => vec![format!("Error reading {name}: {e}")],
    }
}

/// One `fd <id>: <target>` line per descriptor, in directory order.
fn read_descriptors(path: &Path) -> Vec<String> {
    if !path.exists() {
        return vec![not_available("fd")];
    }
    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => return vec![format!("Error reading fd: {e}")],
    };

    let mut lines = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                lines.push(format!("Error reading fd: {e}"));
                continue;
            }
        };
        let id = entry.file_name().to_string_lossy().into_owned();
        match std::fs::read_link(entry.path()) {
            Ok(target) => lines.push(format!("fd {id}: {}", target.display())),
            Err(e) => {
                trace!(fd = %id, error = %e, "descriptor target unreadable");
                lines.push(format!("fd {id}: Error: {e}"));
            }
        }
    }

    if lines.is_empty() {
        lines.push(no_entries("fd"));
    }
    lines
}

/// The resolved target of a symlink source, as a single line.
fn read_link_line(path: &Path, name: &str) -> Vec<String> {
    if let Err(e) = std::fs::symlink_metadata(path) {
        if e.kind() == std::io::ErrorKind::NotFound {
            return vec![not_available(name)];
        }
    }
    match std::fs::read_link(path) {
        Ok(target) => vec![target.display().to_string()],
        Err(e) => vec![format!("Error: {e}")],
    }
}
