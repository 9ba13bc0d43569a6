//! Handle on a Linux-style `/proc` tree.
//!
//! Every per-process source is addressed relative to a root so the
//! collector and resolver can be pointed at a fabricated tree. The page
//! size and clock tick divisor travel with the handle: they are platform
//! constants, never per-process values.

use pscope_common::is_numeric_pid;
use std::path::{Path, PathBuf};

/// Default proc filesystem mount point.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Fallback page size when sysconf is unavailable.
const FALLBACK_PAGE_SIZE: u64 = 4096;

/// Fallback clock ticks per second when sysconf is unavailable.
const FALLBACK_CLOCK_TICKS: u64 = 100;

/// A proc filesystem root plus the platform constants needed to interpret it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcFs {
    root: PathBuf,
    page_size: u64,
    clock_ticks: u64,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl ProcFs {
    /// Create a handle for `root` using the host's page size and tick rate.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            page_size: host_page_size(),
            clock_ticks: host_clock_ticks(),
        }
    }

    /// Override the page size (bytes).
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Override the clock tick divisor (ticks per second).
    pub fn with_clock_ticks(mut self, clock_ticks: u64) -> Self {
        self.clock_ticks = clock_ticks.max(1);
        self
    }

    /// The root directory of this tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Page size in bytes.
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Clock ticks per second.
    pub fn clock_ticks(&self) -> u64 {
        self.clock_ticks
    }

    /// Whether this handle points at the host's real `/proc`.
    pub fn is_host_root(&self) -> bool {
        self.root == Path::new(DEFAULT_PROC_ROOT)
    }

    /// Whether per-process collection is possible through this handle.
    ///
    /// Fabricated trees are always usable; the host root only on Linux.
    pub fn is_supported(&self) -> bool {
        cfg!(target_os = "linux") || !self.is_host_root()
    }

    /// Directory of a process, or `None` when the pid is not numeric.
    pub fn pid_dir(&self, pid: &str) -> Option<PathBuf> {
        is_numeric_pid(pid).then(|| self.root.join(pid))
    }

    /// Path of a named source under a process directory.
    pub fn source(&self, pid: &str, name: &str) -> Option<PathBuf> {
        self.pid_dir(pid).map(|dir| dir.join(name))
    }

    /// Existence probe for a process.
    pub fn exists(&self, pid: &str) -> bool {
        self.pid_dir(pid).is_some_and(|dir| dir.exists())
    }

    /// Path of the system uptime scalar.
    pub fn uptime_path(&self) -> PathBuf {
        self.root.join("uptime")
    }
}

#[cfg(unix)]
fn host_page_size() -> u64 {
    // SAFETY: sysconf has no preconditions.
    let value = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if value > 0 {
        value as u64
    } else {
        FALLBACK_PAGE_SIZE
    }
}

#[cfg(not(unix))]
fn host_page_size() -> u64 {
    FALLBACK_PAGE_SIZE
}

#[cfg(unix)]
fn host_clock_ticks() -> u64 {
    // SAFETY: sysconf has no preconditions.
    let value = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if value > 0 {
        value as u64
    } else {
        FALLBACK_CLOCK_TICKS
    }
}

#[cfg(not(unix))]
fn host_clock_ticks() -> u64 {
    FALLBACK_CLOCK_TICKS
}
