//! Error types for procscope.
//!
//! Every failure the inspector can hit falls into one of a small set of
//! categories. All of them are contained at the component that detects
//! them and turned into operator-visible text; the category decides how
//! that text is presented and whether the operator can retry.
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Process Not Found
//!   Reason: process 4242 not found
//!   Fix: The process exited. Pick another process from the list.
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for procscope operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The pid no longer resolves to a process.
    Lookup,
    /// The OS refused access to a source.
    Permission,
    /// A per-process source is missing.
    Source,
    /// A required external utility is not installed.
    Tool,
    /// Drawing to the terminal failed.
    Render,
    /// Other I/O and collection failures.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Lookup => write!(f, "lookup"),
            ErrorCategory::Permission => write!(f, "permission"),
            ErrorCategory::Source => write!(f, "source"),
            ErrorCategory::Tool => write!(f, "tool"),
            ErrorCategory::Render => write!(f, "render"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for procscope.
#[derive(Error, Debug)]
pub enum Error {
    #[error("process {pid} not found")]
    ProcessNotFound { pid: String },

    #[error("permission denied reading {source_name} of process {pid}")]
    PermissionDenied { pid: String, source_name: String },

    #[error("{source_name} not available for process {pid}")]
    SourceUnavailable { pid: String, source_name: String },

    #[error("{tool} is not installed")]
    ExternalToolMissing { tool: String },

    #[error("render failure: {0}")]
    RenderFailure(String),

    #[error("process collection failed: {0}")]
    Collection(String),

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a not-found error for a pid.
    pub fn not_found(pid: impl Into<String>) -> Self {
        Error::ProcessNotFound { pid: pid.into() }
    }

    /// Classify an I/O error raised while reading `source_name` of `pid`.
    ///
    /// `NotFound` becomes [`Error::SourceUnavailable`] and `PermissionDenied`
    /// becomes [`Error::PermissionDenied`]; anything else stays an I/O error.
    pub fn from_source_io(pid: &str, source_name: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::SourceUnavailable {
                pid: pid.to_string(),
                source_name: source_name.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => Error::PermissionDenied {
                pid: pid.to_string(),
                source_name: source_name.to_string(),
            },
            _ => Error::Io(err),
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ProcessNotFound { .. } => ErrorCategory::Lookup,
            Error::PermissionDenied { .. } => ErrorCategory::Permission,
            Error::SourceUnavailable { .. } => ErrorCategory::Source,
            Error::ExternalToolMissing { .. } | Error::UnsupportedPlatform(_) => {
                ErrorCategory::Tool
            }
            Error::RenderFailure(_) => ErrorCategory::Render,
            Error::Collection(_) | Error::Io(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether the operator can carry on after this error.
    ///
    /// Nothing here terminates the application; non-recoverable errors only
    /// abort the operation that raised them (a monitor session that cannot
    /// launch, for example).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::ProcessNotFound { .. } => true,
            Error::PermissionDenied { .. } => true,
            Error::SourceUnavailable { .. } => true,
            Error::ExternalToolMissing { .. } => false,
            Error::RenderFailure(_) => true,
            Error::Collection(_) => true,
            Error::UnsupportedPlatform(_) => false,
            Error::Io(_) => true,
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::ProcessNotFound { .. } => "Process Not Found",
            Error::PermissionDenied { .. } => "Permission Denied",
            Error::SourceUnavailable { .. } => "Source Unavailable",
            Error::ExternalToolMissing { .. } => "Required Tool Missing",
            Error::RenderFailure(_) => "Render Failure",
            Error::Collection(_) => "Collection Error",
            Error::UnsupportedPlatform(_) => "Unsupported Platform",
            Error::Io(_) => "I/O Error",
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::ProcessNotFound { .. } => {
                "The process exited. Pick another process from the list."
            }
            Error::PermissionDenied { .. } => {
                "The source belongs to another user. Inspect your own processes or rerun as that user."
            }
            Error::SourceUnavailable { .. } => {
                "This kernel does not expose the source for this process."
            }
            Error::ExternalToolMissing { .. } => {
                "Install the tool (for example 'apt install strace') or point --tracer at it."
            }
            Error::RenderFailure(_) => "Enlarge the terminal window.",
            Error::Collection(_) | Error::Io(_) => "Retry the operation.",
            Error::UnsupportedPlatform(_) => {
                "This feature relies on the Linux /proc filesystem."
            }
        }
    }

    /// Format the error as headline, reason, and fix lines.
    pub fn to_human(&self) -> String {
        format!(
            "✗ {}\n  Reason: {}\n  Fix: {}",
            self.headline(),
            self,
            self.remediation()
        )
    }
}
