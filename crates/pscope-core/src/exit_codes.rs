//! Exit codes for the pscope binary.
//!
//! Exit code ranges:
//! - 0: Clean run
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

use pscope_common::{Error, ErrorCategory};

/// Exit codes for pscope operations.
///
/// These codes are a stable contract for scripts wrapping the one-shot
/// subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Clean = 0,

    /// Invalid arguments
    ArgsError = 10,

    /// The requested process does not exist
    NotFound = 11,

    /// Permission denied
    PermissionError = 12,

    /// Required external tool missing (e.g., strace not installed)
    ToolMissing = 13,

    /// Internal error (bug - please report)
    InternalError = 20,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code is a user/environment error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Check if this exit code indicates any error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::NotFound => "ERR_NOT_FOUND",
            ExitCode::PermissionError => "ERR_PERMISSION",
            ExitCode::ToolMissing => "ERR_TOOL_MISSING",
            ExitCode::InternalError => "ERR_INTERNAL",
        }
    }

    /// Exit code for an error that ended a one-shot command.
    pub fn for_error(err: &Error) -> Self {
        match err.category() {
            ErrorCategory::Lookup => ExitCode::NotFound,
            ErrorCategory::Permission => ExitCode::PermissionError,
            ErrorCategory::Tool => ExitCode::ToolMissing,
            ErrorCategory::Source | ErrorCategory::Render | ErrorCategory::Io => {
                ExitCode::InternalError
            }
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Clean.as_i32(), 0);
        assert_eq!(ExitCode::ArgsError.as_i32(), 10);
        assert_eq!(ExitCode::NotFound.as_i32(), 11);
        assert_eq!(ExitCode::PermissionError.as_i32(), 12);
        assert_eq!(ExitCode::ToolMissing.as_i32(), 13);
        assert_eq!(ExitCode::InternalError.as_i32(), 20);
    }

    #[test]
    fn test_exit_code_classification() {
        assert!(!ExitCode::Clean.is_error());
        assert!(ExitCode::NotFound.is_user_error());
        assert!(ExitCode::InternalError.is_error());
        assert!(!ExitCode::InternalError.is_user_error());
    }

    #[test]
    fn test_for_error() {
        assert_eq!(ExitCode::for_error(&Error::not_found("1")), ExitCode::NotFound);
        assert_eq!(
            ExitCode::for_error(&Error::ExternalToolMissing {
                tool: "strace".into()
            }),
            ExitCode::ToolMissing
        );
        assert_eq!(
            ExitCode::for_error(&Error::Collection("boom".into())),
            ExitCode::InternalError
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::NotFound.to_string(), "ERR_NOT_FOUND (11)");
    }
}
