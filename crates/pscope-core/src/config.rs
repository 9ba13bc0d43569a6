//! Runtime configuration.
//!
//! There is no configuration file: every knob is a command-line flag, some
//! with an environment fallback. [`InspectorArgs`] is the clap surface
//! shared by every subcommand; [`InspectorConfig`] is the resolved form the
//! rest of the crate consumes.

use crate::collect::{
    FactCollector, ProcFs, ProcessDirectory, DEFAULT_FD_DETAIL_LIMIT, DEFAULT_PROC_ROOT,
};
use crate::logging::{LogConfig, LogFormat, LogLevel};
use crate::monitor::{MonitorConfig, TracerCommand, DEFAULT_TRACER};
use crate::tui::screens::NavContext;
pub use crate::tui::screens::selector::DEFAULT_PAGE_SIZE;
use crate::tui::Theme;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for the process listing utility, in seconds.
pub const DEFAULT_LIST_TIMEOUT_SECS: u64 = 10;

/// Options available to every command.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct InspectorArgs {
    /// Root of the proc filesystem to read
    #[arg(long, global = true, env = "PSCOPE_PROC_ROOT", default_value = DEFAULT_PROC_ROOT)]
    pub proc_root: PathBuf,

    /// Maximum processes per selector page
    #[arg(
        long,
        global = true,
        env = "PSCOPE_PAGE_SIZE",
        default_value_t = DEFAULT_PAGE_SIZE,
        value_parser = parse_page_size
    )]
    pub page_size: usize,

    /// Descriptors whose targets are resolved in a snapshot
    #[arg(long, global = true, default_value_t = DEFAULT_FD_DETAIL_LIMIT)]
    pub fd_detail_limit: usize,

    /// Tracer program used by the monitor
    #[arg(long, global = true, env = "PSCOPE_TRACER", default_value = DEFAULT_TRACER)]
    pub tracer: String,

    /// Monitor input wait when the tracer is quiet (milliseconds)
    #[arg(long, global = true, default_value_t = 1000)]
    pub poll_ms: u64,

    /// Grace period before the tracer is force-killed (milliseconds)
    #[arg(long, global = true, default_value_t = 2000)]
    pub grace_ms: u64,

    /// Timeout for the process listing utility (seconds)
    #[arg(long, global = true, default_value_t = DEFAULT_LIST_TIMEOUT_SECS)]
    pub list_timeout: u64,

    /// Disable colored output (NO_COLOR is honoured as well)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Log format (human, jsonl)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Write logs here while the terminal is owned by the UI or monitor
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

fn parse_page_size(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a positive integer"))?;
    if value == 0 {
        return Err("page size must be at least 1".to_string());
    }
    Ok(value)
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectorConfig {
    pub proc_root: PathBuf,
    pub page_size: usize,
    pub fd_detail_limit: usize,
    pub tracer: String,
    pub poll_interval: Duration,
    pub grace: Duration,
    pub list_timeout: Duration,
    pub no_color: bool,
    pub log_level: Option<LogLevel>,
    pub log_format: Option<LogFormat>,
    pub log_file: Option<PathBuf>,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            page_size: DEFAULT_PAGE_SIZE,
            fd_detail_limit: DEFAULT_FD_DETAIL_LIMIT,
            tracer: DEFAULT_TRACER.to_string(),
            poll_interval: Duration::from_millis(1000),
            grace: Duration::from_millis(2000),
            list_timeout: Duration::from_secs(DEFAULT_LIST_TIMEOUT_SECS),
            no_color: false,
            log_level: None,
            log_format: None,
            log_file: None,
        }
    }
}

impl From<&InspectorArgs> for InspectorConfig {
    fn from(args: &InspectorArgs) -> Self {
        Self {
            proc_root: args.proc_root.clone(),
            page_size: args.page_size.max(1),
            fd_detail_limit: args.fd_detail_limit,
            tracer: args.tracer.clone(),
            poll_interval: Duration::from_millis(args.poll_ms),
            grace: Duration::from_millis(args.grace_ms),
            list_timeout: Duration::from_secs(args.list_timeout),
            no_color: args.no_color,
            log_level: args.log_level,
            log_format: args.log_format,
            log_file: args.log_file.clone(),
        }
    }
}

impl InspectorConfig {
    pub fn procfs(&self) -> ProcFs {
        ProcFs::new(&self.proc_root)
    }

    pub fn collector(&self) -> FactCollector {
        FactCollector::new(self.procfs()).with_fd_limit(self.fd_detail_limit)
    }

    pub fn directory(&self) -> ProcessDirectory {
        ProcessDirectory::new(self.list_timeout)
    }

    pub fn monitor(&self) -> MonitorConfig {
        MonitorConfig {
            tracer: TracerCommand::new(&self.tracer),
            poll_interval: self.poll_interval,
            grace: self.grace,
        }
    }

    pub fn theme(&self) -> Theme {
        if self.no_color {
            Theme::no_color()
        } else {
            Theme::from_env()
        }
    }

    /// Logging for one-shot commands: stderr.
    pub fn log_config(&self) -> LogConfig {
        LogConfig::from_env(self.log_level, self.log_format)
    }

    /// Logging while the terminal belongs to the UI or the monitor.
    pub fn interactive_log_config(&self) -> LogConfig {
        self.log_config().off_terminal(self.log_file.clone())
    }

    /// Shared context for the navigation engine.
    pub fn nav_context(&self) -> NavContext {
        NavContext::new(Box::new(self.directory()), self.collector())
            .with_monitor(self.monitor())
            .with_page_size(self.page_size)
            .with_theme(self.theme())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogDestination;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        args: InspectorArgs,
    }

    #[test]
    fn test_flags_resolve() {
        let cli = TestCli::try_parse_from([
            "pscope",
            "--proc-root",
            "/tmp/fake-proc",
            "--page-size",
            "7",
            "--tracer",
            "/opt/bin/strace",
            "--poll-ms",
            "50",
            "--no-color",
        ])
        .unwrap();
        let config = InspectorConfig::from(&cli.args);
        assert_eq!(config.proc_root, PathBuf::from("/tmp/fake-proc"));
        assert_eq!(config.page_size, 7);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.monitor().tracer.display_name(), "strace");
        assert_eq!(config.theme(), Theme::no_color());
        assert_eq!(config.procfs().root(), std::path::Path::new("/tmp/fake-proc"));
        assert_eq!(config.nav_context().page_size, 7);
    }

    #[test]
    fn test_defaults_match_selector() {
        let cli = TestCli::try_parse_from(["pscope"]).unwrap();
        assert_eq!(cli.args.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(
            InspectorConfig::default().nav_context().page_size,
            crate::tui::screens::selector::DEFAULT_PAGE_SIZE
        );
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(TestCli::try_parse_from(["pscope", "--page-size", "0"]).is_err());
        assert!(TestCli::try_parse_from(["pscope", "--page-size", "x"]).is_err());
    }

    #[test]
    fn test_interactive_logs_leave_terminal() {
        let config = InspectorConfig::default();
        assert_eq!(config.interactive_log_config().destination, LogDestination::Off);

        let config = InspectorConfig {
            log_file: Some(PathBuf::from("/tmp/pscope.log")),
            ..InspectorConfig::default()
        };
        assert_eq!(
            config.interactive_log_config().destination,
            LogDestination::File(PathBuf::from("/tmp/pscope.log"))
        );
        assert_eq!(config.log_config().destination, LogDestination::Stderr);
    }
}
