//! Event vocabulary for structured logs.
//!
//! Every log call carries an `event` field drawn from [`event_names`], so
//! JSONL consumers can filter on a stable key instead of message text.

use serde::{Deserialize, Serialize};

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Component that emitted an event; recorded on spans as `stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Process enumeration.
    Scan,
    /// Snapshot collection and section resolution.
    Collect,
    /// Live output monitoring.
    Monitor,
    /// Interactive screens.
    Ui,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Scan => "scan",
            Stage::Collect => "collect",
            Stage::Monitor => "monitor",
            Stage::Ui => "ui",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Process enumeration
    pub const SCAN_STARTED: &str = "scan.started";
    pub const SCAN_FINISHED: &str = "scan.finished";
    pub const SCAN_FAILED: &str = "scan.failed";
    pub const SCAN_UNSUPPORTED: &str = "scan.unsupported";

    // Fact collection
    pub const COLLECT_FINISHED: &str = "collect.finished";
    pub const COLLECT_PARTIAL: &str = "collect.partial";
    pub const COLLECT_NOT_FOUND: &str = "collect.not_found";
    pub const RESOLVE_FINISHED: &str = "collect.section_resolved";

    // Live output monitor
    pub const MONITOR_ATTACHING: &str = "monitor.attaching";
    pub const MONITOR_STREAMING: &str = "monitor.streaming";
    pub const MONITOR_STDIN: &str = "monitor.stdin";
    pub const MONITOR_FINISHED: &str = "monitor.finished";
    pub const MONITOR_FAILED: &str = "monitor.failed";
    pub const MONITOR_CLEANUP: &str = "monitor.cleanup";
    pub const MONITOR_CONSOLE_FAILED: &str = "monitor.console_failed";

    // Interactive UI
    pub const UI_STARTED: &str = "ui.started";
    pub const UI_SCREEN_PUSHED: &str = "ui.screen_pushed";
    pub const UI_SCREEN_POPPED: &str = "ui.screen_popped";
    pub const UI_RENDER_FAILED: &str = "ui.render_failed";
    pub const UI_FINISHED: &str = "ui.finished";

    // Error events
    pub const INTERNAL_ERROR: &str = "internal_error";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_matches_serde() {
        for stage in [Stage::Init, Stage::Scan, Stage::Collect, Stage::Monitor, Stage::Ui] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }

    #[test]
    fn test_event_names_are_namespaced() {
        for name in [
            event_names::SCAN_STARTED,
            event_names::COLLECT_FINISHED,
            event_names::MONITOR_CLEANUP,
            event_names::MONITOR_CONSOLE_FAILED,
            event_names::UI_RENDER_FAILED,
        ] {
            assert!(name.contains('.'), "{name}");
        }
    }

    #[test]
    fn test_level_from_tracing() {
        assert_eq!(Level::from(tracing::Level::WARN), Level::Warn);
        assert_eq!(
            serde_json::to_string(&Level::from(tracing::Level::DEBUG)).unwrap(),
            "\"debug\""
        );
    }
}
