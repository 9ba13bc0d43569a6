//! Structured logging foundation for pscope.
//!
//! Provides dual-mode logging:
//! - Human-readable output for people tailing a log
//! - Machine-parseable JSONL for tooling
//!
//! # Usage
//!
//! ```ignore
//! use pscope_core::logging::{init_logging, LogConfig, event_names};
//!
//! let config = LogConfig::from_env(None, None);
//! init_logging(&config)?;
//! tracing::info!(event = event_names::RUN_STARTED, "starting");
//! ```
//!
//! # Design Notes
//!
//! - stdout is reserved for command payloads (`list`, `show`, `sections`)
//! - one-shot commands log to stderr
//! - while the terminal is owned by the UI or the monitor, logs go to a
//!   file or are discarded

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogDestination, LogFormat, LogLevel};
pub use events::{event_names, Level, Stage};
pub use layer::JsonlLayer;

use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging subsystem.
///
/// Call once at startup. A second call is a no-op. Fails only when the
/// configured log file cannot be opened.
pub fn init_logging(config: &LogConfig) -> std::io::Result<()> {
    let level: LevelFilter = config.level.into();
    let filter = EnvFilter::default().add_directive(level.into());

    match &config.destination {
        LogDestination::Off => {
            let _ = tracing_subscriber::registry()
                .with(EnvFilter::default().add_directive(LevelFilter::OFF.into()))
                .try_init();
        }
        LogDestination::Stderr => match config.format {
            LogFormat::Human => {
                let use_ansi = std::io::stderr().is_terminal();
                let fmt_layer = fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_ansi(use_ansi);
                if config.timestamps {
                    let _ = tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt_layer)
                        .try_init();
                } else {
                    let _ = tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt_layer.without_time())
                        .try_init();
                }
            }
            LogFormat::Jsonl => {
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(JsonlLayer::stderr())
                    .try_init();
            }
        },
        LogDestination::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            match config.format {
                LogFormat::Human => {
                    let fmt_layer = fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_target(false)
                        .with_ansi(false);
                    let _ = tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt_layer)
                        .try_init();
                }
                LogFormat::Jsonl => {
                    let _ = tracing_subscriber::registry()
                        .with(filter)
                        .with(JsonlLayer::new(file))
                        .try_init();
                }
            }
        }
    }
    Ok(())
}

/// Truncate a potentially long string (command lines, payloads) for logging.
pub fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let head: String = s.chars().take(max_len).collect();
    format!("{head}...(truncated)")
}
