//! Live output monitoring.
//!
//! Attaches a syscall tracer to a running process, relays what the process
//! writes to its standard output, and forwards operator lines to its
//! standard input.

pub mod session;
pub mod trace_parser;
pub mod tracer;

pub use session::{
    MonitorConfig, MonitorError, MonitorReport, MonitorSession, MonitorState, OperatorConsole,
    OperatorInput, DEFAULT_POLL_INTERVAL, DEFAULT_TRACER_GRACE,
};
pub use trace_parser::{decode_payload, parse_line, StatusKind, TraceEvent};
pub use tracer::{Tracer, TracerCommand, DEFAULT_TRACER};
