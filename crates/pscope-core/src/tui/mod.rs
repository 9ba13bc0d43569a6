//! Interactive navigation engine.
//!
//! A stack of modal screens drawn on a [`Surface`]:
//! main menu, process selector, process detail, advanced info. The engine
//! owns the stack and the draw/read/dispatch loop; each screen owns its own
//! selection, scroll and collapse state.
//!
//! # Module Structure
//!
//! - `terminal`: the drawing surface, key model and the monitor console
//! - `screens`: the screen state machines and their shared context
//! - `theme`: colour roles
//! - `events`: key bindings

pub mod events;
pub mod screens;
pub mod terminal;
pub mod theme;

pub use events::KeyBindings;
pub use screens::{MainMenu, NavContext, Screen, ScreenResult, Transition};
pub use terminal::{CrosstermSurface, Key, MemorySurface, Surface, SurfaceConsole};
pub use theme::{Theme, ThemeMode};

use crate::logging::{event_names, Stage};
use crate::monitor::MonitorSession;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

/// Errors that can occur in the TUI module.
#[derive(Error, Debug)]
pub enum TuiError {
    /// Failed to initialize terminal.
    #[error("terminal initialization failed: {0}")]
    TerminalInit(String),

    /// Failed to restore terminal state.
    #[error("terminal restoration failed: {0}")]
    TerminalRestore(String),

    /// Text did not fit the current terminal.
    #[error("render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for TUI operations.
pub type TuiResult<T> = Result<T, TuiError>;

impl From<TuiError> for pscope_common::Error {
    fn from(err: TuiError) -> Self {
        match err {
            TuiError::Io(e) => pscope_common::Error::Io(e),
            other => pscope_common::Error::RenderFailure(other.to_string()),
        }
    }
}

/// Run the navigation engine until the user exits.
///
/// Render failures are logged and the frame is dropped; the loop keeps
/// going. Terminal I/O failures end the run.
pub fn run_tui(surface: &mut dyn Surface, ctx: &NavContext) -> TuiResult<()> {
    let span = info_span!("ui", stage = %Stage::Ui);
    let _guard = span.enter();
    info!(event = event_names::UI_STARTED, "navigation started");

    let mut stack: Vec<Box<dyn Screen>> = vec![Box::new(MainMenu::new())];
    surface.set_cursor_visible(false)?;
    surface.set_echo(false);

    while let Some(top) = stack.last_mut() {
        draw_frame(surface, top.as_mut(), ctx)?;
        let key = surface.read_key()?;
        if ctx.bindings.is_quit(key) {
            break;
        }
        let transition = top.handle_key(key, ctx);
        if !apply(&mut stack, transition, surface, ctx)? {
            break;
        }
    }

    surface.set_echo(true);
    surface.set_cursor_visible(true)?;
    info!(event = event_names::UI_FINISHED, "navigation finished");
    Ok(())
}

fn draw_frame(surface: &mut dyn Surface, screen: &mut dyn Screen, ctx: &NavContext) -> TuiResult<()> {
    surface.clear()?;
    match screen.draw(surface, ctx) {
        Ok(()) => {}
        Err(TuiError::Render(reason)) => {
            warn!(
                event = event_names::UI_RENDER_FAILED,
                screen = screen.name(),
                reason = %reason,
                "frame dropped"
            );
            surface.clear()?;
        }
        Err(other) => return Err(other),
    }

    match screen.cursor() {
        Some((row, col)) => {
            surface.set_echo(true);
            surface.set_cursor_visible(true)?;
            surface.move_cursor(row, col)?;
        }
        None => {
            surface.set_echo(false);
            surface.set_cursor_visible(false)?;
        }
    }
    surface.present()?;
    Ok(())
}

/// Apply a transition to the stack. Returns false when the engine should stop.
fn apply(
    stack: &mut Vec<Box<dyn Screen>>,
    mut transition: Transition,
    surface: &mut dyn Surface,
    ctx: &NavContext,
) -> TuiResult<bool> {
    loop {
        match transition {
            Transition::Stay => return Ok(true),
            Transition::Push(screen) => {
                debug!(event = event_names::UI_SCREEN_PUSHED, screen = screen.name());
                stack.push(screen);
                return Ok(true);
            }
            Transition::Replace(screen) => {
                if let Some(old) = stack.pop() {
                    debug!(event = event_names::UI_SCREEN_POPPED, screen = old.name());
                }
                debug!(event = event_names::UI_SCREEN_PUSHED, screen = screen.name());
                stack.push(screen);
                return Ok(true);
            }
            Transition::Pop(result) => {
                if let Some(old) = stack.pop() {
                    debug!(event = event_names::UI_SCREEN_POPPED, screen = old.name());
                }
                let Some(parent) = stack.last_mut() else {
                    return Ok(false);
                };
                match result {
                    Some(result) => transition = parent.on_child_result(result, ctx),
                    None => return Ok(true),
                }
            }
            Transition::Monitor(pid) => {
                run_monitor(surface, ctx, &pid)?;
                return Ok(true);
            }
            Transition::Exit => return Ok(false),
        }
    }
}

/// Hand the terminal to a monitor session, then take it back.
fn run_monitor(surface: &mut dyn Surface, ctx: &NavContext, pid: &str) -> TuiResult<()> {
    surface.clear()?;
    surface.present()?;
    surface.set_cursor_visible(true)?;
    surface.set_echo(true);

    let report = {
        let mut console = SurfaceConsole::new(&mut *surface);
        MonitorSession::new(ctx.collector.procfs(), pid, ctx.monitor.clone()).run(&mut console)
    };
    debug!(
        pid,
        state = %report.final_state,
        payload_bytes = report.payload_bytes,
        "monitor returned to navigation"
    );

    surface.set_echo(false);
    surface.set_cursor_visible(false)?;
    surface.clear()?;
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::collect::{FactCollector, ProcessListing};
    use crate::monitor::MonitorConfig;
    use crate::test_utils::ProcFixture;
    use pscope_common::ProcessRef;
    use std::time::Duration;

    fn fixture() -> ProcFixture {
        ProcFixture::new()
            .uptime("100.0 0.0")
            .process("42")
            .status("Name:\tdemo\nState:\tR (running)\n")
            .cmdline(b"demo\0")
            .done()
    }

    fn context(fixture: &ProcFixture) -> NavContext {
        let listing = ProcessListing {
            processes: vec![ProcessRef::new("42", "demo"), ProcessRef::new("43", "other")],
            diagnostic: None,
        };
        NavContext::new(Box::new(listing), FactCollector::new(fixture.procfs()))
    }

    #[test]
    fn test_menu_to_detail_and_back() {
        let fixture = fixture();
        let ctx = context(&fixture);
        let mut surface = MemorySurface::new(40, 100).with_keys([
            Key::Enter,
            Key::Enter,
            Key::Char('q'),
            Key::Down,
            Key::Enter,
        ]);
        crate::assert_ok!(run_tui(&mut surface, &ctx));
        assert_eq!(surface.pending_keys(), 0);
        assert!(surface.presents() >= 4);
        // The last frame drawn is the main menu with Exit selected.
        assert!(surface.contains("Process Inspector"));
    }

    #[test]
    fn test_detail_frame_drawn() {
        let fixture = fixture();
        let ctx = context(&fixture);
        // Detail is on top when the queue runs dry; the last frame shows it.
        let mut surface = MemorySurface::new(40, 100).with_keys([Key::Enter, Key::Enter]);
        let err = run_tui(&mut surface, &ctx).unwrap_err();
        assert!(matches!(err, TuiError::Io(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof));
        assert!(surface.contains("=== Process Details for PID 42 ==="));
        assert!(surface.contains("Name: demo"));
    }

    #[test]
    fn test_vanished_selection_shows_message() {
        let fixture = fixture();
        let ctx = context(&fixture);
        let mut surface =
            MemorySurface::new(40, 100).with_keys([Key::Enter, Key::Down, Key::Enter]);
        let _ = run_tui(&mut surface, &ctx);
        assert!(surface.contains("Process 43 no longer exists"));
        assert!(surface.contains("Press any key to return..."));
    }

    #[test]
    fn test_ctrl_c_quits_from_any_depth() {
        let fixture = fixture();
        let ctx = context(&fixture);
        let mut surface =
            MemorySurface::new(40, 100).with_keys([Key::Enter, Key::Enter, Key::CtrlC, Key::Enter]);
        crate::assert_ok!(run_tui(&mut surface, &ctx));
        assert_eq!(surface.pending_keys(), 1);
        assert!(surface.cursor_visible());
    }

    #[test]
    fn test_tiny_terminal_keeps_running() {
        let fixture = fixture();
        let ctx = context(&fixture);
        let mut surface = MemorySurface::new(1, 5).with_keys([Key::Down, Key::Enter]);
        crate::assert_ok!(run_tui(&mut surface, &ctx));
        assert_eq!(surface.presents(), 2);
    }

    #[test]
    fn test_monitor_failure_returns_to_detail() {
        let fixture = fixture();
        let ctx = context(&fixture).with_monitor(MonitorConfig {
            tracer: crate::monitor::TracerCommand::new("pscope-no-such-tracer"),
            poll_interval: Duration::from_millis(20),
            grace: Duration::from_millis(200),
        });
        let mut surface = MemorySurface::new(40, 100).with_keys([
            Key::Enter,
            Key::Enter,
            Key::Right,
            Key::Down,
            Key::Enter,
            // acknowledges the failure prompt
            Key::Enter,
            Key::Char('q'),
            Key::Char('q'),
        ]);
        crate::assert_ok!(run_tui(&mut surface, &ctx));
        let stream = surface.stream_text();
        assert!(stream.contains("Error: pscope-no-such-tracer is not installed"));
        assert!(stream.contains("Press Enter to continue..."));
    }

    #[test]
    fn test_error_conversion() {
        let err: pscope_common::Error = TuiError::Render("row 99".into()).into();
        assert!(matches!(err, pscope_common::Error::RenderFailure(_)));
    }
}
