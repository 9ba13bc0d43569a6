//! Process detail: collapsible fact sections plus an action menu.
//!
//! Two input modes. In `Sections`, Up/Down pick a section and Enter/Space
//! collapse it. In `Menu`, Up/Down pick an action and Enter/Space run it.
//! Right switches to the menu, Left back to the sections.

use super::message::MessageScreen;
use super::{ellipsize, AdvancedScreen, NavContext, Screen, Transition};
use crate::collect::{FieldValue, ProcessSnapshot};
use crate::logging::event_names;
use crate::tui::terminal::{Key, Line, Span, Style, Surface};
use crate::tui::theme::Theme;
use crate::tui::TuiResult;
use pscope_common::{Error, ProcessRef};
use tracing::debug;

/// Section titles and the snapshot keys each one shows, in order.
///
/// `status` is only present when the status source was denied.
pub const DETAIL_SECTIONS: [(&str, &[&str]); 7] = [
    (
        "General Info",
        &["status", "Name", "State", "Tgid", "Pid", "PPid", "Uid", "Gid"],
    ),
    ("Memory Usage", &["VmSize", "VmRSS", "VmSwap", "memory"]),
    ("CPU Usage", &["cpu", "uptime"]),
    ("Command Line", &["cmdline"]),
    ("File Descriptors", &["fd_count", "fd_details"]),
    ("I/O Statistics", &["io"]),
    ("Threads", &["Threads"]),
];

/// Action menu entries.
pub const DETAIL_MENU: [&str; 4] = [
    "Refresh information",
    "Monitor stdout (using strace)",
    "Advanced info (memory maps, open files, etc)",
    "Return to main menu",
];

const FOOTER: &str = "Up/Down:move, Left/Right:switch, Space:expand/collapse, q:return";

/// First body row; rows above hold the title and command.
const BODY_TOP: u16 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailMode {
    Sections,
    Menu,
}

/// What a key asks the detail screen to do beyond moving its cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailAction {
    None,
    Refresh,
    Monitor,
    Advanced,
    Return,
}

/// Selection and collapse flags for the detail screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailState {
    mode: DetailMode,
    section: usize,
    menu: usize,
    collapsed: [bool; DETAIL_SECTIONS.len()],
}

impl Default for DetailState {
    fn default() -> Self {
        Self {
            mode: DetailMode::Sections,
            section: 0,
            menu: 0,
            collapsed: [false; DETAIL_SECTIONS.len()],
        }
    }
}

impl DetailState {
    pub fn mode(&self) -> DetailMode {
        self.mode
    }

    pub fn section(&self) -> usize {
        self.section
    }

    pub fn menu(&self) -> usize {
        self.menu
    }

    pub fn is_collapsed(&self, section: usize) -> bool {
        self.collapsed.get(section).copied().unwrap_or(true)
    }

    pub fn up(&mut self) {
        match self.mode {
            DetailMode::Sections => self.section = self.section.saturating_sub(1),
            DetailMode::Menu => self.menu = self.menu.saturating_sub(1),
        }
    }

    pub fn down(&mut self) {
        match self.mode {
            DetailMode::Sections => {
                self.section = (self.section + 1).min(DETAIL_SECTIONS.len() - 1)
            }
            DetailMode::Menu => self.menu = (self.menu + 1).min(DETAIL_MENU.len() - 1),
        }
    }

    pub fn to_menu(&mut self) {
        self.mode = DetailMode::Menu;
    }

    pub fn to_sections(&mut self) {
        self.mode = DetailMode::Sections;
    }

    /// Toggle the selected section, or pick the selected menu action.
    pub fn activate(&mut self) -> DetailAction {
        match self.mode {
            DetailMode::Sections => {
                self.collapsed[self.section] = !self.collapsed[self.section];
                DetailAction::None
            }
            DetailMode::Menu => match self.menu {
                0 => DetailAction::Refresh,
                1 => DetailAction::Monitor,
                2 => DetailAction::Advanced,
                _ => DetailAction::Return,
            },
        }
    }
}

pub struct DetailScreen {
    process: ProcessRef,
    snapshot: ProcessSnapshot,
    state: DetailState,
}

impl DetailScreen {
    pub fn new(process: ProcessRef, snapshot: ProcessSnapshot) -> Self {
        Self {
            process,
            snapshot,
            state: DetailState::default(),
        }
    }

    /// Collect facts for `process` and return the screen to show.
    ///
    /// A vanished process or an error-only snapshot yields a message
    /// screen instead of the detail view.
    pub fn open(process: ProcessRef, ctx: &NavContext) -> Box<dyn Screen> {
        match ctx.collector.collect(&process.pid) {
            Ok(snapshot) if snapshot.is_error_only() => {
                let message = snapshot.error().unwrap_or_default().to_string();
                Box::new(MessageScreen::new(message))
            }
            Ok(snapshot) => Box::new(Self::new(process, snapshot)),
            Err(err) => Box::new(MessageScreen::new(vanished_message(&process.pid, &err))),
        }
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub fn snapshot(&self) -> &ProcessSnapshot {
        &self.snapshot
    }

    /// Body lines and the index of the line holding the cursor.
    fn body(&self, theme: &Theme, width: usize) -> (Vec<Line>, usize) {
        let mut lines = Vec::new();
        let mut focus = 0;

        if let Some(error) = self.snapshot.error() {
            lines.push(vec![Span::new(ellipsize(error, width), theme.error())]);
        }

        for (i, (title, keys)) in DETAIL_SECTIONS.iter().enumerate() {
            let on = self.state.mode == DetailMode::Sections && i == self.state.section;
            if on {
                focus = lines.len();
            }
            let prefix = if self.state.is_collapsed(i) { "[+]" } else { "[-]" };
            let style = if on {
                theme.section(title).reversed()
            } else {
                theme.section(title)
            };
            lines.push(vec![Span::new(format!("{prefix} {title}"), style)]);
            if !self.state.is_collapsed(i) {
                lines.extend(section_lines(&self.snapshot, keys, theme, width));
            }
        }

        lines.push(Vec::new());
        lines.push(vec![Span::new("Options:", theme.title())]);
        for (i, item) in DETAIL_MENU.iter().enumerate() {
            let on = self.state.mode == DetailMode::Menu && i == self.state.menu;
            if on {
                focus = lines.len();
            }
            lines.push(vec![
                Span::new("  ", Style::PLAIN),
                Span::new(*item, theme.prompt().highlighted(on)),
            ]);
        }
        (lines, focus)
    }

    fn refresh(&mut self, ctx: &NavContext) -> Transition {
        match ctx.collector.collect(&self.process.pid) {
            Ok(snapshot) => {
                debug!(event = event_names::COLLECT_FINISHED, pid = %self.process.pid, "detail refreshed");
                self.snapshot = snapshot;
                Transition::Stay
            }
            Err(err) => Transition::Replace(Box::new(MessageScreen::new(vanished_message(
                &self.process.pid,
                &err,
            )))),
        }
    }
}

fn vanished_message(pid: &str, err: &Error) -> String {
    match err {
        Error::ProcessNotFound { .. } => format!("Process {pid} no longer exists"),
        other => format!("Error reading process information: {other}"),
    }
}

/// Lines for one section's keys, skipping keys the snapshot lacks.
pub fn section_lines(
    snapshot: &ProcessSnapshot,
    keys: &[&str],
    theme: &Theme,
    width: usize,
) -> Vec<Line> {
    let mut lines = Vec::new();
    for key in keys {
        let Some(value) = snapshot.get(key) else {
            continue;
        };
        match value {
            FieldValue::Group(entries) => {
                for (name, inner) in entries {
                    lines.push(pair_line(name, &inner.to_string(), theme.value(), theme, width));
                }
            }
            FieldValue::Descriptors(fds) => {
                for (fd, target) in fds {
                    let label = format!("fd {fd}:");
                    let target = ellipsize(target, width.saturating_sub(10));
                    lines.push(vec![
                        Span::new("  ", Style::PLAIN),
                        Span::new(label, theme.list_index()),
                        Span::new(format!(" {target}"), theme.fd_target(&target)),
                    ]);
                }
            }
            other => {
                let text = other.to_string();
                let style = match *key {
                    "State" => theme.process_state(&text),
                    "cmdline" => theme.value(),
                    _ => theme.plain(),
                };
                lines.push(pair_line(key, &text, style, theme, width));
            }
        }
    }
    if lines.is_empty() {
        lines.push(vec![Span::new("  (not available)", theme.plain())]);
    }
    lines
}

fn pair_line(key: &str, value: &str, style: Style, theme: &Theme, width: usize) -> Line {
    let room = width.saturating_sub(key.chars().count() + 5);
    vec![
        Span::new("  ", Style::PLAIN),
        Span::new(format!("{key}:"), theme.label()),
        Span::new(format!(" {}", ellipsize(value, room)), style),
    ]
}

/// Plain-text rendering of a snapshot in detail-screen layout.
pub fn snapshot_report(process: &ProcessRef, snapshot: &ProcessSnapshot) -> String {
    let theme = Theme::no_color();
    let mut out = format!("=== Process Details for PID {} ===\n", process.pid);
    if !process.command.is_empty() {
        out.push_str(&format!("Command: {}\n", process.command));
    }
    if let Some(error) = snapshot.error() {
        out.push_str(error);
        out.push('\n');
    }
    for (title, keys) in DETAIL_SECTIONS {
        out.push_str(&format!("\n{title}\n"));
        for line in section_lines(snapshot, keys, &theme, usize::MAX) {
            let text: String = line.iter().map(|span| span.text.as_str()).collect();
            out.push_str(&text);
            out.push('\n');
        }
    }
    out
}

impl Screen for DetailScreen {
    fn name(&self) -> &'static str {
        "detail"
    }

    fn draw(&mut self, surface: &mut dyn Surface, ctx: &NavContext) -> TuiResult<()> {
        let size = surface.size();
        let theme = &ctx.theme;
        let width = usize::from(size.cols);

        surface.put(
            0,
            0,
            &format!("=== Process Details for PID {} ===", self.process.pid),
            theme.title(),
        )?;
        surface.put(1, 0, "Command: ", theme.label())?;
        if !self.process.command.is_empty() && size.cols > 9 {
            let command = ellipsize(&self.process.command, width.saturating_sub(10));
            surface.put(1, 9, &command, theme.value())?;
        }

        let footer_row = size.rows.saturating_sub(1);
        let visible = usize::from(footer_row.saturating_sub(BODY_TOP));
        let (lines, focus) = self.body(theme, width);
        let offset = if visible == 0 || focus < visible {
            0
        } else {
            focus + 1 - visible
        };
        for (i, line) in lines.iter().skip(offset).take(visible).enumerate() {
            surface.put_line(BODY_TOP + i as u16, 0, line)?;
        }

        if footer_row > BODY_TOP {
            surface.put(footer_row, 0, FOOTER, theme.footer())?;
        }
        Ok(())
    }

    fn handle_key(&mut self, key: Key, ctx: &NavContext) -> Transition {
        let keys = &ctx.bindings;
        if keys.is_back(key) {
            return Transition::Pop(None);
        }
        if keys.is_up(key) {
            self.state.up();
        } else if keys.is_down(key) {
            self.state.down();
        } else if keys.is_right(key) && self.state.mode == DetailMode::Sections {
            self.state.to_menu();
        } else if keys.is_left(key) && self.state.mode == DetailMode::Menu {
            self.state.to_sections();
        } else if keys.is_toggle(key) {
            return match self.state.activate() {
                DetailAction::None => Transition::Stay,
                DetailAction::Refresh => self.refresh(ctx),
                DetailAction::Monitor => Transition::Monitor(self.process.pid.clone()),
                DetailAction::Advanced => {
                    Transition::Push(AdvancedScreen::open(&self.process.pid, ctx))
                }
                DetailAction::Return => Transition::Pop(None),
            };
        }
        Transition::Stay
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::collect::{FactCollector, ProcessListing};
    use crate::test_utils::ProcFixture;
    use crate::tui::terminal::{Color, MemorySurface};

    fn context(fixture: &ProcFixture) -> NavContext {
        NavContext::new(
            Box::new(ProcessListing::default()),
            FactCollector::new(fixture.procfs()),
        )
        .with_theme(Theme::color())
    }

    fn demo_fixture() -> ProcFixture {
        ProcFixture::new()
            .uptime("500.00 0.00")
            .process("42")
            .status("Name:\tdemo\nState:\tS (sleeping)\nPid:\t42\nThreads:\t2\n")
            .cmdline(b"demo\0--serve\0")
            .statm("100 50 10 5 0 20 0")
            .fd_link("0", "/dev/null")
            .fd_link("3", "socket:[777]")
            .done()
    }

    #[test]
    fn test_state_transitions() {
        let mut state = DetailState::default();
        state.up();
        assert_eq!(state.section(), 0);
        for _ in 0..10 {
            state.down();
        }
        assert_eq!(state.section(), DETAIL_SECTIONS.len() - 1);
        assert_eq!(state.activate(), DetailAction::None);
        assert!(state.is_collapsed(DETAIL_SECTIONS.len() - 1));
        assert!(!state.is_collapsed(0));

        state.to_menu();
        state.down();
        assert_eq!(state.activate(), DetailAction::Monitor);
        state.down();
        state.down();
        state.down();
        assert_eq!(state.activate(), DetailAction::Return);
        // Section selection survives the mode switch.
        state.to_sections();
        assert_eq!(state.section(), DETAIL_SECTIONS.len() - 1);
    }

    #[test]
    fn test_open_missing_process_shows_message() {
        let fixture = ProcFixture::new().done();
        let ctx = context(&fixture);
        let mut screen = DetailScreen::open(ProcessRef::new("999", "gone"), &ctx);
        assert_eq!(screen.name(), "message");
        let mut surface = MemorySurface::new(10, 60);
        screen.draw(&mut surface, &ctx).unwrap();
        assert_eq!(surface.row_text(0), "Process 999 no longer exists");
        assert_eq!(surface.row_text(2), "Press any key to return...");
    }

    #[test]
    fn test_draw_sections_and_colours() {
        let fixture = demo_fixture();
        let ctx = context(&fixture);
        let mut screen = DetailScreen::open(ProcessRef::new("42", "demo --serve"), &ctx);
        assert_eq!(screen.name(), "detail");
        let mut surface = MemorySurface::new(60, 100);
        screen.draw(&mut surface, &ctx).unwrap();

        assert_eq!(surface.row_text(0), "=== Process Details for PID 42 ===");
        assert_eq!(surface.row_text(1), "Command: demo --serve");
        assert_eq!(surface.row_text(3), "[-] General Info");
        assert!(surface.style_at(3, 0).unwrap().reverse);

        let state_row = surface.find_row("State: S (sleeping)").unwrap();
        assert_eq!(surface.style_at(state_row, 10).unwrap().fg, Color::Cyan);
        assert!(surface.contains("total_program_size: 400 KB"));
        assert!(surface.contains("cmdline: demo --serve"));
        assert!(surface.contains("fd_count: 2"));

        let socket_row = surface.find_row("fd 3: socket:[777]").unwrap();
        assert_eq!(surface.style_at(socket_row, 9).unwrap().fg, Color::Magenta);
        assert!(surface.contains("Refresh information"));
        assert_eq!(surface.row_text(59), FOOTER);
    }

    #[test]
    fn test_collapse_hides_fields() {
        let fixture = demo_fixture();
        let ctx = context(&fixture);
        let mut screen = DetailScreen::open(ProcessRef::new("42", "demo"), &ctx);
        screen.handle_key(Key::Char(' '), &ctx);
        let mut surface = MemorySurface::new(60, 100);
        screen.draw(&mut surface, &ctx).unwrap();
        assert_eq!(surface.row_text(3), "[+] General Info");
        assert!(!surface.contains("Name: demo"));
        assert!(surface.contains("VmSize") || surface.contains("total_program_size"));
    }

    #[test]
    fn test_menu_actions() {
        let fixture = demo_fixture();
        let ctx = context(&fixture);
        let mut screen = DetailScreen::open(ProcessRef::new("42", "demo"), &ctx);
        assert!(matches!(screen.handle_key(Key::Right, &ctx), Transition::Stay));
        assert!(matches!(screen.handle_key(Key::Enter, &ctx), Transition::Stay));
        screen.handle_key(Key::Down, &ctx);
        assert!(matches!(
            screen.handle_key(Key::Enter, &ctx),
            Transition::Monitor(ref pid) if pid == "42"
        ));
        screen.handle_key(Key::Down, &ctx);
        assert!(matches!(
            screen.handle_key(Key::Char(' '), &ctx),
            Transition::Push(ref s) if s.name() == "advanced"
        ));
        assert!(matches!(screen.handle_key(Key::Esc, &ctx), Transition::Pop(None)));
    }

    #[test]
    fn test_refresh_after_exit_replaces_with_message() {
        let fixture = demo_fixture();
        let ctx = context(&fixture);
        let mut screen = DetailScreen::open(ProcessRef::new("42", "demo"), &ctx);
        fixture.remove_process("42");
        screen.handle_key(Key::Right, &ctx);
        match screen.handle_key(Key::Enter, &ctx) {
            Transition::Replace(next) => assert_eq!(next.name(), "message"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_small_terminal_keeps_focus_visible() {
        let fixture = demo_fixture();
        let ctx = context(&fixture);
        let mut screen = DetailScreen::open(ProcessRef::new("42", "demo"), &ctx);
        screen.handle_key(Key::Right, &ctx);
        screen.handle_key(Key::Down, &ctx);
        screen.handle_key(Key::Down, &ctx);
        screen.handle_key(Key::Down, &ctx);
        let mut surface = MemorySurface::new(10, 80);
        screen.draw(&mut surface, &ctx).unwrap();
        assert!(surface.contains("Return to main menu"));
        assert_eq!(surface.row_text(9), FOOTER);
    }

    #[test]
    fn test_snapshot_report_layout() {
        let fixture = demo_fixture();
        let snapshot = FactCollector::new(fixture.procfs()).collect("42").unwrap();
        let report = snapshot_report(&ProcessRef::new("42", "demo"), &snapshot);
        assert!(report.starts_with("=== Process Details for PID 42 ===\nCommand: demo\n"));
        assert!(report.contains("\nGeneral Info\n  Name: demo\n"));
        assert!(report.contains("  fd 0: /dev/null\n"));
        assert!(report.contains("\nI/O Statistics\n  (not available)\n"));
    }

    #[test]
    fn test_denied_status_shown_in_general_info() {
        let mut snapshot = ProcessSnapshot::new("7");
        snapshot.insert("status", FieldValue::Denied);
        let lines = section_lines(&snapshot, DETAIL_SECTIONS[0].1, &Theme::no_color(), 80);
        let text: Vec<String> = lines
            .iter()
            .map(|line| line.iter().map(|span| span.text.as_str()).collect())
            .collect();
        assert_eq!(text, vec!["  status: (Permission denied)".to_string()]);

        let report = snapshot_report(&ProcessRef::new("7", ""), &snapshot);
        assert!(report.contains("\nGeneral Info\n  status: (Permission denied)\n"));
    }
}
