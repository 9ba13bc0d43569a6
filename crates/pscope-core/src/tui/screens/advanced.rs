//! Advanced info: the five resolver categories as collapsible sections.
//!
//! Content is resolved once when the screen opens and held for its
//! lifetime. Only the selected section scrolls; moving the selection or
//! toggling a section resets the offset to zero.

use super::message::MessageScreen;
use super::{centered, NavContext, Screen, Transition};
use crate::collect::{resolve, SectionCategory};
use crate::tui::terminal::{Key, Line, Span, Surface};
use crate::tui::theme::Theme;
use crate::tui::TuiResult;

const FOOTER: &str = "Up/Down:move, Space:expand/collapse, PgUp/PgDn:scroll, q:return";

/// Lines moved by one PgUp/PgDn.
pub const SCROLL_STEP: usize = 5;

/// First row used by sections.
const SECTIONS_TOP: u16 = 2;

/// Selection, collapse flags and the single scroll offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvancedState {
    selected: usize,
    collapsed: Vec<bool>,
    scroll: usize,
}

impl AdvancedState {
    /// State for `sections` sections, all expanded.
    pub fn new(sections: usize) -> Self {
        Self {
            selected: 0,
            collapsed: vec![false; sections],
            scroll: 0,
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn is_collapsed(&self, section: usize) -> bool {
        self.collapsed.get(section).copied().unwrap_or(true)
    }

    /// Scroll offset of `section`; zero unless it is the selected one.
    pub fn scroll_offset(&self, section: usize) -> usize {
        if section == self.selected {
            self.scroll
        } else {
            0
        }
    }

    pub fn up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll = 0;
        }
    }

    pub fn down(&mut self) {
        if self.selected + 1 < self.collapsed.len() {
            self.selected += 1;
            self.scroll = 0;
        }
    }

    pub fn toggle(&mut self) {
        if let Some(flag) = self.collapsed.get_mut(self.selected) {
            *flag = !*flag;
            self.scroll = 0;
        }
    }

    /// Scroll the selected section forward; `len` is its line count.
    pub fn page_down(&mut self, len: usize) {
        if !self.is_collapsed(self.selected) {
            self.scroll = (self.scroll + SCROLL_STEP).min(len.saturating_sub(1));
        }
    }

    pub fn page_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(SCROLL_STEP);
    }
}

pub struct AdvancedScreen {
    pid: String,
    sections: Vec<(SectionCategory, Vec<String>)>,
    state: AdvancedState,
}

impl AdvancedScreen {
    pub fn new(pid: impl Into<String>, sections: Vec<(SectionCategory, Vec<String>)>) -> Self {
        let state = AdvancedState::new(sections.len());
        Self {
            pid: pid.into(),
            sections,
            state,
        }
    }

    /// Resolve every category for `pid`, or explain that it is gone.
    pub fn open(pid: &str, ctx: &NavContext) -> Box<dyn Screen> {
        let procfs = ctx.collector.procfs();
        if !procfs.exists(pid) {
            return Box::new(MessageScreen::new(format!(
                "Process {pid} no longer exists."
            )));
        }
        let sections = SectionCategory::ALL
            .into_iter()
            .map(|category| (category, resolve(procfs, pid, category)))
            .collect();
        Box::new(Self::new(pid, sections))
    }

    pub fn state(&self) -> &AdvancedState {
        &self.state
    }

    fn selected_len(&self) -> usize {
        self.sections
            .get(self.state.selected)
            .map_or(0, |(_, lines)| lines.len())
    }
}

fn content_line(theme: &Theme, category: SectionCategory, line: &str) -> Line {
    match category {
        SectionCategory::Maps => theme.maps_line(line),
        SectionCategory::Fd => theme.fd_line(line),
        SectionCategory::Limits => theme.limits_line(line),
        SectionCategory::Cwd | SectionCategory::Exe => vec![Span::new(line, theme.value())],
    }
}

fn more_marker(scroll: usize, shown: usize, len: usize) -> Option<&'static str> {
    let above = scroll > 0;
    let below = scroll + shown < len;
    match (above, below) {
        (true, true) => Some("↕ more ↕"),
        (true, false) => Some("↑ more ↑"),
        (false, true) => Some("↓ more ↓"),
        (false, false) => None,
    }
}

impl Screen for AdvancedScreen {
    fn name(&self) -> &'static str {
        "advanced"
    }

    fn draw(&mut self, surface: &mut dyn Surface, ctx: &NavContext) -> TuiResult<()> {
        let size = surface.size();
        let theme = &ctx.theme;
        let title = format!("=== Advanced Info for PID {} ===", self.pid);
        surface.put(0, centered(size.cols, &title), &title, theme.title())?;

        let bottom = size.rows.saturating_sub(2);
        let mut row = SECTIONS_TOP;
        for (i, (category, lines)) in self.sections.iter().enumerate() {
            if row >= bottom {
                break;
            }
            let prefix = if self.state.is_collapsed(i) { "[+]" } else { "[-]" };
            let header = format!("{prefix} {}", category.title());
            let style = if i == self.state.selected {
                theme.marker().reversed()
            } else {
                theme.marker().bold()
            };
            surface.put(row, 0, &header, style)?;
            row += 1;

            if self.state.is_collapsed(i) {
                row += 1;
                continue;
            }

            let scroll = self.state.scroll_offset(i).min(lines.len());
            let room = usize::from(bottom.saturating_sub(row));
            let shown = (lines.len() - scroll).min(room);
            if shown == 0 {
                continue;
            }
            for line in &lines[scroll..scroll + shown] {
                surface.put_line(row, 2, &content_line(theme, *category, line))?;
                row += 1;
            }
            if let Some(marker) = more_marker(scroll, shown, lines.len()) {
                if row < size.rows {
                    surface.put(row, size.cols.saturating_sub(10), marker, theme.marker())?;
                }
                row += 1;
            }
            row += 1;
        }

        if size.rows > row + 1 {
            surface.put(size.rows - 1, 0, FOOTER, theme.footer())?;
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
        } else if keys.is_toggle(key) {
            self.state.toggle();
        } else if keys.is_page_down(key) {
            let len = self.selected_len();
            self.state.page_down(len);
        } else if keys.is_page_up(key) {
            self.state.page_up();
        }
        Transition::Stay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::{FactCollector, ProcessListing};
    use crate::tui::terminal::{Color, MemorySurface};

    fn numbered(prefix: &str, count: usize) -> Vec<String> {
        (0..count).map(|i| format!("{prefix} {i}")).collect()
    }

    fn screen() -> AdvancedScreen {
        AdvancedScreen::new(
            "7",
            vec![
                (SectionCategory::Maps, numbered("map", 30)),
                (SectionCategory::Fd, vec!["fd 0: /dev/null".into(), "fd 1: pipe:[5]".into()]),
                (SectionCategory::Cwd, vec!["/srv".into()]),
                (SectionCategory::Exe, vec!["/usr/bin/demo".into()]),
                (SectionCategory::Limits, numbered("limit", 3)),
            ],
        )
    }

    fn context() -> NavContext {
        NavContext::new(
            Box::new(ProcessListing::default()),
            FactCollector::new(crate::collect::ProcFs::new("/nonexistent-proc-root")),
        )
        .with_theme(Theme::color())
    }

    #[test]
    fn test_scroll_clamps_and_resets() {
        let mut state = AdvancedState::new(5);
        state.page_down(12);
        state.page_down(12);
        assert_eq!(state.scroll_offset(0), 10);
        state.page_down(12);
        assert_eq!(state.scroll_offset(0), 11);
        state.page_up();
        assert_eq!(state.scroll_offset(0), 6);
        state.down();
        assert_eq!(state.scroll_offset(1), 0);
        state.page_down(3);
        assert_eq!(state.scroll_offset(1), 2);
        state.toggle();
        assert_eq!(state.scroll_offset(1), 0);
        assert!(state.is_collapsed(1));
        // Collapsed sections do not scroll.
        state.page_down(3);
        assert_eq!(state.scroll_offset(1), 0);
    }

    #[test]
    fn test_scrolling_selected_leaves_others_alone() {
        let mut state = AdvancedState::new(5);
        state.down();
        state.toggle();
        state.up();
        let before: Vec<bool> = (0..5).map(|i| state.is_collapsed(i)).collect();
        state.page_down(30);
        state.page_down(30);
        let after: Vec<bool> = (0..5).map(|i| state.is_collapsed(i)).collect();
        assert_eq!(before, after);
        for i in 1..5 {
            assert_eq!(state.scroll_offset(i), 0);
        }
        assert_eq!(state.scroll_offset(0), 10);
    }

    #[test]
    fn test_up_at_top_keeps_scroll() {
        let mut state = AdvancedState::new(2);
        state.page_down(20);
        state.up();
        assert_eq!(state.scroll_offset(0), 5);
    }

    #[test]
    fn test_draw_layout_and_markers() {
        let ctx = context();
        let mut screen = screen();
        let mut surface = MemorySurface::new(20, 60);
        screen.draw(&mut surface, &ctx).unwrap();

        assert_eq!(surface.row_text(0).trim(), "=== Advanced Info for PID 7 ===");
        assert_eq!(surface.row_text(2), "[-] Memory Maps");
        assert!(surface.style_at(2, 0).unwrap().reverse);
        // Rows 3..=17 hold map lines, then the marker shares no room: sections stop at h-2.
        assert_eq!(surface.row_text(3), "  map 0");
        assert_eq!(surface.row_text(17), "  map 14");
        assert!(surface.row_text(18).contains("↓ more ↓"));
        assert!(!surface.contains("Open Files/Sockets"));
    }

    #[test]
    fn test_scrolled_marker_and_footer() {
        let ctx = context();
        let mut screen = screen();
        screen.handle_key(Key::PageDown, &ctx);
        let mut surface = MemorySurface::new(60, 60);
        screen.draw(&mut surface, &ctx).unwrap();
        assert_eq!(surface.row_text(3), "  map 5");
        let marker_row = surface.find_row("↑ more ↑").unwrap();
        assert_eq!(marker_row, 3 + 25);
        assert!(surface.contains("[-] Open Files/Sockets"));
        let fd_row = surface.find_row("fd 1: pipe:[5]").unwrap();
        assert_eq!(surface.style_at(fd_row, 2).unwrap().fg, Color::Cyan);
        assert_eq!(surface.style_at(fd_row, 7).unwrap().fg, Color::Yellow);
        assert_eq!(surface.row_text(59), FOOTER);
    }

    #[test]
    fn test_collapse_and_back() {
        let ctx = context();
        let mut screen = screen();
        assert!(matches!(screen.handle_key(Key::Char(' '), &ctx), Transition::Stay));
        let mut surface = MemorySurface::new(30, 60);
        screen.draw(&mut surface, &ctx).unwrap();
        assert_eq!(surface.row_text(2), "[+] Memory Maps");
        assert_eq!(surface.row_text(4), "[-] Open Files/Sockets");
        assert!(matches!(screen.handle_key(Key::Char('q'), &ctx), Transition::Pop(None)));
    }

    #[test]
    fn test_open_missing_process() {
        let ctx = context();
        let screen = AdvancedScreen::open("123", &ctx);
        assert_eq!(screen.name(), "message");
    }
}
