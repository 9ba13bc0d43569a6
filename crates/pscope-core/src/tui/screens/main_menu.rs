//! Top-level menu: browse processes or exit.

use super::{centered, DetailScreen, NavContext, Screen, ScreenResult, SelectorScreen, Transition};
use crate::tui::terminal::{Key, Surface};
use crate::tui::TuiResult;

const TITLE: &str = "=== Process Inspector (TUI mode) ===";
const FOOTER: &str = "Use Up/Down to move, Enter to select";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Processes,
    Exit,
}

impl MenuItem {
    const ALL: [MenuItem; 2] = [MenuItem::Processes, MenuItem::Exit];

    fn label(self) -> &'static str {
        match self {
            MenuItem::Processes => "Processes",
            MenuItem::Exit => "Exit",
        }
    }
}

#[derive(Debug, Default)]
pub struct MainMenu {
    selected: usize,
    /// Why the last listing came back empty or partial.
    diagnostic: Option<String>,
}

impl MainMenu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }
}

impl Screen for MainMenu {
    fn name(&self) -> &'static str {
        "main_menu"
    }

    fn draw(&mut self, surface: &mut dyn Surface, ctx: &NavContext) -> TuiResult<()> {
        let size = surface.size();
        let theme = &ctx.theme;

        surface.put(1, centered(size.cols, TITLE), TITLE, theme.title())?;

        if let Some(diagnostic) = &self.diagnostic {
            if size.rows > 3 {
                surface.put(3, 0, diagnostic, theme.error())?;
            }
        }

        let count = MenuItem::ALL.len() as i32;
        for (i, item) in MenuItem::ALL.iter().enumerate() {
            let row = i32::from(size.rows) / 2 - count / 2 + i as i32;
            if row < 0 || row >= i32::from(size.rows) {
                continue;
            }
            let label = item.label();
            let style = theme.menu_item().highlighted(i == self.selected);
            surface.put(row as u16, centered(size.cols, label), label, style)?;
        }

        if size.rows > 4 {
            surface.put(size.rows - 2, centered(size.cols, FOOTER), FOOTER, theme.footer())?;
        }
        Ok(())
    }

    fn handle_key(&mut self, key: Key, ctx: &NavContext) -> Transition {
        let keys = &ctx.bindings;
        if keys.is_up(key) {
            self.selected = self.selected.saturating_sub(1);
        } else if keys.is_down(key) {
            self.selected = (self.selected + 1).min(MenuItem::ALL.len() - 1);
        } else if keys.is_confirm(key) {
            return match MenuItem::ALL[self.selected] {
                MenuItem::Processes => {
                    let listing = ctx.source.list();
                    self.diagnostic = listing.diagnostic;
                    Transition::Push(Box::new(SelectorScreen::new(listing.processes)))
                }
                MenuItem::Exit => Transition::Exit,
            };
        } else if keys.is_back(key) {
            return Transition::Exit;
        }
        Transition::Stay
    }

    fn on_child_result(&mut self, result: ScreenResult, ctx: &NavContext) -> Transition {
        match result {
            ScreenResult::Selected(process) => Transition::Push(DetailScreen::open(process, ctx)),
        }
    }
}
