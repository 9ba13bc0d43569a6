//! Paged process selector with literal search input.

use super::{centered, ellipsize, NavContext, Screen, ScreenResult, Transition};
use crate::collect::search;
use crate::tui::terminal::{Key, Surface};
use crate::tui::TuiResult;
use pscope_common::ProcessRef;

/// Default cap on rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Rows reserved around the list (title, blank, footer, prompt).
const CHROME_ROWS: u16 = 5;

/// Where the command column starts: after `NNNN.` and ` PID: NNNNNN `.
const COMMAND_COL: u16 = 18;

const FOOTER: &str = "Up/Down:move, Left/Right:page, Enter:select, /:search, q:quit";
const SEARCH_LABEL: &str = "Search: ";
const EMPTY: &str = "No processes found matching criteria.";

/// Rows per page for a terminal of `rows` lines.
pub fn page_size_for(cap: usize, rows: u16) -> usize {
    cap.min(usize::from(rows.saturating_sub(CHROME_ROWS))).max(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorMode {
    Browsing,
    /// Typing a search term; keys are taken literally.
    Searching { buffer: String },
}

/// Selector navigation state.
///
/// `page` and `index` address the filtered list; `index` is relative to
/// the page.
#[derive(Debug, Clone)]
pub struct SelectorState {
    all: Vec<ProcessRef>,
    filtered: Vec<ProcessRef>,
    filter: Option<String>,
    page: usize,
    index: usize,
    mode: SelectorMode,
}

impl SelectorState {
    pub fn new(processes: Vec<ProcessRef>) -> Self {
        Self {
            filtered: processes.clone(),
            all: processes,
            filter: None,
            page: 0,
            index: 0,
            mode: SelectorMode::Browsing,
        }
    }

    pub fn filtered(&self) -> &[ProcessRef] {
        &self.filtered
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn mode(&self) -> &SelectorMode {
        &self.mode
    }

    pub fn page_count(&self, page_size: usize) -> usize {
        self.filtered.len().div_ceil(page_size).max(1)
    }

    fn last_page(&self, page_size: usize) -> usize {
        self.filtered.len().saturating_sub(1) / page_size
    }

    fn rows_on_page(&self, page_size: usize) -> usize {
        self.filtered
            .len()
            .saturating_sub(self.page * page_size)
            .min(page_size)
    }

    /// The highlighted process, if the list is not empty.
    pub fn selected(&self, page_size: usize) -> Option<&ProcessRef> {
        self.filtered.get(self.page * page_size + self.index)
    }

    /// Keep `page`/`index` valid after the page size changed.
    pub fn clamp(&mut self, page_size: usize) {
        self.page = self.page.min(self.last_page(page_size));
        self.index = self
            .index
            .min(self.rows_on_page(page_size).saturating_sub(1));
    }

    /// Down one row, continuing onto the next page at the bottom.
    pub fn move_down(&mut self, page_size: usize) {
        if self.filtered.is_empty() {
            return;
        }
        if self.index + 1 < self.rows_on_page(page_size) {
            self.index += 1;
        } else if self.page < self.last_page(page_size) {
            self.page += 1;
            self.index = 0;
        }
    }

    /// Up one row, continuing onto the previous page at the top.
    pub fn move_up(&mut self, page_size: usize) {
        if self.index > 0 {
            self.index -= 1;
        } else if self.page > 0 {
            self.page -= 1;
            self.index = page_size - 1;
        }
    }

    pub fn page_left(&mut self) {
        if self.page > 0 {
            self.page -= 1;
            self.index = 0;
        }
    }

    pub fn page_right(&mut self, page_size: usize) {
        if self.page < self.last_page(page_size) {
            self.page += 1;
            self.index = 0;
        }
    }

    pub fn begin_search(&mut self) {
        self.mode = SelectorMode::Searching {
            buffer: String::new(),
        };
    }

    /// Feed one key to the search prompt. Returns true when input ended.
    ///
    /// Enter applies the buffer, Esc applies an empty term (restoring the
    /// full list). Only printable ASCII is accepted, up to `max_len`.
    pub fn search_key(&mut self, key: Key, max_len: usize) -> bool {
        let SelectorMode::Searching { buffer } = &mut self.mode else {
            return true;
        };
        match key {
            Key::Enter => {
                let term = buffer.trim().to_string();
                self.apply_filter(&term);
                true
            }
            Key::Esc => {
                self.apply_filter("");
                true
            }
            Key::Backspace => {
                buffer.pop();
                false
            }
            Key::Char(c) if (' '..='~').contains(&c) => {
                if buffer.len() < max_len {
                    buffer.push(c);
                }
                false
            }
            _ => false,
        }
    }

    /// Re-filter from the full list. An empty term clears the filter.
    pub fn apply_filter(&mut self, term: &str) {
        if term.is_empty() {
            self.filter = None;
            self.filtered = self.all.clone();
        } else {
            self.filter = Some(term.to_string());
            self.filtered = search(&self.all, term);
        }
        self.page = 0;
        self.index = 0;
        self.mode = SelectorMode::Browsing;
    }
}

pub struct SelectorScreen {
    state: SelectorState,
    page_size: usize,
    prompt_row: u16,
    search_width: usize,
}

impl SelectorScreen {
    pub fn new(processes: Vec<ProcessRef>) -> Self {
        Self {
            state: SelectorState::new(processes),
            page_size: DEFAULT_PAGE_SIZE,
            prompt_row: 0,
            search_width: usize::MAX,
        }
    }

    pub fn state(&self) -> &SelectorState {
        &self.state
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn title(&self) -> String {
        let mut title = format!(
            "=== Process List (Page {}/{}) ===",
            self.state.page + 1,
            self.state.page_count(self.page_size)
        );
        if let Some(term) = &self.state.filter {
            title.push_str(&format!(" [search: {term}]"));
        }
        title
    }
}

impl Screen for SelectorScreen {
    fn name(&self) -> &'static str {
        "selector"
    }

    fn draw(&mut self, surface: &mut dyn Surface, ctx: &NavContext) -> TuiResult<()> {
        let size = surface.size();
        let theme = &ctx.theme;
        self.page_size = page_size_for(ctx.page_size, size.rows);
        self.state.clamp(self.page_size);
        self.search_width = usize::from(size.cols.saturating_sub(10));

        let title = self.title();
        surface.put(0, centered(size.cols, &title), &title, theme.title())?;

        let ps = self.page_size;
        let start = self.state.page * ps;
        if self.state.filtered.is_empty() {
            surface.put(2, 0, EMPTY, theme.error())?;
        } else {
            let end = (start + ps).min(self.state.filtered.len());
            let command_width = usize::from(size.cols.saturating_sub(COMMAND_COL + 2));
            for (offset, process) in self.state.filtered[start..end].iter().enumerate() {
                let row = offset as u16 + 2;
                let on = offset == self.state.index;
                surface.put(
                    row,
                    0,
                    &format!("{:4}.", start + offset + 1),
                    theme.list_index().highlighted(on),
                )?;
                surface.put(
                    row,
                    5,
                    &format!(" PID: {:>6} ", process.pid),
                    theme.list_pid().highlighted(on),
                )?;
                let command = if process.command.chars().count() > command_width {
                    ellipsize(&process.command, command_width)
                } else {
                    process.command.clone()
                };
                surface.put(
                    row,
                    COMMAND_COL,
                    &format!("| {command}"),
                    theme.list_command().highlighted(on),
                )?;
            }
        }

        let footer_row = ps as u16 + 3;
        if size.rows > footer_row {
            surface.put(footer_row, 0, FOOTER, theme.prompt())?;
        }

        self.prompt_row = (size.rows.saturating_sub(1)).min(ps as u16 + 5);
        if let SelectorMode::Searching { buffer } = &self.state.mode {
            surface.put(self.prompt_row, 0, SEARCH_LABEL, theme.prompt())?;
            if !buffer.is_empty() {
                surface.put(self.prompt_row, SEARCH_LABEL.len() as u16, buffer, theme.plain())?;
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: Key, ctx: &NavContext) -> Transition {
        if matches!(self.state.mode, SelectorMode::Searching { .. }) {
            self.state.search_key(key, self.search_width);
            return Transition::Stay;
        }

        let keys = &ctx.bindings;
        let ps = self.page_size;
        if keys.is_up(key) {
            self.state.move_up(ps);
        } else if keys.is_down(key) {
            self.state.move_down(ps);
        } else if keys.is_left(key) {
            self.state.page_left();
        } else if keys.is_right(key) {
            self.state.page_right(ps);
        } else if keys.is_search(key) {
            self.state.begin_search();
        } else if keys.is_back(key) {
            return Transition::Pop(None);
        } else if keys.is_confirm(key) {
            if let Some(process) = self.state.selected(ps) {
                return Transition::Pop(Some(ScreenResult::Selected(process.clone())));
            }
        }
        Transition::Stay
    }

    fn cursor(&self) -> Option<(u16, u16)> {
        match &self.state.mode {
            SelectorMode::Searching { buffer } => Some((
                self.prompt_row,
                (SEARCH_LABEL.len() + buffer.len()) as u16,
            )),
            SelectorMode::Browsing => None,
        }
    }
}
