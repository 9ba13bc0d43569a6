//! Navigation engine screens.
//!
//! Each screen is its own state machine over keys. The engine keeps them
//! on a stack; only the top one draws and receives input. A screen asks
//! for changes to the stack by returning a [`Transition`], and learns what
//! a child produced through [`Screen::on_child_result`].
//!
//! Screen state never outlives the screen: popping drops it.

pub mod advanced;
pub mod detail;
pub mod main_menu;
pub mod message;
pub mod selector;

pub use advanced::{AdvancedScreen, AdvancedState};
pub use detail::{DetailMode, DetailScreen, DetailState};
pub use main_menu::MainMenu;
pub use message::MessageScreen;
pub use selector::{SelectorMode, SelectorScreen, SelectorState};

use super::events::KeyBindings;
use super::terminal::{Key, Surface};
use super::theme::Theme;
use super::TuiResult;
use crate::collect::{FactCollector, ProcessSource};
use crate::monitor::MonitorConfig;
use pscope_common::ProcessRef;

/// Everything screens share. Read-only while screens run.
pub struct NavContext {
    pub source: Box<dyn ProcessSource>,
    pub collector: FactCollector,
    pub monitor: MonitorConfig,
    /// Upper bound on selector rows per page.
    pub page_size: usize,
    pub theme: Theme,
    pub bindings: KeyBindings,
}

impl NavContext {
    pub fn new(source: Box<dyn ProcessSource>, collector: FactCollector) -> Self {
        Self {
            source,
            collector,
            monitor: MonitorConfig::default(),
            page_size: selector::DEFAULT_PAGE_SIZE,
            theme: Theme::default(),
            bindings: KeyBindings::default(),
        }
    }

    pub fn with_monitor(mut self, monitor: MonitorConfig) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }
}

/// What a child screen hands back to its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenResult {
    Selected(ProcessRef),
}

/// Requested change to the screen stack.
pub enum Transition {
    Stay,
    Push(Box<dyn Screen>),
    /// Pop this screen and push another in its place.
    Replace(Box<dyn Screen>),
    Pop(Option<ScreenResult>),
    /// Suspend the stack and run a monitor session on this pid.
    Monitor(String),
    /// Unwind the whole stack.
    Exit,
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Stay => f.write_str("Stay"),
            Transition::Push(screen) => write!(f, "Push({})", screen.name()),
            Transition::Replace(screen) => write!(f, "Replace({})", screen.name()),
            Transition::Pop(result) => write!(f, "Pop({result:?})"),
            Transition::Monitor(pid) => write!(f, "Monitor({pid})"),
            Transition::Exit => f.write_str("Exit"),
        }
    }
}

pub trait Screen {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn draw(&mut self, surface: &mut dyn Surface, ctx: &NavContext) -> TuiResult<()>;

    fn handle_key(&mut self, key: Key, ctx: &NavContext) -> Transition;

    fn on_child_result(&mut self, _result: ScreenResult, _ctx: &NavContext) -> Transition {
        Transition::Stay
    }

    /// Where the text cursor belongs while this screen takes typed input.
    fn cursor(&self) -> Option<(u16, u16)> {
        None
    }
}

/// Column that centres `text` on a `width`-wide row.
pub(crate) fn centered(width: u16, text: &str) -> u16 {
    let len = text.chars().count() as u16;
    width.saturating_sub(len) / 2
}

/// `text` cut to `max` characters, with `...` marking the cut.
pub(crate) fn ellipsize(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
