//! A message that any key dismisses.

use super::{NavContext, Screen, Transition};
use crate::tui::terminal::{Key, Surface};
use crate::tui::TuiResult;

pub const ANY_KEY: &str = "Press any key to return...";

#[derive(Debug, Clone)]
pub struct MessageScreen {
    message: String,
}

impl MessageScreen {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Screen for MessageScreen {
    fn name(&self) -> &'static str {
        "message"
    }

    fn draw(&mut self, surface: &mut dyn Surface, ctx: &NavContext) -> TuiResult<()> {
        surface.put(0, 0, &self.message, ctx.theme.error())?;
        surface.put(2, 0, ANY_KEY, ctx.theme.prompt())
    }

    fn handle_key(&mut self, key: Key, _ctx: &NavContext) -> Transition {
        match key {
            Key::Resize => Transition::Stay,
            _ => Transition::Pop(None),
        }
    }
}
