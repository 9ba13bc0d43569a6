//! Key bindings shared by every screen.
//!
//! Arrow keys have vi-style aliases (`h`/`j`/`k`/`l`). `q` and Esc leave
//! the current screen; Ctrl+C leaves the application.

use super::terminal::Key;

/// Configurable key bindings for screen navigation.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    /// Leave the current screen.
    pub back: Vec<Key>,
    /// Leave the application from any screen.
    pub quit: Vec<Key>,
    /// Confirm the highlighted item.
    pub confirm: Vec<Key>,
    /// Expand or collapse, or activate in menus.
    pub toggle: Vec<Key>,
    /// Enter search input.
    pub search: Vec<Key>,
    pub up: Vec<Key>,
    pub down: Vec<Key>,
    pub left: Vec<Key>,
    pub right: Vec<Key>,
    pub page_up: Vec<Key>,
    pub page_down: Vec<Key>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            back: vec![Key::Char('q'), Key::Esc],
            quit: vec![Key::CtrlC],
            confirm: vec![Key::Enter],
            toggle: vec![Key::Enter, Key::Char(' ')],
            search: vec![Key::Char('/'), Key::Char('f')],
            up: vec![Key::Up, Key::Char('k')],
            down: vec![Key::Down, Key::Char('j')],
            left: vec![Key::Left, Key::Char('h')],
            right: vec![Key::Right, Key::Char('l')],
            page_up: vec![Key::PageUp],
            page_down: vec![Key::PageDown],
        }
    }
}

impl KeyBindings {
    pub fn is_back(&self, key: Key) -> bool {
        self.back.contains(&key)
    }

    pub fn is_quit(&self, key: Key) -> bool {
        self.quit.contains(&key)
    }

    pub fn is_confirm(&self, key: Key) -> bool {
        self.confirm.contains(&key)
    }

    pub fn is_toggle(&self, key: Key) -> bool {
        self.toggle.contains(&key)
    }

    pub fn is_search(&self, key: Key) -> bool {
        self.search.contains(&key)
    }

    pub fn is_up(&self, key: Key) -> bool {
        self.up.contains(&key)
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.down.contains(&key)
    }

    pub fn is_left(&self, key: Key) -> bool {
        self.left.contains(&key)
    }

    pub fn is_right(&self, key: Key) -> bool {
        self.right.contains(&key)
    }

    pub fn is_page_up(&self, key: Key) -> bool {
        self.page_up.contains(&key)
    }

    pub fn is_page_down(&self, key: Key) -> bool {
        self.page_down.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let bindings = KeyBindings::default();
        assert!(bindings.is_back(Key::Char('q')));
        assert!(bindings.is_back(Key::Esc));
        assert!(!bindings.is_back(Key::CtrlC));
        assert!(bindings.is_quit(Key::CtrlC));

        assert!(bindings.is_down(Key::Char('j')));
        assert!(bindings.is_up(Key::Up));
        assert!(bindings.is_right(Key::Char('l')));
        assert!(bindings.is_search(Key::Char('f')));
    }

    #[test]
    fn test_space_toggles_but_does_not_confirm() {
        let bindings = KeyBindings::default();
        assert!(bindings.is_toggle(Key::Char(' ')));
        assert!(!bindings.is_confirm(Key::Char(' ')));
        assert!(bindings.is_confirm(Key::Enter));
    }
}
