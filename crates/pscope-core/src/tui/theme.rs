//! Theme and styling for the inspector screens.
//!
//! Screens ask the theme for a style by role (title, section header, key,
//! value) or by content (process state, descriptor target). With colour
//! disabled every role keeps its bold/reverse attributes and loses only
//! its foreground colour.

use super::terminal::{Color, Line, Span, Style};

/// Theme mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeMode {
    /// Eight-colour palette (default).
    #[default]
    Color,
    /// No color; respects `NO_COLOR` environment variable.
    NoColor,
}

/// Role and content styles for every screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Theme {
    pub mode: ThemeMode,
}

impl Theme {
    /// Colour unless `NO_COLOR` is set.
    pub fn from_env() -> Self {
        if std::env::var_os("NO_COLOR").is_some() {
            Self::no_color()
        } else {
            Self::color()
        }
    }

    pub fn color() -> Self {
        Self {
            mode: ThemeMode::Color,
        }
    }

    pub fn no_color() -> Self {
        Self {
            mode: ThemeMode::NoColor,
        }
    }

    fn paint(&self, color: Color) -> Style {
        match self.mode {
            ThemeMode::Color => Style::fg(color),
            ThemeMode::NoColor => Style::PLAIN,
        }
    }

    // --- roles ---

    pub fn title(&self) -> Style {
        self.paint(Color::Cyan).bold()
    }

    pub fn menu_item(&self) -> Style {
        self.paint(Color::Blue)
    }

    pub fn footer(&self) -> Style {
        self.paint(Color::White)
    }

    pub fn prompt(&self) -> Style {
        self.paint(Color::Yellow)
    }

    pub fn error(&self) -> Style {
        self.paint(Color::Red)
    }

    pub fn label(&self) -> Style {
        self.paint(Color::Yellow)
    }

    pub fn value(&self) -> Style {
        self.paint(Color::Green)
    }

    pub fn plain(&self) -> Style {
        self.paint(Color::White)
    }

    pub fn marker(&self) -> Style {
        self.paint(Color::Yellow)
    }

    pub fn list_index(&self) -> Style {
        self.paint(Color::Cyan)
    }

    pub fn list_pid(&self) -> Style {
        self.paint(Color::Magenta)
    }

    pub fn list_command(&self) -> Style {
        self.paint(Color::Green)
    }

    /// Section header colour, keyed by the section title.
    pub fn section(&self, title: &str) -> Style {
        let color = if title.contains("Memory") {
            Color::Magenta
        } else if title.contains("CPU") {
            Color::Yellow
        } else if title.contains("File") || title.contains("I/O") {
            Color::Cyan
        } else {
            Color::Blue
        };
        self.paint(color).bold()
    }

    // --- content ---

    /// Colour of a `State` value: running, sleeping, zombie.
    pub fn process_state(&self, state: &str) -> Style {
        let lower = state.to_ascii_lowercase();
        if lower.contains("running") {
            self.paint(Color::Green)
        } else if lower.contains("sleep") {
            self.paint(Color::Cyan)
        } else if lower.contains("zombie") || lower.contains("defunct") {
            self.paint(Color::Red)
        } else {
            self.plain()
        }
    }

    /// Colour of a descriptor target by its kind.
    pub fn fd_target(&self, target: &str) -> Style {
        if target.contains("socket") {
            self.paint(Color::Magenta)
        } else if target.contains("pipe") {
            self.paint(Color::Yellow)
        } else if target.contains("/dev/") {
            self.paint(Color::Blue)
        } else if target.contains("Error") {
            self.paint(Color::Red)
        } else {
            self.paint(Color::Green)
        }
    }

    /// A memory-map line: address range, permissions, then the rest.
    pub fn maps_line(&self, line: &str) -> Line {
        let mut parts = line.split_whitespace();
        let (Some(range), Some(perms)) = (parts.next(), parts.next()) else {
            return vec![Span::new(line, self.plain())];
        };
        if !range.contains('-') {
            return vec![Span::new(line, self.plain())];
        }
        let perm_style = if perms.contains('w') {
            self.paint(Color::Red)
        } else {
            self.paint(Color::Green)
        };
        let rest = parts.collect::<Vec<_>>().join(" ");
        let rest_style = if rest.contains(".so") {
            self.paint(Color::Magenta)
        } else {
            self.plain()
        };
        let mut spans = vec![
            Span::new(range, self.paint(Color::Cyan)),
            Span::new(" ", Style::PLAIN),
            Span::new(perms, perm_style),
        ];
        if !rest.is_empty() {
            spans.push(Span::new(" ", Style::PLAIN));
            spans.push(Span::new(rest, rest_style));
        }
        spans
    }

    /// A resolver `fd N: target` line.
    pub fn fd_line(&self, line: &str) -> Line {
        match line.strip_prefix("fd ").and_then(|rest| rest.find(':').map(|i| (rest, i))) {
            Some((rest, colon)) => vec![
                Span::new(format!("fd {}", &rest[..colon]), self.paint(Color::Cyan)),
                Span::new(&rest[colon..], self.fd_target(&rest[colon..])),
            ],
            None => vec![Span::new(line, self.plain())],
        }
    }

    pub fn limits_line(&self, line: &str) -> Line {
        let style = if line.contains("unlimited") {
            self.paint(Color::Green)
        } else {
            self.plain()
        };
        vec![Span::new(line, style)]
    }
}
