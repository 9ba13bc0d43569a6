//! Terminal surface.
//!
//! Screens draw through the [`Surface`] capability set and never touch the
//! terminal directly. [`CrosstermSurface`] drives a real terminal;
//! [`MemorySurface`] is a character grid with a scripted key queue for
//! tests.

use super::{TuiError, TuiResult};
use crate::monitor::{OperatorConsole, OperatorInput};
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Attribute, Color as CtColor, Print, SetAttribute, SetForegroundColor};
use crossterm::{cursor, execute, queue, terminal};
use std::collections::VecDeque;
use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

/// Foreground colours available to screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Default,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl From<Color> for CtColor {
    fn from(color: Color) -> Self {
        match color {
            Color::Default => CtColor::Reset,
            Color::Red => CtColor::Red,
            Color::Green => CtColor::Green,
            Color::Yellow => CtColor::Yellow,
            Color::Blue => CtColor::Blue,
            Color::Magenta => CtColor::Magenta,
            Color::Cyan => CtColor::Cyan,
            Color::White => CtColor::White,
        }
    }
}

/// Text attributes for one run of characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub fg: Color,
    pub bold: bool,
    pub reverse: bool,
}

impl Style {
    pub const PLAIN: Style = Style {
        fg: Color::Default,
        bold: false,
        reverse: false,
    };

    pub const fn fg(color: Color) -> Self {
        Style {
            fg: color,
            bold: false,
            reverse: false,
        }
    }

    pub const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub const fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Reverse video when `on`.
    pub const fn highlighted(self, on: bool) -> Self {
        if on {
            self.reversed()
        } else {
            self
        }
    }
}

/// A styled run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: Style,
}

impl Span {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// One screen row built from spans.
pub type Line = Vec<Span>;

/// Keys screens react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Enter,
    Esc,
    Backspace,
    Char(char),
    CtrlC,
    Resize,
    Other,
}

impl From<KeyEvent> for Key {
    fn from(key: KeyEvent) -> Self {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') | KeyCode::Char('C') => Key::CtrlC,
                KeyCode::Char('h') => Key::Backspace,
                _ => Key::Other,
            };
        }
        match key.code {
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::PageUp => Key::PageUp,
            KeyCode::PageDown => Key::PageDown,
            KeyCode::Enter => Key::Enter,
            KeyCode::Esc => Key::Esc,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Char(c) => Key::Char(c),
            _ => Key::Other,
        }
    }
}

/// Terminal dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub rows: u16,
    pub cols: u16,
}

/// What the navigation engine needs from a terminal.
pub trait Surface {
    fn size(&self) -> Size;

    fn clear(&mut self) -> io::Result<()>;

    /// Write `text` at (`row`, `col`), clipped at the right edge.
    ///
    /// Fails with [`TuiError::Render`] when the position is off-screen.
    fn put(&mut self, row: u16, col: u16, text: &str, style: Style) -> TuiResult<()>;

    /// Make everything drawn since the last clear visible.
    fn present(&mut self) -> io::Result<()>;

    /// Block until a key arrives.
    fn read_key(&mut self) -> io::Result<Key>;

    /// Wait up to `timeout` for a key.
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<Key>>;

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()>;

    fn move_cursor(&mut self, row: u16, col: u16) -> io::Result<()>;

    /// Toggle echo of typed input. Line readers consult [`Surface::echo`].
    fn set_echo(&mut self, on: bool);

    fn echo(&self) -> bool;

    /// Write free-flowing text at the cursor (monitor output).
    fn write_stream(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Write a run of spans starting at (`row`, `col`).
    fn put_line(&mut self, row: u16, col: u16, line: &[Span]) -> TuiResult<()> {
        let mut col = col;
        let width = self.size().cols;
        for span in line {
            if col >= width {
                break;
            }
            self.put(row, col, &span.text, span.style)?;
            col = col.saturating_add(span.text.chars().count() as u16);
        }
        Ok(())
    }
}

fn clip(text: &str, col: u16, cols: u16) -> String {
    let room = cols.saturating_sub(col) as usize;
    text.chars().take(room).collect()
}

fn check_bounds(size: Size, row: u16, col: u16) -> TuiResult<()> {
    if row >= size.rows || col >= size.cols {
        return Err(TuiError::Render(format!(
            "position ({row}, {col}) outside {}x{} terminal",
            size.rows, size.cols
        )));
    }
    Ok(())
}

// ============================================================================
// Crossterm backend
// ============================================================================

/// A real terminal in raw mode on the alternate screen.
///
/// The terminal is restored when the surface is dropped.
pub struct CrosstermSurface {
    out: Stdout,
    size: Size,
    echo: bool,
    alternate: bool,
}

impl CrosstermSurface {
    pub fn new() -> TuiResult<Self> {
        terminal::enable_raw_mode().map_err(|e| TuiError::TerminalInit(e.to_string()))?;
        let mut out = io::stdout();
        execute!(out, terminal::EnterAlternateScreen, cursor::Hide)
            .map_err(|e| TuiError::TerminalInit(e.to_string()))?;
        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            size: Size { rows, cols },
            echo: false,
            alternate: true,
        })
    }

    /// Raw mode on the primary screen, for streaming output that should
    /// stay in the scrollback.
    pub fn inline() -> TuiResult<Self> {
        terminal::enable_raw_mode().map_err(|e| TuiError::TerminalInit(e.to_string()))?;
        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out: io::stdout(),
            size: Size { rows, cols },
            echo: true,
            alternate: false,
        })
    }

    /// Leave the alternate screen and raw mode.
    pub fn restore(&mut self) -> TuiResult<()> {
        if self.alternate {
            execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen)
                .map_err(|e| TuiError::TerminalRestore(e.to_string()))?;
            self.alternate = false;
        } else {
            execute!(self.out, cursor::Show)
                .map_err(|e| TuiError::TerminalRestore(e.to_string()))?;
        }
        terminal::disable_raw_mode().map_err(|e| TuiError::TerminalRestore(e.to_string()))
    }

    fn next_key(&mut self, event: CrosstermEvent) -> Option<Key> {
        match event {
            CrosstermEvent::Key(key) if key.kind != KeyEventKind::Release => Some(Key::from(key)),
            CrosstermEvent::Resize(cols, rows) => {
                self.size = Size { rows, cols };
                Some(Key::Resize)
            }
            _ => None,
        }
    }
}

impl Drop for CrosstermSurface {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

impl Surface for CrosstermSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn clear(&mut self) -> io::Result<()> {
        if let Ok((cols, rows)) = terminal::size() {
            self.size = Size { rows, cols };
        }
        queue!(self.out, terminal::Clear(terminal::ClearType::All), cursor::MoveTo(0, 0))
    }

    fn put(&mut self, row: u16, col: u16, text: &str, style: Style) -> TuiResult<()> {
        check_bounds(self.size, row, col)?;
        queue!(self.out, cursor::MoveTo(col, row), SetForegroundColor(style.fg.into()))?;
        if style.bold {
            queue!(self.out, SetAttribute(Attribute::Bold))?;
        }
        if style.reverse {
            queue!(self.out, SetAttribute(Attribute::Reverse))?;
        }
        queue!(
            self.out,
            Print(clip(text, col, self.size.cols)),
            SetAttribute(Attribute::Reset)
        )?;
        Ok(())
    }

    fn present(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn read_key(&mut self) -> io::Result<Key> {
        loop {
            let event = event::read()?;
            if let Some(key) = self.next_key(event) {
                return Ok(key);
            }
        }
    }

    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<Key>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !event::poll(remaining)? {
                return Ok(None);
            }
            let event = event::read()?;
            if let Some(key) = self.next_key(event) {
                return Ok(Some(key));
            }
            if remaining.is_zero() {
                return Ok(None);
            }
        }
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        if visible {
            execute!(self.out, cursor::Show)
        } else {
            execute!(self.out, cursor::Hide)
        }
    }

    fn move_cursor(&mut self, row: u16, col: u16) -> io::Result<()> {
        execute!(self.out, cursor::MoveTo(col, row))
    }

    fn set_echo(&mut self, on: bool) {
        self.echo = on;
    }

    fn echo(&self) -> bool {
        self.echo
    }

    fn write_stream(&mut self, bytes: &[u8]) -> io::Result<()> {
        // Raw mode does not translate newlines.
        let mut translated = Vec::with_capacity(bytes.len());
        let mut prev = 0u8;
        for &b in bytes {
            if b == b'\n' && prev != b'\r' {
                translated.push(b'\r');
            }
            translated.push(b);
            prev = b;
        }
        self.out.write_all(&translated)?;
        self.out.flush()
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// A character grid with a scripted key queue.
///
/// `read_key` on an empty queue fails with `UnexpectedEof`, so a screen
/// that waits for more input than a test scripted ends the run instead
/// of hanging.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    size: Size,
    cells: Vec<Vec<(char, Style)>>,
    keys: VecDeque<Key>,
    stream: Vec<u8>,
    presents: usize,
    cursor_visible: bool,
    cursor: (u16, u16),
    echo: bool,
}

impl MemorySurface {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            size: Size { rows, cols },
            cells: vec![vec![(' ', Style::PLAIN); cols as usize]; rows as usize],
            keys: VecDeque::new(),
            stream: Vec::new(),
            presents: 0,
            cursor_visible: false,
            cursor: (0, 0),
            echo: false,
        }
    }

    pub fn with_keys(mut self, keys: impl IntoIterator<Item = Key>) -> Self {
        self.keys.extend(keys);
        self
    }

    pub fn push_key(&mut self, key: Key) {
        self.keys.push_back(key);
    }

    /// Queue each character of `text` as a key.
    pub fn type_text(&mut self, text: &str) {
        self.keys.extend(text.chars().map(Key::Char));
    }

    /// Change the dimensions, as a terminal resize would.
    pub fn resize(&mut self, rows: u16, cols: u16) {
        *self = Self {
            keys: std::mem::take(&mut self.keys),
            stream: std::mem::take(&mut self.stream),
            ..Self::new(rows, cols)
        };
    }

    /// Text of one row with trailing blanks removed.
    pub fn row_text(&self, row: u16) -> String {
        self.cells
            .get(row as usize)
            .map(|cells| cells.iter().map(|(c, _)| *c).collect::<String>())
            .unwrap_or_default()
            .trim_end()
            .to_string()
    }

    /// Every row, newline separated.
    pub fn text(&self) -> String {
        (0..self.size.rows)
            .map(|row| self.row_text(row))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn contains(&self, needle: &str) -> bool {
        (0..self.size.rows).any(|row| self.row_text(row).contains(needle))
    }

    /// Row index of the first row containing `needle`.
    pub fn find_row(&self, needle: &str) -> Option<u16> {
        (0..self.size.rows).find(|row| self.row_text(*row).contains(needle))
    }

    pub fn style_at(&self, row: u16, col: u16) -> Option<Style> {
        self.cells
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .map(|(_, style)| *style)
    }

    pub fn stream_text(&self) -> String {
        String::from_utf8_lossy(&self.stream).into_owned()
    }

    pub fn presents(&self) -> usize {
        self.presents
    }

    pub fn pending_keys(&self) -> usize {
        self.keys.len()
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }
}

impl Surface for MemorySurface {
    fn size(&self) -> Size {
        self.size
    }

    fn clear(&mut self) -> io::Result<()> {
        for row in &mut self.cells {
            row.fill((' ', Style::PLAIN));
        }
        Ok(())
    }

    fn put(&mut self, row: u16, col: u16, text: &str, style: Style) -> TuiResult<()> {
        check_bounds(self.size, row, col)?;
        let cells = &mut self.cells[row as usize];
        for (offset, ch) in clip(text, col, self.size.cols).chars().enumerate() {
            cells[col as usize + offset] = (ch, style);
        }
        Ok(())
    }

    fn present(&mut self) -> io::Result<()> {
        self.presents += 1;
        Ok(())
    }

    fn read_key(&mut self) -> io::Result<Key> {
        self.keys
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted keys left"))
    }

    fn poll_key(&mut self, _timeout: Duration) -> io::Result<Option<Key>> {
        Ok(self.keys.pop_front())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        self.cursor_visible = visible;
        Ok(())
    }

    fn move_cursor(&mut self, row: u16, col: u16) -> io::Result<()> {
        self.cursor = (row, col);
        Ok(())
    }

    fn set_echo(&mut self, on: bool) {
        self.echo = on;
    }

    fn echo(&self) -> bool {
        self.echo
    }

    fn write_stream(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.extend_from_slice(bytes);
        Ok(())
    }
}

// ============================================================================
// Monitor console on a surface
// ============================================================================

/// Runs a monitor session on a surface: payload and status lines flow as
/// text, keys are assembled into lines, Ctrl+C interrupts.
pub struct SurfaceConsole<'s> {
    surface: &'s mut dyn Surface,
    line: String,
}

impl<'s> SurfaceConsole<'s> {
    pub fn new(surface: &'s mut dyn Surface) -> Self {
        Self {
            surface,
            line: String::new(),
        }
    }

    /// Apply one key; returns a finished input if the key completed one.
    fn feed(&mut self, key: Key) -> io::Result<Option<OperatorInput>> {
        match key {
            Key::CtrlC => return Ok(Some(OperatorInput::Interrupt)),
            Key::Enter => {
                if self.surface.echo() {
                    self.surface.write_stream(b"\n")?;
                }
                return Ok(Some(OperatorInput::Line(std::mem::take(&mut self.line))));
            }
            Key::Backspace => {
                if self.line.pop().is_some() && self.surface.echo() {
                    self.surface.write_stream(b"\x08 \x08")?;
                }
            }
            Key::Char(c) if !c.is_control() => {
                self.line.push(c);
                if self.surface.echo() {
                    let mut buf = [0u8; 4];
                    self.surface.write_stream(c.encode_utf8(&mut buf).as_bytes())?;
                }
            }
            _ => {}
        }
        Ok(None)
    }
}

impl OperatorConsole for SurfaceConsole<'_> {
    fn emit_payload(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.surface.write_stream(bytes)
    }

    fn status(&mut self, line: &str) -> io::Result<()> {
        self.surface.write_stream(format!("{line}\n").as_bytes())
    }

    fn poll_input(&mut self, timeout: Duration) -> io::Result<OperatorInput> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.surface.poll_key(remaining)? {
                None => return Ok(OperatorInput::Idle),
                Some(key) => {
                    if let Some(input) = self.feed(key)? {
                        return Ok(input);
                    }
                }
            }
            if Instant::now() >= deadline {
                return Ok(OperatorInput::Idle);
            }
        }
    }

    fn acknowledge(&mut self, prompt: &str) -> io::Result<()> {
        self.surface.write_stream(prompt.as_bytes())?;
        loop {
            match self.surface.read_key()? {
                Key::Enter | Key::CtrlC | Key::Esc => break,
                _ => {}
            }
        }
        self.surface.write_stream(b"\n")
    }
}
