//! The slice of the host window the modal core drives.

use super::menu::MenuNode;
use crate::ipc::Message;
use crate::keys::Modifiers;

/// Character range of a selection; `start == end` is a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn caret(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn to_message(self) -> Message {
        Message::new()
            .with("start", self.start)
            .with("end", self.end)
    }

    /// Read `{start, end}`; negative offsets are rejected.
    pub fn from_message(message: &Message) -> Option<Self> {
        let start = usize::try_from(message.get_int("start")?).ok()?;
        let end = usize::try_from(message.get_int("end")?).ok()?;
        Some(Self::new(start, end))
    }
}

/// Scroll offset of the text view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn to_message(self) -> Message {
        Message::new().with("x", self.x).with("y", self.y)
    }

    pub fn from_message(message: &Message) -> Option<Self> {
        Some(Self {
            x: message.get_int("x")?,
            y: message.get_int("y")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabDirection {
    Next,
    Previous,
}

impl TabDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "next" => Some(TabDirection::Next),
            "previous" => Some(TabDirection::Previous),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TabDirection::Next => "next",
            TabDirection::Previous => "previous",
        }
    }
}

/// RGBA caret color handed to the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaretColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl CaretColor {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for CaretColor {
    fn default() -> Self {
        Self::rgba(0, 0, 0, 0xa0)
    }
}

/// Mode-cursor overlay contract. Rendering is the host's business.
pub trait CursorOverlay {
    fn set_mode(&mut self, mode: &str);
    fn set_color(&mut self, color: CaretColor);
}

/// One key press as the host reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key_code: u16,
    pub characters: String,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key_code: u16, characters: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key_code,
            characters: characters.into(),
            modifiers,
        }
    }
}

/// Window operations the dispatcher and controller call into.
///
/// Motions are host selector names (`moveDown:`,
/// `moveForwardAndModifySelection:`); hosts ignore selectors they do not know.
pub trait EditorWindow {
    fn window_class(&self) -> &str;

    fn menu(&self) -> &[MenuNode];
    fn menu_mut(&mut self) -> &mut Vec<MenuNode>;

    fn overlay(&mut self) -> &mut dyn CursorOverlay;

    fn move_cursor(&mut self, motion: &str);
    fn selection(&self) -> TextRange;
    fn selected_text(&self) -> String;
    fn set_selection(&mut self, range: TextRange);

    fn has_selection(&self) -> bool {
        !self.selection().is_empty()
    }

    fn switch_tab(&mut self, direction: TabDirection);

    /// Fire the action reference stored on a menu item.
    fn perform_menu_action(&mut self, action: &str);

    fn insert_newline(&mut self);

    fn scroll_position(&self) -> Point;
    fn scroll_to(&mut self, point: Point);
}
