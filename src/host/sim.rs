//! In-memory editor window for tests and the replay CLI.

use crate::keys::{KeyStroke, Modifier};
use crate::log_debug;
use crate::modal::{
    for_each_item_mut, CaretColor, CursorOverlay, CursorStyle, EditorWindow, KeyEvent, MenuItem,
    MenuNode, Mode, Point, TabDirection, TextRange,
};
use serde::Serialize;

const SELECTION_SUFFIX: &str = "AndModifySelection:";

/// What the overlay was last told.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimOverlay {
    pub mode: Option<String>,
    pub color: Option<CaretColor>,
}

impl SimOverlay {
    pub fn cursor_style(&self) -> Option<CursorStyle> {
        match self.mode.as_deref().and_then(Mode::parse)? {
            Mode::Command => Some(CursorStyle::Block),
            Mode::Insert => Some(CursorStyle::Bar),
        }
    }
}

impl CursorOverlay for SimOverlay {
    fn set_mode(&mut self, mode: &str) {
        self.mode = Some(mode.to_string());
    }

    fn set_color(&mut self, color: CaretColor) {
        self.color = Some(color);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionSnapshot {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSnapshot {
    pub text: String,
    pub cursor: usize,
    pub selection: SelectionSnapshot,
    pub mode: Option<String>,
    pub active_tab: String,
    pub clipboard: String,
    pub scroll: [i64; 2],
}

/// A single-buffer editor window with tabs, a menu bar and a recorded overlay.
#[derive(Debug, Clone)]
pub struct SimWindow {
    class: String,
    text: Vec<char>,
    anchor: usize,
    head: usize,
    tabs: Vec<String>,
    active_tab: usize,
    menu: Vec<MenuNode>,
    scroll: Point,
    overlay: SimOverlay,
    clipboard: String,
    performed: Vec<String>,
}

impl SimWindow {
    pub fn new(text: &str) -> Self {
        Self {
            class: "OakDocumentWindow".to_string(),
            text: text.chars().collect(),
            anchor: 0,
            head: 0,
            tabs: vec!["untitled".to_string()],
            active_tab: 0,
            menu: default_menu_bar(),
            scroll: Point::default(),
            overlay: SimOverlay::default(),
            clipboard: String::new(),
            performed: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    pub fn with_tabs(mut self, tabs: &[&str]) -> Self {
        if !tabs.is_empty() {
            self.tabs = tabs.iter().map(|tab| tab.to_string()).collect();
            self.active_tab = 0;
        }
        self
    }

    pub fn with_menu(mut self, menu: Vec<MenuNode>) -> Self {
        self.menu = menu;
        self
    }

    pub fn text(&self) -> String {
        self.text.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.head
    }

    pub fn active_tab(&self) -> &str {
        &self.tabs[self.active_tab]
    }

    pub fn clipboard(&self) -> &str {
        &self.clipboard
    }

    pub fn overlay_state(&self) -> &SimOverlay {
        &self.overlay
    }

    /// Menu actions fired so far, in order.
    pub fn performed_actions(&self) -> &[String] {
        &self.performed
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        let selection = self.selection();
        WindowSnapshot {
            text: self.text(),
            cursor: self.head,
            selection: SelectionSnapshot {
                start: selection.start,
                end: selection.end,
            },
            mode: self.overlay.mode.clone(),
            active_tab: self.active_tab().to_string(),
            clipboard: self.clipboard.clone(),
            scroll: [self.scroll.x, self.scroll.y],
        }
    }

    /// The host's own key handling: menu shortcuts first, then text input.
    pub fn handle_key_default(&mut self, event: &KeyEvent) {
        if let Some(stroke) = KeyStroke::from_event(&event.characters, &event.modifiers) {
            if stroke.has_modifier(Modifier::Command) || stroke.has_modifier(Modifier::Control) {
                if let Some(action) = self.menu_action_for(&stroke) {
                    self.perform_menu_action(&action);
                }
                return;
            }
        }
        match event.characters.as_str() {
            "" | "\u{1b}" => {}
            "\r" | "\n" => self.insert_text("\n"),
            "\u{8}" | "\u{7f}" => self.delete_backward(),
            text => self.insert_text(text),
        }
    }

    /// Replace the selection with `text` and leave the caret after it.
    pub fn insert_text(&mut self, text: &str) {
        let range = self.selection();
        let inserted: Vec<char> = text.chars().collect();
        let caret = range.start + inserted.len();
        self.text.splice(range.start..range.end, inserted);
        self.collapse_to(caret);
    }

    fn delete_backward(&mut self) {
        let range = self.selection();
        if range.is_empty() {
            if range.start == 0 {
                return;
            }
            self.text.remove(range.start - 1);
            self.collapse_to(range.start - 1);
        } else {
            self.delete_selection();
        }
    }

    fn delete_selection(&mut self) {
        let range = self.selection();
        self.text.drain(range.start..range.end);
        self.collapse_to(range.start);
    }

    fn collapse_to(&mut self, at: usize) {
        let at = at.min(self.text.len());
        self.anchor = at;
        self.head = at;
    }

    fn menu_action_for(&mut self, stroke: &KeyStroke) -> Option<String> {
        let mut found = None;
        for_each_item_mut(&mut self.menu, &mut |item: &mut MenuItem| {
            if found.is_none() && item.shortcut.as_ref() == Some(stroke) {
                found = Some(item.action.clone());
            }
        });
        found
    }

    fn line_start(&self, pos: usize) -> usize {
        self.text[..pos]
            .iter()
            .rposition(|ch| *ch == '\n')
            .map_or(0, |idx| idx + 1)
    }

    fn line_end(&self, pos: usize) -> usize {
        self.text[pos..]
            .iter()
            .position(|ch| *ch == '\n')
            .map_or(self.text.len(), |idx| pos + idx)
    }

    fn motion_target(&self, motion: &str, from: usize) -> Option<usize> {
        let len = self.text.len();
        let target = match motion {
            "moveBackward" => from.saturating_sub(1),
            "moveForward" => (from + 1).min(len),
            "moveUp" => {
                let start = self.line_start(from);
                if start == 0 {
                    0
                } else {
                    let column = from - start;
                    let prev_start = self.line_start(start - 1);
                    (prev_start + column).min(start - 1)
                }
            }
            "moveDown" => {
                let end = self.line_end(from);
                if end == len {
                    len
                } else {
                    let column = from - self.line_start(from);
                    let next_start = end + 1;
                    (next_start + column).min(self.line_end(next_start))
                }
            }
            "moveWordForward" => {
                let mut i = from;
                if i < len {
                    let class = char_class(self.text[i]);
                    if class != CharClass::Space {
                        while i < len && char_class(self.text[i]) == class {
                            i += 1;
                        }
                    }
                }
                while i < len && char_class(self.text[i]) == CharClass::Space {
                    i += 1;
                }
                i
            }
            "moveWordBackward" => {
                let mut i = from;
                while i > 0 && char_class(self.text[i - 1]) == CharClass::Space {
                    i -= 1;
                }
                if i > 0 {
                    let class = char_class(self.text[i - 1]);
                    while i > 0 && char_class(self.text[i - 1]) == class {
                        i -= 1;
                    }
                }
                i
            }
            "moveToEndOfWord" => {
                let mut i = from;
                while i < len && char_class(self.text[i]) == CharClass::Space {
                    i += 1;
                }
                if i < len {
                    let class = char_class(self.text[i]);
                    while i < len && char_class(self.text[i]) == class {
                        i += 1;
                    }
                }
                i
            }
            "moveToBeginningOfLine" => self.line_start(from),
            "moveToEndOfLine" => self.line_end(from),
            "moveToBeginningOfDocument" => 0,
            "moveToEndOfDocument" => len,
            _ => return None,
        };
        Some(target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Space,
    Word,
    Punct,
}

fn char_class(ch: char) -> CharClass {
    if ch.is_whitespace() {
        CharClass::Space
    } else if ch.is_alphanumeric() || ch == '_' {
        CharClass::Word
    } else {
        CharClass::Punct
    }
}

impl EditorWindow for SimWindow {
    fn window_class(&self) -> &str {
        &self.class
    }

    fn menu(&self) -> &[MenuNode] {
        &self.menu
    }

    fn menu_mut(&mut self) -> &mut Vec<MenuNode> {
        &mut self.menu
    }

    fn overlay(&mut self) -> &mut dyn CursorOverlay {
        &mut self.overlay
    }

    fn move_cursor(&mut self, motion: &str) {
        if let Some(base) = motion.strip_suffix(SELECTION_SUFFIX) {
            match self.motion_target(base, self.head) {
                Some(target) => self.head = target,
                None => log_debug(&format!("sim window ignores motion '{motion}'")),
            }
            return;
        }
        let base = motion.trim_end_matches(':');
        let range = self.selection();
        let target = match base {
            "moveBackward" if !range.is_empty() => Some(range.start),
            "moveForward" if !range.is_empty() => Some(range.end),
            _ => self.motion_target(base, self.head),
        };
        match target {
            Some(target) => self.collapse_to(target),
            None => log_debug(&format!("sim window ignores motion '{motion}'")),
        }
    }

    fn selection(&self) -> TextRange {
        TextRange::new(self.anchor, self.head)
    }

    fn selected_text(&self) -> String {
        let range = self.selection();
        self.text[range.start..range.end].iter().collect()
    }

    fn set_selection(&mut self, range: TextRange) {
        let len = self.text.len();
        self.anchor = range.start.min(len);
        self.head = range.end.min(len);
    }

    fn switch_tab(&mut self, direction: TabDirection) {
        let count = self.tabs.len();
        self.active_tab = match direction {
            TabDirection::Next => (self.active_tab + 1) % count,
            TabDirection::Previous => (self.active_tab + count - 1) % count,
        };
    }

    fn perform_menu_action(&mut self, action: &str) {
        self.performed.push(action.to_string());
        match action {
            "cut:" => {
                self.clipboard = self.selected_text();
                self.delete_selection();
            }
            "copy:" => self.clipboard = self.selected_text(),
            "paste:" => {
                let clipboard = self.clipboard.clone();
                self.insert_text(&clipboard);
            }
            "selectNextTab:" => self.switch_tab(TabDirection::Next),
            "selectPreviousTab:" => self.switch_tab(TabDirection::Previous),
            _ => {}
        }
    }

    fn insert_newline(&mut self) {
        self.insert_text("\n");
    }

    fn scroll_position(&self) -> Point {
        self.scroll
    }

    fn scroll_to(&mut self, point: Point) {
        self.scroll = point;
    }
}

/// File, Edit, Text and Navigation menus with the usual key-equivalents.
pub fn default_menu_bar() -> Vec<MenuNode> {
    let cmd = |key: &str| KeyStroke::new(key, [Modifier::Command]);
    let ctrl = |key: &str| KeyStroke::new(key, [Modifier::Control]);
    vec![
        MenuNode::submenu(
            "File",
            vec![
                MenuItem::new(1, "New", "newDocument:")
                    .with_shortcut(cmd("n"))
                    .into(),
                MenuItem::new(2, "Save", "saveDocument:")
                    .with_shortcut(cmd("s"))
                    .into(),
            ],
        ),
        MenuNode::submenu(
            "Edit",
            vec![
                MenuItem::new(10, "Undo", "undo:")
                    .with_shortcut(cmd("z"))
                    .into(),
                MenuItem::new(11, "Cut", "cut:")
                    .with_shortcut(cmd("x"))
                    .into(),
                MenuItem::new(12, "Copy", "copy:")
                    .with_shortcut(cmd("c"))
                    .into(),
                MenuItem::new(13, "Paste", "paste:")
                    .with_shortcut(cmd("v"))
                    .into(),
            ],
        ),
        MenuNode::submenu(
            "Text",
            vec![
                MenuItem::new(20, "Duplicate Line", "duplicateLine:")
                    .with_shortcut(ctrl("d"))
                    .into(),
                MenuNode::submenu(
                    "Convert",
                    vec![
                        MenuItem::new(21, "to Uppercase", "uppercaseWord:")
                            .with_shortcut(ctrl("u"))
                            .into(),
                        MenuItem::new(22, "to Lowercase", "lowercaseWord:")
                            .with_shortcut(ctrl("U"))
                            .into(),
                    ],
                ),
            ],
        ),
        MenuNode::submenu(
            "Navigation",
            vec![
                MenuItem::new(30, "Next File Tab", "selectNextTab:")
                    .with_shortcut(cmd("}"))
                    .into(),
                MenuItem::new(31, "Previous File Tab", "selectPreviousTab:")
                    .with_shortcut(cmd("{"))
                    .into(),
            ],
        ),
    ]
}
