use super::keymap::{Command, Keymap, Lookup};
use crate::ipc::{Message, Value};
use crate::keys::{sequence_to_string, KeyStroke, Modifier, Modifiers};
use crate::modal::{Mode, MAX_MOTION_COUNT};
use crate::{log_debug, log_debug_content};

/// "Half a page", in lines.
const HALF_PAGE_LINES: i64 = 6;

const CUT_MENU_ITEM: &str = "Edit > Cut";

/// Turns `keyEvent` requests into editor directives.
#[derive(Debug, Clone)]
pub struct EventHandler {
    keymap: Keymap,
    mode: Mode,
    key_queue: Vec<KeyStroke>,
    count: Option<i64>,
    word_cut: Option<WordCut>,
}

/// Progress of a `dw` across `selection` replies.
///
/// Hosts disagree on whether a word motion stops before or after the
/// whitespace that follows the word, so the selection is grown one character
/// at a time until the next character is not whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordCut {
    /// The word motions went out; waiting for the first selection.
    Selected,
    /// One more character was added. `base` is the length, in chars, of the
    /// selection before any whitespace was added.
    Extending { base: usize },
}

struct KeyRequest {
    stroke: KeyStroke,
    has_selection: bool,
}

impl EventHandler {
    pub fn new(keymap: Keymap) -> Self {
        Self {
            keymap,
            mode: Mode::Insert,
            key_queue: Vec::new(),
            count: None,
            word_cut: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Keys typed so far toward a multi-key mapping, in notation form.
    pub fn pending_keys(&self) -> String {
        sequence_to_string(&self.key_queue)
    }

    pub fn pending_count(&self) -> Option<i64> {
        self.count
    }

    pub fn handle_request(&mut self, request: &Message) -> Message {
        match request.action_name() {
            Some("keyEvent") => {
                self.word_cut = None;
                match parse_key_request(request) {
                    Ok(key) => self.handle_key(request.get_str("mode"), key),
                    Err(message) => error_response(&message),
                }
            }
            Some("selection") => self.handle_selection(request),
            Some(other) => {
                log_debug(&format!("engine ignoring '{other}' request"));
                Message::action("noop")
            }
            None => error_response("request has no action"),
        }
    }

    fn handle_selection(&mut self, reply: &Message) -> Message {
        let Some(state) = self.word_cut.take() else {
            log_debug("engine ignoring unsolicited selection reply");
            return Message::action("noop");
        };
        let text = reply.get_str("text").unwrap_or_default();
        match state {
            WordCut::Selected => self.extend_word_cut(text.chars().count()),
            WordCut::Extending { base } => {
                let mut added = text.chars().skip(base).peekable();
                if added.peek().is_none() {
                    // End of the document: nothing left to take.
                    return cut_selection();
                }
                if added.all(char::is_whitespace) {
                    return self.extend_word_cut(base);
                }
                combine(vec![
                    motion("moveBackwardAndModifySelection:", 1),
                    cut_selection(),
                ])
            }
        }
    }

    fn extend_word_cut(&mut self, base: usize) -> Message {
        self.word_cut = Some(WordCut::Extending { base });
        combine(vec![
            motion("moveForwardAndModifySelection:", 1),
            Message::action("getSelection"),
        ])
    }

    fn handle_key(&mut self, host_mode: Option<&str>, key: KeyRequest) -> Message {
        if let Some(mode) = host_mode.and_then(Mode::parse) {
            self.sync_mode(mode);
        }
        log_debug_content(&format!("engine key {} in {}", key.stroke, self.mode.as_str()));

        if self.mode == Mode::Command && self.key_queue.is_empty() {
            if let Some(digit) = count_digit(&key.stroke, self.count.is_some()) {
                let count = self.count.unwrap_or(0) * 10 + digit;
                self.count = Some(count.min(MAX_MOTION_COUNT));
                return Message::action("noop");
            }
        }

        self.key_queue.push(key.stroke);
        match self.keymap.lookup(self.mode, &self.key_queue) {
            Lookup::Command(command) => self.run_command(command, key.has_selection),
            Lookup::Pending => Message::action("noop"),
            Lookup::Unmapped => self.retry_last_key(key.has_selection),
        }
    }

    /// A failed multi-key prefix still lets its last key stand on its own (`gj` → `j`).
    fn retry_last_key(&mut self, has_selection: bool) -> Message {
        let queued = self.key_queue.len();
        let last = self.key_queue.pop();
        self.key_queue.clear();
        if queued > 1 {
            if let Some(last) = last {
                self.key_queue.push(last);
                match self.keymap.lookup(self.mode, &self.key_queue) {
                    Lookup::Command(command) => return self.run_command(command, has_selection),
                    Lookup::Pending => return Message::action("noop"),
                    Lookup::Unmapped => self.key_queue.clear(),
                }
            }
        }
        self.count = None;
        match self.mode {
            Mode::Command => Message::action("noop"),
            Mode::Insert => Message::action("passThrough"),
        }
    }

    fn sync_mode(&mut self, mode: Mode) {
        if mode != self.mode {
            self.mode = mode;
            self.key_queue.clear();
            self.count = None;
        }
    }

    fn run_command(&mut self, command: Command, has_selection: bool) -> Message {
        let count = self.count.take().unwrap_or(1);
        self.key_queue.clear();
        log_debug(&format!("engine command {} x{count}", command.name()));
        let steps = self.steps_for(command, count, has_selection);
        combine(steps)
    }

    fn steps_for(&mut self, command: Command, count: i64, has_selection: bool) -> Vec<Message> {
        match command {
            Command::MoveBackward => vec![motion("moveBackward:", count)],
            Command::MoveForward => vec![motion("moveForward:", count)],
            Command::MoveDown => vec![motion("moveDown:", count)],
            Command::MoveUp => vec![motion("moveUp:", count)],
            Command::HalfPageDown => vec![motion("moveDown:", HALF_PAGE_LINES * count)],
            Command::HalfPageUp => vec![motion("moveUp:", HALF_PAGE_LINES * count)],
            Command::MoveWordBackward => vec![motion("moveWordBackward:", count)],
            Command::MoveWordForward => vec![motion("moveWordForward:", count)],
            Command::MoveToEndOfWord => vec![motion("moveToEndOfWord:", count)],
            Command::MoveToBeginningOfLine => vec![motion("moveToBeginningOfLine:", 1)],
            Command::MoveToEndOfLine => vec![motion("moveToEndOfLine:", 1)],
            Command::MoveToBeginningOfDocument => vec![motion("moveToBeginningOfDocument:", 1)],
            Command::MoveToEndOfDocument => vec![motion("moveToEndOfDocument:", 1)],
            Command::InsertBackward | Command::EnterInsertMode => self.enter_insert(Vec::new()),
            Command::InsertForward => self.enter_insert(vec![motion("moveForward:", 1)]),
            Command::InsertAtBeginningOfLine => {
                self.enter_insert(vec![motion("moveToBeginningOfLine:", 1)])
            }
            Command::InsertAtEndOfLine => self.enter_insert(vec![motion("moveToEndOfLine:", 1)]),
            Command::InsertNewlineAbove => self.enter_insert(vec![
                motion("moveToBeginningOfLine:", 1),
                Message::action("insertNewline"),
                motion("moveUp:", 1),
            ]),
            Command::InsertNewlineBelow => self.enter_insert(vec![
                motion("moveToEndOfLine:", 1),
                Message::action("insertNewline"),
            ]),
            Command::CutForward => cut(has_selection, "moveForwardAndModifySelection:", count),
            Command::CutBackward => cut(has_selection, "moveBackwardAndModifySelection:", count),
            Command::CutWordForward if has_selection => vec![cut_selection()],
            Command::CutWordForward => {
                self.word_cut = Some(WordCut::Selected);
                vec![
                    motion("moveWordForwardAndModifySelection:", count),
                    Message::action("getSelection"),
                ]
            }
            Command::CutWordBackward => {
                cut(has_selection, "moveWordBackwardAndModifySelection:", count)
            }
            Command::NextTab => tabs("next", count),
            Command::PreviousTab => tabs("previous", count),
            Command::EnterCommandMode => {
                self.mode = Mode::Command;
                let mut steps = vec![Message::action("enterCommand")];
                if has_selection {
                    steps.push(motion("moveBackward:", 1));
                }
                steps
            }
        }
    }

    fn enter_insert(&mut self, mut steps: Vec<Message>) -> Vec<Message> {
        self.mode = Mode::Insert;
        steps.push(Message::action("enterInsert"));
        steps
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new(super::keymap::default_keymap())
    }
}

fn parse_key_request(request: &Message) -> Result<KeyRequest, String> {
    let characters = request
        .get_str("characters")
        .filter(|chars| !chars.is_empty())
        .ok_or_else(|| "keyEvent without characters".to_string())?;
    let mut modifiers = Modifiers::new();
    for value in request.get_array("modifiers").unwrap_or_default() {
        let name = value.as_str().unwrap_or_default();
        match Modifier::from_str(name) {
            Some(modifier) => {
                modifiers.insert(modifier);
            }
            None => return Err(format!("unknown modifier '{name}'")),
        }
    }
    let stroke = KeyStroke::from_event(characters, &modifiers)
        .ok_or_else(|| "keyEvent without characters".to_string())?;
    Ok(KeyRequest {
        stroke,
        has_selection: request.get_bool("hasSelection").unwrap_or(false),
    })
}

/// Digits feed the count prefix; a leading `0` is left to the keymap.
fn count_digit(stroke: &KeyStroke, counting: bool) -> Option<i64> {
    if !stroke.modifiers.is_empty() {
        return None;
    }
    let mut chars = stroke.key.chars();
    let (Some(ch), None) = (chars.next(), chars.next()) else {
        return None;
    };
    let digit = i64::from(ch.to_digit(10)?);
    (digit != 0 || counting).then_some(digit)
}

fn motion(selector: &str, count: i64) -> Message {
    let message = Message::action("moveCursor").with("motion", selector);
    if count > 1 {
        message.with("count", count.min(MAX_MOTION_COUNT))
    } else {
        message
    }
}

fn cut_selection() -> Message {
    Message::action("invokeMenuItem").with("menuItemTitle", CUT_MENU_ITEM)
}

fn cut(has_selection: bool, extend: &str, count: i64) -> Vec<Message> {
    if has_selection {
        vec![cut_selection()]
    } else {
        vec![motion(extend, count), cut_selection()]
    }
}

fn tabs(direction: &str, count: i64) -> Vec<Message> {
    (0..count.clamp(1, MAX_MOTION_COUNT))
        .map(|_| Message::action("switchTab").with("tabDirection", direction))
        .collect()
}

/// One step goes out bare; several are wrapped in a `sequence`.
fn combine(mut steps: Vec<Message>) -> Message {
    if steps.len() == 1 {
        if let Some(step) = steps.pop() {
            return step;
        }
    }
    let steps: Vec<Value> = steps.into_iter().map(Value::from).collect();
    Message::action("sequence").with("steps", steps)
}

pub fn error_response(message: &str) -> Message {
    Message::action("error").with("message", message)
}
