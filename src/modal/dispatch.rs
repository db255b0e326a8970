//! Interpreting engine responses as window effects.

use super::menu::resolve_path;
use super::mode::Mode;
use super::window::{EditorWindow, Point, TabDirection, TextRange};
use crate::ipc::{Message, Value};
use crate::{log_debug, log_debug_content};

/// Upper bound on repeated motions from one response.
pub const MAX_MOTION_COUNT: i64 = 1000;

/// A response's declared action, with its payload checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Noop,
    EnterMode(Mode),
    PassThrough,
    MoveCursor { motion: String, count: usize },
    GetSelection,
    SetSelection(TextRange),
    SwitchTab(TabDirection),
    /// Title path of the item to fire; see [`parse_title_path`](super::menu::parse_title_path)
    /// for the accepted separators.
    InvokeMenuItem(String),
    InsertNewline,
    ScrollTo(Point),
    GetScrollPosition,
    Sequence(Vec<Message>),
    /// Unknown name or a known name with a payload that does not fit.
    Invalid(String),
}

impl Action {
    pub fn from_message(message: &Message) -> Self {
        let Some(name) = message.action_name() else {
            return Action::Invalid("missing action".to_string());
        };
        let invalid = |detail: &str| Action::Invalid(format!("{name}: {detail}"));
        match name {
            "noop" => Action::Noop,
            "enterCommand" => Action::EnterMode(Mode::Command),
            "enterInsert" => Action::EnterMode(Mode::Insert),
            "enterMode" => match message.get_str("mode").and_then(Mode::parse) {
                Some(mode) => Action::EnterMode(mode),
                None => invalid("unknown mode"),
            },
            "passThrough" => Action::PassThrough,
            "moveCursor" => {
                let Some(motion) = message.get_str("motion").filter(|m| !m.is_empty()) else {
                    return invalid("missing motion");
                };
                let count = message
                    .get_int("count")
                    .unwrap_or(1)
                    .clamp(1, MAX_MOTION_COUNT);
                Action::MoveCursor {
                    motion: motion.to_string(),
                    count: count as usize,
                }
            }
            "getSelection" => Action::GetSelection,
            "setSelection" => match message.get_map("range").and_then(TextRange::from_message) {
                Some(range) => Action::SetSelection(range),
                None => invalid("missing or negative range"),
            },
            "switchTab" => match message.get_str("tabDirection").and_then(TabDirection::parse) {
                Some(direction) => Action::SwitchTab(direction),
                None => invalid("tabDirection must be next or previous"),
            },
            "invokeMenuItem" => match message.get_str("menuItemTitle") {
                Some(title) => Action::InvokeMenuItem(title.to_string()),
                None => invalid("missing menuItemTitle"),
            },
            "insertNewline" => Action::InsertNewline,
            "scrollTo" => match message.get_map("point").and_then(Point::from_message) {
                Some(point) => Action::ScrollTo(point),
                None => invalid("missing point"),
            },
            "getScrollPosition" => Action::GetScrollPosition,
            "sequence" => {
                let steps = message
                    .get_array("steps")
                    .unwrap_or_default()
                    .iter()
                    .filter_map(Value::as_map)
                    .cloned()
                    .collect();
                Action::Sequence(steps)
            }
            other => Action::Invalid(format!("unknown action '{other}'")),
        }
    }
}

/// What the controller does next after one action ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A window mutation happened.
    Applied,
    /// Nothing happened; also the result of unknown or unresolvable actions.
    Noop,
    /// Query answered; send this back to the engine.
    Reply(Message),
    EnterMode(Mode),
    PassThrough,
    /// Steps to run in order.
    Sequence(Vec<Message>),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ActionDispatcher;

impl ActionDispatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn dispatch<W: EditorWindow + ?Sized>(
        &self,
        window: &mut W,
        response: &Message,
    ) -> DispatchOutcome {
        match Action::from_message(response) {
            Action::Noop => DispatchOutcome::Noop,
            Action::EnterMode(mode) => DispatchOutcome::EnterMode(mode),
            Action::PassThrough => DispatchOutcome::PassThrough,
            Action::MoveCursor { motion, count } => {
                for _ in 0..count {
                    window.move_cursor(&motion);
                }
                DispatchOutcome::Applied
            }
            Action::GetSelection => {
                let text = window.selected_text();
                log_debug_content(&format!("selection query: {text:?}"));
                DispatchOutcome::Reply(
                    Message::action("selection")
                        .with("range", window.selection().to_message())
                        .with("text", text),
                )
            }
            Action::SetSelection(range) => {
                window.set_selection(range);
                DispatchOutcome::Applied
            }
            Action::SwitchTab(direction) => {
                window.switch_tab(direction);
                DispatchOutcome::Applied
            }
            Action::InvokeMenuItem(title) => {
                let Some(action) =
                    resolve_path(window.menu(), &title).map(|item| item.action.clone())
                else {
                    log_debug(&format!("no menu item named '{title}'"));
                    return DispatchOutcome::Noop;
                };
                window.perform_menu_action(&action);
                DispatchOutcome::Applied
            }
            Action::InsertNewline => {
                window.insert_newline();
                DispatchOutcome::Applied
            }
            Action::ScrollTo(point) => {
                window.scroll_to(point);
                DispatchOutcome::Applied
            }
            Action::GetScrollPosition => DispatchOutcome::Reply(
                Message::action("scrollPosition")
                    .with("point", window.scroll_position().to_message()),
            ),
            Action::Sequence(steps) => DispatchOutcome::Sequence(steps),
            Action::Invalid(detail) => {
                log_debug(&format!("ignoring action: {detail}"));
                tracing::debug!(detail, "unhandled engine action");
                DispatchOutcome::Noop
            }
        }
    }
}
