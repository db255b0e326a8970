//! Modal dispatch for one editor window: mode state, menu shortcut
//! suppression, action interpretation and the controller tying them to the
//! event router.

mod controller;
mod dispatch;
mod menu;
mod mode;
mod shortcuts;
#[cfg(test)]
mod tests;
mod window;

pub use controller::{key_event_request, ControllerSettings, EventDisposition, ModalWindowController};
pub use dispatch::{Action, ActionDispatcher, DispatchOutcome, MAX_MOTION_COUNT};
pub use menu::{
    find_item, find_item_mut, flatten, for_each_item_mut, parse_title_path, resolve_path,
    MenuItem, MenuItemDescriptor, MenuItemId, MenuNode,
};
pub use mode::{CursorStyle, ModalStateMachine, Mode, ShortcutEffect, Transition};
pub use shortcuts::{ShortcutDescriptor, ShortcutFilter, ShortcutSuppressionSet};
pub use window::{
    CaretColor, CursorOverlay, EditorWindow, KeyEvent, Point, TabDirection, TextRange,
};
