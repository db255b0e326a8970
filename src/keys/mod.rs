//! Vim-style keystroke notation shared by the host side and the reference engine.

mod keystroke;

pub use keystroke::{sequence_to_string, KeyParseError, KeyStroke, Modifier, Modifiers};
