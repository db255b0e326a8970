use crate::keys::{sequence_to_string, KeyParseError, KeyStroke};
use crate::modal::Mode;
use std::collections::BTreeMap;
use thiserror::Error;

/// Editor commands the reference engine knows how to express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveBackward,
    MoveForward,
    MoveDown,
    MoveUp,
    HalfPageDown,
    HalfPageUp,
    MoveWordBackward,
    MoveWordForward,
    MoveToEndOfWord,
    MoveToBeginningOfLine,
    MoveToEndOfLine,
    MoveToBeginningOfDocument,
    MoveToEndOfDocument,
    InsertBackward,
    InsertForward,
    InsertAtBeginningOfLine,
    InsertAtEndOfLine,
    InsertNewlineAbove,
    InsertNewlineBelow,
    CutForward,
    CutBackward,
    /// Word plus its trailing whitespace; needs selection round trips.
    CutWordForward,
    CutWordBackward,
    NextTab,
    PreviousTab,
    EnterCommandMode,
    EnterInsertMode,
}

const COMMAND_NAMES: &[(&str, Command)] = &[
    ("move_backward", Command::MoveBackward),
    ("move_forward", Command::MoveForward),
    ("move_down", Command::MoveDown),
    ("move_up", Command::MoveUp),
    ("half_page_down", Command::HalfPageDown),
    ("half_page_up", Command::HalfPageUp),
    ("move_word_backward", Command::MoveWordBackward),
    ("move_word_forward", Command::MoveWordForward),
    ("move_to_end_of_word", Command::MoveToEndOfWord),
    ("move_to_beginning_of_line", Command::MoveToBeginningOfLine),
    ("move_to_end_of_line", Command::MoveToEndOfLine),
    ("move_to_beginning_of_document", Command::MoveToBeginningOfDocument),
    ("move_to_end_of_document", Command::MoveToEndOfDocument),
    ("insert_backward", Command::InsertBackward),
    ("insert_forward", Command::InsertForward),
    ("insert_at_beginning_of_line", Command::InsertAtBeginningOfLine),
    ("insert_at_end_of_line", Command::InsertAtEndOfLine),
    ("insert_newline_above", Command::InsertNewlineAbove),
    ("insert_newline_below", Command::InsertNewlineBelow),
    ("cut_forward", Command::CutForward),
    ("cut_backward", Command::CutBackward),
    ("cut_word_forward", Command::CutWordForward),
    ("cut_word_backward", Command::CutWordBackward),
    ("next_tab", Command::NextTab),
    ("previous_tab", Command::PreviousTab),
    ("enter_command_mode", Command::EnterCommandMode),
    ("enter_insert_mode", Command::EnterInsertMode),
];

impl Command {
    pub fn from_name(name: &str) -> Option<Self> {
        COMMAND_NAMES
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, command)| *command)
    }

    pub fn name(self) -> &'static str {
        COMMAND_NAMES
            .iter()
            .find(|(_, command)| *command == self)
            .map_or("unknown", |(name, _)| *name)
    }
}

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("mapping '{0}' should look like [insert:]KEYS=COMMAND")]
    Syntax(String),
    #[error("unknown mode '{0}'")]
    UnknownMode(String),
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error(transparent)]
    Keys(#[from] KeyParseError),
}

/// Result of looking up the pending key queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Command(Command),
    /// The queue starts a longer mapping; wait for more keys.
    Pending,
    Unmapped,
}

/// Key sequence → command tables, one per mode. Sequences are stored in
/// canonical notation so `<M-C-y>` and `<C-M-y>` land on the same entry.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    command: BTreeMap<String, Command>,
    insert: BTreeMap<String, Command>,
}

impl Keymap {
    pub fn empty() -> Self {
        Self::default()
    }

    fn table(&self, mode: Mode) -> &BTreeMap<String, Command> {
        match mode {
            Mode::Command => &self.command,
            Mode::Insert => &self.insert,
        }
    }

    pub fn map(&mut self, mode: Mode, keys: &str, command: Command) -> Result<(), KeyParseError> {
        let canonical = sequence_to_string(&KeyStroke::parse_sequence(keys)?);
        let table = match mode {
            Mode::Command => &mut self.command,
            Mode::Insert => &mut self.insert,
        };
        table.insert(canonical, command);
        Ok(())
    }

    /// Apply a `[insert:]KEYS=COMMAND` mapping from the command line.
    pub fn apply_mapping(&mut self, mapping: &str) -> Result<(), MappingError> {
        let (lhs, command) = mapping
            .rsplit_once('=')
            .ok_or_else(|| MappingError::Syntax(mapping.to_string()))?;
        let (mode, keys) = match lhs.split_once(':') {
            Some((mode, keys)) if !keys.is_empty() && !mode.starts_with('<') => {
                let mode =
                    Mode::parse(mode).ok_or_else(|| MappingError::UnknownMode(mode.to_string()))?;
                (mode, keys)
            }
            _ => (Mode::Command, lhs),
        };
        let command = Command::from_name(command.trim())
            .ok_or_else(|| MappingError::UnknownCommand(command.to_string()))?;
        self.map(mode, keys, command)?;
        Ok(())
    }

    pub fn lookup(&self, mode: Mode, queue: &[KeyStroke]) -> Lookup {
        let typed = sequence_to_string(queue);
        let table = self.table(mode);
        if let Some(command) = table.get(&typed) {
            return Lookup::Command(*command);
        }
        let longer = table
            .range(typed.clone()..)
            .next()
            .is_some_and(|(keys, _)| keys.starts_with(&typed));
        if longer {
            Lookup::Pending
        } else {
            Lookup::Unmapped
        }
    }

    pub fn len(&self, mode: Mode) -> usize {
        self.table(mode).len()
    }
}

const DEFAULT_COMMAND_MAPPINGS: &[(&str, Command)] = &[
    ("h", Command::MoveBackward),
    ("l", Command::MoveForward),
    ("j", Command::MoveDown),
    ("k", Command::MoveUp),
    ("b", Command::MoveWordBackward),
    ("w", Command::MoveWordForward),
    ("e", Command::MoveToEndOfWord),
    ("0", Command::MoveToBeginningOfLine),
    ("$", Command::MoveToEndOfLine),
    ("G", Command::MoveToEndOfDocument),
    ("gg", Command::MoveToBeginningOfDocument),
    ("<C-d>", Command::HalfPageDown),
    ("<C-u>", Command::HalfPageUp),
    ("i", Command::InsertBackward),
    ("a", Command::InsertForward),
    ("I", Command::InsertAtBeginningOfLine),
    ("A", Command::InsertAtEndOfLine),
    ("O", Command::InsertNewlineAbove),
    ("o", Command::InsertNewlineBelow),
    ("x", Command::CutForward),
    ("dl", Command::CutForward),
    ("dh", Command::CutBackward),
    ("dw", Command::CutWordForward),
    ("db", Command::CutWordBackward),
    ("gt", Command::NextTab),
    ("gT", Command::PreviousTab),
];

/// The stock Vim-flavored bindings.
pub fn default_keymap() -> Keymap {
    let mut keymap = Keymap::empty();
    for (keys, command) in DEFAULT_COMMAND_MAPPINGS {
        insert_canonical(&mut keymap.command, keys, *command);
    }
    insert_canonical(&mut keymap.insert, "<esc>", Command::EnterCommandMode);
    keymap
}

fn insert_canonical(table: &mut BTreeMap<String, Command>, keys: &str, command: Command) {
    match KeyStroke::parse_sequence(keys) {
        Ok(strokes) => {
            table.insert(sequence_to_string(&strokes), command);
        }
        Err(err) => crate::log_debug(&format!("skipping default mapping '{keys}': {err}")),
    }
}
