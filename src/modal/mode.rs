/// Modal state of one editor window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Insert,
    Command,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Insert => "insert",
            Mode::Command => "command",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "insert" => Some(Mode::Insert),
            "command" => Some(Mode::Command),
            _ => None,
        }
    }
}

/// How the mode-cursor overlay should draw the caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStyle {
    Block,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutEffect {
    Suppress,
    Restore,
}

/// Side effects the caller applies after a mode request.
///
/// Every request yields the full effect set, even when the mode did not
/// change, so reapplying heals partial external changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Mode,
    pub to: Mode,
    pub cursor: CursorStyle,
    pub shortcuts: ShortcutEffect,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModalStateMachine {
    mode: Mode,
}

impl ModalStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn enter_command(&mut self) -> Transition {
        self.enter(Mode::Command)
    }

    pub fn enter_insert(&mut self) -> Transition {
        self.enter(Mode::Insert)
    }

    pub fn enter(&mut self, mode: Mode) -> Transition {
        let from = std::mem::replace(&mut self.mode, mode);
        let (cursor, shortcuts) = match mode {
            Mode::Command => (CursorStyle::Block, ShortcutEffect::Suppress),
            Mode::Insert => (CursorStyle::Bar, ShortcutEffect::Restore),
        };
        Transition {
            from,
            to: mode,
            cursor,
            shortcuts,
        }
    }
}
