use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Modifier keys as they travel on the wire (`M`, `C`, `A`, `S`).
///
/// Declaration order is the canonical print order, so `<C-M-y>` and `<M-C-y>`
/// normalize to the same keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Modifier {
    #[serde(rename = "A")]
    Alternate,
    #[serde(rename = "C")]
    Control,
    #[serde(rename = "M")]
    Command,
    #[serde(rename = "S")]
    Shift,
}

impl Modifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::Alternate => "A",
            Modifier::Control => "C",
            Modifier::Command => "M",
            Modifier::Shift => "S",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "A" | "a" => Some(Modifier::Alternate),
            "C" | "c" => Some(Modifier::Control),
            "M" | "m" => Some(Modifier::Command),
            "S" | "s" => Some(Modifier::Shift),
            _ => None,
        }
    }
}

/// Ordered modifier set; ordering keeps printing and hashing canonical.
pub type Modifiers = BTreeSet<Modifier>;

/// Readable names for keys that have no printable form.
const READABLE_KEYS: &[(&str, &str)] = &[
    ("enter", "\r"),
    ("tab", "\t"),
    ("space", " "),
    ("esc", "\u{1b}"),
    ("backspace", "\u{8}"),
];

fn readable_to_key(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    READABLE_KEYS
        .iter()
        .find(|(readable, _)| *readable == lower)
        .map(|(_, key)| *key)
}

fn key_to_readable(key: &str) -> Option<&'static str> {
    READABLE_KEYS
        .iter()
        .find(|(_, raw)| *raw == key)
        .map(|(readable, _)| *readable)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("empty keystroke")]
    Empty,
    #[error("keystroke '{0}' should contain a single character or a <...> group")]
    TooLong(String),
    #[error("unterminated <...> group in '{0}'")]
    Unterminated(String),
    #[error("<...> group in '{0}' names no key")]
    MissingKey(String),
}

/// A key plus its modifiers, in Vim-style notation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyStroke {
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyStroke {
    pub fn new(key: impl Into<String>, modifiers: impl IntoIterator<Item = Modifier>) -> Self {
        Self::normalized(key.into(), modifiers.into_iter().collect())
    }

    /// Fold an uppercase letter into `S` + lowercase so `G` and `<S-g>` compare equal.
    fn normalized(mut key: String, mut modifiers: Modifiers) -> Self {
        let mut chars = key.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            if ch.is_uppercase() {
                modifiers.insert(Modifier::Shift);
                key = ch.to_lowercase().collect();
            }
        }
        Self { key, modifiers }
    }

    /// Parse one keystroke: `z`, `G`, `<esc>`, `<C-d>`, `<M-S-z>`.
    pub fn parse(notation: &str) -> Result<Self, KeyParseError> {
        if notation.is_empty() {
            return Err(KeyParseError::Empty);
        }
        if notation.len() > 1 && notation.starts_with('<') {
            let inner = notation
                .strip_prefix('<')
                .and_then(|rest| rest.strip_suffix('>'))
                .ok_or_else(|| KeyParseError::Unterminated(notation.to_string()))?;
            return Self::parse_group(inner, notation);
        }
        let mut chars = notation.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Ok(Self::normalized(ch.to_string(), Modifiers::new())),
            _ => Err(KeyParseError::TooLong(notation.to_string())),
        }
    }

    fn parse_group(inner: &str, notation: &str) -> Result<Self, KeyParseError> {
        let mut modifiers = Modifiers::new();
        let mut rest = inner;
        // Modifier prefixes are single letters followed by '-'; whatever remains is the key,
        // which lets `<C-->` name the minus key.
        while let Some((head, tail)) = rest.split_once('-') {
            match Modifier::from_str(head) {
                Some(modifier) if !tail.is_empty() => {
                    modifiers.insert(modifier);
                    rest = tail;
                }
                _ => break,
            }
        }
        if rest.is_empty() {
            return Err(KeyParseError::MissingKey(notation.to_string()));
        }
        let key = readable_to_key(rest)
            .map(str::to_string)
            .unwrap_or_else(|| rest.to_string());
        Ok(Self::normalized(key, modifiers))
    }

    /// Parse a mapping string that may hold several keystrokes, like `x<C-d>gg`.
    pub fn parse_sequence(notation: &str) -> Result<Vec<Self>, KeyParseError> {
        let mut strokes = Vec::new();
        let mut rest = notation;
        while let Some(ch) = rest.chars().next() {
            if ch == '<' && rest.len() > 1 {
                let end = rest
                    .find('>')
                    .ok_or_else(|| KeyParseError::Unterminated(notation.to_string()))?;
                strokes.push(Self::parse(&rest[..=end])?);
                rest = &rest[end + 1..];
            } else {
                let len = ch.len_utf8();
                strokes.push(Self::parse(&rest[..len])?);
                rest = &rest[len..];
            }
        }
        if strokes.is_empty() {
            return Err(KeyParseError::Empty);
        }
        Ok(strokes)
    }

    /// Build a keystroke from the characters and modifier flags of a host key event.
    pub fn from_event(characters: &str, modifiers: &Modifiers) -> Option<Self> {
        if characters.is_empty() {
            return None;
        }
        Some(Self::normalized(characters.to_string(), modifiers.clone()))
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }
}

impl fmt::Display for KeyStroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut modifiers = self.modifiers.clone();
        let mut key = self.key.clone();
        let is_letter = {
            let mut chars = key.chars();
            matches!((chars.next(), chars.next()), (Some(ch), None) if ch.is_alphabetic())
        };
        if is_letter && modifiers.remove(&Modifier::Shift) {
            key = key.to_uppercase();
        }
        let readable = key_to_readable(&key);
        if modifiers.is_empty() {
            return match readable {
                Some(name) => write!(f, "<{name}>"),
                None => write!(f, "{key}"),
            };
        }
        write!(f, "<")?;
        for modifier in &modifiers {
            write!(f, "{}-", modifier.as_str())?;
        }
        write!(f, "{}>", readable.unwrap_or(&key))
    }
}

/// Render a keystroke list back to canonical notation (`x<C-M-y>Z`).
pub fn sequence_to_string(strokes: &[KeyStroke]) -> String {
    strokes.iter().map(ToString::to_string).collect()
}
