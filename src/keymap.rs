//! Keyboard bindings.
//!
//! Bindings map a key plus modifiers to an [`EditorCommand`]. They are plain
//! configuration and can be loaded from JSON; Escape always cancels no matter
//! what the bindings say.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Modifier keys held during a pointer or key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Self { shift: true, ..Self::NONE }
    }

    pub fn ctrl() -> Self {
        Self { ctrl: true, ..Self::NONE }
    }

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }

    /// Whether the modifiers ask for additive (multi) selection.
    pub fn multi_select(&self) -> bool {
        self.shift || self.command()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    Char(char),
    Escape,
    Delete,
    Backspace,
    Enter,
    Tab,
}

impl Key {
    /// Map the text of a Slint `KeyEvent` to a key.
    ///
    /// Special keys arrive as the private-use characters Slint assigns them.
    pub fn from_slint_text(text: &str) -> Option<Key> {
        use slint::platform::Key as SlintKey;

        let mut chars = text.chars();
        let c = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        let key = if c == char::from(SlintKey::Escape) {
            Key::Escape
        } else if c == char::from(SlintKey::Delete) {
            Key::Delete
        } else if c == char::from(SlintKey::Backspace) {
            Key::Backspace
        } else if c == char::from(SlintKey::Return) {
            Key::Enter
        } else if c == char::from(SlintKey::Tab) {
            Key::Tab
        } else {
            Key::Char(c)
        };
        Some(key)
    }

    fn matches(&self, other: &Key) -> bool {
        match (self, other) {
            (Key::Char(a), Key::Char(b)) => a.eq_ignore_ascii_case(b),
            (a, b) => a == b,
        }
    }
}

impl TryFrom<String> for Key {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "Escape" => Ok(Key::Escape),
            "Delete" => Ok(Key::Delete),
            "Backspace" => Ok(Key::Backspace),
            "Enter" => Ok(Key::Enter),
            "Tab" => Ok(Key::Tab),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Key::Char(c)),
                    _ => Err(format!("unknown key `{}`", other)),
                }
            }
        }
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c),
            Key::Escape => f.write_str("Escape"),
            Key::Delete => f.write_str("Delete"),
            Key::Backspace => f.write_str("Backspace"),
            Key::Enter => f.write_str("Enter"),
            Key::Tab => f.write_str("Tab"),
        }
    }
}

/// Editor-level actions reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditorCommand {
    ZoomIn,
    ZoomOut,
    FitToView,
    DeleteSelected,
    Cancel,
    SelectAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub key: Key,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    pub command: EditorCommand,
}

impl KeyBinding {
    pub fn new(key: Key, command: EditorCommand) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
            command,
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    /// Ctrl/Cmd must match exactly; Shift is only checked when the binding
    /// asks for it, since it is needed to type `+` on many layouts.
    fn matches(&self, key: &Key, modifiers: &Modifiers) -> bool {
        self.key.matches(key)
            && self.ctrl == modifiers.command()
            && (!self.shift || modifiers.shift)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keymap {
    bindings: Vec<KeyBinding>,
}

impl Default for Keymap {
    fn default() -> Self {
        use EditorCommand::*;
        Self {
            bindings: vec![
                KeyBinding::new(Key::Char('+'), ZoomIn),
                KeyBinding::new(Key::Char('='), ZoomIn),
                KeyBinding::new(Key::Char('-'), ZoomOut),
                KeyBinding::new(Key::Char('f'), FitToView).with_ctrl(),
                KeyBinding::new(Key::Delete, DeleteSelected),
                KeyBinding::new(Key::Backspace, DeleteSelected),
                KeyBinding::new(Key::Escape, Cancel),
                KeyBinding::new(Key::Char('a'), SelectAll).with_ctrl(),
            ],
        }
    }
}

impl Keymap {
    pub fn new(bindings: Vec<KeyBinding>) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }

    /// Command for a key press, first matching binding wins.
    pub fn resolve(&self, key: &Key, modifiers: &Modifiers) -> Option<EditorCommand> {
        if *key == Key::Escape {
            return Some(EditorCommand::Cancel);
        }
        self.bindings
            .iter()
            .find(|b| b.matches(key, modifiers))
            .map(|b| b.command)
    }
}
