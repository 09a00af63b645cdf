//! Keyboard input: keys, modifier state, key combinations and the editor
//! keymap.
//!
//! Keys follow the DOM `KeyboardEvent.key` vocabulary so a host can convert
//! its events with [`Key::from_dom`]. The keymap resolves a [`KeyCombo`] to
//! a [`KeyAction`]; the editor executes it.

use std::collections::HashMap;

use smol_str::SmolStr;

use crate::blocks::ListKind;
use crate::commands::Command;
use crate::model::{MarkType, TextAlign};
use crate::types::Direction;

/// A keyboard key, by its DOM name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key.
    Character(SmolStr),

    /// Unknown/unidentified key.
    Unidentified,

    // === Whitespace / editing ===
    Backspace,
    Delete,
    Enter,
    Tab,
    Escape,

    // === Navigation ===
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    PageUp,
    PageDown,

    // === Modifiers ===
    Alt,
    Control,
    Meta,
    Shift,
    CapsLock,
}

impl Key {
    /// Create a character key. Letters are stored lowercase so Shift does
    /// not change which binding matches.
    pub fn character(s: impl Into<SmolStr>) -> Self {
        let s: SmolStr = s.into();
        if s.chars().all(|c| c.is_ascii_uppercase()) {
            Self::Character(s.to_ascii_lowercase().into())
        } else {
            Self::Character(s)
        }
    }

    /// Key from a DOM `KeyboardEvent.key` value.
    pub fn from_dom(name: &str) -> Self {
        match name {
            "Backspace" => Self::Backspace,
            "Delete" => Self::Delete,
            "Enter" => Self::Enter,
            "Tab" => Self::Tab,
            "Escape" | "Esc" => Self::Escape,
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowRight" => Self::ArrowRight,
            "ArrowUp" => Self::ArrowUp,
            "ArrowDown" => Self::ArrowDown,
            "Home" => Self::Home,
            "End" => Self::End,
            "PageUp" => Self::PageUp,
            "PageDown" => Self::PageDown,
            "Alt" => Self::Alt,
            "Control" => Self::Control,
            "Meta" => Self::Meta,
            "Shift" => Self::Shift,
            "CapsLock" => Self::CapsLock,
            "" | "Unidentified" => Self::Unidentified,
            other if other.chars().count() == 1 => Self::character(other),
            _ => Self::Unidentified,
        }
    }

    /// Check if this is a navigation key.
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Self::ArrowLeft
                | Self::ArrowRight
                | Self::ArrowUp
                | Self::ArrowDown
                | Self::Home
                | Self::End
                | Self::PageUp
                | Self::PageDown
        )
    }

    /// Check if this is a modifier key.
    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            Self::Alt | Self::Control | Self::Meta | Self::Shift | Self::CapsLock
        )
    }
}

/// Modifier key state for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };

    pub const ALT: Self = Self {
        alt: true,
        ..Self::NONE
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    pub const META: Self = Self {
        meta: true,
        ..Self::NONE
    };

    /// Get the primary modifier for the platform (Cmd on Mac, Ctrl elsewhere).
    pub fn primary(is_mac: bool) -> Self {
        if is_mac { Self::META } else { Self::CTRL }
    }

    pub fn with_shift(self) -> Self {
        Self {
            shift: true,
            ..self
        }
    }

    pub fn with_alt(self) -> Self {
        Self { alt: true, ..self }
    }
}

/// A key combination for triggering an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn primary(key: Key, is_mac: bool) -> Self {
        Self {
            key,
            modifiers: Modifiers::primary(is_mac),
        }
    }

    /// Parse a binding such as `"Mod-Shift-7"` or `"Alt-ArrowUp"`.
    ///
    /// `Mod` is Cmd on Mac and Ctrl elsewhere. The key comes last.
    pub fn parse(binding: &str, is_mac: bool) -> Option<Self> {
        let mut parts: Vec<&str> = binding.split('-').collect();
        // "Mod--" binds the minus key.
        if binding.ends_with("--") {
            parts.truncate(parts.len() - 2);
            parts.push("-");
        }
        let key = parts.pop().filter(|k| !k.is_empty())?;
        let mut modifiers = Modifiers::NONE;
        for part in parts {
            match part {
                "Mod" => {
                    let primary = Modifiers::primary(is_mac);
                    modifiers.ctrl |= primary.ctrl;
                    modifiers.meta |= primary.meta;
                }
                "Ctrl" => modifiers.ctrl = true,
                "Cmd" | "Meta" => modifiers.meta = true,
                "Alt" => modifiers.alt = true,
                "Shift" => modifiers.shift = true,
                _ => return None,
            }
        }
        let key = Key::from_dom(key);
        (key != Key::Unidentified).then_some(Self { key, modifiers })
    }
}

/// Result of handling a keydown event.
#[derive(Debug, Clone, PartialEq)]
pub enum KeydownResult {
    /// Event was handled, prevent default.
    Handled,
    /// Event was not a keybinding, let platform handle it.
    NotHandled,
    /// Event should be passed through (navigation, etc.).
    PassThrough,
}

/// What a key binding does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Command(Command),
    Undo,
    Redo,
    /// Focus the search box.
    OpenSearch,
    /// Clear the search term.
    CloseSearch,
    /// Ask the host to show the link dialog.
    OpenLinkDialog,
}

/// Key bindings, resolved for one platform.
#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: HashMap<KeyCombo, KeyAction>,
}

impl Keymap {
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Default bindings. `Mod` is Cmd on Mac and Ctrl elsewhere.
    pub fn default_for_platform(is_mac: bool) -> Self {
        let cmd = KeyAction::Command;
        let table: Vec<(&str, KeyAction)> = vec![
            // === Marks ===
            ("Mod-b", cmd(Command::ToggleMark(MarkType::Bold))),
            ("Mod-i", cmd(Command::ToggleMark(MarkType::Italic))),
            ("Mod-u", cmd(Command::ToggleMark(MarkType::Underline))),
            ("Mod-Shift-x", cmd(Command::ToggleMark(MarkType::Strike))),
            ("Mod-e", cmd(Command::ToggleMark(MarkType::Code))),
            ("Mod-k", KeyAction::OpenLinkDialog),
            // === Alignment ===
            ("Mod-Shift-l", cmd(Command::SetTextAlign(TextAlign::Left))),
            ("Mod-Shift-e", cmd(Command::SetTextAlign(TextAlign::Center))),
            ("Mod-Shift-r", cmd(Command::SetTextAlign(TextAlign::Right))),
            ("Mod-Shift-j", cmd(Command::SetTextAlign(TextAlign::Justify))),
            // === Blocks ===
            ("Mod-Alt-1", cmd(Command::ToggleHeading(1))),
            ("Mod-Alt-2", cmd(Command::ToggleHeading(2))),
            ("Mod-Alt-3", cmd(Command::ToggleHeading(3))),
            ("Mod-Shift-7", cmd(Command::ToggleList(ListKind::Ordered))),
            ("Mod-Shift-8", cmd(Command::ToggleList(ListKind::Bullet))),
            ("Mod-Shift-9", cmd(Command::ToggleList(ListKind::Task))),
            ("Mod-Shift-b", cmd(Command::ToggleBlockquote)),
            ("Mod-Alt-c", cmd(Command::ToggleCodeBlock(None))),
            // === History ===
            ("Mod-z", KeyAction::Undo),
            ("Mod-Shift-z", KeyAction::Redo),
            ("Mod-y", KeyAction::Redo),
            // === Search ===
            ("Mod-f", KeyAction::OpenSearch),
            ("Escape", KeyAction::CloseSearch),
            // === Structure ===
            ("Alt-ArrowUp", cmd(Command::MoveNode(Direction::Up))),
            ("Alt-ArrowDown", cmd(Command::MoveNode(Direction::Down))),
            // === Editing ===
            ("Enter", cmd(Command::SplitBlock)),
            ("Backspace", cmd(Command::DeleteBackward)),
            ("Tab", cmd(Command::Indent)),
            ("ArrowDown", cmd(Command::CodeBlockArrowDown)),
        ];
        let mut keymap = Self::empty();
        for (binding, action) in table {
            if let Some(combo) = KeyCombo::parse(binding, is_mac) {
                keymap.bind(combo, action);
            }
        }
        keymap
    }

    pub fn bind(&mut self, combo: KeyCombo, action: KeyAction) {
        self.bindings.insert(combo, action);
    }

    pub fn lookup(&self, combo: &KeyCombo) -> Option<&KeyAction> {
        self.bindings.get(combo)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
