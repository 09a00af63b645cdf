use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Scalar settings, each stored under its own key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub last_active_note_id: Option<String>,
    pub theme: Theme,
    pub spellcheck: bool,
    pub sidebar_open: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            last_active_note_id: None,
            theme: Theme::Light,
            spellcheck: true,
            sidebar_open: false,
        }
    }
}
