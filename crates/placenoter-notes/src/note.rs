//! Persisted note and quick-link records.

use placenoter_editor_core::{parse_html, text_content};
use serde::{Deserialize, Serialize};

/// A note as stored under `dbnotes` / `binNotes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    /// Editor HTML. The canonical content.
    pub content: String,
    /// Plain text derived from `content`, for search and previews.
    #[serde(default)]
    pub text_content: String,
    #[serde(default)]
    pub timestamp: String,
}

impl Note {
    /// A fresh empty note with a random id, stamped now.
    pub fn new_empty() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: String::new(),
            content: String::new(),
            text_content: String::new(),
            timestamp: timestamp_now(),
        }
    }

    /// No title and no text. Candidates for reuse by `create_note`.
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.text_content.trim().is_empty()
    }

    /// Replace the content, re-deriving `text_content` from it.
    pub fn set_content(&mut self, html: &str) {
        self.content = html.trim().to_string();
        self.text_content = derive_text(&self.content);
    }

    /// Case-insensitive match against title and text.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&term)
            || self.text_content.to_lowercase().contains(&term)
    }
}

/// Plain text of an HTML note body.
pub fn derive_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    text_content(&parse_html(html))
}

/// Local time in the `Thu Oct 16 2026 09:30:00 GMT+0200` shape.
pub fn timestamp_now() -> String {
    chrono::Local::now()
        .format("%a %b %d %Y %H:%M:%S GMT%z")
        .to_string()
}

pub const DEFAULT_ICON_URL: &str = "https://icon.horse/icon/google.com";

/// A bookmark shown on the home screen, keyed by `id` in `quicklinks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickLink {
    pub id: String,
    pub name: String,
    pub url: String,
    pub icon_url: String,
}

impl QuickLink {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            icon_url: icon_url_for(&url),
            url,
        }
    }
}

/// Favicon service URL for the domain of `url`.
pub fn icon_url_for(url: &str) -> String {
    let domain = url
        .split_once("://")
        .map(|(_, rest)| rest.split('/').next().unwrap_or_default())
        .filter(|domain| domain.chars().count() >= 2);
    match domain {
        Some(domain) => format!("https://icon.horse/icon/{domain}"),
        None => DEFAULT_ICON_URL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_field_names() {
        let mut note = Note::new_empty();
        note.id = "n1".into();
        note.set_content("<p>hi</p>");
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["textContent"], "hi");
        assert!(json.get("text_content").is_none());

        let link = QuickLink::new("Docs", "https://docs.rs/serde");
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["iconUrl"], "https://icon.horse/icon/docs.rs");
    }

    #[test]
    fn test_icon_url_fallback() {
        assert_eq!(icon_url_for("example.com"), DEFAULT_ICON_URL);
        assert_eq!(
            icon_url_for("http://localhost:8080"),
            "https://icon.horse/icon/localhost:8080"
        );
    }

    #[test]
    fn test_empty_and_matches() {
        let mut note = Note::new_empty();
        assert!(note.is_empty());
        note.title = "  ".into();
        assert!(note.is_empty());
        note.set_content("<p>Grocery list</p>");
        assert!(!note.is_empty());
        assert!(note.matches("grocery"));
        assert!(!note.matches("todo"));
    }

    #[test]
    fn test_missing_text_content_defaults() {
        let note: Note =
            serde_json::from_str(r#"{"id":"a","title":"t","content":"<p>x</p>"}"#).unwrap();
        assert_eq!(note.text_content, "");
        assert_eq!(note.timestamp, "");
    }
}
