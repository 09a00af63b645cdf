//! The slash-command palette.
//!
//! Typing `/` at the start of a textblock, or after whitespace, opens a menu
//! over a fixed catalog. The text after the slash narrows the catalog with
//! fuzzy matching. Invoking an item deletes the `/query` text and runs the
//! item's command in the same transaction.

use std::sync::LazyLock;

use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};

use crate::actions::Key;
use crate::blocks::{self, ListKind};
use crate::commands::Command;
use crate::model::{Document, Mark};
use crate::serialize::push_escaped;
use crate::transform::Transaction;
use crate::types::Selection;

/// One palette entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashItem {
    pub title: &'static str,
    /// Markdown-ish hint shown next to the title.
    pub shortcut: Option<&'static str>,
    pub command: Command,
}

pub static SLASH_ITEMS: LazyLock<Vec<SlashItem>> = LazyLock::new(|| {
    let item = |title, shortcut, command| SlashItem {
        title,
        shortcut,
        command,
    };
    vec![
        item("Heading 1", Some("#"), Command::SetHeading(1)),
        item("Heading 2", Some("##"), Command::SetHeading(2)),
        item("Heading 3", Some("###"), Command::SetHeading(3)),
        item("Ordered List", Some("1. L"), Command::ToggleList(ListKind::Ordered)),
        item("Bullet List", Some("- L"), Command::ToggleList(ListKind::Bullet)),
        item("Task List", None, Command::ToggleList(ListKind::Task)),
        item("Bold", Some("**b**"), Command::SetMark(Mark::Bold)),
        item("Italic", Some("_i_"), Command::SetMark(Mark::Italic)),
        item("Underline", None, Command::SetMark(Mark::Underline)),
        item("Strike", Some("~~s~~"), Command::SetMark(Mark::Strike)),
        item("Code", Some("`i`"), Command::SetMark(Mark::Code)),
        item("Code Block", Some("```"), Command::SetCodeBlock(None)),
        item("Blockquote", Some(">"), Command::ToggleBlockquote),
    ]
});

/// A filtered catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashMatch {
    /// Index into [`SLASH_ITEMS`].
    pub index: usize,
    pub score: u32,
    /// Title with matched characters wrapped in `<b>`.
    pub highlighted_title: String,
}

impl SlashMatch {
    pub fn item(&self) -> &'static SlashItem {
        &SLASH_ITEMS[self.index]
    }
}

fn highlight_title(title: &str, indices: &[u32]) -> String {
    let mut out = String::new();
    let mut open = false;
    for (i, c) in title.chars().enumerate() {
        let hit = indices.binary_search(&(i as u32)).is_ok();
        if hit && !open {
            out.push_str("<b>");
            open = true;
        } else if !hit && open {
            out.push_str("</b>");
            open = false;
        }
        push_escaped(&mut out, c.encode_utf8(&mut [0; 4]));
    }
    if open {
        out.push_str("</b>");
    }
    out
}

/// Catalog entries matching `query`, best first.
///
/// An empty query returns the whole catalog in declared order.
pub fn filter_items(query: &str) -> Vec<SlashMatch> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return SLASH_ITEMS
            .iter()
            .enumerate()
            .map(|(index, item)| SlashMatch {
                index,
                score: 0,
                highlighted_title: item.title.to_string(),
            })
            .collect();
    }
    let pattern = Pattern::parse(&query, CaseMatching::Ignore, Normalization::Smart);
    let mut matcher = Matcher::new(Config::DEFAULT);
    let mut buf = Vec::new();
    let mut indices = Vec::new();
    let mut matches: Vec<SlashMatch> = SLASH_ITEMS
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            indices.clear();
            let haystack = Utf32Str::new(item.title, &mut buf);
            let score = pattern.indices(haystack, &mut matcher, &mut indices)?;
            indices.sort_unstable();
            indices.dedup();
            Some(SlashMatch {
                index,
                score,
                highlighted_title: highlight_title(item.title, &indices),
            })
        })
        .collect();
    // Stable sort keeps catalog order between equal scores.
    matches.sort_by(|a, b| b.score.cmp(&a.score));
    matches
}

/// The `/query` text the menu is anchored to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashTrigger {
    /// Position of the slash.
    pub from: usize,
    /// The caret.
    pub to: usize,
    pub query: String,
}

/// Find an active trigger before the caret.
pub fn detect_trigger(doc: &Document, selection: Selection) -> Option<SlashTrigger> {
    if !selection.is_empty() {
        return None;
    }
    let head = selection.head;
    let tb = doc.textblock_at(head)?;
    if tb.is_code() {
        return None;
    }
    let text: Vec<char> = doc.element_at(&tb.path)?.text().chars().collect();
    let offset = head - tb.start;
    let before = &text[..offset.min(text.len())];
    let slash = before.iter().rposition(|c| *c == '/' || c.is_whitespace())?;
    if before[slash] != '/' {
        return None;
    }
    if slash > 0 && !before[slash - 1].is_whitespace() {
        return None;
    }
    Some(SlashTrigger {
        from: tb.start + slash,
        to: head,
        query: before[slash + 1..].iter().collect(),
    })
}

/// Run a palette command in place of the trigger text.
///
/// The `/query` text is removed even when the command does not apply here.
pub fn run_item(tr: &mut Transaction, trigger: &SlashTrigger, command: &Command) -> bool {
    if !blocks::delete_range(tr, trigger.from, trigger.to) {
        return false;
    }
    tr.set_selection(Selection::collapsed(trigger.from));
    let applied = command.apply(tr);
    if !applied {
        tracing::debug!(
            command = command.name(),
            "slash command did not apply, query text removed only"
        );
    }
    true
}

/// What the palette did with a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashKeyResult {
    /// Key consumed, palette still open.
    Handled,
    /// Invoke this catalog entry.
    Invoke(usize),
    /// Close without invoking.
    Close,
    /// Not a palette key.
    Ignored,
}

/// Open palette state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashMenu {
    trigger: SlashTrigger,
    items: Vec<SlashMatch>,
    selected: usize,
}

impl SlashMenu {
    pub fn open(trigger: SlashTrigger) -> Self {
        let items = filter_items(&trigger.query);
        Self {
            trigger,
            items,
            selected: 0,
        }
    }

    /// Follow the trigger as the query changes. The cursor resets when the
    /// list changes.
    pub fn update(&mut self, trigger: SlashTrigger) {
        if trigger.query != self.trigger.query {
            self.items = filter_items(&trigger.query);
            self.selected = 0;
        }
        self.trigger = trigger;
    }

    pub fn trigger(&self) -> &SlashTrigger {
        &self.trigger
    }

    pub fn items(&self) -> &[SlashMatch] {
        &self.items
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&SlashMatch> {
        self.items.get(self.selected)
    }

    pub fn move_up(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + self.items.len() - 1) % self.items.len();
        }
    }

    pub fn move_down(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + 1) % self.items.len();
        }
    }

    /// Mouse hover moves the cursor.
    pub fn hover(&mut self, index: usize) {
        if index < self.items.len() {
            self.selected = index;
        }
    }

    /// Catalog index to invoke for a click on `index`.
    pub fn click(&self, index: usize) -> Option<usize> {
        self.items.get(index).map(|m| m.index)
    }

    pub fn handle_key(&mut self, key: &Key) -> SlashKeyResult {
        match key {
            Key::ArrowUp => {
                self.move_up();
                SlashKeyResult::Handled
            }
            Key::ArrowDown => {
                self.move_down();
                SlashKeyResult::Handled
            }
            Key::Enter => match self.selected_item() {
                Some(m) => SlashKeyResult::Invoke(m.index),
                None => SlashKeyResult::Close,
            },
            Key::Escape => SlashKeyResult::Close,
            _ => SlashKeyResult::Ignored,
        }
    }
}
