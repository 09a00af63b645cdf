//! The editor: state plus everything that follows each committed
//! transaction.
//!
//! Every change goes through [`Editor::dispatch`], which records history,
//! keeps code highlighting and search results current and re-checks the
//! slash trigger. All of it runs before `dispatch` returns, so derived state
//! always describes the latest document.

use crate::actions::{KeyAction, KeyCombo, KeydownResult, Keymap, Modifiers};
use crate::commands::Command;
use crate::formatting::current_link;
use crate::highlight::CodeHighlighter;
use crate::history::{DEFAULT_MAX_STEPS, History, UndoManager};
use crate::links::UrlInput;
use crate::model::Document;
use crate::search::SearchState;
use crate::serialize::{text_content, to_html};
use crate::slash::{self, SLASH_ITEMS, SlashKeyResult, SlashMenu, detect_trigger};
use crate::state::EditorState;
use crate::transform::Transaction;
use crate::types::{Decoration, Selection};

/// Something the host UI has to do in response to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRequest {
    /// Show the link dialog, prefilled with the link under the selection.
    OpenLinkDialog { href: Option<String> },
    /// Focus the search box.
    FocusSearch,
}

#[derive(Debug, Clone)]
pub struct Editor {
    state: EditorState,
    history: History,
    search: SearchState,
    highlighter: CodeHighlighter,
    slash: Option<SlashMenu>,
    /// Slash position the user closed the menu at.
    dismissed_slash: Option<usize>,
    keymap: Keymap,
    requests: Vec<HostRequest>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Document::default())
    }
}

impl Editor {
    pub fn new(doc: Document) -> Self {
        let state = EditorState::new(doc);
        let highlighter = CodeHighlighter::new(&state.doc);
        Self {
            state,
            history: History::new(DEFAULT_MAX_STEPS),
            search: SearchState::new(),
            highlighter,
            slash: None,
            dismissed_slash: None,
            keymap: Keymap::default_for_platform(false),
            requests: Vec::new(),
        }
    }

    pub fn from_html(html: &str) -> Self {
        Self::new(crate::parse::parse_html(html))
    }

    pub fn with_keymap(mut self, keymap: Keymap) -> Self {
        self.keymap = keymap;
        self
    }

    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history = History::new(depth);
        self
    }

    // === Accessors ===

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn doc(&self) -> &Document {
        &self.state.doc
    }

    pub fn selection(&self) -> Selection {
        self.state.selection
    }

    pub fn to_html(&self) -> String {
        to_html(&self.state.doc)
    }

    pub fn text_content(&self) -> String {
        text_content(&self.state.doc)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn highlighter(&self) -> &CodeHighlighter {
        &self.highlighter
    }

    pub fn slash_menu(&self) -> Option<&SlashMenu> {
        self.slash.as_ref()
    }

    /// Search results followed by code highlighting.
    pub fn decorations(&self) -> Vec<Decoration> {
        let mut out = self.search.results().to_vec();
        out.extend(self.highlighter.decorations());
        out
    }

    /// Requests raised since the last call.
    pub fn take_requests(&mut self) -> Vec<HostRequest> {
        std::mem::take(&mut self.requests)
    }

    // === Transactions ===

    /// Commit a transaction and bring derived state up to date.
    pub fn dispatch(&mut self, tr: Transaction) {
        let before = self.state.selection;
        let next = self.state.apply(&tr);
        self.history.record(&tr, before, next.selection);
        self.highlighter.apply(&tr, before.head, next.selection.head);
        self.state = next;
        if tr.doc_changed() {
            self.search.update(&self.state.doc);
        }
        self.refresh_slash();
    }

    /// Run one command. Returns whether it applied.
    pub fn execute(&mut self, command: &Command) -> bool {
        let mut tr = self.state.transaction();
        if !command.apply(&mut tr) {
            tracing::trace!(command = command.name(), "command not applicable");
            return false;
        }
        self.dispatch(tr);
        true
    }

    /// Run commands as one transaction. Nothing changes unless all apply.
    pub fn execute_chain(&mut self, commands: &[Command]) -> bool {
        let mut tr = self.state.transaction();
        for command in commands {
            if !command.apply(&mut tr) {
                return false;
            }
        }
        self.dispatch(tr);
        true
    }

    pub fn can_execute(&self, command: &Command) -> bool {
        command.can_apply(&self.state)
    }

    pub fn is_active(&self, command: &Command) -> bool {
        command.is_active(&self.state)
    }

    pub fn set_selection(&mut self, selection: Selection) {
        let mut tr = self.state.transaction();
        tr.set_selection(selection);
        self.dispatch(tr);
    }

    /// Type text at the selection.
    pub fn type_text(&mut self, text: &str) -> bool {
        self.execute(&Command::InsertText(text.to_string()))
    }

    /// Replace the whole document. History does not survive this.
    pub fn set_content(&mut self, html: &str) {
        self.state = EditorState::from_html(html);
        self.history.clear();
        self.highlighter.recompute(&self.state.doc);
        self.search.update(&self.state.doc);
        self.slash = None;
        self.dismissed_slash = None;
    }

    // === Links ===

    /// Link the selection. Invalid URLs are refused without touching the
    /// document.
    pub fn set_link(&mut self, href: &str) -> bool {
        if !UrlInput::of(href).can_submit() {
            return false;
        }
        self.execute(&Command::SetLink(href.trim().into()))
    }

    pub fn unset_link(&mut self) -> bool {
        self.execute(&Command::UnsetLink)
    }

    // === Search ===

    pub fn set_search_term(&mut self, term: &str) {
        self.search.set_search_term(term, &self.state.doc);
    }

    pub fn set_replace_term(&mut self, term: &str) {
        self.search.set_replace_term(term);
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
    }

    /// Replace the first match; the term stays active.
    pub fn replace(&mut self) -> bool {
        let mut tr = self.state.transaction();
        if !self.search.replace(&mut tr) {
            return false;
        }
        self.dispatch(tr);
        true
    }

    /// Replace every match in one undoable step.
    pub fn replace_all(&mut self) -> bool {
        let mut tr = self.state.transaction();
        if !self.search.replace_all(&mut tr) {
            return false;
        }
        self.dispatch(tr);
        true
    }

    // === Slash menu ===

    fn refresh_slash(&mut self) {
        match detect_trigger(&self.state.doc, self.state.selection) {
            Some(trigger) if self.dismissed_slash == Some(trigger.from) => {
                self.slash = None;
            }
            Some(trigger) => match &mut self.slash {
                Some(menu) if menu.trigger().from == trigger.from => menu.update(trigger),
                _ => self.slash = Some(SlashMenu::open(trigger)),
            },
            None => {
                self.slash = None;
                self.dismissed_slash = None;
            }
        }
    }

    pub fn close_slash_menu(&mut self) {
        if let Some(menu) = self.slash.take() {
            self.dismissed_slash = Some(menu.trigger().from);
        }
    }

    /// Run a catalog entry over the current trigger.
    pub fn invoke_slash_item(&mut self, catalog_index: usize) -> bool {
        let (Some(menu), Some(item)) = (self.slash.take(), SLASH_ITEMS.get(catalog_index))
        else {
            return false;
        };
        let mut tr = self.state.transaction();
        if !slash::run_item(&mut tr, menu.trigger(), &item.command) {
            return false;
        }
        tracing::debug!(item = item.title, "slash command");
        self.dispatch(tr);
        true
    }

    pub fn slash_hover(&mut self, index: usize) {
        if let Some(menu) = &mut self.slash {
            menu.hover(index);
        }
    }

    pub fn slash_click(&mut self, index: usize) -> bool {
        match self.slash.as_ref().and_then(|m| m.click(index)) {
            Some(catalog_index) => self.invoke_slash_item(catalog_index),
            None => false,
        }
    }

    // === Keys ===

    /// Handle a keydown. The open slash menu sees plain keys first.
    pub fn handle_key(&mut self, combo: &KeyCombo) -> KeydownResult {
        if combo.modifiers == Modifiers::NONE {
            if let Some(menu) = &mut self.slash {
                match menu.handle_key(&combo.key) {
                    SlashKeyResult::Handled => return KeydownResult::Handled,
                    SlashKeyResult::Invoke(index) => {
                        self.invoke_slash_item(index);
                        return KeydownResult::Handled;
                    }
                    SlashKeyResult::Close => {
                        self.close_slash_menu();
                        return KeydownResult::Handled;
                    }
                    SlashKeyResult::Ignored => {}
                }
            }
        }

        let Some(action) = self.keymap.lookup(combo).cloned() else {
            if combo.key.is_navigation() || combo.key.is_modifier() {
                return KeydownResult::PassThrough;
            }
            return KeydownResult::NotHandled;
        };
        let handled = match action {
            KeyAction::Command(command) => self.execute(&command),
            KeyAction::Undo => {
                self.undo();
                true
            }
            KeyAction::Redo => {
                self.redo();
                true
            }
            KeyAction::OpenSearch => {
                self.requests.push(HostRequest::FocusSearch);
                true
            }
            KeyAction::CloseSearch => {
                let active = self.search.is_active();
                self.search.clear();
                active
            }
            KeyAction::OpenLinkDialog => {
                let href = current_link(&self.state.doc, self.state.selection.from());
                self.requests.push(HostRequest::OpenLinkDialog { href });
                true
            }
        };
        match handled {
            true => KeydownResult::Handled,
            false if combo.key.is_navigation() => KeydownResult::PassThrough,
            false => KeydownResult::NotHandled,
        }
    }
}

impl UndoManager for Editor {
    fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn undo(&mut self) -> bool {
        match self.history.undo(&self.state) {
            Some(tr) => {
                self.dispatch(tr);
                true
            }
            None => false,
        }
    }

    fn redo(&mut self) -> bool {
        match self.history.redo(&self.state) {
            Some(tr) => {
                self.dispatch(tr);
                true
            }
            None => false,
        }
    }

    fn clear_history(&mut self) {
        self.history.clear();
    }
}
