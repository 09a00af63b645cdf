//! Immutable editor state: document, selection and pending marks.

use crate::model::{Document, Mark};
use crate::parse::parse_html;
use crate::transform::Transaction;
use crate::types::{Selection, nearest_caret};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    pub doc: Document,
    pub selection: Selection,
    /// Marks applied to the next inserted text, set by toggling a mark on an
    /// empty selection.
    pub stored_marks: Option<Vec<Mark>>,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(Document::default())
    }
}

impl EditorState {
    /// State with the caret at the start of the document.
    pub fn new(doc: Document) -> Self {
        let caret = nearest_caret(&doc, 0, 1);
        Self {
            doc,
            selection: Selection::collapsed(caret),
            stored_marks: None,
        }
    }

    pub fn from_html(html: &str) -> Self {
        Self::new(parse_html(html))
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection.normalized(&self.doc);
        self
    }

    pub fn transaction(&self) -> Transaction {
        Transaction::new(
            self.doc.clone(),
            self.selection,
            self.stored_marks.clone(),
        )
    }

    /// State after a transaction. The selection always resolves inside a
    /// textblock of the new document.
    pub fn apply(&self, tr: &Transaction) -> EditorState {
        let doc = tr.doc().clone();
        let selection = tr.selection().normalized(&doc);
        let stored_marks = if tr.stored_marks_set() {
            tr.stored_marks().map(<[Mark]>::to_vec)
        } else if tr.doc_changed() || selection != self.selection {
            None
        } else {
            self.stored_marks.clone()
        };
        EditorState {
            doc,
            selection,
            stored_marks,
        }
    }

    /// Marks the next typed character would receive.
    pub fn active_marks(&self) -> Vec<Mark> {
        match &self.stored_marks {
            Some(marks) => marks.clone(),
            None => self.doc.marks_at(self.selection.head),
        }
    }
}
