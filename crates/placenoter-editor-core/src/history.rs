//! Undo/redo management for editor transactions.
//!
//! Provides:
//! - `UndoManager` trait for abstracting undo implementations
//! - `History` - bounded undo and redo stacks of recorded transactions

use crate::state::EditorState;
use crate::transform::{Step, Transaction};
use crate::types::Selection;

/// Default number of undo steps kept.
pub const DEFAULT_MAX_STEPS: usize = 100;

/// Trait for managing undo/redo operations.
///
/// Implementations must actually perform the undo/redo, not just track state.
/// [`crate::Editor`] implements it on top of [`History`].
pub trait UndoManager {
    /// Check if undo is available.
    fn can_undo(&self) -> bool;

    /// Check if redo is available.
    fn can_redo(&self) -> bool;

    /// Perform undo. Returns true if successful.
    fn undo(&mut self) -> bool;

    /// Perform redo. Returns true if successful.
    fn redo(&mut self) -> bool;

    /// Clear all undo/redo history.
    fn clear_history(&mut self);
}

/// One recorded transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HistoryEntry {
    steps: Vec<Step>,
    /// Inverse of each step, in application order.
    inverses: Vec<Step>,
    selection_before: Selection,
    selection_after: Selection,
}

/// Undo and redo stacks.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_steps: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STEPS)
    }
}

impl History {
    pub fn new(max_steps: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps,
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Record a committed transaction. Transactions that did not touch the
    /// document, or opted out of history, are ignored.
    pub fn record(
        &mut self,
        tr: &Transaction,
        selection_before: Selection,
        selection_after: Selection,
    ) {
        if !tr.doc_changed() || !tr.add_to_history() {
            return;
        }
        // Clear redo stack on new edit
        self.redo_stack.clear();

        self.undo_stack.push(HistoryEntry {
            steps: tr.steps().to_vec(),
            inverses: tr.inverses().to_vec(),
            selection_before,
            selection_after,
        });

        // Trim if over max
        while self.undo_stack.len() > self.max_steps {
            self.undo_stack.remove(0);
        }
    }

    /// Build the transaction reverting the most recent entry.
    ///
    /// If the inverses no longer apply, the whole history is dropped since it
    /// cannot describe the current document anymore.
    pub fn undo(&mut self, state: &EditorState) -> Option<Transaction> {
        let entry = self.undo_stack.pop()?;
        let tr = replay(state, entry.inverses.iter().rev(), entry.selection_before);
        match tr {
            Some(tr) => {
                self.redo_stack.push(entry);
                Some(tr)
            }
            None => {
                self.clear();
                None
            }
        }
    }

    /// Build the transaction re-applying the most recently undone entry.
    pub fn redo(&mut self, state: &EditorState) -> Option<Transaction> {
        let entry = self.redo_stack.pop()?;
        match replay(state, entry.steps.iter(), entry.selection_after) {
            Some(tr) => {
                self.undo_stack.push(entry);
                Some(tr)
            }
            None => {
                self.clear();
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

fn replay<'a>(
    state: &EditorState,
    steps: impl Iterator<Item = &'a Step>,
    selection: Selection,
) -> Option<Transaction> {
    let mut tr = Transaction::new(state.doc.clone(), state.selection, None);
    tr.set_add_to_history(false);
    for step in steps {
        if let Err(e) = tr.step(step.clone()) {
            tracing::warn!(error = %e, "history replay failed, dropping history");
            return None;
        }
    }
    tr.set_selection(selection);
    Some(tr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;
    use crate::model::build::*;
    use crate::serialize::text_content;

    fn typed(state: &EditorState, at: usize, text: &str) -> (EditorState, Transaction) {
        let mut tr = state.transaction();
        tr.replace(at, at, vec![Node::text(text)]).unwrap();
        tr.set_selection(Selection::collapsed(at + text.chars().count()));
        (state.apply(&tr), tr)
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut history = History::default();
        let s0 = EditorState::new(doc(vec![p_text("ab")]));
        let (s1, tr) = typed(&s0, 3, "X");
        history.record(&tr, s0.selection, s1.selection);
        assert!(history.can_undo());

        let undo = history.undo(&s1).unwrap();
        let back = s1.apply(&undo);
        assert_eq!(back.doc, s0.doc);
        assert_eq!(back.selection, s0.selection);
        assert!(history.can_redo());

        let redo = history.redo(&back).unwrap();
        let again = back.apply(&redo);
        assert_eq!(text_content(&again.doc), "aXb");
        assert_eq!(again.selection, s1.selection);
    }

    #[test]
    fn test_new_record_clears_redo() {
        let mut history = History::default();
        let s0 = EditorState::new(doc(vec![p_text("ab")]));
        let (s1, tr) = typed(&s0, 2, "1");
        history.record(&tr, s0.selection, s1.selection);
        let undo = history.undo(&s1).unwrap();
        let s2 = s1.apply(&undo);
        let (s3, tr) = typed(&s2, 2, "2");
        history.record(&tr, s2.selection, s3.selection);
        assert!(!history.can_redo());
        assert_eq!(history.undo_depth(), 1);
    }

    #[test]
    fn test_depth_is_bounded() {
        let mut history = History::new(3);
        let mut state = EditorState::new(doc(vec![p_text("")]));
        for _ in 0..5 {
            let before = state.selection;
            let (next, tr) = typed(&state, 2, "x");
            history.record(&tr, before, next.selection);
            state = next;
        }
        assert_eq!(history.undo_depth(), 3);
    }

    #[test]
    fn test_unchanged_transactions_are_not_recorded() {
        let mut history = History::default();
        let s0 = EditorState::new(doc(vec![p_text("ab")]));
        let tr = s0.transaction();
        history.record(&tr, s0.selection, s0.selection);
        assert!(!history.can_undo());
    }
}
