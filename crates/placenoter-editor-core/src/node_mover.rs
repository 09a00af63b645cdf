//! Reordering movable blocks with Alt-ArrowUp / Alt-ArrowDown.

use crate::model::{Node, NodeType};
use crate::transform::Transaction;
use crate::types::{Direction, Selection};

/// Node type that can be moved as a unit.
pub const MOVABLE: NodeType = NodeType::DBlock;

/// Swap the movable block around the caret with its neighbour.
///
/// No-op on a range selection, outside a movable block, inside list items
/// and at either end of the parent.
pub(crate) fn move_node(tr: &mut Transaction, direction: Direction) -> bool {
    let sel = tr.selection();
    if !sel.is_empty() {
        return false;
    }
    let doc = tr.doc().clone();
    let Some(rp) = doc.resolve(sel.head) else {
        return false;
    };
    let Some(depth) = rp.find_ancestor(&doc, |el| el.node_type() == MOVABLE) else {
        return false;
    };
    if depth == 0 {
        return false;
    }
    let Some(parent) = rp.node(&doc, depth - 1) else {
        return false;
    };
    if parent.kind.is_list_item() {
        return false;
    }
    let index = rp.index_at(depth - 1);
    let target = match direction {
        Direction::Up => index.checked_sub(1),
        Direction::Down => Some(index + 1).filter(|&t| t < parent.child_count()),
    };
    let Some(target) = target else {
        return false;
    };

    let sibling_size = parent.content[target].node_size();
    let mut children: Vec<Node> = parent.content.clone();
    children.swap(index, target);

    let (from, to) = (rp.start(depth - 1), rp.end(depth - 1));
    if let Err(e) = tr.replace(from, to, children) {
        tracing::warn!(error = %e, "block move rejected");
        return false;
    }
    let head = match direction {
        Direction::Up => sel.head - sibling_size,
        Direction::Down => sel.head + sibling_size,
    };
    tr.set_selection(Selection::collapsed(head));
    true
}

/// Whether a move in `direction` would do anything.
pub fn can_move(doc: &crate::model::Document, sel: Selection, direction: Direction) -> bool {
    let mut tr = Transaction::new(doc.clone(), sel, None);
    move_node(&mut tr, direction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Document;
    use crate::model::build::*;
    use crate::serialize::text_content;
    use crate::state::EditorState;

    fn abc() -> Document {
        doc(vec![p_text("A"), p_text("B"), p_text("C")])
    }

    fn caret_text(s: &EditorState) -> String {
        let tb = s.doc.textblock_at(s.selection.head).unwrap();
        s.doc.element_at(&tb.path).unwrap().text()
    }

    #[test]
    fn test_move_down_swaps_and_follows() {
        // Caret inside "B": dBlock(A) takes 0..5, B's text starts at 7.
        let s = EditorState::new(abc()).with_selection(Selection::collapsed(7));
        let mut tr = s.transaction();
        assert!(move_node(&mut tr, Direction::Down));
        let next = s.apply(&tr);
        assert_eq!(text_content(&next.doc), "A\n\nC\n\nB");
        assert_eq!(next.selection, Selection::collapsed(12));
        assert_eq!(caret_text(&next), "B");
    }

    #[test]
    fn test_move_up_at_first_is_noop() {
        let s = EditorState::new(abc()).with_selection(Selection::collapsed(2));
        let mut tr = s.transaction();
        assert!(!move_node(&mut tr, Direction::Up));
        assert!(!tr.doc_changed());
        assert!(!can_move(&s.doc, s.selection, Direction::Up));
        assert!(can_move(&s.doc, s.selection, Direction::Down));
    }

    #[test]
    fn test_move_refuses_range_selection() {
        let s = EditorState::new(abc()).with_selection(Selection::new(7, 8));
        assert!(!can_move(&s.doc, s.selection, Direction::Down));
    }

    #[test]
    fn test_move_up_then_down_restores() {
        let s = EditorState::new(abc()).with_selection(Selection::collapsed(12));
        let mut tr = s.transaction();
        assert!(move_node(&mut tr, Direction::Up));
        let up = s.apply(&tr);
        assert_eq!(caret_text(&up), "C");
        let mut tr = up.transaction();
        assert!(move_node(&mut tr, Direction::Down));
        let back = up.apply(&tr);
        assert_eq!(back.doc, s.doc);
        assert_eq!(back.selection, s.selection);
    }
}
