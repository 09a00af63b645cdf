//! Inline formatting: marks, links and text alignment.

use crate::links::is_valid_url;
use crate::model::{
    Document, Mark, MarkType, Node, NodeKind, TextAlign, has_mark_type, remove_mark_type,
};
use crate::transform::{Transaction, remark_inline};

/// Flip a mark over the selection, or over the pending marks when the
/// selection is a caret.
pub(crate) fn toggle_mark(tr: &mut Transaction, mark: Mark) -> bool {
    let sel = tr.selection();
    if sel.is_empty() {
        return toggle_stored_mark(tr, mark);
    }
    let ty = mark.mark_type();
    if range_has_mark(tr.doc(), sel.from(), sel.to(), ty) {
        remove_mark(tr, sel.from(), sel.to(), ty)
    } else {
        add_mark(tr, sel.from(), sel.to(), &mark)
    }
}

/// Apply a mark over the selection (or the pending marks on a caret).
pub(crate) fn set_mark(tr: &mut Transaction, mark: Mark) -> bool {
    let sel = tr.selection();
    if sel.is_empty() {
        let Some(current) = pending_marks(tr) else {
            return false;
        };
        tr.set_stored_marks(Some(mark.add_to_set(&current)));
        return true;
    }
    add_mark(tr, sel.from(), sel.to(), &mark)
}

pub(crate) fn unset_mark(tr: &mut Transaction, ty: MarkType) -> bool {
    let sel = tr.selection();
    if sel.is_empty() {
        let Some(current) = pending_marks(tr) else {
            return false;
        };
        if !has_mark_type(&current, ty) {
            return false;
        }
        tr.set_stored_marks(Some(remove_mark_type(&current, ty)));
        return true;
    }
    remove_mark(tr, sel.from(), sel.to(), ty)
}

fn toggle_stored_mark(tr: &mut Transaction, mark: Mark) -> bool {
    let Some(current) = pending_marks(tr) else {
        return false;
    };
    let ty = mark.mark_type();
    let next = if has_mark_type(&current, ty) {
        remove_mark_type(&current, ty)
    } else {
        mark.add_to_set(&current)
    };
    tr.set_stored_marks(Some(next));
    true
}

/// Marks at the caret, or `None` where marks are not allowed.
fn pending_marks(tr: &Transaction) -> Option<Vec<Mark>> {
    let head = tr.selection().head;
    let tb = tr.doc().textblock_at(head)?;
    if tb.is_code() {
        return None;
    }
    Some(
        tr.stored_marks()
            .map(<[Mark]>::to_vec)
            .unwrap_or_else(|| tr.doc().marks_at(head)),
    )
}

/// Every character in range, outside code blocks and inline code, carries a
/// mark of `ty`.
pub fn range_has_mark(doc: &Document, from: usize, to: usize, ty: MarkType) -> bool {
    let mut seen_text = false;
    for tb in doc.textblocks_between(from, to) {
        if tb.is_code() {
            continue;
        }
        let Some(el) = doc.element_at(&tb.path) else {
            continue;
        };
        let local_from = from.max(tb.start) - tb.start;
        let local_to = to.min(tb.end).saturating_sub(tb.start);
        let mut pos = 0;
        for node in &el.content {
            let size = node.node_size();
            let overlaps = pos < local_to && pos + size > local_from;
            pos += size;
            if !overlaps {
                continue;
            }
            if let Node::Text(t) = node {
                // Inline code never takes other marks, see `add_mark`.
                if ty != MarkType::Code && has_mark_type(&t.marks, MarkType::Code) {
                    continue;
                }
                if !has_mark_type(&t.marks, ty) {
                    return false;
                }
            }
            seen_text = true;
        }
    }
    seen_text
}

/// Add a mark across a range. Text carrying inline code is left alone.
pub(crate) fn add_mark(tr: &mut Transaction, from: usize, to: usize, mark: &Mark) -> bool {
    remark_range(tr, from, to, |marks| {
        if has_mark_type(marks, MarkType::Code) && mark.mark_type() != MarkType::Code {
            marks.to_vec()
        } else {
            mark.add_to_set(marks)
        }
    })
}

pub(crate) fn remove_mark(tr: &mut Transaction, from: usize, to: usize, ty: MarkType) -> bool {
    remark_range(tr, from, to, |marks| remove_mark_type(marks, ty))
}

/// Rewrite marks of every textblock overlapping the range. Each rewrite keeps
/// the textblock's size so positions stay stable.
fn remark_range(
    tr: &mut Transaction,
    from: usize,
    to: usize,
    f: impl Fn(&[Mark]) -> Vec<Mark>,
) -> bool {
    let blocks = tr.doc().textblocks_between(from, to);
    let mut changed = false;
    for tb in blocks {
        if tb.is_code() {
            continue;
        }
        let local_from = from.max(tb.start) - tb.start;
        let local_to = to.min(tb.end).saturating_sub(tb.start);
        if local_from >= local_to {
            continue;
        }
        let Some(el) = tr.doc().element_at(&tb.path) else {
            continue;
        };
        let content = remark_inline(&el.content, local_from, local_to, &f);
        if content == el.content {
            continue;
        }
        match tr.replace(tb.start, tb.end, content) {
            Ok(()) => changed = true,
            Err(e) => tracing::warn!(error = %e, "mark change rejected"),
        }
    }
    changed
}

/// Range of the contiguous run carrying a mark of `ty` at `pos`.
pub fn mark_range(doc: &Document, pos: usize, ty: MarkType) -> Option<(usize, usize, Mark)> {
    let tb = doc.textblock_at(pos)?;
    let el = doc.element_at(&tb.path)?;
    let offset = pos - tb.start;
    let mut leaves = Vec::new();
    let mut cursor = 0;
    for node in &el.content {
        let size = node.node_size();
        let marks = node.as_text().map(|t| t.marks.as_slice()).unwrap_or(&[]);
        leaves.push((cursor, cursor + size, marks));
        cursor += size;
    }
    let carries = |i: usize| has_mark_type(leaves[i].2, ty);
    let after = leaves.iter().position(|(s, e, _)| *s <= offset && offset < *e);
    let before = leaves.iter().position(|(_, e, _)| *e == offset);
    let index = match (after, before) {
        (Some(a), _) if carries(a) => a,
        (_, Some(b)) if carries(b) => b,
        _ => return None,
    };
    let mark = leaves[index].2.iter().find(|m| m.mark_type() == ty)?.clone();
    let mut lo = index;
    while lo > 0 && leaves[lo - 1].2.contains(&mark) {
        lo -= 1;
    }
    let mut hi = index;
    while hi + 1 < leaves.len() && leaves[hi + 1].2.contains(&mark) {
        hi += 1;
    }
    Some((tb.start + leaves[lo].0, tb.start + leaves[hi].1, mark))
}

/// Link the selection, or the whole link run around the caret.
///
/// Invalid URLs leave the document untouched.
pub(crate) fn set_link(tr: &mut Transaction, href: &str) -> bool {
    let href = href.trim();
    if !is_valid_url(href) {
        return false;
    }
    let mark = Mark::link(href);
    let sel = tr.selection();
    let range = match mark_range(tr.doc(), sel.from(), MarkType::Link) {
        Some((from, to, _)) => Some((from.min(sel.from()), to.max(sel.to()))),
        None if !sel.is_empty() => Some((sel.from(), sel.to())),
        None => None,
    };
    match range {
        Some((from, to)) => add_mark(tr, from, to, &mark),
        None => set_mark(tr, mark),
    }
}

pub(crate) fn unset_link(tr: &mut Transaction) -> bool {
    let sel = tr.selection();
    let range = match mark_range(tr.doc(), sel.from(), MarkType::Link) {
        Some((from, to, _)) => (from.min(sel.from()), to.max(sel.to())),
        None if !sel.is_empty() => (sel.from(), sel.to()),
        None => return false,
    };
    remove_mark(tr, range.0, range.1, MarkType::Link)
}

/// Href of the link at the selection start, for prefilling the link dialog.
pub fn current_link(doc: &Document, pos: usize) -> Option<String> {
    match mark_range(doc, pos, MarkType::Link)?.2 {
        Mark::Link { href } => Some(href.to_string()),
        _ => None,
    }
}

/// Set or clear alignment on paragraphs and headings in the selection.
pub(crate) fn set_text_align(tr: &mut Transaction, align: Option<TextAlign>) -> bool {
    let sel = tr.selection();
    let blocks = tr.doc().textblocks_between(sel.from(), sel.to());
    let mut changed = false;
    for tb in blocks {
        let kind = match &tb.kind {
            NodeKind::Paragraph { .. } => NodeKind::Paragraph { align },
            NodeKind::Heading { level, .. } => NodeKind::Heading {
                level: *level,
                align,
            },
            _ => continue,
        };
        if kind == tb.kind {
            continue;
        }
        let Some(el) = tr.doc().element_at(&tb.path) else {
            continue;
        };
        let node = Node::element(kind, el.content.clone());
        if tr.replace(tb.before, tb.after(), vec![node]).is_ok() {
            changed = true;
        }
    }
    changed
}

/// Alignment shared by every aligned block in the selection.
pub fn active_align(doc: &Document, from: usize, to: usize) -> Option<TextAlign> {
    let mut aligns = doc
        .textblocks_between(from, to)
        .into_iter()
        .filter(|tb| !tb.is_code())
        .map(|tb| tb.kind.align());
    let first = aligns.next()??;
    aligns.all(|a| a == Some(first)).then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::*;
    use crate::state::EditorState;
    use crate::types::Selection;

    fn state(doc: crate::model::Document, anchor: usize, head: usize) -> EditorState {
        EditorState::new(doc).with_selection(Selection::new(anchor, head))
    }

    #[test]
    fn test_toggle_mark_twice_restores_document() {
        let s = state(doc(vec![p_text("hello world")]), 2, 7);
        let mut tr = s.transaction();
        assert!(toggle_mark(&mut tr, Mark::Bold));
        let bolded = s.apply(&tr);
        assert!(range_has_mark(&bolded.doc, 2, 7, MarkType::Bold));

        let mut tr = bolded.transaction();
        assert!(toggle_mark(&mut tr, Mark::Bold));
        let back = bolded.apply(&tr);
        assert_eq!(back.doc, s.doc);
        assert_eq!(back.selection, Selection::new(2, 7));
    }

    #[test]
    fn test_toggle_over_inline_code_restores_document() {
        let mixed = doc(vec![p(vec![
            Node::text("ab"),
            Node::marked("cd", vec![Mark::Code]),
        ])]);
        let s = state(mixed, 2, 6);
        let mut tr = s.transaction();
        assert!(toggle_mark(&mut tr, Mark::Bold));
        let bolded = s.apply(&tr);
        assert!(range_has_mark(&bolded.doc, 2, 6, MarkType::Bold));

        let mut tr = bolded.transaction();
        assert!(toggle_mark(&mut tr, Mark::Bold));
        assert_eq!(bolded.apply(&tr).doc, s.doc);
    }

    #[test]
    fn test_toggle_on_caret_sets_pending_mark() {
        let s = state(doc(vec![p_text("abc")]), 3, 3);
        let mut tr = s.transaction();
        assert!(toggle_mark(&mut tr, Mark::Italic));
        assert!(!tr.doc_changed());
        let next = s.apply(&tr);
        assert_eq!(next.stored_marks, Some(vec![Mark::Italic]));
    }

    #[test]
    fn test_marks_skip_code_blocks() {
        let s = state(doc(vec![code(None, "let x")]), 2, 5);
        let mut tr = s.transaction();
        assert!(!toggle_mark(&mut tr, Mark::Bold));
        assert!(!tr.doc_changed());
    }

    #[test]
    fn test_set_link_extends_over_existing_link() {
        let d = doc(vec![p(vec![
            Node::text("see "),
            Node::marked("the docs", vec![Mark::link("https://old.example.com")]),
            Node::text("!"),
        ])]);
        // Caret in the middle of the link.
        let s = state(d, 9, 9);
        let mut tr = s.transaction();
        assert!(set_link(&mut tr, "https://new.example.com"));
        let next = s.apply(&tr);
        assert_eq!(
            mark_range(&next.doc, 9, MarkType::Link).map(|r| (r.0, r.1)),
            Some((6, 14))
        );
        assert_eq!(
            current_link(&next.doc, 9).as_deref(),
            Some("https://new.example.com")
        );
    }

    #[test]
    fn test_invalid_link_is_rejected() {
        let s = state(doc(vec![p_text("text")]), 2, 6);
        let mut tr = s.transaction();
        assert!(!set_link(&mut tr, "not a url"));
        assert!(!tr.doc_changed());
    }

    #[test]
    fn test_unset_link_removes_whole_run() {
        let d = doc(vec![p(vec![Node::marked(
            "linked",
            vec![Mark::link("https://a.io"), Mark::Bold],
        )])]);
        let s = state(d, 4, 4);
        let mut tr = s.transaction();
        assert!(unset_link(&mut tr));
        let next = s.apply(&tr);
        assert!(mark_range(&next.doc, 4, MarkType::Link).is_none());
        assert!(range_has_mark(&next.doc, 2, 8, MarkType::Bold));
    }

    #[test]
    fn test_text_align_applies_to_selected_blocks() {
        let s = state(doc(vec![p_text("a"), h(2, "b"), code(None, "c")]), 2, 13);
        let mut tr = s.transaction();
        assert!(set_text_align(&mut tr, Some(TextAlign::Center)));
        let next = s.apply(&tr);
        assert_eq!(active_align(&next.doc, 2, 8), Some(TextAlign::Center));
        let code_kind = next.doc.blocks().nth(2).unwrap().kind.clone();
        assert_eq!(code_kind, NodeKind::code_block(None));
    }
}
