//! Invertible document steps, position maps and transactions.

use crate::error::StepError;
use crate::model::{Document, Element, Mark, Node, TextNode, normalize_inline};
use crate::schema::{check_content, check_deep};
use crate::types::Selection;

/// Which side a position sticks to when content is inserted exactly there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Before,
    After,
}

/// Position map produced by a single step.
///
/// Positions before the replaced range are unchanged, positions after it
/// shift by the size delta, and positions inside keep their offset from the
/// start, clamped to the new content size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMap {
    pub start: usize,
    pub old_size: usize,
    pub new_size: usize,
}

impl StepMap {
    pub fn new(start: usize, old_size: usize, new_size: usize) -> Self {
        Self {
            start,
            old_size,
            new_size,
        }
    }

    pub fn old_end(&self) -> usize {
        self.start + self.old_size
    }

    pub fn delta(&self) -> isize {
        self.new_size as isize - self.old_size as isize
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        let end = self.old_end();
        if pos < self.start {
            return pos;
        }
        if pos > end {
            return pos - self.old_size + self.new_size;
        }
        if self.old_size == 0 {
            return match assoc {
                Assoc::Before => self.start,
                Assoc::After => self.start + self.new_size,
            };
        }
        if pos == end {
            return self.start + self.new_size;
        }
        self.start + (pos - self.start).min(self.new_size)
    }

    /// Whether the replaced range completely encloses `from..to`.
    pub fn encloses(&self, from: usize, to: usize) -> bool {
        self.old_size > 0 && self.start <= from && to <= self.old_end()
    }
}

/// A chain of step maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.maps.iter().fold(pos, |p, m| m.map(p, assoc))
    }
}

/// Replace the content between two positions that share a parent.
///
/// Inside a textblock the ends may fall inside text leaves; in any other
/// parent they sit on child boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub from: usize,
    pub to: usize,
    pub slice: Vec<Node>,
}

/// Result of applying a step.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub doc: Document,
    pub inverse: Step,
    pub map: StepMap,
}

impl Step {
    pub fn replace(from: usize, to: usize, slice: Vec<Node>) -> Self {
        Self { from, to, slice }
    }

    pub fn insert(pos: usize, slice: Vec<Node>) -> Self {
        Self::replace(pos, pos, slice)
    }

    pub fn delete(from: usize, to: usize) -> Self {
        Self::replace(from, to, Vec::new())
    }

    pub fn slice_size(&self) -> usize {
        self.slice.iter().map(Node::node_size).sum()
    }

    pub fn apply(&self, doc: &Document) -> Result<StepResult, StepError> {
        let size = doc.content_size();
        if self.from > self.to {
            return Err(StepError::InvertedRange {
                from: self.from,
                to: self.to,
            });
        }
        let out_of_range = |pos| StepError::OutOfRange { pos, size };
        let rf = doc.resolve(self.from).ok_or(out_of_range(self.from))?;
        let rt = doc.resolve(self.to).ok_or(out_of_range(self.to))?;
        if rf.path() != rt.path() {
            return Err(StepError::CrossesParents {
                from: self.from,
                to: self.to,
            });
        }
        let parent = rf.parent(doc).ok_or(out_of_range(self.from))?;

        let (content, removed) = if parent.is_textblock() {
            splice_inline(
                &parent.content,
                rf.parent_offset(),
                rt.parent_offset(),
                &self.slice,
            )
        } else {
            if rf.text_offset != 0 || rt.text_offset != 0 {
                return Err(StepError::CrossesParents {
                    from: self.from,
                    to: self.to,
                });
            }
            let removed = parent.content[rf.index..rt.index].to_vec();
            let mut content = parent.content[..rf.index].to_vec();
            content.extend(self.slice.iter().cloned());
            content.extend(parent.content[rt.index..].iter().cloned());
            (content, removed)
        };

        for node in &self.slice {
            if let Node::Element(el) = node {
                check_deep(el)?;
            }
        }
        let new_parent = Element::new(parent.kind.clone(), content);
        check_content(&new_parent)?;

        let doc = doc
            .with_element_at(rf.path(), new_parent)
            .ok_or(out_of_range(self.from))?;
        let slice_size = self.slice_size();
        Ok(StepResult {
            doc,
            inverse: Step::replace(self.from, self.from + slice_size, removed),
            map: StepMap::new(self.from, self.to - self.from, slice_size),
        })
    }
}

/// Splice inline content by character offsets. Returns the new content and
/// the removed leaves.
fn splice_inline(
    content: &[Node],
    from: usize,
    to: usize,
    slice: &[Node],
) -> (Vec<Node>, Vec<Node>) {
    let mut before = Vec::new();
    let mut removed = Vec::new();
    let mut after = Vec::new();
    let mut pos = 0;
    for node in content {
        let Node::Text(t) = node else {
            continue;
        };
        let len = t.len_chars();
        let end = pos + len;
        if pos < from {
            before.push(Node::Text(t.slice(0, len.min(from - pos))));
        }
        let rs = from.max(pos);
        let re = to.min(end);
        if rs < re {
            removed.push(Node::Text(t.slice(rs - pos, re - pos)));
        }
        if end > to {
            after.push(Node::Text(t.slice(to.max(pos) - pos, len)));
        }
        pos = end;
    }
    before.extend(slice.iter().cloned());
    before.extend(after);
    (normalize_inline(before), normalize_inline(removed))
}

/// Re-mark the inline content of a textblock between two character offsets.
pub fn remark_inline(
    content: &[Node],
    from: usize,
    to: usize,
    f: impl Fn(&[Mark]) -> Vec<Mark>,
) -> Vec<Node> {
    let mut out = Vec::new();
    let mut pos = 0;
    for node in content {
        let Node::Text(t) = node else {
            out.push(node.clone());
            continue;
        };
        let len = t.len_chars();
        let end = pos + len;
        let rs = from.clamp(pos, end);
        let re = to.clamp(pos, end);
        if rs > pos {
            out.push(Node::Text(t.slice(0, rs - pos)));
        }
        if re > rs {
            let piece = t.slice(rs - pos, re - pos);
            out.push(Node::Text(TextNode::with_marks(piece.text, f(&t.marks))));
        }
        if end > re {
            out.push(Node::Text(t.slice(re - pos, len)));
        }
        pos = end;
    }
    normalize_inline(out)
}

/// A batch of steps applied to a working document.
///
/// The selection is mapped through every step; commands may override it.
#[derive(Debug, Clone)]
pub struct Transaction {
    before: Document,
    doc: Document,
    selection: Selection,
    stored_marks: Option<Vec<Mark>>,
    stored_marks_set: bool,
    steps: Vec<Step>,
    inverses: Vec<Step>,
    mapping: Mapping,
    add_to_history: bool,
}

impl Transaction {
    pub fn new(doc: Document, selection: Selection, stored_marks: Option<Vec<Mark>>) -> Self {
        Self {
            before: doc.clone(),
            doc,
            selection,
            stored_marks,
            stored_marks_set: false,
            steps: Vec::new(),
            inverses: Vec::new(),
            mapping: Mapping::default(),
            add_to_history: true,
        }
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn doc_before(&self) -> &Document {
        &self.before
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn stored_marks_set(&self) -> bool {
        self.stored_marks_set
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn inverses(&self) -> &[Step] {
        &self.inverses
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn add_to_history(&self) -> bool {
        self.add_to_history
    }

    pub fn set_add_to_history(&mut self, add: bool) {
        self.add_to_history = add;
    }

    /// Apply a step. On error the transaction is left untouched.
    pub fn step(&mut self, step: Step) -> Result<(), StepError> {
        let result = step.apply(&self.doc)?;
        self.doc = result.doc;
        self.selection = self.selection.map_through(&result.map);
        self.mapping.push(result.map);
        self.inverses.push(result.inverse);
        self.steps.push(step);
        Ok(())
    }

    pub fn replace(&mut self, from: usize, to: usize, slice: Vec<Node>) -> Result<(), StepError> {
        self.step(Step::replace(from, to, slice))
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    pub fn set_stored_marks(&mut self, marks: Option<Vec<Mark>>) {
        self.stored_marks = marks;
        self.stored_marks_set = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::*;
    use crate::serialize::text_content;

    #[test]
    fn test_replace_text_and_invert() {
        let d = doc(vec![p_text("hello world")]);
        let step = Step::replace(8, 13, vec![Node::text("there")]);
        let result = step.apply(&d).unwrap();
        assert_eq!(text_content(&result.doc), "hello there");
        let back = result.inverse.apply(&result.doc).unwrap();
        assert_eq!(back.doc, d);
    }

    #[test]
    fn test_replace_across_parents_rejected() {
        let d = doc(vec![p_text("ab"), p_text("cd")]);
        let err = Step::delete(3, 8).apply(&d).unwrap_err();
        assert!(matches!(err, StepError::CrossesParents { .. }));
    }

    #[test]
    fn test_schema_violation_rejected() {
        let d = doc(vec![code(None, "x")]);
        let step = Step::insert(2, vec![Node::marked("y", vec![Mark::Bold])]);
        assert!(matches!(step.apply(&d), Err(StepError::Schema(_))));
    }

    #[test]
    fn test_step_map_positions() {
        let map = StepMap::new(4, 2, 5);
        assert_eq!(map.map(3, Assoc::After), 3);
        assert_eq!(map.map(5, Assoc::After), 5);
        assert_eq!(map.map(6, Assoc::After), 9);
        assert_eq!(map.map(10, Assoc::After), 13);

        let insert = StepMap::new(4, 0, 3);
        assert_eq!(insert.map(4, Assoc::Before), 4);
        assert_eq!(insert.map(4, Assoc::After), 7);
    }

    #[test]
    fn test_transaction_maps_selection() {
        let d = doc(vec![p_text("abc")]);
        let mut tr = Transaction::new(d, Selection::collapsed(5), None);
        tr.replace(2, 2, vec![Node::text("xx")]).unwrap();
        assert_eq!(tr.selection(), Selection::collapsed(7));
        assert!(tr.doc_changed());
        assert_eq!(tr.mapping().map(5, Assoc::After), 7);
    }

    #[test]
    fn test_remark_inline_splits_leaves() {
        let content = vec![Node::text("abcdef")];
        let out = remark_inline(&content, 2, 4, |marks| Mark::Bold.add_to_set(marks));
        assert_eq!(
            out,
            vec![
                Node::text("ab"),
                Node::marked("cd", vec![Mark::Bold]),
                Node::text("ef"),
            ]
        );
    }
}
