//! Core editor types: selection, decorations and movement direction.

use std::ops::Range;

use smol_str::SmolStr;

use crate::model::Document;
use crate::transform::{Assoc, Mapping, StepMap};

/// Text selection with anchor and head positions.
///
/// The anchor is where the selection started, the head is where the cursor is now.
/// They may be in any order - use `from()` and `to()` for ordered bounds.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
    /// Where selection started
    pub anchor: usize,
    /// Where cursor is now
    pub head: usize,
}

impl Selection {
    /// Create a new selection.
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Create a collapsed selection (cursor position).
    pub fn collapsed(offset: usize) -> Self {
        Self {
            anchor: offset,
            head: offset,
        }
    }

    /// Lower bound of the selection.
    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Upper bound of the selection.
    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Check if the selection is collapsed (empty, cursor only).
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Check if empty (same as is_collapsed).
    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }

    /// Check if a position is within the selection.
    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.from() && pos < self.to()
    }

    /// Convert to a Range<usize> (ordered).
    pub fn to_range(&self) -> Range<usize> {
        self.from()..self.to()
    }

    /// Check if the selection is backwards (head before anchor).
    pub fn is_backwards(&self) -> bool {
        self.head < self.anchor
    }

    pub fn map_through(&self, map: &StepMap) -> Self {
        Self {
            anchor: map.map(self.anchor, Assoc::After),
            head: map.map(self.head, Assoc::After),
        }
    }

    pub fn map(&self, mapping: &Mapping) -> Self {
        Self {
            anchor: mapping.map(self.anchor, Assoc::After),
            head: mapping.map(self.head, Assoc::After),
        }
    }

    /// Both ends sit inside textblock content.
    pub fn is_valid(&self, doc: &Document) -> bool {
        is_caret_position(doc, self.anchor) && is_caret_position(doc, self.head)
    }

    /// Move each end to the nearest valid caret position.
    pub fn normalized(&self, doc: &Document) -> Self {
        if self.is_valid(doc) {
            return *self;
        }
        let toward_head = if self.head >= self.anchor { 1 } else { -1 };
        Self {
            anchor: nearest_caret(doc, self.anchor, toward_head),
            head: nearest_caret(doc, self.head, -toward_head),
        }
    }
}

/// Whether `pos` lies inside the content of a textblock.
pub fn is_caret_position(doc: &Document, pos: usize) -> bool {
    doc.resolve(pos)
        .and_then(|rp| rp.parent(doc).map(|p| p.is_textblock()))
        .unwrap_or(false)
}

/// Closest caret position to `pos`. A non-negative `bias` prefers searching
/// forward.
pub fn nearest_caret(doc: &Document, pos: usize, bias: i8) -> usize {
    let pos = pos.min(doc.content_size());
    let blocks = doc.textblocks();
    if blocks.iter().any(|tb| tb.start <= pos && pos <= tb.end) {
        return pos;
    }
    let forward = blocks.iter().find(|tb| tb.start >= pos).map(|tb| tb.start);
    let backward = blocks.iter().rev().find(|tb| tb.end <= pos).map(|tb| tb.end);
    let found = if bias >= 0 {
        forward.or(backward)
    } else {
        backward.or(forward)
    };
    found.unwrap_or(0)
}

/// A non-content highlight over a document range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decoration {
    pub from: usize,
    pub to: usize,
    pub class: SmolStr,
}

impl Decoration {
    pub fn new(from: usize, to: usize, class: impl Into<SmolStr>) -> Self {
        Self {
            from,
            to,
            class: class.into(),
        }
    }

    /// Shift both ends by a signed delta.
    pub fn adjust_positions(&mut self, delta: isize) {
        self.from = (self.from as isize + delta) as usize;
        self.to = (self.to as isize + delta) as usize;
    }
}

/// Direction for block reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::*;

    #[test]
    fn test_selection_bounds() {
        let sel = Selection::new(9, 3);
        assert_eq!(sel.from(), 3);
        assert_eq!(sel.to(), 9);
        assert!(sel.is_backwards());
        assert!(sel.contains(3));
        assert!(!sel.contains(9));
    }

    #[test]
    fn test_nearest_caret_skips_structure() {
        let d = doc(vec![p_text("ab"), p_text("cd")]);
        // 5 sits between the two wrappers.
        assert!(!is_caret_position(&d, 5));
        assert_eq!(nearest_caret(&d, 5, 1), 7);
        assert_eq!(nearest_caret(&d, 5, -1), 4);
        assert_eq!(nearest_caret(&d, 0, -1), 2);
    }

    #[test]
    fn test_normalized_keeps_valid_selection() {
        let d = doc(vec![p_text("abc")]);
        let sel = Selection::new(2, 4);
        assert_eq!(sel.normalized(&d), sel);
        assert_eq!(Selection::collapsed(99).normalized(&d), Selection::collapsed(5));
    }
}
